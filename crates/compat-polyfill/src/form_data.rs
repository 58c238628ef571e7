//! Multipart Form Data Fallback
//!
//! Collects entries in append order and encodes them as
//! `multipart/form-data` only when the transport asks for a body.

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};

const BOUNDARY_PREFIX: &str = "----fOSFormBoundary";
const BOUNDARY_TOKEN_LEN: usize = 24;
const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

/// Form data error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormDataError {
    #[error("Form field name must not be empty")]
    EmptyKey,
    #[error("Form field name contains a NUL byte: {0:?}")]
    NulInKey(String),
}

/// Binary form field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePart {
    pub filename: String,
    /// Falls back to `application/octet-stream`
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl FilePart {
    pub fn new(filename: &str, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.to_string(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_FILE_TYPE)
    }
}

/// Form entry value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormValue {
    Text(String),
    File(FilePart),
}

impl FormValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::File(_) => None,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Self::Text(s) => s.as_bytes(),
            Self::File(f) => &f.data,
        }
    }
}

/// Form-data contract shared with the native implementation
pub trait FormDataSink {
    fn append(&mut self, key: &str, value: &str) -> Result<(), FormDataError>;
    fn append_file(&mut self, key: &str, file: FilePart) -> Result<(), FormDataError>;
    /// Replace every entry for `key` with one value
    fn set(&mut self, key: &str, value: &str) -> Result<(), FormDataError>;
    fn delete(&mut self, key: &str);
    fn get(&self, key: &str) -> Option<&FormValue>;
    fn get_all(&self, key: &str) -> Vec<&FormValue>;
    fn has(&self, key: &str) -> bool;
    fn entries(&self) -> Box<dyn Iterator<Item = (&str, &FormValue)> + '_>;
}

/// Encoded request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedForm {
    pub boundary: String,
    pub body: Vec<u8>,
}

impl EncodedForm {
    /// `Content-Type` header value for this body
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

/// Manual multipart encoder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    entries: Vec<(String, FormValue)>,
}

fn check_key(key: &str) -> Result<(), FormDataError> {
    if key.is_empty() {
        Err(FormDataError::EmptyKey)
    } else if key.contains('\0') {
        Err(FormDataError::NulInKey(key.to_string()))
    } else {
        Ok(())
    }
}

/// Escape a header parameter the way browsers do
fn escape_param(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("%22"),
            '\r' => out.push_str("%0D"),
            '\n' => out.push_str("%0A"),
            _ => out.push(c),
        }
    }
    out
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode with a fresh random boundary
    pub fn encode(&self) -> EncodedForm {
        self.encode_with(&mut rand::rng())
    }

    /// Encode drawing the boundary from `rng`
    pub fn encode_with<R: Rng + ?Sized>(&self, rng: &mut R) -> EncodedForm {
        let boundary = loop {
            let token: String = (&mut *rng)
                .sample_iter(Alphanumeric)
                .take(BOUNDARY_TOKEN_LEN)
                .map(char::from)
                .collect();
            let candidate = format!("{BOUNDARY_PREFIX}{token}");
            if !self.collides(&candidate) {
                break candidate;
            }
            tracing::debug!("Multipart boundary collided with part content, regenerating");
        };

        let body = self.to_multipart(&boundary);
        EncodedForm { boundary, body }
    }

    fn collides(&self, boundary: &str) -> bool {
        self.entries.iter().any(|(key, value)| {
            key.contains(boundary)
                || contains_bytes(value.bytes(), boundary.as_bytes())
                || matches!(value, FormValue::File(f) if f.filename.contains(boundary))
        })
    }

    /// Multipart body for a caller-chosen boundary
    pub fn to_multipart(&self, boundary: &str) -> Vec<u8> {
        let mut body = Vec::new();

        for (name, value) in &self.entries {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            let name = escape_param(name);

            match value {
                FormValue::Text(text) => {
                    let disposition =
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n");
                    body.extend_from_slice(disposition.as_bytes());
                    body.extend_from_slice(text.as_bytes());
                }
                FormValue::File(file) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{}\"\r\n",
                            escape_param(&file.filename)
                        )
                        .as_bytes(),
                    );
                    let content_type = format!("Content-Type: {}\r\n\r\n", file.content_type());
                    body.extend_from_slice(content_type.as_bytes());
                    body.extend_from_slice(&file.data);
                }
            }
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    /// `application/x-www-form-urlencoded` body; file entries are skipped
    pub fn to_urlencoded(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.entries {
            if let Some(text) = value.as_text() {
                serializer.append_pair(key, text);
            }
        }
        serializer.finish()
    }
}

impl FormDataSink for MultipartForm {
    fn append(&mut self, key: &str, value: &str) -> Result<(), FormDataError> {
        check_key(key)?;
        self.entries.push((key.to_string(), FormValue::Text(value.to_string())));
        Ok(())
    }

    fn append_file(&mut self, key: &str, file: FilePart) -> Result<(), FormDataError> {
        check_key(key)?;
        self.entries.push((key.to_string(), FormValue::File(file)));
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), FormDataError> {
        check_key(key)?;
        let value = FormValue::Text(value.to_string());
        // Native set keeps the position of the first match
        match self.entries.iter().position(|(k, _)| k == key) {
            Some(first) => {
                self.entries[first].1 = value;
                let mut index = 0;
                self.entries.retain(|(k, _)| {
                    let keep = index <= first || k != key;
                    index += 1;
                    keep
                });
            }
            None => self.entries.push((key.to_string(), value)),
        }
        Ok(())
    }

    fn delete(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }

    fn get(&self, key: &str) -> Option<&FormValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn get_all(&self, key: &str) -> Vec<&FormValue> {
        self.entries.iter().filter(|(k, _)| k == key).map(|(_, v)| v).collect()
    }

    fn has(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    fn entries(&self) -> Box<dyn Iterator<Item = (&str, &FormValue)> + '_> {
        Box::new(self.entries.iter().map(|(k, v)| (k.as_str(), v)))
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn test_append_and_get() {
        let mut form = MultipartForm::new();
        form.append("name", "John").unwrap();
        form.append("color", "red").unwrap();
        form.append("color", "blue").unwrap();

        assert_eq!(form.len(), 3);
        assert_eq!(form.get("name").and_then(FormValue::as_text), Some("John"));
        assert_eq!(form.get_all("color").len(), 2);
        assert!(!form.has("missing"));
    }

    #[test]
    fn test_invalid_keys() {
        let mut form = MultipartForm::new();
        assert_eq!(form.append("", "x"), Err(FormDataError::EmptyKey));
        assert!(matches!(form.append("a\0b", "x"), Err(FormDataError::NulInKey(_))));
        assert!(form.is_empty());
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut form = MultipartForm::new();
        form.append("a", "1").unwrap();
        form.append("b", "2").unwrap();
        form.append("a", "3").unwrap();
        form.set("a", "x").unwrap();

        let keys: Vec<_> = form.entries().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(form.get("a").and_then(FormValue::as_text), Some("x"));
    }

    #[test]
    fn test_delete() {
        let mut form = MultipartForm::new();
        form.append("name", "John").unwrap();
        form.delete("name");
        assert!(!form.has("name"));
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_param("a\"b\r\nc"), "a%22b%0D%0Ac");
    }

    #[test]
    fn test_boundary_shape() {
        let form = MultipartForm::new();
        let encoded = form.encode_with(&mut SmallRng::seed_from_u64(7));
        let token = &encoded.boundary[BOUNDARY_PREFIX.len()..];

        assert_eq!(token.len(), BOUNDARY_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(encoded.body, format!("--{}--\r\n", encoded.boundary).into_bytes());
    }

    #[test]
    fn test_boundary_regenerated_on_collision() {
        // Predict the first boundary of a seeded generator and plant it in a part
        let first = MultipartForm::new().encode_with(&mut SmallRng::seed_from_u64(42)).boundary;

        let mut form = MultipartForm::new();
        form.append("trap", &format!("prefix {first} suffix")).unwrap();
        let encoded = form.encode_with(&mut SmallRng::seed_from_u64(42));

        assert_ne!(encoded.boundary, first);
    }

    #[test]
    fn test_urlencoded() {
        let mut form = MultipartForm::new();
        form.append("name", "John Doe").unwrap();
        form.append("q", "a&b").unwrap();
        form.append_file("upload", FilePart::new("a.txt", "hi")).unwrap();

        assert_eq!(form.to_urlencoded(), "name=John+Doe&q=a%26b");
    }
}
