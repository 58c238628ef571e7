//! Declarative Form Validation
//!
//! Compiles per-field constraints into ordered rules once, then checks one
//! field on input/blur and every field on submit, with the same messages on
//! every host.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Class hosts put on a field while it shows an error
pub const ERROR_CLASS: &str = "compat-field-error";

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

/// Validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid pattern for field '{field}': {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
    #[error("Field is not registered: {0}")]
    UnknownField(String),
}

/// Input type for validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Email,
    Url,
    Number,
    Tel,
    Password,
    Search,
}

/// Rule name, used to override messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKey {
    Required,
    Email,
    Url,
    Number,
    MinLength,
    MaxLength,
    Min,
    Max,
    Pattern,
}

/// Rule with its typed parameter
#[derive(Debug, Clone)]
pub enum RuleKind {
    Required,
    Email,
    Url,
    Number,
    MinLength(usize),
    MaxLength(usize),
    Min(f64),
    Max(f64),
    Pattern(Regex),
}

impl RuleKind {
    pub fn key(&self) -> RuleKey {
        match self {
            Self::Required => RuleKey::Required,
            Self::Email => RuleKey::Email,
            Self::Url => RuleKey::Url,
            Self::Number => RuleKey::Number,
            Self::MinLength(_) => RuleKey::MinLength,
            Self::MaxLength(_) => RuleKey::MaxLength,
            Self::Min(_) => RuleKey::Min,
            Self::Max(_) => RuleKey::Max,
            Self::Pattern(_) => RuleKey::Pattern,
        }
    }

    /// Only `Required` fails on an empty value
    pub fn accepts(&self, value: &str) -> bool {
        if value.is_empty() {
            return !matches!(self, Self::Required);
        }

        match self {
            Self::Required => true,
            Self::Email => EMAIL.is_match(value),
            Self::Url => url::Url::parse(value).is_ok(),
            Self::Number => parse_number(value).is_some(),
            Self::MinLength(min) => value.chars().count() >= *min,
            Self::MaxLength(max) => value.chars().count() <= *max,
            // Non-numeric input is the number rule's failure, not a range failure
            Self::Min(min) => parse_number(value).is_none_or(|n| n >= *min),
            Self::Max(max) => parse_number(value).is_none_or(|n| n <= *max),
            Self::Pattern(re) => re.is_match(value),
        }
    }

    fn default_message(&self) -> String {
        match self {
            Self::Required => "Please fill out this field.".to_string(),
            Self::Email => "Please enter an email address.".to_string(),
            Self::Url => "Please enter a URL.".to_string(),
            Self::Number => "Please enter a number.".to_string(),
            Self::MinLength(n) => format!("Please lengthen this text to {n} characters or more."),
            Self::MaxLength(n) => format!("Please shorten this text to {n} characters or less."),
            Self::Min(n) => format!("Value must be greater than or equal to {n}."),
            Self::Max(n) => format!("Value must be less than or equal to {n}."),
            Self::Pattern(_) => "Please match the requested format.".to_string(),
        }
    }
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// A compiled rule and the message it surfaces
#[derive(Debug, Clone)]
pub struct ValidationRule {
    pub kind: RuleKind,
    pub message: String,
}

/// Constraints declared on a field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldConstraints {
    pub required: bool,
    pub input_type: InputType,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub pattern: Option<String>,
    pub messages: BTreeMap<RuleKey, String>,
}

impl FieldConstraints {
    pub fn new(input_type: InputType) -> Self {
        Self {
            input_type,
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn message(mut self, rule: RuleKey, message: &str) -> Self {
        self.messages.insert(rule, message.to_string());
        self
    }

    /// Compile to ordered rules: required, type, length, range, pattern
    pub fn compile(&self, field: &str) -> Result<Vec<ValidationRule>, ValidationError> {
        let mut kinds = Vec::new();

        if self.required {
            kinds.push(RuleKind::Required);
        }
        match self.input_type {
            InputType::Email => kinds.push(RuleKind::Email),
            InputType::Url => kinds.push(RuleKind::Url),
            InputType::Number => kinds.push(RuleKind::Number),
            _ => {}
        }
        kinds.extend(self.min_length.map(RuleKind::MinLength));
        kinds.extend(self.max_length.map(RuleKind::MaxLength));
        kinds.extend(self.min.map(RuleKind::Min));
        kinds.extend(self.max.map(RuleKind::Max));
        if let Some(pattern) = &self.pattern {
            // Anchored like native constraint validation
            let re = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
                ValidationError::InvalidPattern {
                    field: field.to_string(),
                    source,
                }
            })?;
            kinds.push(RuleKind::Pattern(re));
        }

        Ok(kinds
            .into_iter()
            .map(|kind| {
                let message = self
                    .messages
                    .get(&kind.key())
                    .cloned()
                    .unwrap_or_else(|| kind.default_message());
                ValidationRule { kind, message }
            })
            .collect())
    }
}

/// First failing rule's message, if any
pub fn first_failure<'a>(rules: &'a [ValidationRule], value: &str) -> Option<&'a str> {
    rules
        .iter()
        .find(|rule| !rule.kind.accepts(value))
        .map(|rule| rule.message.as_str())
}

/// Host-side field decoration
pub trait FieldDecorator {
    /// Add [`ERROR_CLASS`] and a message node, replacing any previous one
    fn show_error(&mut self, field: &str, message: &str);
    fn clear_error(&mut self, field: &str);
    fn focus(&mut self, field: &str);
}

impl<D: FieldDecorator + ?Sized> FieldDecorator for Box<D> {
    fn show_error(&mut self, field: &str, message: &str) {
        (**self).show_error(field, message);
    }

    fn clear_error(&mut self, field: &str) {
        (**self).clear_error(field);
    }

    fn focus(&mut self, field: &str) {
        (**self).focus(field);
    }
}

/// Result of a submit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    Cancelled {
        first_invalid: String,
        /// `(field, message)` in registration order
        errors: Vec<(String, String)>,
    },
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

/// Per-form validator
pub struct FormValidator<D: FieldDecorator> {
    decorator: D,
    /// Registration order
    fields: Vec<(String, Vec<ValidationRule>)>,
    decorated: HashSet<String>,
}

impl<D: FieldDecorator> FormValidator<D> {
    pub fn new(decorator: D) -> Self {
        Self {
            decorator,
            fields: Vec::new(),
            decorated: HashSet::new(),
        }
    }

    /// Register or replace a field's constraints
    pub fn register(
        &mut self,
        field: &str,
        constraints: &FieldConstraints,
    ) -> Result<(), ValidationError> {
        let rules = constraints.compile(field)?;
        debug!(field, rules = rules.len(), "Registered field");

        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => *existing = rules,
            None => self.fields.push((field.to_string(), rules)),
        }
        Ok(())
    }

    pub fn rules(&self, field: &str) -> Option<&[ValidationRule]> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, rules)| rules.as_slice())
    }

    pub fn decorator(&self) -> &D {
        &self.decorator
    }

    /// Input event on one field
    pub fn handle_input(
        &mut self,
        field: &str,
        value: &str,
    ) -> Result<Option<String>, ValidationError> {
        self.check_field(field, value)
    }

    /// Blur event on one field
    pub fn handle_blur(
        &mut self,
        field: &str,
        value: &str,
    ) -> Result<Option<String>, ValidationError> {
        self.check_field(field, value)
    }

    /// Validate every field; missing values count as empty
    pub fn handle_submit(&mut self, values: &HashMap<String, String>) -> SubmitOutcome {
        let mut errors = Vec::new();

        for (field, rules) in &self.fields {
            let value = values.get(field).map(String::as_str).unwrap_or("");
            let failure = first_failure(rules, value).map(str::to_string);
            apply_decoration(&mut self.decorator, &mut self.decorated, field, failure.as_deref());
            if let Some(message) = failure {
                errors.push((field.clone(), message));
            }
        }

        match errors.first() {
            None => SubmitOutcome::Submitted,
            Some((first, _)) => {
                let first_invalid = first.clone();
                self.decorator.focus(&first_invalid);
                debug!(%first_invalid, invalid = errors.len(), "Submit cancelled");
                SubmitOutcome::Cancelled {
                    first_invalid,
                    errors,
                }
            }
        }
    }

    /// Clear every decoration and drop all rules
    pub fn teardown(&mut self) {
        for field in self.decorated.drain() {
            self.decorator.clear_error(&field);
        }
        self.fields.clear();
    }

    fn check_field(&mut self, field: &str, value: &str) -> Result<Option<String>, ValidationError> {
        let rules = self
            .fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, rules)| rules)
            .ok_or_else(|| ValidationError::UnknownField(field.to_string()))?;

        let failure = first_failure(rules, value).map(str::to_string);
        apply_decoration(&mut self.decorator, &mut self.decorated, field, failure.as_deref());
        Ok(failure)
    }
}

fn apply_decoration<D: FieldDecorator>(
    decorator: &mut D,
    decorated: &mut HashSet<String>,
    field: &str,
    failure: Option<&str>,
) {
    match failure {
        Some(message) => {
            decorator.show_error(field, message);
            decorated.insert(field.to_string());
        }
        None => {
            if decorated.remove(field) {
                decorator.clear_error(field);
            }
        }
    }
}

impl<D: FieldDecorator> fmt::Debug for FormValidator<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormValidator")
            .field("fields", &self.fields.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("decorated", &self.decorated)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(constraints: &FieldConstraints) -> Vec<ValidationRule> {
        constraints.compile("field").unwrap()
    }

    #[test]
    fn test_rule_order() {
        let constraints = FieldConstraints::new(InputType::Number)
            .required()
            .pattern("[0-9]+")
            .range(Some(1.0), Some(10.0))
            .length(Some(1), Some(2));
        let keys: Vec<_> = rules(&constraints).iter().map(|r| r.kind.key()).collect();

        assert_eq!(
            keys,
            vec![
                RuleKey::Required,
                RuleKey::Number,
                RuleKey::MinLength,
                RuleKey::MaxLength,
                RuleKey::Min,
                RuleKey::Max,
                RuleKey::Pattern,
            ]
        );
    }

    #[test]
    fn test_empty_passes_format_rules() {
        for kind in [
            RuleKind::Email,
            RuleKind::Url,
            RuleKind::Number,
            RuleKind::MinLength(3),
            RuleKind::Min(5.0),
        ] {
            assert!(kind.accepts(""), "{kind:?}");
        }
        assert!(!RuleKind::Required.accepts(""));
    }

    #[test]
    fn test_email() {
        let rules = rules(&FieldConstraints::new(InputType::Email));
        assert_eq!(first_failure(&rules, "user@example.com"), None);
        assert_eq!(first_failure(&rules, "not-an-email"), Some("Please enter an email address."));
    }

    #[test]
    fn test_url() {
        assert!(RuleKind::Url.accepts("https://example.com/path"));
        assert!(!RuleKind::Url.accepts("example dot com"));
    }

    #[test]
    fn test_pattern_is_anchored() {
        let rules = rules(&FieldConstraints::default().pattern("[a-z]+"));
        assert_eq!(first_failure(&rules, "abc"), None);
        assert!(first_failure(&rules, "abc1").is_some());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = FieldConstraints::default().pattern("(").compile("zip").unwrap_err();
        assert!(matches!(&err, ValidationError::InvalidPattern { field, .. } if field == "zip"));
    }

    #[test]
    fn test_range_ignores_non_numeric() {
        assert!(RuleKind::Min(3.0).accepts("abc"));
        assert!(!RuleKind::Min(3.0).accepts("2"));
        assert!(RuleKind::Max(3.0).accepts(" 3 "));
    }

    #[test]
    fn test_message_override() {
        let constraints = FieldConstraints::default()
            .required()
            .message(RuleKey::Required, "Name needed");
        let rules = rules(&constraints);
        assert_eq!(first_failure(&rules, ""), Some("Name needed"));
    }

    #[test]
    fn test_constraints_deserialize() {
        let json = r#"{"required":true,"inputType":"email","messages":{"email":"Bad email"}}"#;
        let constraints: FieldConstraints = serde_json::from_str(json).unwrap();
        assert!(constraints.required);
        assert_eq!(constraints.input_type, InputType::Email);
        assert_eq!(constraints.messages[&RuleKey::Email], "Bad email");
    }
}
