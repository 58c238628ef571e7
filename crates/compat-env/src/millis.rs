//! `Duration` as whole milliseconds in serde formats
//!
//! Use with `#[serde(with = "compat_env::millis")]`.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    serializer.serialize_u64(millis)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timeout {
        #[serde(with = "crate::millis")]
        after: Duration,
    }

    #[test]
    fn test_whole_milliseconds() {
        let timeout = Timeout {
            after: Duration::from_micros(2500),
        };
        let json = serde_json::to_string(&timeout).unwrap();
        assert_eq!(json, r#"{"after":2}"#);

        let parsed: Timeout = serde_json::from_str(r#"{"after":1500}"#).unwrap();
        assert_eq!(parsed.after, Duration::from_millis(1500));
        assert!(serde_json::from_str::<Timeout>(r#"{"after":-1}"#).is_err());
    }
}
