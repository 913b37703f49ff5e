//! Comparison configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable read by [`DeepEqualsOptions::from_env`].
pub const IGNORE_CUSTOM_EQUALS_ENV: &str = "AGGPERSIST_IGNORE_CUSTOM_EQUALS";

/// Options for [`DeepEquals`](crate::DeepEquals).
///
/// Serializable so a host can embed it in its own configuration document;
/// missing keys fall back to [`Default`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepEqualsOptions {
    /// Compare records field by field even when they declare their own
    /// equality.
    pub ignore_custom_equals: bool,
}

impl DeepEqualsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignore_custom_equals(mut self, ignore: bool) -> Self {
        self.ignore_custom_equals = ignore;
        self
    }

    /// Read options from the process environment.
    ///
    /// Unset variables keep their defaults; accepted booleans are
    /// `true/false`, `1/0`, `yes/no` and `on/off` (case-insensitive).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut options = Self::default();
        if let Some(raw) = lookup(IGNORE_CUSTOM_EQUALS_ENV) {
            options.ignore_custom_equals = parse_bool(IGNORE_CUSTOM_EQUALS_ENV, &raw)?;
        }
        Ok(options)
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_honor_custom_equals() {
        assert!(!DeepEqualsOptions::default().ignore_custom_equals);
    }

    #[test]
    fn deserializes_with_missing_keys() {
        let options: DeepEqualsOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, DeepEqualsOptions::default());

        let options: DeepEqualsOptions =
            serde_json::from_str(r#"{"ignore_custom_equals": true}"#).unwrap();
        assert!(options.ignore_custom_equals);
    }

    #[test]
    fn reads_flag_from_lookup() {
        let options = DeepEqualsOptions::from_lookup(|_| Some(" Yes ".to_string())).unwrap();
        assert!(options.ignore_custom_equals);

        let options = DeepEqualsOptions::from_lookup(|_| None).unwrap();
        assert!(!options.ignore_custom_equals);
    }

    #[test]
    fn rejects_malformed_flag() {
        let err = DeepEqualsOptions::from_lookup(|_| Some("maybe".to_string())).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidBool {
                key: IGNORE_CUSTOM_EQUALS_ENV,
                value: "maybe".to_string(),
            }
        );
    }
}
