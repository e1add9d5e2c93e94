//! Environment property bag.
//!
//! Properties override the behaviour of individual tasks (e.g. `<task>.skip`).
//! The contract distinguishes three states of a key: absent, present but
//! empty, and present with a value. Every read that finds a value is recorded
//! so a run can report which overrides influenced it.

use crate::EnvironmentError;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Property store read by skip policies and tasks.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Current properties
    properties: BTreeMap<String, String>,

    /// Values handed out so far, keyed by property
    reads: RefCell<BTreeMap<String, String>>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment from key/value pairs.
    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            reads: RefCell::new(BTreeMap::new()),
        }
    }

    /// Parse a `key=value` assignment. The value may be empty.
    pub fn parse_assignment(assignment: &str) -> Result<(String, String), EnvironmentError> {
        match assignment.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(EnvironmentError::Malformed {
                key: assignment.to_string(),
                value: assignment.to_string(),
                expected: "key=value",
            }),
        }
    }

    /// Set or remove a property, returning the previous value.
    ///
    /// Removing a key does not forget that it was read earlier.
    pub fn set_property(&mut self, key: impl Into<String>, value: Option<String>) -> Option<String> {
        let key = key.into();
        match value {
            Some(value) => self.properties.insert(key, value),
            None => self.properties.remove(&key),
        }
    }

    /// Whether a property is set (possibly to the empty string).
    pub fn contains_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Get a string property.
    pub fn get_property_as_string(&self, key: &str) -> Option<String> {
        let value = self.properties.get(key)?.clone();
        self.reads.borrow_mut().insert(key.to_string(), value.clone());
        Some(value)
    }

    /// Get a string property, falling back to `default` when absent.
    pub fn get_property_as_string_or(&self, key: &str, default: &str) -> String {
        self.get_property_as_string(key)
            .unwrap_or_else(|| default.to_string())
    }

    /// Get a string property that must be set and non-empty.
    pub fn require_property_as_string(&self, key: &str) -> Result<String, EnvironmentError> {
        let value = self.require_property_as_string_allow_empty(key)?;
        if value.is_empty() {
            return Err(EnvironmentError::EmptyProperty { key: key.to_string() });
        }
        Ok(value)
    }

    /// Get a string property that must be set; the empty string is accepted.
    pub fn require_property_as_string_allow_empty(&self, key: &str) -> Result<String, EnvironmentError> {
        self.get_property_as_string(key)
            .ok_or_else(|| EnvironmentError::MissingProperty { key: key.to_string() })
    }

    /// Get a boolean property (`true`/`false`, case insensitive).
    pub fn get_property_as_bool(&self, key: &str) -> Result<Option<bool>, EnvironmentError> {
        let Some(value) = self.get_property_as_string(key) else {
            return Ok(None);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(EnvironmentError::Malformed {
                key: key.to_string(),
                value,
                expected: "true or false",
            }),
        }
    }

    /// Get a boolean property, falling back to `default` when absent.
    pub fn get_property_as_bool_or(&self, key: &str, default: bool) -> Result<bool, EnvironmentError> {
        Ok(self.get_property_as_bool(key)?.unwrap_or(default))
    }

    /// Get a boolean property that must be set.
    pub fn require_property_as_bool(&self, key: &str) -> Result<bool, EnvironmentError> {
        self.get_property_as_bool(key)?
            .ok_or_else(|| EnvironmentError::MissingProperty { key: key.to_string() })
    }

    /// Get an integer property.
    pub fn get_property_as_int(&self, key: &str) -> Result<Option<i64>, EnvironmentError> {
        let Some(value) = self.get_property_as_string(key) else {
            return Ok(None);
        };
        value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| EnvironmentError::Malformed {
                key: key.to_string(),
                value,
                expected: "an integer",
            })
    }

    /// Get a comma separated list property.
    ///
    /// Items are trimmed and empty items dropped, so `""` is the empty list.
    /// An absent property is `None`, not the empty list.
    pub fn get_property_as_list(&self, key: &str) -> Option<Vec<String>> {
        let value = self.get_property_as_string(key)?;
        Some(
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Get a list property, falling back to `default` when absent.
    pub fn get_property_as_list_or(&self, key: &str, default: &[&str]) -> Vec<String> {
        self.get_property_as_list(key)
            .unwrap_or_else(|| default.iter().map(|s| s.to_string()).collect())
    }

    /// Properties read so far with the values that were handed out.
    pub fn property_reads(&self) -> BTreeMap<String, String> {
        self.reads.borrow().clone()
    }

    /// Iterate over the current properties.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_remove_round_trip() {
        let mut env = Environment::new();
        assert_eq!(env.set_property("k", Some("abcd".to_string())), None);
        assert_eq!(env.get_property_as_string("k"), Some("abcd".to_string()));
        assert_eq!(env.set_property("k", None), Some("abcd".to_string()));
        assert_eq!(env.get_property_as_string("k"), None);
    }

    #[test]
    fn test_unset_property_defaults() {
        let env = Environment::new();
        assert_eq!(env.get_property_as_string_or("k", "d"), "d");
        assert_eq!(env.get_property_as_string("k"), None);
    }

    #[test]
    fn test_empty_is_distinct_from_absent() {
        let env = Environment::from_properties([("empty", "")]);
        assert_eq!(env.get_property_as_string("empty"), Some(String::new()));
        assert_eq!(env.get_property_as_string_or("empty", "d"), "");
        assert_eq!(
            env.require_property_as_string("empty"),
            Err(EnvironmentError::EmptyProperty { key: "empty".into() })
        );
        assert_eq!(env.require_property_as_string_allow_empty("empty"), Ok(String::new()));
        assert_eq!(
            env.require_property_as_string_allow_empty("absent"),
            Err(EnvironmentError::MissingProperty { key: "absent".into() })
        );
    }

    #[test]
    fn test_list_parsing() {
        let env = Environment::from_properties([("empty", ""), ("two", "foo,bar"), ("spaced", " foo , bar ,")]);
        assert_eq!(env.get_property_as_list("empty"), Some(vec![]));
        assert_eq!(env.get_property_as_list("two"), Some(vec!["foo".to_string(), "bar".to_string()]));
        assert_eq!(env.get_property_as_list("spaced"), Some(vec!["foo".to_string(), "bar".to_string()]));
        assert_eq!(env.get_property_as_list("missing"), None);
        assert_eq!(env.get_property_as_list_or("missing", &["x"]), vec!["x".to_string()]);
    }

    #[test]
    fn test_bool_parsing() {
        let env = Environment::from_properties([("yes", "TRUE"), ("no", "false"), ("bad", "maybe")]);
        assert_eq!(env.get_property_as_bool("yes"), Ok(Some(true)));
        assert_eq!(env.get_property_as_bool("no"), Ok(Some(false)));
        assert_eq!(env.get_property_as_bool("missing"), Ok(None));
        assert_eq!(env.get_property_as_bool_or("missing", true), Ok(true));
        assert!(matches!(
            env.get_property_as_bool("bad"),
            Err(EnvironmentError::Malformed { .. })
        ));
        assert!(matches!(
            env.require_property_as_bool("missing"),
            Err(EnvironmentError::MissingProperty { .. })
        ));
    }

    #[test]
    fn test_int_parsing() {
        let env = Environment::from_properties([("n", " 42 "), ("bad", "forty-two")]);
        assert_eq!(env.get_property_as_int("n"), Ok(Some(42)));
        assert_eq!(env.get_property_as_int("missing"), Ok(None));
        assert!(env.get_property_as_int("bad").is_err());
    }

    #[test]
    fn test_reads_are_recorded_and_survive_removal() {
        let mut env = Environment::from_properties([("a", "1"), ("b", "2")]);
        env.get_property_as_string("a");
        env.get_property_as_string("missing");
        env.set_property("a", None);

        let reads = env.property_reads();
        assert_eq!(reads.get("a"), Some(&"1".to_string()));
        assert!(!reads.contains_key("b"));
        assert!(!reads.contains_key("missing"));
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            Environment::parse_assignment("subsystems.remove=jacorb,cmp"),
            Ok(("subsystems.remove".to_string(), "jacorb,cmp".to_string()))
        );
        assert_eq!(Environment::parse_assignment("k="), Ok(("k".to_string(), String::new())));
        assert!(Environment::parse_assignment("no-equals").is_err());
        assert!(Environment::parse_assignment("=v").is_err());
    }
}
