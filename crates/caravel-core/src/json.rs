//! High-performance JSON operations using sonic-rs.

use crate::{Error, Result};
use serde::{Serialize, de::DeserializeOwned};

/// Deserialize JSON string.
///
/// # Errors
/// Returns error if JSON is invalid.
pub fn from_json<T: DeserializeOwned>(s: &str) -> Result<T> {
    sonic_rs::from_str(s).map_err(Error::from)
}

/// Deserialize JSON bytes.
///
/// # Errors
/// Returns error if JSON is invalid.
pub fn from_json_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    sonic_rs::from_slice(bytes).map_err(Error::from)
}

/// Serialize to compact JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    sonic_rs::to_string(value).map_err(Error::from)
}

/// Serialize to pretty JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    sonic_rs::to_string_pretty(value).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
    struct Manifest {
        version: String,
        #[serde(default)]
        dependencies: HashMap<String, String>,
    }

    #[test]
    fn roundtrip() {
        let orig = Manifest {
            version: "1.0".into(),
            dependencies: HashMap::from([("A".to_string(), "1.0".to_string())]),
        };
        let json = to_json(&orig).expect("serialization should succeed");
        let parsed: Manifest = from_json(&json).expect("deserialization should succeed");
        assert_eq!(orig, parsed);
    }

    #[test]
    fn slice_equals_str() {
        let json = r#"{"version":"1.0","dependencies":{"A":"1.0"}}"#;
        let from_str: Manifest = from_json(json).unwrap();
        let from_slice: Manifest = from_json_slice(json.as_bytes()).unwrap();
        assert_eq!(from_str, from_slice);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let result: Result<Manifest> = from_json("{not json}");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_keys_ignored() {
        let json = r#"{"version":"1.0","somethingElse":{"x":1}}"#;
        let parsed: Manifest = from_json(json).unwrap();
        assert_eq!(parsed.version, "1.0");
        assert!(parsed.dependencies.is_empty());
    }

    #[test]
    fn pretty_contains_newlines() {
        let val = Manifest {
            version: "1.0".into(),
            dependencies: HashMap::new(),
        };
        assert!(to_json_pretty(&val).unwrap().contains('\n'));
    }
}
