// src/params/diff.rs

//! Custom parameter detection
//!
//! A run's parameters are compared against the documented defaults to
//! recover which values were (probably) passed on the command line. A
//! parameter passed explicitly with its default value is indistinguishable
//! from an omitted one, which yields the same conversion anyway.

use std::path::Path;

use super::{ParamValue, ParameterDocument};
use crate::error::Result;

/// A parameter whose run value is not the default
#[derive(Debug, Clone, PartialEq)]
pub struct CustomParam {
    pub key: String,
    pub value: ParamValue,
    /// Default value, `None` when the key is not documented
    pub default: Option<ParamValue>,
}

impl CustomParam {
    /// Whether the key is missing from the defaults altogether
    pub fn is_undocumented(&self) -> bool {
        self.default.is_none()
    }

    /// Human-readable description
    pub fn description(&self) -> String {
        match &self.default {
            Some(default) => format!("{} = {} (default: {})", self.key, self.value, default),
            None => format!("{} = {} (no default)", self.key, self.value),
        }
    }
}

/// Result of comparing a run's parameters with the defaults
#[derive(Debug, Clone, Default)]
pub struct ParamDiff {
    /// Differing or undocumented parameters, in run-document order
    pub custom: Vec<CustomParam>,

    /// Number of parameters equal to their default
    pub unchanged: usize,
}

impl ParamDiff {
    /// Compare two parameter documents
    pub fn compute(actual: &ParameterDocument, defaults: &ParameterDocument) -> Self {
        let mut diff = ParamDiff::default();

        for (key, value) in actual.iter() {
            match defaults.get(key) {
                Some(default) if default == value => diff.unchanged += 1,
                default => diff.custom.push(CustomParam {
                    key: key.to_string(),
                    value: value.clone(),
                    default: default.cloned(),
                }),
            }
        }

        diff
    }

    /// Load both documents from disk and compare them
    ///
    /// Fails with a not-found error if either document is missing.
    pub fn from_files(params: impl AsRef<Path>, defaults: impl AsRef<Path>) -> Result<Self> {
        let actual = ParameterDocument::load(params)?;
        let defaults = ParameterDocument::load(defaults)?;
        Ok(Self::compute(&actual, &defaults))
    }

    /// Check if every parameter has its default value
    pub fn is_empty(&self) -> bool {
        self.custom.is_empty()
    }

    pub fn len(&self) -> usize {
        self.custom.len()
    }

    /// The `(key, value)` pairs in run-document order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.custom.iter().map(|p| (p.key.as_str(), &p.value))
    }

    /// Look up a custom parameter by key
    pub fn get(&self, key: &str) -> Option<&CustomParam> {
        self.custom.iter().find(|p| p.key == key)
    }
}

/// Compute the ordered `(key, value)` pairs of non-default parameters
pub fn compute_custom_params(
    actual: &ParameterDocument,
    defaults: &ParameterDocument,
) -> Vec<(String, ParamValue)> {
    ParamDiff::compute(actual, defaults)
        .custom
        .into_iter()
        .map(|p| (p.key, p.value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;
    use tempfile::TempDir;

    fn doc(json: &str) -> ParameterDocument {
        ParameterDocument::from_json_str(json).unwrap()
    }

    #[test]
    fn test_equal_values_excluded() {
        let actual = doc(r#"{"a": 1, "b": "x", "c": "False"}"#);
        let defaults = doc(r#"{"a": 1, "b": "x", "c": false}"#);

        let diff = ParamDiff::compute(&actual, &defaults);
        assert!(diff.is_empty());
        assert_eq!(diff.unchanged, 3);
    }

    #[test]
    fn test_differing_and_absent_included_in_order() {
        let actual = doc(
            r#"{"out_path": "/b", "merge_files": "True", "compression": "zlib", "in_path": "/a"}"#,
        );
        let defaults = doc(r#"{"merge_files": "False", "compression": "zlib"}"#);

        let pairs = compute_custom_params(&actual, &defaults);
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["out_path", "merge_files", "in_path"]);
        assert_eq!(pairs[1].1, ParamValue::Boolean(true));
    }

    #[test]
    fn test_each_key_reported_once() {
        let actual = doc(r#"{"a": 1, "b": 2, "c": 3}"#);
        let defaults = doc(r#"{"a": 5}"#);

        let diff = ParamDiff::compute(&actual, &defaults);
        assert_eq!(diff.len(), 3);
        assert!(diff.get("a").is_some_and(|p| !p.is_undocumented()));
        assert!(diff.get("b").is_some_and(CustomParam::is_undocumented));
    }

    #[test]
    fn test_boolean_not_compared_as_string() {
        let actual = doc(r#"{"flag": "True"}"#);
        let defaults = doc(r#"{"flag": "true"}"#);

        // "true" stays text, "True" becomes a boolean
        let diff = ParamDiff::compute(&actual, &defaults);
        assert_eq!(diff.len(), 1);
    }

    #[test]
    fn test_description() {
        let param = CustomParam {
            key: "merge_files".to_string(),
            value: ParamValue::Boolean(true),
            default: Some(ParamValue::Boolean(false)),
        };
        assert_eq!(param.description(), "merge_files = true (default: false)");
    }

    #[test]
    fn test_from_files_missing_default() {
        let temp_dir = TempDir::new().unwrap();
        let params = temp_dir.path().join("params.json");
        fs::write(&params, r#"{"a": 1}"#).unwrap();

        let err =
            ParamDiff::from_files(&params, temp_dir.path().join("params.json.default")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_from_files() {
        let temp_dir = TempDir::new().unwrap();
        let params = temp_dir.path().join("params.json");
        let defaults = temp_dir.path().join("params.json.default");
        fs::write(&params, r#"{"a": 1, "b": "True"}"#).unwrap();
        fs::write(&defaults, r#"{"a": 1, "b": "False"}"#).unwrap();

        let diff = ParamDiff::from_files(&params, &defaults).unwrap();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.custom[0].key, "b");
    }
}
