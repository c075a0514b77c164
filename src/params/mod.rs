// src/params/mod.rs

//! Parameter documents written by BatchConvert
//!
//! BatchConvert snapshots the values used for a conversion into a flat JSON
//! object (`params.json`) next to the documented defaults
//! (`params.json.default`). Booleans are serialized by the upstream tool as the
//! literal strings `"True"` and `"False"`; they are normalized back to booleans
//! here so that comparisons against the defaults are type-aware.
//!
//! # Example params.json
//!
//! ```json
//! {
//!   "output_type": "ometiff",
//!   "in_path": "/data/run1/src",
//!   "out_path": "/data/run1/dst",
//!   "merge_files": "False",
//!   "keep_workdir": "True"
//! }
//! ```

mod diff;
mod edit;

pub use diff::{compute_custom_params, CustomParam, ParamDiff};
pub use edit::{delete_param, set_param, EditOutcome};

use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the actual parameter document
pub const PARAMS_FILE: &str = "params.json";

/// File name of the default parameter document
pub const DEFAULT_PARAMS_FILE: &str = "params.json.default";

/// Key holding the input image directory
pub const IN_PATH_KEY: &str = "in_path";

/// Key holding the output image directory
pub const OUT_PATH_KEY: &str = "out_path";

/// A scalar parameter value after boolean normalization
#[derive(Debug, Clone)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// null, arrays and objects are kept verbatim
    Other(Value),
}

impl ParamValue {
    /// Convert a raw JSON value, turning `"True"`/`"False"` into booleans
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Bool(b) => ParamValue::Boolean(b),
            Value::String(s) => match s.as_str() {
                "True" => ParamValue::Boolean(true),
                "False" => ParamValue::Boolean(false),
                _ => ParamValue::Text(s),
            },
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ParamValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    ParamValue::Float(f)
                } else {
                    ParamValue::Other(Value::Number(n))
                }
            }
            other => ParamValue::Other(other),
        }
    }

    /// JSON representation used in crate metadata
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Text(s) => Value::String(s.clone()),
            ParamValue::Integer(i) => Value::from(*i),
            ParamValue::Float(f) => Value::from(*f),
            ParamValue::Boolean(b) => Value::Bool(*b),
            ParamValue::Other(v) => v.clone(),
        }
    }

    /// Name of the value's type, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            ParamValue::Text(_) => "string",
            ParamValue::Integer(_) => "integer",
            ParamValue::Float(_) => "float",
            ParamValue::Boolean(_) => "boolean",
            ParamValue::Other(Value::Null) => "null",
            ParamValue::Other(Value::Array(_)) => "array",
            ParamValue::Other(Value::Object(_)) => "object",
            ParamValue::Other(_) => "unknown",
        }
    }

    /// Whether the value would count as set in a flag position
    pub fn is_truthy(&self) -> bool {
        match self {
            ParamValue::Text(s) => !s.is_empty(),
            ParamValue::Integer(i) => *i != 0,
            ParamValue::Float(f) => *f != 0.0,
            ParamValue::Boolean(b) => *b,
            ParamValue::Other(Value::Null) => false,
            ParamValue::Other(Value::Array(a)) => !a.is_empty(),
            ParamValue::Other(Value::Object(o)) => !o.is_empty(),
            ParamValue::Other(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        use ParamValue::*;
        match (self, other) {
            (Text(a), Text(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Integer(a), Float(b)) | (Float(b), Integer(a)) => (*a as f64) == *b,
            (Boolean(a), Boolean(b)) => a == b,
            (Other(a), Other(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => write!(f, "{}", s),
            ParamValue::Integer(i) => write!(f, "{}", i),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Boolean(b) => write!(f, "{}", b),
            ParamValue::Other(v) => write!(f, "{}", v),
        }
    }
}

/// An ordered parameter-name to value mapping
///
/// Entries keep the order of the source JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterDocument {
    entries: Vec<(String, ParamValue)>,
}

impl ParameterDocument {
    /// Load a parameter document from disk
    ///
    /// Fails with [`Error::NotFound`] if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content).map_err(|source| Error::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a document from a JSON object string
    pub fn from_json_str(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let map: Map<String, Value> = serde_json::from_str(json)?;
        Ok(Self::from_map(map))
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        let entries = map
            .into_iter()
            .map(|(key, value)| (key, ParamValue::from_json(value)))
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate entries in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get a string-valued parameter
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_str)
    }

    /// Get a required string parameter holding a path
    pub fn require_path(&self, key: &str) -> Result<PathBuf> {
        self.get_str(key)
            .map(PathBuf::from)
            .ok_or_else(|| Error::MissingParameter(key.to_string()))
    }

    /// Whether a flag parameter is set; missing keys are false
    pub fn is_truthy(&self, key: &str) -> bool {
        self.get(key).is_some_and(ParamValue::is_truthy)
    }
}

/// Locations of the two parameter documents of a run
#[derive(Debug, Clone)]
pub struct ParamPaths {
    pub params: PathBuf,
    pub defaults: PathBuf,
}

impl ParamPaths {
    /// Standard file names inside a parameter directory
    pub fn in_dir(param_dir: impl AsRef<Path>) -> Self {
        let dir = param_dir.as_ref();
        Self {
            params: dir.join(PARAMS_FILE),
            defaults: dir.join(DEFAULT_PARAMS_FILE),
        }
    }
}
