// src/provenance/parameters.rs

//! FormalParameter / PropertyValue pairs for customised parameters

use crate::error::{Error, Result};
use crate::params::{CustomParam, ParamValue, IN_PATH_KEY, OUT_PATH_KEY};
use crate::rocrate::{reference, Entity};

/// Bioschemas FormalParameter profile
pub const FORMAL_PARAMETER_PROFILE: &str =
    "https://bioschemas.org/profiles/FormalParameter/1.0-RELEASE";

/// Crate identifier for a parameter key
pub fn parameter_id(key: &str) -> String {
    if key.starts_with('#') {
        key.to_string()
    } else {
        format!("#{}", key)
    }
}

/// Crate identifier for the value a parameter took
pub fn value_id(key: &str) -> String {
    format!("{}/value", parameter_id(key))
}

/// The `additionalType` of a parameter value
///
/// Only strings, integers and booleans can be described.
pub fn additional_type(key: &str, value: &ParamValue) -> Result<&'static str> {
    match value {
        ParamValue::Text(_) => Ok("Text"),
        ParamValue::Integer(_) => Ok("Integer"),
        ParamValue::Boolean(_) => Ok("Boolean"),
        other => Err(Error::UnsupportedValueType {
            key: key.to_string(),
            kind: other.kind(),
        }),
    }
}

/// Build the FormalParameter describing `param` and the PropertyValue it took
pub fn parameter_entities(param: &CustomParam) -> Result<(Entity, Entity)> {
    let additional_type = additional_type(&param.key, &param.value)?;
    let mut formal = Entity::new(parameter_id(&param.key), &["FormalParameter"])
        .with("additionalType", additional_type)
        .with(
            "valueRequired",
            param.key == IN_PATH_KEY || param.key == OUT_PATH_KEY,
        )
        .with("conformsTo", reference(FORMAL_PARAMETER_PROFILE))
        .with("name", param.key.as_str());

    // Falsy defaults are left out
    if let Some(default) = param.default.as_ref().filter(|d| d.is_truthy()) {
        formal.set("defaultValue", default.to_json());
    }

    let value = Entity::new(value_id(&param.key), &["PropertyValue"])
        .with("name", param.key.as_str())
        .with("value", param.value.to_json())
        .with("exampleOfWork", formal.reference());

    Ok((formal, value))
}
