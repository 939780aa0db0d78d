//! Property-contract enforcement at invocation sites.
//!
//! Before a component renders, the props supplied at its call site are
//! checked against its declared contract: required props must be present,
//! typed props must match at runtime. Validation happens before defaults
//! are applied, so a required prop is never satisfied by its own default.
//! Props not covered by the contract pass through untouched.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::core::{Result, WeftError};
use crate::definition::{PropSpec, PropType};

/// Runtime type name of a JSON value, as used in mismatch messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check supplied props against a component's contract.
///
/// Contract entries are visited in name order so the first error reported
/// is deterministic.
pub fn validate_props(
    component: &str,
    contract: &BTreeMap<String, PropSpec>,
    supplied: &Map<String, Value>,
) -> Result<()> {
    for (name, spec) in contract {
        let Some(value) = supplied.get(name) else {
            if spec.required {
                return Err(WeftError::RequiredPropMissing {
                    prop: name.clone(),
                    component: component.to_string(),
                });
            }
            continue;
        };

        let matches = match &spec.prop_type {
            PropType::String => value.is_string(),
            PropType::Number => value.is_number(),
            PropType::Boolean => value.is_boolean(),
            PropType::Array => value.is_array(),
            // Unknown declared types are annotations, not checks.
            PropType::Other(_) => true,
        };
        if !matches {
            return Err(WeftError::PropTypeMismatch {
                prop: name.clone(),
                expected: spec.prop_type.as_str().to_string(),
                actual: json_type_name(value).to_string(),
                component: component.to_string(),
            });
        }
    }
    Ok(())
}

/// Fill in declared defaults for props the call site left out.
pub fn apply_defaults(contract: &BTreeMap<String, PropSpec>, supplied: &mut Map<String, Value>) {
    for (name, spec) in contract {
        if supplied.contains_key(name) {
            continue;
        }
        if let Some(default) = spec.default_json() {
            supplied.insert(name.clone(), default);
        }
    }
}
