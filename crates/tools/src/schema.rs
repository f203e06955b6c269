//! A small interpreter over a bounded schema dialect
//! (object/array/string/number/enum/required), not a
//! general JSON-Schema implementation. Tool argument schemas only ever need
//! this much.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schema {
    Object {
        properties: HashMap<String, Schema>,
        #[serde(default)]
        required: Vec<String>,
    },
    Array {
        items: Box<Schema>,
    },
    String {
        #[serde(default, rename = "enum")]
        allowed: Option<Vec<String>>,
    },
    Number {},
    Boolean {},
}

/// Validates `value` against `schema`, returning every violation found
/// (missing required fields, wrong JSON type, values outside an enum) —
/// the dispatcher reports `INVALID_PARAMETERS` only when this is non-empty.
pub fn validate(schema: &Schema, value: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    validate_into(schema, value, "$", &mut errors);
    errors
}

fn validate_into(schema: &Schema, value: &Value, path: &str, errors: &mut Vec<String>) {
    match schema {
        Schema::Object { properties, required } => {
            let Some(obj) = value.as_object() else {
                errors.push(format!("{path}: expected object"));
                return;
            };
            for field in required {
                if !obj.contains_key(field) {
                    errors.push(format!("{path}.{field}: required field missing"));
                }
            }
            for (key, sub_schema) in properties {
                if let Some(sub_value) = obj.get(key) {
                    validate_into(sub_schema, sub_value, &format!("{path}.{key}"), errors);
                }
            }
        }
        Schema::Array { items } => {
            let Some(arr) = value.as_array() else {
                errors.push(format!("{path}: expected array"));
                return;
            };
            for (i, item) in arr.iter().enumerate() {
                validate_into(items, item, &format!("{path}[{i}]"), errors);
            }
        }
        Schema::String { allowed } => {
            let Some(s) = value.as_str() else {
                errors.push(format!("{path}: expected string"));
                return;
            };
            if let Some(allowed) = allowed {
                if !allowed.iter().any(|a| a == s) {
                    errors.push(format!("{path}: {s:?} is not one of {allowed:?}"));
                }
            }
        }
        Schema::Number {} => {
            if !value.is_number() {
                errors.push(format!("{path}: expected number"));
            }
        }
        Schema::Boolean {} => {
            if !value.is_boolean() {
                errors.push(format!("{path}: expected boolean"));
            }
        }
    }
}
