//! JSON scalar → SQL literal and column type.

use serde_json::{Map, Value as JsonValue};

use crate::ast::{ColumnDef, Value};
use crate::config::TranslatorConfig;

/// Whether `value` is flattened into a child table rather than stored inline.
pub fn is_nested(value: &JsonValue) -> bool {
    matches!(value, JsonValue::Object(_) | JsonValue::Array(_))
}

/// Fields of a document in lexicographic key order.
pub fn sorted_fields(doc: &Map<String, JsonValue>) -> Vec<(&String, &JsonValue)> {
    let mut fields: Vec<_> = doc.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));
    fields
}

/// Render a JSON scalar as a SQL literal.
///
/// Objects and arrays have no literal form and yield `None`.
pub fn literal(value: &JsonValue) -> Option<Value> {
    match value {
        JsonValue::Null => Some(Value::Null),
        JsonValue::Bool(b) => Some(Value::Bool(*b)),
        JsonValue::String(s) => Some(Value::String(s.clone())),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Int(i))
            } else if let Some(u) = n.as_u64() {
                Some(Value::UInt(u))
            } else {
                n.as_f64().map(Value::Float)
            }
        }
        JsonValue::Object(_) | JsonValue::Array(_) => None,
    }
}

/// Infer the column definition for a field from its first-seen value.
///
/// Nulls and nested values carry no type and yield `None`.
pub fn infer_column(name: &str, value: &JsonValue, config: &TranslatorConfig) -> Option<ColumnDef> {
    let data_type = match value {
        JsonValue::String(_) => {
            let col = ColumnDef::new(name, config.text_type.as_str());
            if name == config.identity_field {
                return Some(col.primary_key());
            }
            return Some(col);
        }
        JsonValue::Number(n) => match &config.integer_type {
            Some(int_type) if is_integral(n) => int_type.as_str(),
            _ => config.float_type.as_str(),
        },
        JsonValue::Bool(_) => config.boolean_type.as_str(),
        JsonValue::Null | JsonValue::Object(_) | JsonValue::Array(_) => return None,
    };
    Some(ColumnDef::new(name, data_type))
}

fn is_integral(n: &serde_json::Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}
