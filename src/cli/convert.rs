//! JSON <-> runtime Value conversion, used for variable bindings and
//! command output

use serde_json::{Number, Value as Json, json};

use crate::Value;

/// Convert a JSON document to a runtime value. Numbers outside the i64
/// range become floats.
pub fn json_to_value(json: Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map_or(Value::Null, Value::Float),
        },
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(items.into_iter().map(json_to_value).collect()),
        Json::Object(members) => Value::Object(
            members
                .into_iter()
                .map(|(key, member)| (key, json_to_value(member)))
                .collect(),
        ),
    }
}

/// Convert a runtime value to JSON. Non-finite floats become `null` and
/// ranges become `{"low": .., "high": ..}`.
pub fn value_to_json(value: Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(b),
        Value::Integer(i) => Json::Number(i.into()),
        Value::Float(f) => Number::from_f64(f).map_or(Json::Null, Json::Number),
        Value::String(s) => Json::String(s),
        Value::Array(items) => Json::Array(items.into_iter().map(value_to_json).collect()),
        Value::Object(members) => Json::Object(
            members
                .into_iter()
                .map(|(key, member)| (key, value_to_json(member)))
                .collect(),
        ),
        Value::Range { low, high } => json!({ "low": low, "high": high }),
    }
}
