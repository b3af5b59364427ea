use jsg_core::graph::Shape;
use serde_json::Value;

/// Map a primitive shape to its Rust type string. `None` for shapes that
/// need graph context (objects, arrays, enums, unions).
pub(crate) fn primitive(shape: &Shape, schema: &Value, assert_format: bool) -> Option<String> {
    match shape {
        Shape::String => Some(string_type(schema, assert_format)),
        Shape::Integer => Some("i64".to_string()),
        Shape::Number => Some("f64".to_string()),
        Shape::Boolean => Some("bool".to_string()),
        Shape::Null => Some("()".to_string()),
        _ => None,
    }
}

/// The Rust type for a string schema. With format assertion on, well-known
/// formats upgrade to assertive types; otherwise `format` stays an
/// annotation and the value is a plain string.
fn string_type(schema: &Value, assert_format: bool) -> String {
    if !assert_format {
        return "String".to_string();
    }
    match schema.get("format").and_then(Value::as_str) {
        Some("date-time") => "chrono::DateTime<chrono::Utc>".to_string(),
        Some("date") => "chrono::NaiveDate".to_string(),
        Some("uuid") => "uuid::Uuid".to_string(),
        _ => "String".to_string(),
    }
}
