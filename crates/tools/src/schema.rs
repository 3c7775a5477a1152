//! Argument validation against a tool's JSON Schema.
//!
//! Covers the subset of JSON Schema the registered tools use: `type`,
//! `enum`, `required`, `properties`, `additionalProperties: false`,
//! string length, `format: date-time`, numeric bounds, and array
//! `items`/`minItems`/`maxItems`. Unknown keywords are ignored.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::ToolError;

/// Validate tool `arguments` against `schema`.
///
/// The first violation wins; its `field` is the dotted path of the
/// offending value (`tweets[0].text`), or `arguments` for the root.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<(), ToolError> {
    if !arguments.is_object() {
        return Err(ToolError::invalid(
            "arguments",
            format!("expected object, received {}", json_type_name(arguments)),
        ));
    }
    validate_value(schema, arguments, "")
}

fn validate_value(schema: &Value, value: &Value, path: &str) -> Result<(), ToolError> {
    let Some(schema) = schema.as_object() else {
        return Ok(());
    };
    let field = || {
        if path.is_empty() {
            "arguments".to_string()
        } else {
            path.to_string()
        }
    };

    if let Some(expected) = schema.get("type") {
        let ok = match expected {
            Value::String(t) => type_matches(t, value),
            Value::Array(ts) => ts.iter().filter_map(Value::as_str).any(|t| type_matches(t, value)),
            _ => true,
        };
        if !ok {
            return Err(ToolError::invalid(
                field(),
                format!("expected {}, received {}", expected_label(expected), json_type_name(value)),
            ));
        }
    }

    if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
        if !allowed.contains(value) {
            return Err(ToolError::invalid(field(), format!("must be one of {}", Value::Array(allowed.clone()))));
        }
    }

    match value {
        Value::String(s) => check_string(schema, s, &field)?,
        Value::Number(_) => check_number(schema, value, &field)?,
        Value::Array(items) => {
            let len = items.len() as u64;
            if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
                if len < min {
                    return Err(ToolError::invalid(field(), format!("must contain at least {min} item(s)")));
                }
            }
            if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
                if len > max {
                    return Err(ToolError::invalid(field(), format!("must contain at most {max} item(s)")));
                }
            }
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    validate_value(item_schema, item, &format!("{path}[{i}]"))?;
                }
            }
        }
        Value::Object(object) => {
            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for key in required.iter().filter_map(Value::as_str) {
                    if !object.contains_key(key) {
                        return Err(ToolError::invalid(join(path, key), "required"));
                    }
                }
            }
            let properties = schema.get("properties").and_then(Value::as_object);
            let additional_allowed = schema
                .get("additionalProperties")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            for (key, item) in object {
                match properties.and_then(|p| p.get(key)) {
                    Some(prop_schema) => validate_value(prop_schema, item, &join(path, key))?,
                    None if additional_allowed => {}
                    None => {
                        return Err(ToolError::invalid(join(path, key), "unexpected argument"));
                    }
                }
            }
        }
        _ => {}
    }

    Ok(())
}

fn check_string(
    schema: &serde_json::Map<String, Value>,
    s: &str,
    field: &dyn Fn() -> String,
) -> Result<(), ToolError> {
    let len = s.chars().count() as u64;
    if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
        if len < min {
            return Err(ToolError::invalid(field(), format!("must contain at least {min} character(s)")));
        }
    }
    if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
        if len > max {
            return Err(ToolError::invalid(field(), format!("must contain at most {max} character(s)")));
        }
    }
    if schema.get("format").and_then(Value::as_str) == Some("date-time") && parse_date_time(s).is_none() {
        return Err(ToolError::invalid(field(), "Invalid date format"));
    }
    Ok(())
}

fn check_number(
    schema: &serde_json::Map<String, Value>,
    value: &Value,
    field: &dyn Fn() -> String,
) -> Result<(), ToolError> {
    let Some(n) = value.as_f64() else {
        return Ok(());
    };
    if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
        if n < min {
            return Err(ToolError::invalid(field(), format!("must be greater than or equal to {min}")));
        }
    }
    if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
        if n > max {
            return Err(ToolError::invalid(field(), format!("must be less than or equal to {max}")));
        }
    }
    Ok(())
}

/// Parse a timestamp the way `scheduleTime` accepts it: RFC 3339, or a
/// zone-less `YYYY-MM-DD[T ]HH:MM:SS` read as UTC.
pub fn parse_date_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn type_matches(type_name: &str, value: &Value) -> bool {
    match type_name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn expected_label(expected: &Value) -> String {
    match expected {
        Value::String(t) => t.clone(),
        Value::Array(ts) => ts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" | "),
        other => other.to_string(),
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
