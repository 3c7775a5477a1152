//! Tool schema → Gemini function declaration.
//!
//! Gemini accepts a subset of OpenAPI schema. Everything outside that
//! subset is dropped here so a declaration never fails on the LLM side
//! because of metadata the tool server happened to include.

use serde_json::{Map, Value};

use bc_domain::tool::{FunctionDeclaration, ToolDescriptor};

/// Keys removed at every level of a parameter schema.
const UNSUPPORTED_KEYS: &[&str] = &[
    "additionalProperties",
    "$schema",
    "definitions",
    "$defs",
    "$ref",
    "$id",
    "$comment",
    "default",
    "examples",
];

/// Build the declaration Gemini sees for one tool.
///
/// The root is always `{"type": "object", "properties": …, "required": …}`;
/// every other root key is discarded. Adapting an adapted declaration's
/// parameters yields the same value.
pub fn adapt(descriptor: &ToolDescriptor) -> FunctionDeclaration {
    FunctionDeclaration {
        name: descriptor.name.clone(),
        description: descriptor.description.clone(),
        parameters: adapt_parameters(&descriptor.input_schema),
    }
}

pub fn adapt_all(descriptors: &[ToolDescriptor]) -> Vec<FunctionDeclaration> {
    descriptors.iter().map(adapt).collect()
}

/// Root-level transform applied to a tool's input schema.
pub fn adapt_parameters(schema: &Value) -> Value {
    let properties = match schema.get("properties") {
        Some(Value::Object(props)) => sanitize_properties(props),
        _ => Map::new(),
    };

    let mut root = Map::new();
    root.insert("type".into(), Value::String("object".into()));
    root.insert("properties".into(), Value::Object(properties));
    if let Some(required) = schema.get("required").filter(|r| r.is_array()) {
        root.insert("required".into(), required.clone());
    }
    Value::Object(root)
}

/// Strip unsupported keys from a nested schema, recursing into
/// `properties` and `items`.
pub fn sanitize_schema(schema: &Value) -> Value {
    let Value::Object(obj) = schema else {
        return schema.clone();
    };

    let mut out = Map::new();
    for (key, value) in obj {
        if UNSUPPORTED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let value = match (key.as_str(), value) {
            ("properties", Value::Object(props)) => Value::Object(sanitize_properties(props)),
            ("items", Value::Array(tuple)) => {
                Value::Array(tuple.iter().map(sanitize_schema).collect())
            }
            ("items", item) => sanitize_schema(item),
            _ => value.clone(),
        };
        out.insert(key.clone(), value);
    }
    Value::Object(out)
}

fn sanitize_properties(props: &Map<String, Value>) -> Map<String, Value> {
    props
        .iter()
        .map(|(name, schema)| (name.clone(), sanitize_schema(schema)))
        .collect()
}
