//! Tools that need no external service.

use chrono::Utc;
use serde_json::{json, Value};

use bc_protocol::ToolCallResult;

use crate::error::ToolError;
use crate::registry::{Tool, ToolContext};

/// `currentTime {}`: the server clock in RFC 3339.
pub struct CurrentTime;

#[async_trait::async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &str {
        "currentTime"
    }

    fn description(&self) -> &str {
        "returns the current server time"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _ctx: &ToolContext, _args: Value) -> Result<ToolCallResult, ToolError> {
        Ok(ToolCallResult::text(format!(
            "The current server time is {}",
            Utc::now().to_rfc3339()
        )))
    }
}

/// `multiply {a, b}`.
pub struct Multiply;

#[async_trait::async_trait]
impl Tool for Multiply {
    fn name(&self) -> &str {
        "multiply"
    }

    fn description(&self) -> &str {
        "multiply two numbers"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": { "type": "number", "description": "first factor" },
                "b": { "type": "number", "description": "second factor" }
            },
            "required": ["a", "b"],
            "additionalProperties": false
        })
    }

    async fn call(&self, _ctx: &ToolContext, args: Value) -> Result<ToolCallResult, ToolError> {
        let a = &args["a"];
        let b = &args["b"];
        let product = match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x.checked_mul(y).map(Value::from),
            _ => None,
        }
        .or_else(|| {
            let p = a.as_f64()? * b.as_f64()?;
            serde_json::Number::from_f64(p).map(Value::Number)
        })
        .ok_or_else(|| ToolError::Execution(format!("cannot multiply {a} by {b}")))?;

        Ok(ToolCallResult::text(format!("{a} multiplied by {b} is {product}")))
    }
}
