//! Tool registry: a fixed, ordered set of named procedures, each guarded
//! by its argument schema.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use bc_domain::tool::ToolDescriptor;
use bc_domain::trace::TraceEvent;
use bc_protocol::ToolCallResult;

use crate::error::ToolError;
use crate::schema::validate_arguments;

/// Per-call context handed to a tool.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Transport session the call arrived on, if any.
    pub session_id: Option<String>,
}

/// Implement this trait to expose a procedure through the registry.
///
/// `call` only ever sees arguments that already passed
/// [`input_schema`](Tool::input_schema) validation.
#[async_trait::async_trait]
pub trait Tool: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<ToolCallResult, ToolError>;
}

/// Registry of tools, listed in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    descriptors: Vec<ToolDescriptor>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names are unique and case-sensitive.
    pub fn register<T: Tool>(&mut self, tool: T) -> Result<&mut Self, ToolError> {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<&mut Self, ToolError> {
        let name = tool.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(ToolError::Duplicate(name));
        }
        self.descriptors.push(ToolDescriptor {
            name: name.clone(),
            description: tool.description().to_string(),
            input_schema: tool.input_schema(),
        });
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(self)
    }

    /// Descriptors of every tool, in registration order.
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up, validate, then run a tool.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Value,
        ctx: &ToolContext,
    ) -> Result<ToolCallResult, ToolError> {
        let idx = *self
            .by_name
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        validate_arguments(&self.descriptors[idx].input_schema, &arguments)?;

        let started = Instant::now();
        let result = self.tools[idx].call(ctx, arguments).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let is_error = match &result {
            Ok(out) => out.is_error,
            Err(_) => true,
        };
        if let Err(e) = &result {
            tracing::warn!(tool = %name, error = %e, "tool execution failed");
        }
        TraceEvent::ToolInvoked {
            tool: name.to_string(),
            duration_ms,
            is_error,
        }
        .emit();

        result
    }
}
