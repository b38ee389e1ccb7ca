//! Tool registration and argument validation.
//!
//! A [`ToolRegistry`] holds the tools offered to the model for one call.
//! Each tool pairs an argument schema with an optional executor; tools
//! without an executor are declared to the model but never run client-side
//! (the caller handles their invocations out of band).

mod engine;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use jsonschema::Validator;
use serde_json::Value;

use crate::model::ToolDeclaration;

pub(crate) use engine::invoke_tools;

/// Validates raw tool-call arguments against a declared shape.
pub trait ArgumentSchema: Send + Sync {
    /// The JSON Schema sent to the model in the tool declaration.
    fn definition(&self) -> Value;

    /// Validate parsed arguments, returning them (possibly normalized) on
    /// success or a human-readable reason on failure.
    fn validate(&self, args: &Value) -> Result<Value, String>;
}

/// Executes one tool call with validated arguments.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        args: Value,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>;
}

/// [`ArgumentSchema`] backed by a compiled JSON Schema (draft auto-detected).
pub struct JsonSchema {
    definition: Value,
    validator: Validator,
}

impl JsonSchema {
    /// Compile a JSON Schema. Fails if the schema itself is invalid.
    pub fn compile(definition: Value) -> Result<Self, crate::error::Error> {
        let validator = jsonschema::validator_for(&definition)
            .map_err(|e| crate::error::Error::InvalidInput(format!("invalid JSON schema: {e}")))?;
        Ok(Self {
            definition,
            validator,
        })
    }
}

impl ArgumentSchema for JsonSchema {
    fn definition(&self) -> Value {
        self.definition.clone()
    }

    fn validate(&self, args: &Value) -> Result<Value, String> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(args)
            .map(|e| format!("{} at {}", e, e.instance_path))
            .take(3)
            .collect();
        if errors.is_empty() {
            Ok(args.clone())
        } else {
            Err(errors.join("; "))
        }
    }
}

/// One registered tool: declaration metadata plus optional execution.
#[derive(Clone)]
pub struct ToolDefinition {
    pub description: String,
    pub schema: Arc<dyn ArgumentSchema>,
    /// `None` marks a declare-only tool: offered to the model, never
    /// executed by the invocation engine.
    pub execute: Option<Arc<dyn ToolExecutor>>,
}

/// The set of tools offered to the model for one call, keyed by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under `name`, replacing any previous registration.
    pub fn register(mut self, name: impl Into<String>, tool: ToolDefinition) -> Self {
        self.tools.insert(name.into(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Declarations for every registered tool, in name order.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools
            .iter()
            .map(|(name, tool)| ToolDeclaration {
                name: name.clone(),
                description: tool.description.clone(),
                parameters: tool.schema.definition(),
            })
            .collect()
    }
}
