//! The tool registry: `(name, description, json_schema, handler)`, a
//! uniform dispatch path, and the `READ_TOOLS`/`OPERATOR_TOOLS` sets
//! (`spec.md` §4.4).

use crate::context::ToolContext;
use crate::slim::{clip_args, slim_output};
use async_trait::async_trait;
use rfp_error::{ErrorCode, RfpError};
use rfp_policy::PolicyEngine;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A tool's vendor-agnostic definition, mirroring the shape used elsewhere
/// in the platform to describe a callable tool to a model.
#[derive(Debug, Clone)]
pub struct ToolDef {
    /// Stable tool name, as the model calls it.
    pub name: &'static str,
    /// Human-readable description shown to the model.
    pub description: &'static str,
    /// JSON Schema for the tool's arguments.
    pub parameters_schema: Value,
    /// Whether this tool mutates durable state or sends an outbound message
    /// (operator-only), as opposed to being safe for read-only callers.
    pub write: bool,
}

/// One tool: its definition plus the handler that executes a call.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// This tool's definition.
    fn def(&self) -> ToolDef;

    /// Executes the tool against already-clipped `args`. Handlers return
    /// their result as a JSON object (or any `Value`); the registry wraps
    /// it into the uniform `{ok, ...}` shape and slims it before it reaches
    /// the model.
    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError>;
}

/// A named collection of tools, with policy-gated, uniformly-shaped
/// dispatch.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self { tools: BTreeMap::new() }
    }

    /// Registers a tool, panicking if its name collides with one already
    /// registered (a programmer error, never a runtime condition).
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.def().name;
        if self.tools.insert(name, handler).is_some() {
            panic!("duplicate tool registration: {name}");
        }
    }

    /// Tool definitions, in name order, for handing to a model.
    pub fn defs(&self) -> Vec<ToolDef> {
        self.tools.values().map(|h| h.def()).collect()
    }

    /// Whether a tool by this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Dispatches one call: checks the tool allowlist, clips `args`, runs
    /// the handler, then slims and uniformly shapes the result. Never
    /// returns an `Err` across this boundary — every failure mode (unknown
    /// tool, denied tool, handler error) comes back as a `{ok:false, ...}`
    /// JSON value instead, per §7.
    pub async fn dispatch(&self, ctx: &ToolContext, policy: &PolicyEngine, name: &str, args: Value) -> Value {
        if let Err(err) = self.check_allowed(policy, name) {
            return serde_json::to_value(err.to_tool_error()).unwrap_or_else(|_| serde_json::json!({"ok": false}));
        }
        let Some(handler) = self.tools.get(name) else {
            let err = RfpError::new(ErrorCode::NotFound, format!("unknown tool '{name}'"));
            return serde_json::to_value(err.to_tool_error()).unwrap_or_else(|_| serde_json::json!({"ok": false}));
        };

        let clipped = clip_args(&args);
        match handler.call(ctx, clipped).await {
            Ok(value) => {
                let slimmed = slim_output(&value);
                match slimmed {
                    Value::Object(mut map) => {
                        map.insert("ok".to_string(), Value::Bool(true));
                        Value::Object(map)
                    }
                    other => serde_json::json!({ "ok": true, "data": other }),
                }
            }
            Err(err) => serde_json::to_value(err.to_tool_error()).unwrap_or_else(|_| serde_json::json!({"ok": false})),
        }
    }

    fn check_allowed(&self, policy: &PolicyEngine, name: &str) -> Result<(), RfpError> {
        let decision = policy.can_use_tool(name);
        if !decision.allowed {
            return Err(RfpError::new(
                ErrorCode::Internal,
                decision.reason.unwrap_or_else(|| format!("tool '{name}' is not allowed")),
            )
            .with_retryable(false));
        }
        Ok(())
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_policy::AllowlistConfig;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        fn def(&self) -> ToolDef {
            ToolDef {
                name: "echo",
                description: "echoes its args back",
                parameters_schema: serde_json::json!({"type": "object"}),
                write: false,
            }
        }

        async fn call(&self, _ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
            Ok(args)
        }
    }

    struct FailingTool;

    #[async_trait]
    impl ToolHandler for FailingTool {
        fn def(&self) -> ToolDef {
            ToolDef {
                name: "fails",
                description: "always fails",
                parameters_schema: serde_json::json!({"type": "object"}),
                write: false,
            }
        }

        async fn call(&self, _ctx: &ToolContext, _args: Value) -> Result<Value, RfpError> {
            Err(RfpError::new(ErrorCode::NotFound, "nothing here"))
        }
    }

    fn ctx() -> ToolContext {
        ToolContext::new(
            rfp_store::InMemoryKeyValueStore::shared(),
            rfp_store::InMemoryObjectStore::shared().unwrap(),
            PolicyEngine::new(&AllowlistConfig::default()).unwrap(),
        )
    }

    #[tokio::test]
    async fn dispatch_wraps_success_with_ok_true() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let policy = PolicyEngine::new(&AllowlistConfig::default()).unwrap();
        let result = registry.dispatch(&ctx(), &policy, "echo", serde_json::json!({"hello": "world"})).await;
        assert_eq!(result["ok"], serde_json::json!(true));
        assert_eq!(result["hello"], serde_json::json!("world"));
    }

    #[tokio::test]
    async fn dispatch_reports_unknown_tool_as_tool_error() {
        let registry = ToolRegistry::new();
        let policy = PolicyEngine::new(&AllowlistConfig::default()).unwrap();
        let result = registry.dispatch(&ctx(), &policy, "nope", serde_json::json!({})).await;
        assert_eq!(result["ok"], serde_json::json!(false));
        assert_eq!(result["errorType"], serde_json::json!("NOT_FOUND"));
    }

    #[tokio::test]
    async fn dispatch_reports_handler_error_uniformly() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool));
        let policy = PolicyEngine::new(&AllowlistConfig::default()).unwrap();
        let result = registry.dispatch(&ctx(), &policy, "fails", serde_json::json!({})).await;
        assert_eq!(result["ok"], serde_json::json!(false));
        assert_eq!(result["errorType"], serde_json::json!("NOT_FOUND"));
    }

    #[tokio::test]
    async fn dispatch_denies_tool_outside_allowlist() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let policy = PolicyEngine::new(&AllowlistConfig { allowed_tools: vec!["other_tool".into()], ..Default::default() }).unwrap();
        let result = registry.dispatch(&ctx(), &policy, "echo", serde_json::json!({})).await;
        assert_eq!(result["ok"], serde_json::json!(false));
    }
}
