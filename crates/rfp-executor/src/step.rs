//! Executes one [`Step`], retrying the primary tool call with backoff
//! before falling through its ordered [`AlternativeApproach`]es
//! (`spec.md` §4.8 "Step execution").

use crate::plan::{AlternativeApproach, Step};
use rfp_error::ToolError;
use rfp_policy::PolicyEngine;
use rfp_resilience::exponential_backoff_with_jitter;
use rfp_tools::{ToolContext, ToolRegistry};
use serde_json::Value;
use std::time::Duration;

/// Attempts per tool (primary or alternative) before moving on.
const MAX_ATTEMPTS_PER_APPROACH: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(300);
const MAX_DELAY: Duration = Duration::from_secs(10);

/// What happened when a step ran: which tool ultimately served the call
/// (for the procedural-memory tool sequence) and its result.
pub struct StepOutcome {
    /// Tool names attempted, in order, including ones that failed.
    pub tools_attempted: Vec<String>,
    /// The tool that produced the final result (primary or an alternative).
    pub served_by: String,
    /// Whether the step ultimately succeeded.
    pub ok: bool,
    /// The tool's JSON result (the dispatch envelope: `{ok, ...}`).
    pub result: Value,
}

/// Calls one tool through the registry, retrying while the registry
/// reports the failure as retryable.
async fn call_with_retry(registry: &ToolRegistry, ctx: &ToolContext, policy: &PolicyEngine, tool: &str, args: Value) -> Value {
    let mut attempt = 0u32;
    loop {
        let result = registry.dispatch(ctx, policy, tool, args.clone()).await;
        if result["ok"] == Value::Bool(true) {
            return result;
        }
        let retryable = result.get("retryable").and_then(Value::as_bool).unwrap_or(false);
        attempt += 1;
        if !retryable || attempt >= MAX_ATTEMPTS_PER_APPROACH {
            return result;
        }
        let delay = exponential_backoff_with_jitter(attempt, BASE_DELAY, MAX_DELAY, 2.0, 0.25);
        tracing::debug!(target: "rfp.executor", tool, attempt, "retrying tool call after a retryable failure");
        tokio::time::sleep(delay).await;
    }
}

/// Substitutes `"$step:<id>"` string leaves in `args` with the named
/// prior step's result, so later steps can reference earlier output.
pub fn resolve_step_references(args: &Value, step_results: &std::collections::BTreeMap<String, Value>) -> Value {
    match args {
        Value::String(s) => {
            if let Some(id) = s.strip_prefix("$step:") {
                step_results.get(id).cloned().unwrap_or_else(|| args.clone())
            } else {
                args.clone()
            }
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_step_references(v, step_results)).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), resolve_step_references(v, step_results))).collect()),
        other => other.clone(),
    }
}

/// Runs a step: the primary tool first, then each alternative approach in
/// declared order, stopping at the first success. Each approach gets its
/// own retry budget.
pub async fn run_step(registry: &ToolRegistry, ctx: &ToolContext, policy: &PolicyEngine, step: &Step, step_results: &std::collections::BTreeMap<String, Value>) -> StepOutcome {
    let mut tools_attempted = Vec::new();

    let primary_args = resolve_step_references(&step.args, step_results);
    let primary_result = call_with_retry(registry, ctx, policy, &step.tool, primary_args).await;
    tools_attempted.push(step.tool.clone());
    if primary_result["ok"] == Value::Bool(true) {
        return StepOutcome { tools_attempted, served_by: step.tool.clone(), ok: true, result: primary_result };
    }

    let primary_retryable = primary_result.get("retryable").and_then(Value::as_bool).unwrap_or(false);
    if primary_retryable {
        tracing::warn!(target: "rfp.executor", step_id = %step.id, tool = %step.tool, "primary tool exhausted its retries, trying alternatives");
    } else {
        tracing::warn!(target: "rfp.executor", step_id = %step.id, tool = %step.tool, "primary tool failed non-retryably, trying alternatives");
    }

    let mut last_result = primary_result;
    for alt in &step.alternative_approaches {
        let args = resolve_step_references(&alt.args, step_results);
        tracing::info!(target: "rfp.executor", step_id = %step.id, tool = %alt.tool, rationale = %alt.rationale, "trying alternative approach");
        let result = call_with_retry(registry, ctx, policy, &alt.tool, args).await;
        tools_attempted.push(alt.tool.clone());
        if result["ok"] == Value::Bool(true) {
            return StepOutcome { tools_attempted, served_by: alt.tool.clone(), ok: true, result };
        }
        last_result = result;
    }

    StepOutcome { served_by: tools_attempted.last().cloned().unwrap_or_default(), tools_attempted, ok: false, result: last_result }
}

/// Parses a step's final failing result back into a [`ToolError`], for
/// recording on the job.
pub fn as_tool_error(result: &Value) -> Option<ToolError> {
    serde_json::from_value(result.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rfp_error::{ErrorCode, RfpError};
    use rfp_policy::AllowlistConfig;
    use rfp_tools::ToolDef;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyTool {
        succeed_after: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl rfp_tools::ToolHandler for FlakyTool {
        fn def(&self) -> ToolDef {
            ToolDef { name: "flaky", description: "fails a few times then succeeds", parameters_schema: serde_json::json!({"type":"object"}), write: false }
        }

        async fn call(&self, _ctx: &ToolContext, _args: Value) -> Result<Value, RfpError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.succeed_after {
                return Err(RfpError::new(ErrorCode::UpstreamFailed, "rate limit hit, try again"));
            }
            Ok(serde_json::json!({"done": true}))
        }
    }

    struct AlwaysFailsTool;

    #[async_trait]
    impl rfp_tools::ToolHandler for AlwaysFailsTool {
        fn def(&self) -> ToolDef {
            ToolDef { name: "broken", description: "never works", parameters_schema: serde_json::json!({"type":"object"}), write: false }
        }

        async fn call(&self, _ctx: &ToolContext, _args: Value) -> Result<Value, RfpError> {
            Err(RfpError::new(ErrorCode::NotFound, "no such resource").with_retryable(false))
        }
    }

    struct FallbackTool;

    #[async_trait]
    impl rfp_tools::ToolHandler for FallbackTool {
        fn def(&self) -> ToolDef {
            ToolDef { name: "fallback", description: "the alternative", parameters_schema: serde_json::json!({"type":"object"}), write: false }
        }

        async fn call(&self, _ctx: &ToolContext, _args: Value) -> Result<Value, RfpError> {
            Ok(serde_json::json!({"via": "fallback"}))
        }
    }

    fn ctx() -> ToolContext {
        ToolContext::new(rfp_store::InMemoryKeyValueStore::shared(), rfp_store::InMemoryObjectStore::shared().unwrap(), PolicyEngine::new(&AllowlistConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn primary_tool_succeeds_after_transient_failures() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FlakyTool { succeed_after: 2, calls: AtomicU32::new(0) }));
        let policy = PolicyEngine::new(&AllowlistConfig::default()).unwrap();
        let step = Step { id: "s1".to_string(), description: String::new(), tool: "flaky".to_string(), args: serde_json::json!({}), alternative_approaches: vec![] };
        let outcome = run_step(&registry, &ctx(), &policy, &step, &Default::default()).await;
        assert!(outcome.ok);
        assert_eq!(outcome.served_by, "flaky");
    }

    #[tokio::test]
    async fn falls_through_to_alternative_after_non_retryable_primary_failure() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(AlwaysFailsTool));
        registry.register(Arc::new(FallbackTool));
        let policy = PolicyEngine::new(&AllowlistConfig::default()).unwrap();
        let step = Step {
            id: "s1".to_string(),
            description: String::new(),
            tool: "broken".to_string(),
            args: serde_json::json!({}),
            alternative_approaches: vec![AlternativeApproach { tool: "fallback".to_string(), args: serde_json::json!({}), rationale: "broken never works".to_string() }],
        };
        let outcome = run_step(&registry, &ctx(), &policy, &step, &Default::default()).await;
        assert!(outcome.ok);
        assert_eq!(outcome.served_by, "fallback");
        assert_eq!(outcome.tools_attempted, vec!["broken".to_string(), "fallback".to_string()]);
    }

    #[tokio::test]
    async fn reports_failure_when_every_approach_is_exhausted() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(AlwaysFailsTool));
        let policy = PolicyEngine::new(&AllowlistConfig::default()).unwrap();
        let step = Step { id: "s1".to_string(), description: String::new(), tool: "broken".to_string(), args: serde_json::json!({}), alternative_approaches: vec![] };
        let outcome = run_step(&registry, &ctx(), &policy, &step, &Default::default()).await;
        assert!(!outcome.ok);
    }

    #[test]
    fn resolve_step_references_substitutes_prior_results() {
        let mut results = std::collections::BTreeMap::new();
        results.insert("s1".to_string(), serde_json::json!({"rfpId": "r1"}));
        let args = serde_json::json!({"input": "$step:s1", "literal": "keep"});
        let resolved = resolve_step_references(&args, &results);
        assert_eq!(resolved["input"], serde_json::json!({"rfpId": "r1"}));
        assert_eq!(resolved["literal"], serde_json::json!("keep"));
    }
}
