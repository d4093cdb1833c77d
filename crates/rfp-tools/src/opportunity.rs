//! Opportunity tool category: load/patch the canonical state, append
//! journal and event-log rows (`spec.md` §4.4 "Opportunity").

use crate::context::ToolContext;
use crate::registry::{ToolDef, ToolHandler};
use async_trait::async_trait;
use rfp_core::{EventLogEntry, JournalEntry};
use rfp_error::{ErrorCode, RfpError};
use rfp_policy::RawOpportunityPatch;
use serde_json::{json, Value};

fn arg_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, RfpError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| RfpError::new(ErrorCode::Internal, format!("missing required argument '{field}'")))
}

pub struct OpportunityLoadTool;

#[async_trait]
impl ToolHandler for OpportunityLoadTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "opportunity_load",
            description: "Load the canonical opportunity state for an RFP, creating default state if none exists yet.",
            parameters_schema: json!({
                "type": "object",
                "properties": { "rfpId": {"type": "string"} },
                "required": ["rfpId"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let rfp_id = arg_str(&args, "rfpId")?;
        let now = rfp_core::now();
        ctx.opportunity.ensure_state_exists(rfp_id, now).await?;
        let state = ctx
            .opportunity
            .get_state(rfp_id)
            .await?
            .ok_or_else(|| RfpError::new(ErrorCode::Internal, "state missing after ensure_state_exists"))?;
        Ok(serde_json::to_value(state).map_err(|e| RfpError::new(ErrorCode::Internal, e.to_string()))?)
    }
}

/// Applies a sanitized patch to opportunity state. This is a write tool:
/// the agent must call it before posting any chat summary that reports a
/// state change (`spec.md` §4.7 "write-before-talk").
pub struct OpportunityPatchTool;

#[async_trait]
impl ToolHandler for OpportunityPatchTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "opportunity_patch",
            description: "Apply a sanitized patch to an RFP's opportunity state (stage, summary, due dates, commitments, risks, owners).",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "rfpId": {"type": "string"},
                    "patch": {"type": "object"},
                    "createSnapshot": {"type": "boolean"}
                },
                "required": ["rfpId", "patch"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let rfp_id = arg_str(&args, "rfpId")?;
        let raw_patch: RawOpportunityPatch = serde_json::from_value(args.get("patch").cloned().unwrap_or(Value::Null))
            .map_err(|e| RfpError::new(ErrorCode::Internal, format!("invalid patch body: {e}")))?;
        let create_snapshot = args.get("createSnapshot").and_then(Value::as_bool).unwrap_or(false);
        let now = rfp_core::now();
        let outcome = ctx.opportunity.patch_state(rfp_id, raw_patch, create_snapshot, now).await?;
        Ok(json!({
            "state": outcome.state,
            "policyChecks": outcome.policy_checks,
            "diff": outcome.diff,
        }))
    }
}

pub struct JournalAppendTool;

#[async_trait]
impl ToolHandler for JournalAppendTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "journal_append",
            description: "Append a narrative journal entry (what changed, why, assumptions, sources) for an RFP.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "rfpId": {"type": "string"},
                    "whatChanged": {"type": "string"},
                    "why": {"type": "string"},
                    "createdBy": {"type": "string"},
                    "topics": {"type": "array", "items": {"type": "string"}},
                    "assumptions": {"type": "array", "items": {"type": "string"}},
                    "sources": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["rfpId", "whatChanged", "why", "createdBy"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let rfp_id = arg_str(&args, "rfpId")?;
        let what_changed = arg_str(&args, "whatChanged")?;
        let why = arg_str(&args, "why")?;
        let created_by = arg_str(&args, "createdBy")?;
        let now = rfp_core::now();

        let mut entry = JournalEntry::new(rfp_id, what_changed, why, created_by, now);
        if let Some(topics) = args.get("topics").and_then(Value::as_array) {
            entry.topics = topics.iter().filter_map(Value::as_str).map(str::to_string).collect();
        }
        if let Some(assumptions) = args.get("assumptions").and_then(Value::as_array) {
            entry.assumptions = assumptions.iter().filter_map(Value::as_str).map(str::to_string).collect();
        }
        if let Some(sources) = args.get("sources").and_then(Value::as_array) {
            entry.sources = sources.iter().filter_map(Value::as_str).map(str::to_string).collect();
        }

        ctx.opportunity.append_entry(entry.clone()).await?;
        Ok(serde_json::to_value(entry).map_err(|e| RfpError::new(ErrorCode::Internal, e.to_string()))?)
    }
}

pub struct EventAppendTool;

#[async_trait]
impl ToolHandler for EventAppendTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "event_append",
            description: "Append a hash-chained explainability event (tool_call, policy_check, protocol_violation, ...) for an RFP.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "rfpId": {"type": "string"},
                    "eventType": {"type": "string"},
                    "tool": {"type": "string"},
                    "resultPreview": {"type": "string"}
                },
                "required": ["rfpId", "eventType"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let rfp_id = arg_str(&args, "rfpId")?;
        let event_type = arg_str(&args, "eventType")?;
        let now = rfp_core::now();

        let mut entry = EventLogEntry::new(rfp_id, event_type, now);
        entry.tool = args.get("tool").and_then(Value::as_str).map(str::to_string);
        if let Some(preview) = args.get("resultPreview").and_then(Value::as_str) {
            entry.outputs_redacted.result_preview = preview.to_string();
        }

        let saved = ctx.opportunity.append_event(entry).await?;
        Ok(serde_json::to_value(saved).map_err(|e| RfpError::new(ErrorCode::Internal, e.to_string()))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_policy::{AllowlistConfig, PolicyEngine};
    use std::sync::Arc;

    fn ctx() -> ToolContext {
        ToolContext::new(
            rfp_store::InMemoryKeyValueStore::shared(),
            Arc::new(rfp_store::InMemoryObjectStore::new().unwrap()),
            PolicyEngine::new(&AllowlistConfig::default()).unwrap(),
        )
    }

    #[tokio::test]
    async fn load_creates_default_state_on_first_call() {
        let ctx = ctx();
        let result = OpportunityLoadTool.call(&ctx, json!({"rfpId": "r1"})).await.unwrap();
        assert_eq!(result["stage"], json!("new"));
    }

    #[tokio::test]
    async fn patch_bumps_version_and_reports_policy_checks() {
        let ctx = ctx();
        let patch = json!({
            "stage": "in-review",
            "commitments_append": [
                {"text": "ship Friday", "provenance": {"source": "slack_thread"}}
            ]
        });
        let result = OpportunityPatchTool.call(&ctx, json!({"rfpId": "r1", "patch": patch})).await.unwrap();
        assert_eq!(result["state"]["stage"], json!("in-review"));
        assert_eq!(result["state"]["version"], json!(1));
        assert_eq!(result["policyChecks"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn journal_append_round_trips() {
        let ctx = ctx();
        let result = JournalAppendTool
            .call(&ctx, json!({"rfpId": "r1", "whatChanged": "stage set", "why": "user asked", "createdBy": "agent:test"}))
            .await
            .unwrap();
        assert_eq!(result["what_changed"], json!("stage set"));
    }

    #[tokio::test]
    async fn event_append_chains_hashes() {
        let ctx = ctx();
        let first = EventAppendTool.call(&ctx, json!({"rfpId": "r1", "eventType": "tool_call"})).await.unwrap();
        assert!(first["prev_hash"].is_null());
        let second = EventAppendTool.call(&ctx, json!({"rfpId": "r1", "eventType": "policy_check"})).await.unwrap();
        assert!(!second["prev_hash"].is_null());
    }
}
