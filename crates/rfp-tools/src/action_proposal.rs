//! Action-proposal tool category: stage a code/config patch for later
//! approval-gated rollout (`spec.md` §3 "ChangeProposal", §4.8
//! "self-modification").

use crate::context::ToolContext;
use crate::registry::{ToolDef, ToolHandler};
use async_trait::async_trait;
use rfp_core::keys::change_proposal_pk;
use rfp_core::ChangeProposal;
use rfp_error::{ErrorCode, RfpError};
use rfp_store::{Condition, Item, ItemKey};
use serde_json::{json, Value};

fn arg_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, RfpError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| RfpError::new(ErrorCode::Internal, format!("missing required argument '{field}'")))
}

/// Sort key for a change-proposal profile row. `ChangeProposal` shares the
/// `"PROFILE"` convention every other single-row entity in the table uses.
const CHANGE_PROPOSAL_PROFILE_SK: &str = "PROFILE";

/// Records a proposed patch. Never opens a pull request itself — rollout
/// is a separate, approval-gated `self_modify_open_pr` job (`spec.md`
/// §4.9), so a tool-using agent can never directly push code.
pub struct ProposeActionTool;

#[async_trait]
impl ToolHandler for ProposeActionTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "propose_action",
            description: "Stage a code/config patch as a change proposal, awaiting human approval before any pull request is opened.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "summary": {"type": "string"},
                    "patch": {"type": "string"},
                    "filesTouched": {"type": "array", "items": {"type": "string"}},
                    "rfpId": {"type": "string"},
                    "createdBy": {"type": "string"}
                },
                "required": ["title", "summary", "patch", "createdBy"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let title = arg_str(&args, "title")?;
        let summary = arg_str(&args, "summary")?;
        let patch = arg_str(&args, "patch")?;
        let created_by = arg_str(&args, "createdBy")?;
        let now = rfp_core::now();
        let id = rfp_core::sortable_id(now);

        let mut proposal = ChangeProposal::new(&id, title, summary, patch, created_by, now);
        if let Some(files) = args.get("filesTouched").and_then(Value::as_array) {
            proposal.files_touched = files.iter().filter_map(Value::as_str).map(str::to_string).collect();
        }
        proposal.rfp_id = args.get("rfpId").and_then(Value::as_str).map(str::to_string);

        let item = Item {
            key: ItemKey::new(change_proposal_pk(&id), CHANGE_PROPOSAL_PROFILE_SK),
            gsi1pk: None,
            gsi1sk: None,
            attributes: serde_json::to_value(&proposal).map_err(|e| RfpError::new(ErrorCode::Internal, e.to_string()))?,
        };
        ctx.store.put(item, Some(Condition::NotExists)).await?;

        tracing::info!(target: "rfp.action_proposal", proposal_id = %id, "action_proposed");
        Ok(serde_json::to_value(proposal).map_err(|e| RfpError::new(ErrorCode::Internal, e.to_string()))?)
    }
}

pub struct GetActionProposalTool;

#[async_trait]
impl ToolHandler for GetActionProposalTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "get_action_proposal",
            description: "Fetch one staged change proposal by id.",
            parameters_schema: json!({
                "type": "object",
                "properties": { "proposalId": {"type": "string"} },
                "required": ["proposalId"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let proposal_id = arg_str(&args, "proposalId")?;
        match ctx.store.get(&ItemKey::new(change_proposal_pk(proposal_id), CHANGE_PROPOSAL_PROFILE_SK)).await? {
            Some(item) => Ok(item.attributes),
            None => Err(RfpError::new(ErrorCode::NotFound, format!("no change proposal with id '{proposal_id}'"))),
        }
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
    async fn propose_then_get_round_trips() {
        let ctx = ctx();
        let proposed = ProposeActionTool
            .call(&ctx, json!({"title": "bump timeout", "summary": "raise the SQS visibility timeout", "patch": "--- a\n+++ b\n", "createdBy": "agent:test"}))
            .await
            .unwrap();
        let id = proposed["id"].as_str().unwrap();
        let fetched = GetActionProposalTool.call(&ctx, json!({"proposalId": id})).await.unwrap();
        assert_eq!(fetched["stage"], json!("created"));
    }

    #[tokio::test]
    async fn get_reports_not_found_for_missing_id() {
        let ctx = ctx();
        let err = GetActionProposalTool.call(&ctx, json!({"proposalId": "missing"})).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
