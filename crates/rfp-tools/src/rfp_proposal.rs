//! RFP/Proposal tool category: list/search/get over the catalogue, plus a
//! read of the durable commitment list standing in for "tasks"
//! (`spec.md` §4.4 "RFP/Proposal").

use crate::context::ToolContext;
use crate::registry::{ToolDef, ToolHandler};
use async_trait::async_trait;
use rfp_error::{ErrorCode, RfpError};
use serde_json::{json, Value};

fn arg_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, RfpError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| RfpError::new(ErrorCode::Internal, format!("missing required argument '{field}'")))
}

fn arg_limit(args: &Value, default: usize) -> usize {
    args.get("limit").and_then(Value::as_u64).map(|n| n as usize).unwrap_or(default).clamp(1, 100)
}

pub struct ListRfpsTool;

#[async_trait]
impl ToolHandler for ListRfpsTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "list_rfps",
            description: "List RFPs, most recently created first, with pagination.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100},
                    "continuationToken": {"type": "string"}
                }
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let limit = arg_limit(&args, 20);
        let token = args.get("continuationToken").and_then(Value::as_str).map(str::to_string);
        let page = ctx.catalogue.list_rfps(limit, token).await?;
        Ok(json!({ "rfps": page.items, "continuationToken": page.continuation_token }))
    }
}

pub struct SearchRfpsTool;

#[async_trait]
impl ToolHandler for SearchRfpsTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "search_rfps",
            description: "Search RFPs by keyword over title, client name, and project type.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100}
                },
                "required": ["query"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let query = arg_str(&args, "query")?;
        let limit = arg_limit(&args, 20);
        let rfps = ctx.catalogue.search_rfps(query, limit).await?;
        Ok(json!({ "rfps": rfps }))
    }
}

pub struct GetRfpTool;

#[async_trait]
impl ToolHandler for GetRfpTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "get_rfp",
            description: "Fetch one RFP profile by id.",
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
        match ctx.catalogue.get_rfp(rfp_id).await? {
            Some(rfp) => Ok(serde_json::to_value(rfp).map_err(|e| RfpError::new(ErrorCode::Internal, e.to_string()))?),
            None => Err(RfpError::new(ErrorCode::NotFound, format!("no RFP with id '{rfp_id}'"))),
        }
    }
}

pub struct ListProposalsTool;

#[async_trait]
impl ToolHandler for ListProposalsTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "list_proposals",
            description: "List proposals, most recently created first, with pagination.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100},
                    "continuationToken": {"type": "string"}
                }
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let limit = arg_limit(&args, 20);
        let token = args.get("continuationToken").and_then(Value::as_str).map(str::to_string);
        let page = ctx.catalogue.list_proposals(limit, token).await?;
        Ok(json!({ "proposals": page.items, "continuationToken": page.continuation_token }))
    }
}

pub struct SearchProposalsTool;

#[async_trait]
impl ToolHandler for SearchProposalsTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "search_proposals",
            description: "Search proposals by keyword over title and stage.",
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 100}
                },
                "required": ["query"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<Value, RfpError> {
        let query = arg_str(&args, "query")?;
        let limit = arg_limit(&args, 20);
        let proposals = ctx.catalogue.search_proposals(query, limit).await?;
        Ok(json!({ "proposals": proposals }))
    }
}

pub struct GetProposalTool;

#[async_trait]
impl ToolHandler for GetProposalTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "get_proposal",
            description: "Fetch one proposal profile by id.",
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
        match ctx.catalogue.get_proposal(proposal_id).await? {
            Some(proposal) => Ok(serde_json::to_value(proposal).map_err(|e| RfpError::new(ErrorCode::Internal, e.to_string()))?),
            None => Err(RfpError::new(ErrorCode::NotFound, format!("no proposal with id '{proposal_id}'"))),
        }
    }
}

/// Reads an RFP's durable commitments as its task list — the platform has
/// no separate `Task` entity (`spec.md` §3 "OpportunityState.commitments").
pub struct ListTasksForRfpTool;

#[async_trait]
impl ToolHandler for ListTasksForRfpTool {
    fn def(&self) -> ToolDef {
        ToolDef {
            name: "list_tasks_for_rfp",
            description: "List the durable commitments recorded for an RFP's opportunity, treated as its task list.",
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
        match ctx.opportunity.get_state(rfp_id).await? {
            Some(state) => Ok(json!({ "rfpId": rfp_id, "tasks": state.commitments })),
            None => Ok(json!({ "rfpId": rfp_id, "tasks": [] })),
        }
    }
}
