//! GitHub API access: the agent's view into the repos it operates against
//! (`spec.md` §4.4, §6 "GitHub"), gated by the caller against the repo
//! allowlist before reaching this trait.

use async_trait::async_trait;
use rfp_error::{ErrorCode, RfpError};
use serde_json::Value;

/// Read/write access to a GitHub repository.
#[async_trait]
pub trait GitHubClient: Send + Sync {
    /// Fetches one pull request by number.
    async fn get_pull(&self, repo: &str, number: u64) -> Result<Value, RfpError>;

    /// Lists open pull requests.
    async fn list_pulls(&self, repo: &str, state: &str) -> Result<Value, RfpError>;

    /// Lists check runs for a commit SHA.
    async fn list_check_runs(&self, repo: &str, sha: &str) -> Result<Value, RfpError>;

    /// Creates an issue, returning its number.
    async fn create_issue(&self, repo: &str, title: &str, body: &str) -> Result<u64, RfpError>;

    /// Comments on an existing issue or pull request.
    async fn comment_on_issue_or_pr(&self, repo: &str, number: u64, body: &str) -> Result<Value, RfpError>;

    /// Adds labels to an issue or pull request.
    async fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> Result<(), RfpError>;

    /// Re-runs a completed workflow run.
    async fn rerun_workflow_run(&self, repo: &str, run_id: u64) -> Result<(), RfpError>;

    /// Dispatches a workflow on a ref, with inputs.
    async fn dispatch_workflow(&self, repo: &str, workflow_id: &str, git_ref: &str, inputs: Value) -> Result<(), RfpError>;
}

/// Fails every [`GitHubClient`] call with [`ErrorCode::NotConfigured`]. The
/// default adapter until a deployment wires in a real GitHub App client.
pub struct UnconfiguredGitHubClient;

fn not_configured(op: &str) -> RfpError {
    RfpError::new(ErrorCode::NotConfigured, format!("GitHub client is not configured: {op}"))
}

#[async_trait]
impl GitHubClient for UnconfiguredGitHubClient {
    async fn get_pull(&self, _repo: &str, _number: u64) -> Result<Value, RfpError> {
        Err(not_configured("get_pull"))
    }

    async fn list_pulls(&self, _repo: &str, _state: &str) -> Result<Value, RfpError> {
        Err(not_configured("list_pulls"))
    }

    async fn list_check_runs(&self, _repo: &str, _sha: &str) -> Result<Value, RfpError> {
        Err(not_configured("list_check_runs"))
    }

    async fn create_issue(&self, _repo: &str, _title: &str, _body: &str) -> Result<u64, RfpError> {
        Err(not_configured("create_issue"))
    }

    async fn comment_on_issue_or_pr(&self, _repo: &str, _number: u64, _body: &str) -> Result<Value, RfpError> {
        Err(not_configured("comment_on_issue_or_pr"))
    }

    async fn add_labels(&self, _repo: &str, _number: u64, _labels: &[String]) -> Result<(), RfpError> {
        Err(not_configured("add_labels"))
    }

    async fn rerun_workflow_run(&self, _repo: &str, _run_id: u64) -> Result<(), RfpError> {
        Err(not_configured("rerun_workflow_run"))
    }

    async fn dispatch_workflow(&self, _repo: &str, _workflow_id: &str, _git_ref: &str, _inputs: Value) -> Result<(), RfpError> {
        Err(not_configured("dispatch_workflow"))
    }
}

fn arg_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, RfpError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| RfpError::new(ErrorCode::Internal, format!("missing required argument '{field}'")))
}

fn arg_number(args: &Value, field: &str) -> Result<u64, RfpError> {
    args.get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| RfpError::new(ErrorCode::Internal, format!("missing required argument '{field}'")))
}

fn arg_labels(args: &Value) -> Vec<String> {
    args.get("labels")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

pub struct GetPullTool;

#[async_trait]
impl crate::registry::ToolHandler for GetPullTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "get_pull",
            description: "Fetch one pull request by number.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "repo": {"type": "string"}, "number": {"type": "integer"} },
                "required": ["repo", "number"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.github.get_pull(arg_str(&args, "repo")?, arg_number(&args, "number")?).await
    }
}

pub struct ListPullsTool;

#[async_trait]
impl crate::registry::ToolHandler for ListPullsTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "list_pulls",
            description: "List pull requests in a state (open, closed, all).",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "repo": {"type": "string"}, "state": {"type": "string", "enum": ["open", "closed", "all"]} },
                "required": ["repo", "state"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.github.list_pulls(arg_str(&args, "repo")?, arg_str(&args, "state")?).await
    }
}

pub struct ListCheckRunsTool;

#[async_trait]
impl crate::registry::ToolHandler for ListCheckRunsTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "list_check_runs",
            description: "List check runs for a commit SHA.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "repo": {"type": "string"}, "sha": {"type": "string"} },
                "required": ["repo", "sha"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.github.list_check_runs(arg_str(&args, "repo")?, arg_str(&args, "sha")?).await
    }
}

pub struct CreateIssueTool;

#[async_trait]
impl crate::registry::ToolHandler for CreateIssueTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "create_issue",
            description: "Create an issue, returning its number.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "repo": {"type": "string"}, "title": {"type": "string"}, "body": {"type": "string"} },
                "required": ["repo", "title", "body"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        let number = ctx.github.create_issue(arg_str(&args, "repo")?, arg_str(&args, "title")?, arg_str(&args, "body")?).await?;
        Ok(serde_json::json!({ "number": number }))
    }
}

pub struct CommentOnIssueOrPrTool;

#[async_trait]
impl crate::registry::ToolHandler for CommentOnIssueOrPrTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "comment_on_issue_or_pr",
            description: "Comment on an existing issue or pull request.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "repo": {"type": "string"}, "number": {"type": "integer"}, "body": {"type": "string"} },
                "required": ["repo", "number", "body"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.github.comment_on_issue_or_pr(arg_str(&args, "repo")?, arg_number(&args, "number")?, arg_str(&args, "body")?).await
    }
}

pub struct AddLabelsTool;

#[async_trait]
impl crate::registry::ToolHandler for AddLabelsTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "add_labels",
            description: "Add labels to an issue or pull request.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "repo": {"type": "string"},
                    "number": {"type": "integer"},
                    "labels": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["repo", "number", "labels"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.github.add_labels(arg_str(&args, "repo")?, arg_number(&args, "number")?, &arg_labels(&args)).await?;
        Ok(serde_json::json!({}))
    }
}

pub struct RerunWorkflowRunTool;

#[async_trait]
impl crate::registry::ToolHandler for RerunWorkflowRunTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "rerun_workflow_run",
            description: "Re-run a completed workflow run.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "repo": {"type": "string"}, "runId": {"type": "integer"} },
                "required": ["repo", "runId"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.github.rerun_workflow_run(arg_str(&args, "repo")?, arg_number(&args, "runId")?).await?;
        Ok(serde_json::json!({}))
    }
}

pub struct DispatchWorkflowTool;

#[async_trait]
impl crate::registry::ToolHandler for DispatchWorkflowTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "dispatch_workflow",
            description: "Dispatch a workflow on a ref, with inputs.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "repo": {"type": "string"},
                    "workflowId": {"type": "string"},
                    "gitRef": {"type": "string"},
                    "inputs": {"type": "object"}
                },
                "required": ["repo", "workflowId", "gitRef"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        let inputs = args.get("inputs").cloned().unwrap_or_else(|| serde_json::json!({}));
        ctx.github
            .dispatch_workflow(arg_str(&args, "repo")?, arg_str(&args, "workflowId")?, arg_str(&args, "gitRef")?, inputs)
            .await?;
        Ok(serde_json::json!({}))
    }
}
