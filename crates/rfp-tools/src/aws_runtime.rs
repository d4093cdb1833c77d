//! AWS runtime introspection: ECS/SQS/Secrets/Logs/telemetry read tools, so
//! an agent can check deployment health without shell access
//! (`spec.md` §4.4, §6 "AWS runtime introspection").

use async_trait::async_trait;
use rfp_error::{ErrorCode, RfpError};
use serde_json::Value;

/// Read-only AWS runtime introspection. A production deployment backs this
/// with the AWS SDK; tests and unwired deployments get
/// [`UnconfiguredAwsRuntime`], which fails every call closed.
#[async_trait]
pub trait AwsRuntime: Send + Sync {
    /// Describes an ECS service (desired/running count, deployments).
    async fn ecs_describe_service(&self, cluster: &str, service: &str) -> Result<Value, RfpError>;

    /// Lists task ARNs for an ECS service.
    async fn ecs_list_tasks(&self, cluster: &str, service: &str) -> Result<Value, RfpError>;

    /// Describes an ECS task definition by family:revision or ARN.
    async fn ecs_describe_task_definition(&self, task_definition: &str) -> Result<Value, RfpError>;

    /// Reports the approximate visible/in-flight message counts for an SQS
    /// queue.
    async fn sqs_get_queue_depth(&self, queue_url: &str) -> Result<Value, RfpError>;

    /// Reports the full attribute set for an SQS queue.
    async fn sqs_get_queue_attributes(&self, queue_url: &str) -> Result<Value, RfpError>;

    /// Describes a secret's metadata (name, rotation state, version ids).
    /// Never returns the secret's value to the model.
    async fn secrets_describe(&self, secret_id: &str) -> Result<Value, RfpError>;

    /// Tails the most recent lines from a CloudWatch Logs log group/stream.
    async fn logs_tail(&self, log_group: &str, log_stream: Option<&str>, limit: usize) -> Result<Value, RfpError>;

    /// Full-text search over telemetry logs for a time window.
    async fn telemetry_search_logs(&self, query: &str, since_minutes: u32) -> Result<Value, RfpError>;

    /// Top error signatures observed over a time window.
    async fn telemetry_top_errors(&self, since_minutes: u32, limit: usize) -> Result<Value, RfpError>;
}

/// Fails every [`AwsRuntime`] call with [`ErrorCode::NotConfigured`]. The
/// default adapter until a deployment wires in a real AWS SDK client.
pub struct UnconfiguredAwsRuntime;

fn not_configured(op: &str) -> RfpError {
    RfpError::new(ErrorCode::NotConfigured, format!("AWS runtime is not configured: {op}"))
}

#[async_trait]
impl AwsRuntime for UnconfiguredAwsRuntime {
    async fn ecs_describe_service(&self, _cluster: &str, _service: &str) -> Result<Value, RfpError> {
        Err(not_configured("ecs_describe_service"))
    }

    async fn ecs_list_tasks(&self, _cluster: &str, _service: &str) -> Result<Value, RfpError> {
        Err(not_configured("ecs_list_tasks"))
    }

    async fn ecs_describe_task_definition(&self, _task_definition: &str) -> Result<Value, RfpError> {
        Err(not_configured("ecs_describe_task_definition"))
    }

    async fn sqs_get_queue_depth(&self, _queue_url: &str) -> Result<Value, RfpError> {
        Err(not_configured("sqs_get_queue_depth"))
    }

    async fn sqs_get_queue_attributes(&self, _queue_url: &str) -> Result<Value, RfpError> {
        Err(not_configured("sqs_get_queue_attributes"))
    }

    async fn secrets_describe(&self, _secret_id: &str) -> Result<Value, RfpError> {
        Err(not_configured("secrets_describe"))
    }

    async fn logs_tail(&self, _log_group: &str, _log_stream: Option<&str>, _limit: usize) -> Result<Value, RfpError> {
        Err(not_configured("logs_tail"))
    }

    async fn telemetry_search_logs(&self, _query: &str, _since_minutes: u32) -> Result<Value, RfpError> {
        Err(not_configured("telemetry_search_logs"))
    }

    async fn telemetry_top_errors(&self, _since_minutes: u32, _limit: usize) -> Result<Value, RfpError> {
        Err(not_configured("telemetry_top_errors"))
    }
}

fn arg_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, RfpError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| RfpError::new(ErrorCode::Internal, format!("missing required argument '{field}'")))
}

fn arg_limit(args: &Value, field: &str, default: usize) -> usize {
    args.get(field).and_then(Value::as_u64).map(|n| n as usize).unwrap_or(default).clamp(1, 200)
}

pub struct EcsDescribeServiceTool;

#[async_trait]
impl crate::registry::ToolHandler for EcsDescribeServiceTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "ecs_describe_service",
            description: "Describe an ECS service's desired/running count and deployments.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "cluster": {"type": "string"}, "service": {"type": "string"} },
                "required": ["cluster", "service"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.aws_runtime.ecs_describe_service(arg_str(&args, "cluster")?, arg_str(&args, "service")?).await
    }
}

pub struct EcsListTasksTool;

#[async_trait]
impl crate::registry::ToolHandler for EcsListTasksTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "ecs_list_tasks",
            description: "List task ARNs for an ECS service.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "cluster": {"type": "string"}, "service": {"type": "string"} },
                "required": ["cluster", "service"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.aws_runtime.ecs_list_tasks(arg_str(&args, "cluster")?, arg_str(&args, "service")?).await
    }
}

pub struct EcsDescribeTaskDefinitionTool;

#[async_trait]
impl crate::registry::ToolHandler for EcsDescribeTaskDefinitionTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "ecs_describe_task_definition",
            description: "Describe an ECS task definition by family:revision or ARN.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "taskDefinition": {"type": "string"} },
                "required": ["taskDefinition"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.aws_runtime.ecs_describe_task_definition(arg_str(&args, "taskDefinition")?).await
    }
}

pub struct SqsGetQueueDepthTool;

#[async_trait]
impl crate::registry::ToolHandler for SqsGetQueueDepthTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "sqs_get_queue_depth",
            description: "Report approximate visible/in-flight message counts for an SQS queue.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "queueUrl": {"type": "string"} },
                "required": ["queueUrl"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.aws_runtime.sqs_get_queue_depth(arg_str(&args, "queueUrl")?).await
    }
}

pub struct SqsGetQueueAttributesTool;

#[async_trait]
impl crate::registry::ToolHandler for SqsGetQueueAttributesTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "sqs_get_queue_attributes",
            description: "Report the full attribute set for an SQS queue.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "queueUrl": {"type": "string"} },
                "required": ["queueUrl"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.aws_runtime.sqs_get_queue_attributes(arg_str(&args, "queueUrl")?).await
    }
}

pub struct SecretsDescribeTool;

#[async_trait]
impl crate::registry::ToolHandler for SecretsDescribeTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "secrets_describe",
            description: "Describe a secret's metadata (name, rotation state, version ids). Never returns its value.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "secretId": {"type": "string"} },
                "required": ["secretId"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.aws_runtime.secrets_describe(arg_str(&args, "secretId")?).await
    }
}

pub struct LogsTailTool;

#[async_trait]
impl crate::registry::ToolHandler for LogsTailTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "logs_tail",
            description: "Tail the most recent lines from a CloudWatch Logs log group/stream.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "logGroup": {"type": "string"},
                    "logStream": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 200}
                },
                "required": ["logGroup"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        let log_group = arg_str(&args, "logGroup")?;
        let log_stream = args.get("logStream").and_then(Value::as_str);
        let limit = arg_limit(&args, "limit", 50);
        ctx.aws_runtime.logs_tail(log_group, log_stream, limit).await
    }
}

pub struct TelemetrySearchLogsTool;

#[async_trait]
impl crate::registry::ToolHandler for TelemetrySearchLogsTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "telemetry_search_logs",
            description: "Full-text search over telemetry logs for a time window.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "sinceMinutes": {"type": "integer", "minimum": 1}
                },
                "required": ["query", "sinceMinutes"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        let query = arg_str(&args, "query")?;
        let since_minutes = args.get("sinceMinutes").and_then(Value::as_u64).unwrap_or(60) as u32;
        ctx.aws_runtime.telemetry_search_logs(query, since_minutes).await
    }
}

pub struct TelemetryTopErrorsTool;

#[async_trait]
impl crate::registry::ToolHandler for TelemetryTopErrorsTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "telemetry_top_errors",
            description: "Top error signatures observed over a time window.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "sinceMinutes": {"type": "integer", "minimum": 1},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 200}
                },
                "required": ["sinceMinutes"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        let since_minutes = args.get("sinceMinutes").and_then(Value::as_u64).unwrap_or(60) as u32;
        let limit = arg_limit(&args, "limit", 10);
        ctx.aws_runtime.telemetry_top_errors(since_minutes, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_runtime_fails_closed() {
        let runtime = UnconfiguredAwsRuntime;
        let err = runtime.ecs_describe_service("cluster", "svc").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotConfigured);
        let err = runtime.telemetry_top_errors(60, 10).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotConfigured);
    }

    #[tokio::test]
    async fn ecs_describe_service_tool_fails_closed_without_a_configured_runtime() {
        use crate::registry::ToolHandler;
        use rfp_policy::{AllowlistConfig, PolicyEngine};

        let ctx = crate::context::ToolContext::new(
            rfp_store::InMemoryKeyValueStore::shared(),
            std::sync::Arc::new(rfp_store::InMemoryObjectStore::new().unwrap()),
            PolicyEngine::new(&AllowlistConfig::default()).unwrap(),
        );
        let err = EcsDescribeServiceTool.call(&ctx, serde_json::json!({"cluster": "c", "service": "s"})).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotConfigured);
    }
}
