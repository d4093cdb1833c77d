//! Chat (Slack) read/reply adapter: the agent's own operator surface
//! (`spec.md` §4.4, §6 "Chat").

use async_trait::async_trait;
use rfp_error::{ErrorCode, RfpError};
use serde_json::Value;

/// Read/reply access to a chat platform, gated by the caller against the
/// channel allowlist before reaching this trait.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Lists the most recent messages in a channel.
    async fn slack_list_recent_messages(&self, channel_id: &str, limit: usize) -> Result<Value, RfpError>;

    /// Fetches an entire thread by its root message timestamp.
    async fn slack_get_thread(&self, channel_id: &str, thread_ts: &str) -> Result<Value, RfpError>;

    /// Creates a Slack canvas, returning its id.
    async fn slack_create_canvas(&self, channel_id: &str, title: &str, markdown: &str) -> Result<String, RfpError>;

    /// Posts a summary message into a channel/thread.
    async fn slack_post_summary(&self, channel_id: &str, thread_ts: Option<&str>, text: &str) -> Result<Value, RfpError>;

    /// Asks a clarifying question, threaded under an existing message.
    async fn slack_ask_clarifying_question(&self, channel_id: &str, thread_ts: &str, question: &str) -> Result<Value, RfpError>;

    /// Sends a direct message to a user.
    async fn slack_send_dm(&self, user_id: &str, text: &str) -> Result<Value, RfpError>;

    /// Creates an RFP from a file a user dropped into a channel.
    async fn rfp_create_from_slack_file(&self, channel_id: &str, file_id: &str) -> Result<Value, RfpError>;
}

/// Fails every [`ChatAdapter`] call with [`ErrorCode::NotConfigured`]. The
/// default adapter until a deployment wires in a real Slack client.
pub struct UnconfiguredChatAdapter;

fn not_configured(op: &str) -> RfpError {
    RfpError::new(ErrorCode::NotConfigured, format!("chat adapter is not configured: {op}"))
}

#[async_trait]
impl ChatAdapter for UnconfiguredChatAdapter {
    async fn slack_list_recent_messages(&self, _channel_id: &str, _limit: usize) -> Result<Value, RfpError> {
        Err(not_configured("slack_list_recent_messages"))
    }

    async fn slack_get_thread(&self, _channel_id: &str, _thread_ts: &str) -> Result<Value, RfpError> {
        Err(not_configured("slack_get_thread"))
    }

    async fn slack_create_canvas(&self, _channel_id: &str, _title: &str, _markdown: &str) -> Result<String, RfpError> {
        Err(not_configured("slack_create_canvas"))
    }

    async fn slack_post_summary(&self, _channel_id: &str, _thread_ts: Option<&str>, _text: &str) -> Result<Value, RfpError> {
        Err(not_configured("slack_post_summary"))
    }

    async fn slack_ask_clarifying_question(&self, _channel_id: &str, _thread_ts: &str, _question: &str) -> Result<Value, RfpError> {
        Err(not_configured("slack_ask_clarifying_question"))
    }

    async fn slack_send_dm(&self, _user_id: &str, _text: &str) -> Result<Value, RfpError> {
        Err(not_configured("slack_send_dm"))
    }

    async fn rfp_create_from_slack_file(&self, _channel_id: &str, _file_id: &str) -> Result<Value, RfpError> {
        Err(not_configured("rfp_create_from_slack_file"))
    }
}

fn arg_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, RfpError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| RfpError::new(ErrorCode::Internal, format!("missing required argument '{field}'")))
}

pub struct SlackListRecentMessagesTool;

#[async_trait]
impl crate::registry::ToolHandler for SlackListRecentMessagesTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "slack_list_recent_messages",
            description: "List the most recent messages in a channel.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "channelId": {"type": "string"}, "limit": {"type": "integer", "minimum": 1, "maximum": 200} },
                "required": ["channelId"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        let limit = args.get("limit").and_then(Value::as_u64).map(|n| n as usize).unwrap_or(20).clamp(1, 200);
        ctx.chat.slack_list_recent_messages(arg_str(&args, "channelId")?, limit).await
    }
}

pub struct SlackGetThreadTool;

#[async_trait]
impl crate::registry::ToolHandler for SlackGetThreadTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "slack_get_thread",
            description: "Fetch an entire thread by its root message timestamp.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "channelId": {"type": "string"}, "threadTs": {"type": "string"} },
                "required": ["channelId", "threadTs"]
            }),
            write: false,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.chat.slack_get_thread(arg_str(&args, "channelId")?, arg_str(&args, "threadTs")?).await
    }
}

pub struct SlackCreateCanvasTool;

#[async_trait]
impl crate::registry::ToolHandler for SlackCreateCanvasTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "slack_create_canvas",
            description: "Create a Slack canvas, returning its id.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "channelId": {"type": "string"}, "title": {"type": "string"}, "markdown": {"type": "string"} },
                "required": ["channelId", "title", "markdown"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        let id = ctx.chat.slack_create_canvas(arg_str(&args, "channelId")?, arg_str(&args, "title")?, arg_str(&args, "markdown")?).await?;
        Ok(serde_json::json!({ "canvasId": id }))
    }
}

pub struct SlackPostSummaryTool;

#[async_trait]
impl crate::registry::ToolHandler for SlackPostSummaryTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "slack_post_summary",
            description: "Post a summary message into a channel/thread.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "channelId": {"type": "string"}, "threadTs": {"type": "string"}, "text": {"type": "string"} },
                "required": ["channelId", "text"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        let thread_ts = args.get("threadTs").and_then(Value::as_str);
        ctx.chat.slack_post_summary(arg_str(&args, "channelId")?, thread_ts, arg_str(&args, "text")?).await
    }
}

pub struct SlackAskClarifyingQuestionTool;

#[async_trait]
impl crate::registry::ToolHandler for SlackAskClarifyingQuestionTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "slack_ask_clarifying_question",
            description: "Ask a clarifying question, threaded under an existing message.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "channelId": {"type": "string"}, "threadTs": {"type": "string"}, "question": {"type": "string"} },
                "required": ["channelId", "threadTs", "question"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.chat.slack_ask_clarifying_question(arg_str(&args, "channelId")?, arg_str(&args, "threadTs")?, arg_str(&args, "question")?).await
    }
}

pub struct SlackSendDmTool;

#[async_trait]
impl crate::registry::ToolHandler for SlackSendDmTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "slack_send_dm",
            description: "Send a direct message to a user.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "userId": {"type": "string"}, "text": {"type": "string"} },
                "required": ["userId", "text"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.chat.slack_send_dm(arg_str(&args, "userId")?, arg_str(&args, "text")?).await
    }
}

pub struct RfpCreateFromSlackFileTool;

#[async_trait]
impl crate::registry::ToolHandler for RfpCreateFromSlackFileTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "rfp_create_from_slack_file",
            description: "Create an RFP from a file a user dropped into a channel.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "channelId": {"type": "string"}, "fileId": {"type": "string"} },
                "required": ["channelId", "fileId"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.chat.rfp_create_from_slack_file(arg_str(&args, "channelId")?, arg_str(&args, "fileId")?).await
    }
}
