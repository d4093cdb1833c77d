//! Remote browser-automation worker: the agent drives a real browser for
//! contracting portals that have no API (`spec.md` §4.4, §6
//! "Browser automation").

use async_trait::async_trait;
use rfp_error::{ErrorCode, RfpError};
use serde_json::Value;

/// A remote, session-scoped browser. Every navigation is gated by the
/// caller against the domain allowlist before reaching this trait — see
/// [`crate::policy_gate`].
#[async_trait]
pub trait BrowserWorker: Send + Sync {
    /// Opens a new isolated browsing context, returning its id.
    async fn new_context(&self) -> Result<String, RfpError>;

    /// Opens a new page within a context, returning its id.
    async fn new_page(&self, context_id: &str) -> Result<String, RfpError>;

    /// Navigates a page to a URL.
    async fn goto(&self, page_id: &str, url: &str) -> Result<Value, RfpError>;

    /// Clicks the first element matching a selector.
    async fn click(&self, page_id: &str, selector: &str) -> Result<(), RfpError>;

    /// Types text into the first element matching a selector.
    async fn type_text(&self, page_id: &str, selector: &str, text: &str) -> Result<(), RfpError>;

    /// Waits for a selector to appear, up to `timeout_ms`.
    async fn wait_for(&self, page_id: &str, selector: &str, timeout_ms: u64) -> Result<(), RfpError>;

    /// Extracts text/attributes from elements matching a selector.
    async fn extract(&self, page_id: &str, selector: &str) -> Result<Value, RfpError>;

    /// Captures a screenshot, returning an object-store key it was saved
    /// under.
    async fn screenshot(&self, page_id: &str) -> Result<String, RfpError>;

    /// Starts recording a trace for a context.
    async fn trace_start(&self, context_id: &str) -> Result<(), RfpError>;

    /// Stops recording and returns the object-store key the trace was
    /// saved under.
    async fn trace_stop(&self, context_id: &str) -> Result<String, RfpError>;

    /// Closes a context and every page within it.
    async fn close(&self, context_id: &str) -> Result<(), RfpError>;
}

/// Fails every [`BrowserWorker`] call with [`ErrorCode::NotConfigured`].
/// The default adapter until a deployment wires in a real browser pool.
pub struct UnconfiguredBrowserWorker;

fn not_configured(op: &str) -> RfpError {
    RfpError::new(ErrorCode::NotConfigured, format!("browser worker is not configured: {op}"))
}

#[async_trait]
impl BrowserWorker for UnconfiguredBrowserWorker {
    async fn new_context(&self) -> Result<String, RfpError> {
        Err(not_configured("new_context"))
    }

    async fn new_page(&self, _context_id: &str) -> Result<String, RfpError> {
        Err(not_configured("new_page"))
    }

    async fn goto(&self, _page_id: &str, _url: &str) -> Result<Value, RfpError> {
        Err(not_configured("goto"))
    }

    async fn click(&self, _page_id: &str, _selector: &str) -> Result<(), RfpError> {
        Err(not_configured("click"))
    }

    async fn type_text(&self, _page_id: &str, _selector: &str, _text: &str) -> Result<(), RfpError> {
        Err(not_configured("type_text"))
    }

    async fn wait_for(&self, _page_id: &str, _selector: &str, _timeout_ms: u64) -> Result<(), RfpError> {
        Err(not_configured("wait_for"))
    }

    async fn extract(&self, _page_id: &str, _selector: &str) -> Result<Value, RfpError> {
        Err(not_configured("extract"))
    }

    async fn screenshot(&self, _page_id: &str) -> Result<String, RfpError> {
        Err(not_configured("screenshot"))
    }

    async fn trace_start(&self, _context_id: &str) -> Result<(), RfpError> {
        Err(not_configured("trace_start"))
    }

    async fn trace_stop(&self, _context_id: &str) -> Result<String, RfpError> {
        Err(not_configured("trace_stop"))
    }

    async fn close(&self, _context_id: &str) -> Result<(), RfpError> {
        Err(not_configured("close"))
    }
}

fn arg_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, RfpError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| RfpError::new(ErrorCode::Internal, format!("missing required argument '{field}'")))
}

pub struct BrowserNewContextTool;

#[async_trait]
impl crate::registry::ToolHandler for BrowserNewContextTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "browser_new_context",
            description: "Open a new isolated browsing context, returning its id.",
            parameters_schema: serde_json::json!({ "type": "object", "properties": {} }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, _args: Value) -> Result<Value, RfpError> {
        let id = ctx.browser.new_context().await?;
        Ok(serde_json::json!({ "contextId": id }))
    }
}

pub struct BrowserNewPageTool;

#[async_trait]
impl crate::registry::ToolHandler for BrowserNewPageTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "browser_new_page",
            description: "Open a new page within a context, returning its id.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "contextId": {"type": "string"} },
                "required": ["contextId"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        let id = ctx.browser.new_page(arg_str(&args, "contextId")?).await?;
        Ok(serde_json::json!({ "pageId": id }))
    }
}

pub struct BrowserGotoTool;

#[async_trait]
impl crate::registry::ToolHandler for BrowserGotoTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "browser_goto",
            description: "Navigate a page to a URL.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "pageId": {"type": "string"}, "url": {"type": "string"} },
                "required": ["pageId", "url"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.browser.goto(arg_str(&args, "pageId")?, arg_str(&args, "url")?).await
    }
}

pub struct BrowserClickTool;

#[async_trait]
impl crate::registry::ToolHandler for BrowserClickTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "browser_click",
            description: "Click the first element matching a selector.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "pageId": {"type": "string"}, "selector": {"type": "string"} },
                "required": ["pageId", "selector"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.browser.click(arg_str(&args, "pageId")?, arg_str(&args, "selector")?).await?;
        Ok(serde_json::json!({}))
    }
}

pub struct BrowserTypeTextTool;

#[async_trait]
impl crate::registry::ToolHandler for BrowserTypeTextTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "browser_type_text",
            description: "Type text into the first element matching a selector.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "pageId": {"type": "string"}, "selector": {"type": "string"}, "text": {"type": "string"} },
                "required": ["pageId", "selector", "text"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.browser.type_text(arg_str(&args, "pageId")?, arg_str(&args, "selector")?, arg_str(&args, "text")?).await?;
        Ok(serde_json::json!({}))
    }
}

pub struct BrowserWaitForTool;

#[async_trait]
impl crate::registry::ToolHandler for BrowserWaitForTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "browser_wait_for",
            description: "Wait for a selector to appear, up to a timeout.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "pageId": {"type": "string"},
                    "selector": {"type": "string"},
                    "timeoutMs": {"type": "integer", "minimum": 1}
                },
                "required": ["pageId", "selector"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        let timeout_ms = args.get("timeoutMs").and_then(Value::as_u64).unwrap_or(5000);
        ctx.browser.wait_for(arg_str(&args, "pageId")?, arg_str(&args, "selector")?, timeout_ms).await?;
        Ok(serde_json::json!({}))
    }
}

pub struct BrowserExtractTool;

#[async_trait]
impl crate::registry::ToolHandler for BrowserExtractTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "browser_extract",
            description: "Extract text/attributes from elements matching a selector.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "pageId": {"type": "string"}, "selector": {"type": "string"} },
                "required": ["pageId", "selector"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.browser.extract(arg_str(&args, "pageId")?, arg_str(&args, "selector")?).await
    }
}

pub struct BrowserScreenshotTool;

#[async_trait]
impl crate::registry::ToolHandler for BrowserScreenshotTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "browser_screenshot",
            description: "Capture a screenshot, returning the object-store key it was saved under.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "pageId": {"type": "string"} },
                "required": ["pageId"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        let key = ctx.browser.screenshot(arg_str(&args, "pageId")?).await?;
        Ok(serde_json::json!({ "key": key }))
    }
}

pub struct BrowserTraceStartTool;

#[async_trait]
impl crate::registry::ToolHandler for BrowserTraceStartTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "browser_trace_start",
            description: "Start recording a trace for a context.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "contextId": {"type": "string"} },
                "required": ["contextId"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.browser.trace_start(arg_str(&args, "contextId")?).await?;
        Ok(serde_json::json!({}))
    }
}

pub struct BrowserTraceStopTool;

#[async_trait]
impl crate::registry::ToolHandler for BrowserTraceStopTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "browser_trace_stop",
            description: "Stop recording and return the object-store key the trace was saved under.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "contextId": {"type": "string"} },
                "required": ["contextId"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        let key = ctx.browser.trace_stop(arg_str(&args, "contextId")?).await?;
        Ok(serde_json::json!({ "key": key }))
    }
}

pub struct BrowserCloseTool;

#[async_trait]
impl crate::registry::ToolHandler for BrowserCloseTool {
    fn def(&self) -> crate::registry::ToolDef {
        crate::registry::ToolDef {
            name: "browser_close",
            description: "Close a context and every page within it.",
            parameters_schema: serde_json::json!({
                "type": "object",
                "properties": { "contextId": {"type": "string"} },
                "required": ["contextId"]
            }),
            write: true,
        }
    }

    async fn call(&self, ctx: &crate::context::ToolContext, args: Value) -> Result<Value, RfpError> {
        ctx.browser.close(arg_str(&args, "contextId")?).await?;
        Ok(serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_worker_fails_closed() {
        let worker = UnconfiguredBrowserWorker;
        let err = worker.new_context().await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotConfigured);
        let err = worker.goto("page-1", "https://example.com").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotConfigured);
    }

    #[tokio::test]
    async fn browser_goto_tool_fails_closed_without_a_configured_worker() {
        use crate::registry::ToolHandler;
        use rfp_policy::{AllowlistConfig, PolicyEngine};

        let ctx = crate::context::ToolContext::new(
            rfp_store::InMemoryKeyValueStore::shared(),
            std::sync::Arc::new(rfp_store::InMemoryObjectStore::new().unwrap()),
            PolicyEngine::new(&AllowlistConfig::default()).unwrap(),
        );
        let err = BrowserGotoTool.call(&ctx, serde_json::json!({"pageId": "p1", "url": "https://example.com"})).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotConfigured);
    }
}
