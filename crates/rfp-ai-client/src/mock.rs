//! A scriptable [`ChatProvider`] for tests, grounded on the same
//! concrete-mock-over-a-trait shape the platform uses elsewhere.

use crate::provider::{ChatJsonResponse, ChatProvider, ChatRequest, ChatTextResponse, JsonMode};
use async_trait::async_trait;
use rfp_error::{ErrorCode, RfpError};
use std::sync::Mutex;

/// One scripted response: either a success or an error, keyed to the
/// order calls are made.
pub enum ScriptedCall {
    /// Return this text/JSON payload.
    Ok(String),
    /// Fail the call with this message (classified by the caller's retry
    /// layer).
    Err(String),
}

/// A [`ChatProvider`] that plays back a fixed script of responses,
/// recording every request it was asked to serve. Once the script is
/// exhausted, further calls return `"{}"`.
pub struct MockChatProvider {
    script: Mutex<Vec<ScriptedCall>>,
    calls: Mutex<Vec<ChatRequest>>,
}

impl MockChatProvider {
    /// Construct a provider that plays back `script` in order.
    pub fn new(script: Vec<ScriptedCall>) -> Self {
        Self { script: Mutex::new(script), calls: Mutex::new(Vec::new()) }
    }

    /// Requests this provider has served so far, in order.
    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self) -> Result<String, RfpError> {
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Ok("{}".to_string());
        }
        match script.remove(0) {
            ScriptedCall::Ok(text) => Ok(text),
            ScriptedCall::Err(message) => Err(RfpError::new(ErrorCode::UpstreamFailed, message)),
        }
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn complete_text(&self, request: &ChatRequest) -> Result<ChatTextResponse, RfpError> {
        self.calls.lock().unwrap().push(request.clone());
        let text = self.next()?;
        Ok(ChatTextResponse { text, input_tokens: Some(10), output_tokens: Some(10) })
    }

    async fn complete_json(&self, request: &ChatRequest, _schema: &serde_json::Value, mode: JsonMode) -> Result<ChatJsonResponse, RfpError> {
        self.calls.lock().unwrap().push(request.clone());
        let raw_text = self.next()?;
        Ok(ChatJsonResponse { raw_text, mode, input_tokens: Some(10), output_tokens: Some(10) })
    }
}
