//! The model-invocation seam: a `ChatProvider` does the actual call to a
//! model API; [`crate::client::AiClient`] layers retries, model chain,
//! circuit breaker, and budget accounting on top (`spec.md` §4.5).

use async_trait::async_trait;
use rfp_budget::Message;
use rfp_error::RfpError;

/// Reasoning effort tier, escalated low→medium→high on parse/validation
/// retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningEffort {
    /// Cheapest, fastest tier.
    Low,
    /// Default tier for most calls.
    Medium,
    /// Most thorough tier, used after repeated failures.
    High,
}

impl ReasoningEffort {
    /// One step up the tier ladder, saturating at [`Self::High`].
    pub fn escalate(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }
}

/// A single call to a chat model: the model id, messages, and tuning.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier to call.
    pub model: String,
    /// Conversation messages, in order.
    pub messages: Vec<Message>,
    /// Reasoning effort for this attempt.
    pub effort: ReasoningEffort,
    /// Per-message content clip limit.
    pub max_message_chars: usize,
}

impl ChatRequest {
    /// Construct a request, clipping each message's content to
    /// `max_message_chars`.
    pub fn new(model: impl Into<String>, messages: Vec<Message>, effort: ReasoningEffort, max_message_chars: usize) -> Self {
        let messages = messages
            .into_iter()
            .map(|m| Message { role: m.role, content: clip(&m.content, max_message_chars) })
            .collect();
        Self { model: model.into(), messages, effort, max_message_chars }
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// Result of a successful text completion.
#[derive(Debug, Clone)]
pub struct ChatTextResponse {
    /// The model's text output.
    pub text: String,
    /// Input tokens billed, if reported by the provider.
    pub input_tokens: Option<u64>,
    /// Output tokens billed, if reported by the provider.
    pub output_tokens: Option<u64>,
}

/// Which structured-output mode produced a [`ChatJsonResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonMode {
    /// Strict JSON-schema mode: all properties required, no additional
    /// properties.
    Schema,
    /// Provider's generic JSON-object mode (schema not enforced server-side).
    JsonObject,
    /// Freeform text with the first `{...}` span extracted.
    Freeform,
}

/// Result of a successful structured completion.
#[derive(Debug, Clone)]
pub struct ChatJsonResponse {
    /// Raw text the provider returned (pre-parse).
    pub raw_text: String,
    /// Which mode produced this response.
    pub mode: JsonMode,
    /// Input tokens billed, if reported by the provider.
    pub input_tokens: Option<u64>,
    /// Output tokens billed, if reported by the provider.
    pub output_tokens: Option<u64>,
}

/// The model-calling seam. A production implementation calls a live API;
/// [`crate::mock::MockChatProvider`] backs tests without one.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Calls the model for freeform text.
    async fn complete_text(&self, request: &ChatRequest) -> Result<ChatTextResponse, RfpError>;

    /// Calls the model in structured-output mode. `schema` is the JSON
    /// Schema the provider should enforce (strict mode) or guide with
    /// (object/freeform mode); `mode` selects which.
    async fn complete_json(&self, request: &ChatRequest, schema: &serde_json::Value, mode: JsonMode) -> Result<ChatJsonResponse, RfpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clips_message_content_on_construction() {
        let request = ChatRequest::new("gpt-4o", vec![Message { role: "user".to_string(), content: "abcdef".to_string() }], ReasoningEffort::Medium, 3);
        assert_eq!(request.messages[0].content, "abc");
    }

    #[test]
    fn effort_escalates_up_to_high() {
        assert_eq!(ReasoningEffort::Low.escalate(), ReasoningEffort::Medium);
        assert_eq!(ReasoningEffort::Medium.escalate(), ReasoningEffort::High);
        assert_eq!(ReasoningEffort::High.escalate(), ReasoningEffort::High);
    }
}
