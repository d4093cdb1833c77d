//! [`AiClient`] ties the model-calling seam ([`ChatProvider`]) together
//! with the model chain, circuit breaker, retry backoff, and budget
//! accounting described in `spec.md` §4.5.

use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::model_chain::ModelChain;
use crate::provider::{ChatProvider, ChatRequest, ChatTextResponse, JsonMode, ReasoningEffort};
use chrono::Utc;
use rfp_budget::{Message, TokenBudgetTracker};
use rfp_config::{ModelChainConfig, ResilienceConfig};
use rfp_error::{ErrorCode, RfpError};
use rfp_resilience::{classify_message, exponential_backoff_with_jitter, ErrorCategory as RetryCategory};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

const TEXT_BASE_DELAY_SECS: f64 = 0.3;
const JSON_BASE_DELAY_SECS: f64 = 0.4;
const BACKOFF_MULTIPLIER: f64 = 2.0;
const BACKOFF_JITTER: f64 = 0.25;
const PARSE_PREVIEW_CHARS: usize = 300;

/// High-level client a caller uses instead of talking to a [`ChatProvider`]
/// directly: resolves the per-purpose model chain, retries with
/// classification-aware backoff, trips/respects the circuit breaker, and
/// records token usage.
pub struct AiClient {
    provider: Arc<dyn ChatProvider>,
    breaker: CircuitBreaker,
    chains: Vec<ModelChainConfig>,
    global_default_model: String,
    max_retries_per_model: u32,
    max_delay: Duration,
}

impl AiClient {
    /// Construct a client over `provider`, configured per-purpose model
    /// chains, and the global default/fallback model.
    pub fn new(provider: Arc<dyn ChatProvider>, resilience: &ResilienceConfig, chains: Vec<ModelChainConfig>, global_default_model: impl Into<String>) -> Self {
        Self {
            provider,
            breaker: CircuitBreaker::new(resilience),
            chains,
            global_default_model: global_default_model.into(),
            max_retries_per_model: 2,
            max_delay: Duration::from_secs(30),
        }
    }

    fn check_circuit(&self) -> Result<(), RfpError> {
        if self.breaker.state(Utc::now()) == CircuitState::Open {
            return Err(RfpError::new(ErrorCode::UpstreamCircuitOpen, "ai_temporarily_unavailable").with_retryable(false));
        }
        Ok(())
    }

    /// Calls the model for freeform text, walking the per-purpose model
    /// chain and retrying transient failures with backoff.
    pub async fn call_text(&self, purpose: &str, messages: Vec<Message>, effort: ReasoningEffort, max_message_chars: usize, mut tracker: Option<&mut TokenBudgetTracker>) -> Result<ChatTextResponse, RfpError> {
        let chain = ModelChain::for_purpose(purpose, &self.chains, &self.global_default_model);
        let mut model = chain.primary().to_string();
        let mut last_err: Option<RfpError> = None;

        loop {
            let mut attempt = 0u32;
            let outcome = loop {
                self.check_circuit()?;
                let request = ChatRequest::new(model.clone(), messages.clone(), effort, max_message_chars);
                match self.provider.complete_text(&request).await {
                    Ok(response) => {
                        self.breaker.record_success(Utc::now());
                        if let Some(t) = tracker.as_deref_mut() {
                            t.record_llm_call(None, Some(&response.text), response.input_tokens, response.output_tokens);
                        }
                        break Ok(response);
                    }
                    Err(err) => {
                        self.breaker.record_failure(Utc::now());
                        let classification = classify_message(&err.message);
                        if is_model_access_error(&classification, &err) {
                            break Err(err);
                        }
                        if !classification.retryable || attempt >= self.max_retries_per_model {
                            break Err(err);
                        }
                        attempt += 1;
                        let delay = exponential_backoff_with_jitter(attempt, Duration::from_secs_f64(TEXT_BASE_DELAY_SECS), self.max_delay, BACKOFF_MULTIPLIER, BACKOFF_JITTER);
                        tracing::debug!(target: "rfp.ai_client", model = %model, attempt, "retrying text call");
                        tokio::time::sleep(delay).await;
                    }
                }
            };

            match outcome {
                Ok(response) => return Ok(response),
                Err(err) => {
                    last_err = Some(err);
                    match chain.next_after(&model) {
                        Some(next) => model = next.to_string(),
                        None => break,
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| RfpError::new(ErrorCode::UpstreamFailed, "ai call failed with no models remaining")))
    }

    /// Calls the model for structured output, trying JSON-schema mode,
    /// then JSON-object mode, then freeform-with-extraction, escalating
    /// reasoning effort and appending retry feedback between attempts.
    /// Falls back to `fallback` (if given) when every model/mode is
    /// exhausted.
    #[allow(clippy::too_many_arguments)]
    pub async fn call_json<T, V, FB>(
        &self,
        purpose: &str,
        schema: &serde_json::Value,
        mut messages: Vec<Message>,
        mut effort: ReasoningEffort,
        max_message_chars: usize,
        validate_parsed: V,
        fallback: Option<FB>,
        mut tracker: Option<&mut TokenBudgetTracker>,
    ) -> Result<T, RfpError>
    where
        T: DeserializeOwned,
        V: Fn(&T) -> Option<String>,
        FB: FnOnce() -> T,
    {
        let chain = ModelChain::for_purpose(purpose, &self.chains, &self.global_default_model);
        let mut model = chain.primary().to_string();
        let modes = [JsonMode::Schema, JsonMode::JsonObject, JsonMode::Freeform];
        let mut last_err: Option<RfpError> = None;
        let mut global_attempt = 0u32;

        'chain: loop {
            for mode in modes {
                self.check_circuit()?;
                if global_attempt > 0 {
                    let delay = exponential_backoff_with_jitter(global_attempt, Duration::from_secs_f64(JSON_BASE_DELAY_SECS), self.max_delay, BACKOFF_MULTIPLIER, BACKOFF_JITTER);
                    tokio::time::sleep(delay).await;
                }
                global_attempt += 1;

                let request = ChatRequest::new(model.clone(), messages.clone(), effort, max_message_chars);
                match self.provider.complete_json(&request, schema, mode).await {
                    Ok(response) => match parse_and_validate(&response.raw_text, mode, schema, &validate_parsed) {
                        Ok(value) => {
                            self.breaker.record_success(Utc::now());
                            if let Some(t) = tracker.as_deref_mut() {
                                t.record_llm_call(None, Some(&response.raw_text), response.input_tokens, response.output_tokens);
                            }
                            return Ok(value);
                        }
                        Err(parse_err) => {
                            self.breaker.record_failure(Utc::now());
                            messages.push(retry_feedback_message(&parse_err, &response.raw_text));
                            effort = effort.escalate();
                            last_err = Some(parse_err);
                        }
                    },
                    Err(err) => {
                        self.breaker.record_failure(Utc::now());
                        let classification = classify_message(&err.message);
                        let access_error = is_model_access_error(&classification, &err);
                        last_err = Some(err);
                        if access_error {
                            break;
                        }
                    }
                }
            }

            match chain.next_after(&model) {
                Some(next) => model = next.to_string(),
                None => break 'chain,
            }
        }

        if let Some(fb) = fallback {
            return Ok(fb());
        }
        Err(last_err.unwrap_or_else(|| RfpError::new(ErrorCode::UpstreamFailed, "ai call failed with no models remaining")))
    }
}

fn is_model_access_error(classification: &rfp_resilience::Classification, err: &RfpError) -> bool {
    if classification.category == RetryCategory::Auth {
        return true;
    }
    let lower = err.message.to_lowercase();
    lower.contains("model_not_found") || lower.contains("does not have access to model") || lower.contains("model not found")
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0i32;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_and_validate<T, V>(raw_text: &str, mode: JsonMode, schema: &serde_json::Value, validate_parsed: &V) -> Result<T, RfpError>
where
    T: DeserializeOwned,
    V: Fn(&T) -> Option<String>,
{
    let candidate = if mode == JsonMode::Freeform {
        extract_json_object(raw_text).unwrap_or(raw_text)
    } else {
        raw_text
    };

    let value: serde_json::Value = serde_json::from_str(candidate)
        .map_err(|e| RfpError::new(ErrorCode::ParseFailed, format!("model output is not valid json: {e}")).with_retryable(true))?;

    if mode == JsonMode::Schema {
        if let Ok(validator) = jsonschema::validator_for(schema) {
            if !validator.is_valid(&value) {
                return Err(RfpError::new(ErrorCode::SchemaViolation, "model output does not satisfy the schema").with_retryable(true));
            }
        }
    }

    let parsed: T = serde_json::from_value(value)
        .map_err(|e| RfpError::new(ErrorCode::SchemaViolation, format!("model output does not match the expected shape: {e}")).with_retryable(true))?;

    if let Some(reason) = validate_parsed(&parsed) {
        return Err(RfpError::new(ErrorCode::SchemaViolation, reason).with_retryable(true));
    }

    Ok(parsed)
}

fn retry_feedback_message(err: &RfpError, raw_output: &str) -> Message {
    let preview: String = raw_output.chars().take(PARSE_PREVIEW_CHARS).collect();
    Message {
        role: "user".to_string(),
        content: format!("Your previous response could not be used: {err}. It began with:\n\n{preview}\n\nRespond with only a single valid JSON object matching the requested shape, with no surrounding text."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockChatProvider, ScriptedCall};
    use serde::Deserialize;

    fn resilience_config() -> ResilienceConfig {
        ResilienceConfig { circuit_breaker_threshold: 5, circuit_breaker_window_secs: 60, circuit_breaker_open_secs: 15, ..ResilienceConfig::default() }
    }

    fn messages() -> Vec<Message> {
        vec![Message { role: "user".to_string(), content: "hello".to_string() }]
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Plan {
        goal: String,
    }

    #[tokio::test]
    async fn call_text_returns_provider_output_and_records_budget() {
        let provider = Arc::new(MockChatProvider::new(vec![ScriptedCall::Ok("hi there".to_string())]));
        let client = AiClient::new(provider, &resilience_config(), vec![], "gpt-4o");
        let mut tracker = TokenBudgetTracker::new(100_000, "gpt-4o");
        let response = client.call_text("general", messages(), ReasoningEffort::Medium, 2000, Some(&mut tracker)).await.unwrap();
        assert_eq!(response.text, "hi there");
        assert!(tracker.usage.total_tokens > 0);
    }

    #[tokio::test]
    async fn call_json_parses_schema_mode_response() {
        let provider = Arc::new(MockChatProvider::new(vec![ScriptedCall::Ok(r#"{"goal":"win the rfp"}"#.to_string())]));
        let client = AiClient::new(provider, &resilience_config(), vec![], "gpt-4o");
        let schema = serde_json::json!({"type": "object", "properties": {"goal": {"type": "string"}}, "required": ["goal"], "additionalProperties": false});
        let parsed = client
            .call_json::<Plan, _, fn() -> Plan>("planning", &schema, messages(), ReasoningEffort::Low, 2000, |_| None, None, None)
            .await
            .unwrap();
        assert_eq!(parsed.goal, "win the rfp");
    }

    #[tokio::test]
    async fn call_json_falls_back_to_freeform_extraction() {
        let provider = Arc::new(MockChatProvider::new(vec![
            ScriptedCall::Err("schema rejected".to_string()),
            ScriptedCall::Err("object mode rejected".to_string()),
            ScriptedCall::Ok("Sure thing! {\"goal\":\"renew the contract\"} hope that helps".to_string()),
        ]));
        let client = AiClient::new(provider, &resilience_config(), vec![], "gpt-4o");
        let schema = serde_json::json!({"type": "object"});
        let parsed = client
            .call_json::<Plan, _, fn() -> Plan>("planning", &schema, messages(), ReasoningEffort::Low, 2000, |_| None, None, None)
            .await
            .unwrap();
        assert_eq!(parsed.goal, "renew the contract");
    }

    #[tokio::test]
    async fn call_json_uses_fallback_when_every_mode_fails() {
        let script = std::iter::repeat_with(|| ScriptedCall::Err("upstream down".to_string())).take(9).collect();
        let provider = Arc::new(MockChatProvider::new(script));
        let client = AiClient::new(provider, &resilience_config(), vec![], "gpt-4o");
        let schema = serde_json::json!({"type": "object"});
        let parsed = client
            .call_json("planning", &schema, messages(), ReasoningEffort::Low, 2000, |_: &Plan| None, Some(|| Plan { goal: "default".to_string() }), None)
            .await
            .unwrap();
        assert_eq!(parsed.goal, "default");
    }

    #[tokio::test]
    async fn validate_parsed_predicate_rejects_otherwise_valid_json() {
        let provider = Arc::new(MockChatProvider::new(vec![ScriptedCall::Ok(r#"{"goal":""}"#.to_string())]));
        let client = AiClient::new(provider, &resilience_config(), vec![], "gpt-4o");
        let schema = serde_json::json!({"type": "object"});
        let result = client
            .call_json("planning", &schema, messages(), ReasoningEffort::Low, 2000, |p: &Plan| if p.goal.is_empty() { Some("goal must not be empty".to_string()) } else { None }, Some(|| Plan { goal: "default".to_string() }), None)
            .await
            .unwrap();
        assert_eq!(result.goal, "default");
    }
}
