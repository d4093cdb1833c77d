//! The agent runtime: the tool-using conversational loop tying scope
//! detection, metaprompt analysis, context assembly, protocol
//! enforcement, and learning together (`spec.md` §4.7).
//!
//! Two loop flavors share this one implementation, distinguished only by
//! which [`rfp_tools::ToolRegistry`] is passed in: an RFP is bound ->
//! [`rfp_tools::operator_tools`] with protocol enforcement; no RFP bound
//! (and the message doesn't need one) -> [`rfp_tools::read_tools`] with
//! protocol enforcement skipped entirely, since there is nothing to write
//! before talking about. This mirrors the original operator agent's split
//! between its RFP-scoped path and a general-purpose assistant path that
//! reuses the same tool-call plumbing.

use crate::context::{render_within_budget, ContextBuilder};
use crate::learning::{detect_and_record_collaboration, extract_temporal_event, record_episodic, record_procedural_outcome};
use crate::metaprompt::{analyze, step_budget};
use crate::protocol::ProtocolState;
use crate::scope::{extract_rfp_id, IntentClassifier, KeywordIntentClassifier};
use crate::shortcuts::{handle_shortcut, parse_shortcut};
use chrono::{DateTime, Utc};
use rfp_ai_client::{AiClient, ReasoningEffort};
use rfp_budget::{Message, TokenBudgetTracker};
use rfp_core::EventLogEntry;
use rfp_error::RfpError;
use rfp_identity::IdentityResolver;
use rfp_jobs::JobQueueRepo;
use rfp_memory::MemoryRepo;
use rfp_opportunity::{CatalogueRepo, OpportunityRepo};
use rfp_policy::PolicyEngine;
use rfp_resilience::retry_with_classification;
use rfp_tools::{ToolContext, ToolRegistry};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// An incoming chat message the runtime must respond to.
pub struct IncomingMessage {
    /// Chat channel id.
    pub channel_id: String,
    /// Chat thread timestamp.
    pub thread_ts: String,
    /// Sender's Slack user id, if known.
    pub slack_user_id: Option<String>,
    /// Sender's Slack team id, if known.
    pub slack_team_id: Option<String>,
    /// Who bound/wrote on behalf of this turn, for audit fields.
    pub acting_as: String,
    /// The message text.
    pub text: String,
    /// Distinct non-bot Slack ids that have posted in this thread so far,
    /// including the sender, for collaboration detection.
    pub thread_participant_ids: Vec<String>,
}

/// What came out of handling one turn.
#[derive(Debug, Default)]
pub struct TurnOutcome {
    /// The RFP this turn ended up scoped to, if any.
    pub rfp_id: Option<String>,
    /// Text the runtime already posted (or, if posting failed, intended to
    /// post) back to the chat surface.
    pub reply_text: Option<String>,
    /// Tool names invoked, in order, for observability and procedural
    /// memory.
    pub tool_sequence: Vec<String>,
}

/// Ties every agent-runtime subsystem together: AI client, both tool
/// registries, the protocol-relevant repositories, and the intent
/// classifier.
pub struct AgentRuntime {
    ai_client: Arc<AiClient>,
    read_registry: Arc<ToolRegistry>,
    operator_registry: Arc<ToolRegistry>,
    policy: PolicyEngine,
    opportunity: OpportunityRepo,
    catalogue: CatalogueRepo,
    memory: MemoryRepo,
    jobs: JobQueueRepo,
    identity: IdentityResolver,
    intent_classifier: Arc<dyn IntentClassifier>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextAction {
    tool: Option<String>,
    #[serde(default)]
    args: Value,
    #[serde(default)]
    final_text: Option<String>,
}

fn next_action_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "tool": {"type": ["string", "null"]},
            "args": {"type": "object"},
            "finalText": {"type": ["string", "null"]}
        }
    })
}

impl AgentRuntime {
    /// Construct a runtime over its dependencies. `intent_classifier`
    /// defaults to [`KeywordIntentClassifier`] when `None`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ai_client: Arc<AiClient>,
        read_registry: Arc<ToolRegistry>,
        operator_registry: Arc<ToolRegistry>,
        policy: PolicyEngine,
        opportunity: OpportunityRepo,
        catalogue: CatalogueRepo,
        memory: MemoryRepo,
        jobs: JobQueueRepo,
        identity: IdentityResolver,
        intent_classifier: Option<Arc<dyn IntentClassifier>>,
    ) -> Self {
        Self {
            ai_client,
            read_registry,
            operator_registry,
            policy,
            opportunity,
            catalogue,
            memory,
            jobs,
            identity,
            intent_classifier: intent_classifier.unwrap_or_else(|| Arc::new(KeywordIntentClassifier)),
        }
    }

    /// Handles one incoming message end to end: shortcuts, scope
    /// detection, metaprompt analysis, the tool loop, and learning hooks.
    pub async fn handle_message(&self, ctx: &ToolContext, msg: IncomingMessage, now: DateTime<Utc>) -> Result<TurnOutcome, RfpError> {
        if let Some(shortcut) = parse_shortcut(&msg.text) {
            let reply = handle_shortcut(&self.opportunity, &shortcut, &msg.channel_id, &msg.thread_ts, &msg.acting_as, now).await?;
            return Ok(TurnOutcome { rfp_id: None, reply_text: Some(reply), tool_sequence: Vec::new() });
        }

        let bound_rfp_id = self.opportunity.get_binding(&msg.channel_id, &msg.thread_ts).await?.map(|b| b.rfp_id).filter(|id| !id.is_empty());
        let mut rfp_id = bound_rfp_id.or_else(|| extract_rfp_id(&msg.text));

        if rfp_id.is_none() {
            let requires = self.intent_classifier.classify_requires_rfp(&msg.text).await;
            if requires.value == Some(true) {
                let reply = "Which RFP is this about? Say `link rfp_<id>` to bind this thread, or include the id in your message.".to_string();
                return Ok(TurnOutcome { rfp_id: None, reply_text: Some(reply), tool_sequence: Vec::new() });
            }
        }

        let registry = match &rfp_id {
            Some(_) => self.operator_registry.clone(),
            None => self.read_registry.clone(),
        };
        let enforce_protocol = rfp_id.is_some();

        let mut tracker = TokenBudgetTracker::new(crate::DEFAULT_TURN_BUDGET_TOKENS, "gpt-4o");
        let analysis = analyze(&self.ai_client, &msg.text, &registry.defs(), &mut tracker).await?;
        let budget = step_budget(analysis.complexity, analysis.likely_steps);

        let builder = ContextBuilder::new(&self.identity, &self.opportunity, &self.catalogue, &self.memory, &self.jobs);
        let (_turn, blocks) = builder.build(msg.slack_user_id.as_deref(), msg.slack_team_id.as_deref(), &msg.text, rfp_id.as_deref(), None, now).await?;
        let context_text = render_within_budget(blocks, &tracker);

        let mut protocol = ProtocolState::new();
        let mut tool_sequence = Vec::new();
        let mut transcript = vec![
            Message { role: "system".to_string(), content: format!("Context:\n{context_text}\n\nIntent: {} ({:?})", analysis.intent, analysis.complexity) },
            Message { role: "user".to_string(), content: msg.text.clone() },
        ];

        let mut final_text = None;
        for _ in 0..budget {
            let schema = next_action_schema();
            let next: NextAction = self
                .ai_client
                .call_json(
                    "agent_next_action",
                    &schema,
                    transcript.clone(),
                    ReasoningEffort::Medium,
                    8000,
                    |_: &NextAction| None,
                    Some(|| NextAction { tool: None, args: Value::Null, final_text: Some(String::new()) }),
                    Some(&mut tracker),
                )
                .await?;

            let Some(tool) = next.tool else {
                final_text = next.final_text;
                break;
            };

            if enforce_protocol {
                if let Some(rfp_id) = &rfp_id {
                    if let Err(protocol_err) = protocol.enforce(&tool, rfp_id, now) {
                        let rejection = serde_json::to_value(protocol_err.to_tool_error()).unwrap_or(Value::Null);
                        transcript.push(Message { role: "assistant".to_string(), content: format!("tool call '{tool}' rejected: {rejection}") });
                        continue;
                    }
                }
            }

            let result = execute_tool(&registry, ctx, &self.policy, &tool, &next.args).await;
            tool_sequence.push(tool.clone());

            if result["ok"] == Value::Bool(true) {
                if WRITE_TOOL_NAMES.contains(&tool.as_str()) {
                    if let Some(rfp_id) = &rfp_id {
                        protocol.record_write(rfp_id);
                    }
                } else if tool == "opportunity_load" {
                    if let Some(rfp_id) = &rfp_id {
                        protocol.record_load(rfp_id, now);
                    }
                }
            }

            if let Some(rfp_id) = &rfp_id {
                record_tool_event(&self.opportunity, rfp_id, &tool, &next.args, &result, now).await;
            }

            transcript.push(Message { role: "assistant".to_string(), content: format!("called {tool}, result: {result}") });
        }

        let reply_text = match final_text {
            Some(text) if !text.is_empty() => Some(text),
            _ => None,
        };

        if let Some(text) = &reply_text {
            let args = json!({ "channelId": msg.channel_id, "threadTs": msg.thread_ts, "text": text });
            if enforce_protocol {
                if let Some(rfp_id) = &rfp_id {
                    match protocol.enforce("slack_post_summary", rfp_id, now) {
                        Ok(()) => {
                            let result = execute_tool(&registry, ctx, &self.policy, "slack_post_summary", &args).await;
                            record_tool_event(&self.opportunity, rfp_id, "slack_post_summary", &args, &result, now).await;
                            if result["ok"] != Value::Bool(true) {
                                warn!(target: "rfp.agent", rfp_id, "failed to post reply to chat: {result}");
                            }
                        }
                        Err(protocol_err) => {
                            warn!(target: "rfp.agent", rfp_id, "reply withheld: {protocol_err}");
                        }
                    }
                }
            } else if let Err(err) = ctx.chat.slack_post_summary(&msg.channel_id, Some(&msg.thread_ts), text).await {
                warn!(target: "rfp.agent", "failed to post reply to chat: {err}");
            }
        }

        self.learn(&msg, rfp_id.as_deref(), reply_text.as_deref().unwrap_or(""), &tool_sequence, now).await?;

        Ok(TurnOutcome { rfp_id: rfp_id.take(), reply_text, tool_sequence })
    }

    async fn learn(&self, msg: &IncomingMessage, rfp_id: Option<&str>, reply_text: &str, tool_sequence: &[String], now: DateTime<Utc>) -> Result<(), RfpError> {
        let scope_id = match rfp_id {
            Some(id) => rfp_core::keys::rfp_scope(id),
            None => rfp_core::keys::GLOBAL_SCOPE.to_string(),
        };

        record_episodic(&self.memory, &scope_id, &msg.text, reply_text, now).await?;
        detect_and_record_collaboration(&self.memory, &scope_id, &msg.thread_participant_ids, &msg.text, reply_text, now).await?;
        extract_temporal_event(&self.memory, &scope_id, &msg.text, now).await?;

        if !tool_sequence.is_empty() {
            let success = reply_text.is_empty().then(|| "no final reply".to_string()).is_none();
            record_procedural_outcome(&self.memory, &scope_id, tool_sequence, success, "turn completed", now).await?;
        }
        Ok(())
    }
}

const WRITE_TOOL_NAMES: &[&str] = &["opportunity_patch", "journal_append", "event_append", "schedule_job", "propose_action", "memory_create", "relationship_add", "s3_presign_put"];

/// Appends a durable, hash-chained `tool_call` event for one dispatched
/// call, so every tool call an RFP-scoped turn makes shows up in its event
/// log regardless of whether the model also named `event_append` itself.
/// Best-effort: a failure to append is logged, not propagated, since it
/// must never block or unwind the tool loop.
async fn record_tool_event(opportunity: &OpportunityRepo, rfp_id: &str, tool: &str, args: &Value, result: &Value, now: DateTime<Utc>) {
    let mut entry = EventLogEntry::new(rfp_id, "tool_call", now);
    entry.tool = Some(tool.to_string());
    entry.inputs_redacted.args_keys = args.as_object().map(|o| o.keys().cloned().collect()).unwrap_or_default();
    entry.outputs_redacted.result_preview = rfp_tools::slim::slim_output(result).to_string();
    if result["ok"] != Value::Bool(true) {
        entry.confidence_flags.push("tool_call_failed".to_string());
    }

    if let Err(err) = opportunity.append_event(entry).await {
        warn!(target: "rfp.agent", rfp_id, tool, "failed to append tool_call event: {err}");
    }
}

/// Dispatches one tool call through the registry, retrying a retryable
/// failure's *message* through [`rfp_resilience::classify`]'s keyword
/// classifier (2 retries, 0.5-5s backoff) rather than the registry's own
/// structured `retryable` flag — this loop's calls are few and
/// conversational, so tolerating an occasional misclassification in
/// exchange for reusing the shared classifier (rather than hand-rolling
/// another retry loop) is the right trade here.
async fn execute_tool(registry: &ToolRegistry, ctx: &ToolContext, policy: &PolicyEngine, tool: &str, args: &Value) -> Value {
    struct DispatchFailure(Value);
    impl std::fmt::Display for DispatchFailure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0.get("error").and_then(Value::as_str).unwrap_or("tool call failed"))
        }
    }

    let result = retry_with_classification(
        || async {
            let dispatched = registry.dispatch(ctx, policy, tool, args.clone()).await;
            if dispatched["ok"] == Value::Bool(true) {
                Ok(dispatched)
            } else {
                Err(DispatchFailure(dispatched))
            }
        },
        2,
        Duration::from_millis(500),
        Duration::from_secs(5),
        None,
        None,
    )
    .await;

    match result {
        Ok(value) => value,
        Err(retry_err) => json!({
            "ok": false,
            "error": retry_err.message,
            "retryable": retry_err.classification.retryable,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_ai_client::mock::{MockChatProvider, ScriptedCall};
    use rfp_config::ResilienceConfig;
    use rfp_identity::InMemoryDirectory;
    use rfp_policy::AllowlistConfig;
    use rfp_store::{InMemoryKeyValueStore, InMemoryObjectStore};
    use rfp_tools::{read_tools, operator_tools};

    fn harness(script: Vec<ScriptedCall>) -> (AgentRuntime, ToolContext) {
        let store = InMemoryKeyValueStore::shared();
        let objects = InMemoryObjectStore::shared().unwrap();
        let policy = PolicyEngine::new(&AllowlistConfig::default()).unwrap();
        let ctx = ToolContext::new(store.clone(), objects, policy.clone());
        let ai_client = Arc::new(AiClient::new(Arc::new(MockChatProvider::new(script)), &ResilienceConfig::default(), Vec::new(), "gpt-4o"));
        let runtime = AgentRuntime::new(
            ai_client,
            Arc::new(read_tools()),
            Arc::new(operator_tools()),
            policy,
            OpportunityRepo::new(store.clone()),
            CatalogueRepo::new(store.clone()),
            MemoryRepo::new(store.clone()),
            JobQueueRepo::new(store.clone()),
            IdentityResolver::new(Arc::new(InMemoryDirectory::default())),
            None,
        );
        (runtime, ctx)
    }

    #[tokio::test]
    async fn a_link_shortcut_binds_the_thread_without_any_model_call() {
        let (runtime, ctx) = harness(vec![]);
        let msg = IncomingMessage {
            channel_id: "C1".to_string(),
            thread_ts: "T1".to_string(),
            slack_user_id: Some("U1".to_string()),
            slack_team_id: Some("W1".to_string()),
            acting_as: "U1".to_string(),
            text: "link rfp_01h9zz8abcdefg".to_string(),
            thread_participant_ids: vec!["U1".to_string()],
        };
        let now = rfp_core::now();
        let outcome = runtime.handle_message(&ctx, msg, now).await.unwrap();
        assert!(outcome.reply_text.unwrap().contains("rfp_01h9zz8abcdefg"));
        assert!(outcome.tool_sequence.is_empty());
    }

    #[tokio::test]
    async fn a_general_question_uses_the_read_only_registry_and_replies() {
        let (runtime, ctx) = harness(vec![ScriptedCall::Ok(r#"{"tool": null, "args": {}, "finalText": "Sure, happy to help."}"#.to_string())]);
        let msg = IncomingMessage {
            channel_id: "C1".to_string(),
            thread_ts: "T2".to_string(),
            slack_user_id: Some("U1".to_string()),
            slack_team_id: Some("W1".to_string()),
            acting_as: "U1".to_string(),
            text: "how do i use this bot?".to_string(),
            thread_participant_ids: vec!["U1".to_string()],
        };
        let now = rfp_core::now();
        let outcome = runtime.handle_message(&ctx, msg, now).await.unwrap();
        assert_eq!(outcome.rfp_id, None);
        assert_eq!(outcome.reply_text.as_deref(), Some("Sure, happy to help."));
    }
}
