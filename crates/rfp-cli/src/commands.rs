// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared command implementations for the RFP operator CLI.
//!
//! These functions are library-level so they can be tested without
//! spawning the binary.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rfp_agent::{AgentRuntime, IncomingMessage, TurnOutcome};
use rfp_ai_client::mock::{MockChatProvider, ScriptedCall};
use rfp_ai_client::AiClient;
use rfp_config::PlatformConfig;
use rfp_core::{AgentJob, EventLogEntry, JournalEntry, OpportunityState};
use rfp_identity::{IdentityResolver, InMemoryDirectory};
use rfp_jobs::JobQueueRepo;
use rfp_memory::MemoryRepo;
use rfp_opportunity::{CatalogueRepo, OpportunityRepo};
use rfp_policy::{sanitize_opportunity_patch, AllowlistConfig, PolicyEngine, RawOpportunityPatch};
use rfp_receipt::diff::{diff_opportunity_state, FieldChange};
use rfp_store::{InMemoryKeyValueStore, InMemoryObjectStore};
use rfp_tools::{operator_tools, read_tools, ToolContext};
use schemars::schema_for;
use std::path::Path;
use std::sync::Arc;

/// Schema types that can be printed by the `schema` subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// JSON schema for [`PlatformConfig`].
    PlatformConfig,
    /// JSON schema for [`AgentJob`].
    Job,
    /// JSON schema for [`OpportunityState`].
    OpportunityState,
}

/// Return the JSON schema string for the given kind.
pub fn schema_json(kind: SchemaKind) -> Result<String> {
    let value = match kind {
        SchemaKind::PlatformConfig => serde_json::to_value(schema_for!(PlatformConfig))?,
        SchemaKind::Job => serde_json::to_value(schema_for!(AgentJob))?,
        SchemaKind::OpportunityState => serde_json::to_value(schema_for!(OpportunityState))?,
    };
    serde_json::to_string_pretty(&value).context("serialize schema")
}

/// Load and validate a platform configuration file (or just the
/// environment overlay, if `path` is `None`).
///
/// Returns a list of human-readable diagnostic messages (errors and
/// warnings).
pub fn config_check(path: Option<&Path>) -> Result<Vec<String>> {
    let mut diagnostics = Vec::new();

    match crate::config::load_and_validate(path) {
        Ok((_config, warnings)) => {
            if warnings.is_empty() {
                diagnostics.push("config: ok".into());
            }
            for w in &warnings {
                diagnostics.push(format!("warning: {w}"));
            }
        }
        Err(e) => {
            diagnostics.push(format!("error: {e}"));
        }
    }

    Ok(diagnostics)
}

/// Read an [`AgentJob`] from a JSON file.
pub fn read_job_file(path: &Path) -> Result<AgentJob> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read job file '{}'", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parse job from '{}'", path.display()))
}

/// Read a list of [`JournalEntry`] rows from a JSON file, sorted newest
/// first by sort key.
pub fn read_journal_file(path: &Path) -> Result<Vec<JournalEntry>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read journal file '{}'", path.display()))?;
    let mut entries: Vec<JournalEntry> =
        serde_json::from_str(&content).with_context(|| format!("parse journal entries from '{}'", path.display()))?;
    entries.sort_by(|a, b| b.sort_key.cmp(&a.sort_key));
    Ok(entries)
}

/// Read a list of [`EventLogEntry`] rows from a JSON file, sorted newest
/// first by sort key.
pub fn read_events_file(path: &Path) -> Result<Vec<EventLogEntry>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read events file '{}'", path.display()))?;
    let mut events: Vec<EventLogEntry> =
        serde_json::from_str(&content).with_context(|| format!("parse event-log entries from '{}'", path.display()))?;
    events.sort_by(|a, b| b.sort_key.cmp(&a.sort_key));
    Ok(events)
}

/// The result of [`patch_dry_run`].
pub struct PatchDryRunResult {
    /// The state that would result from applying the patch.
    pub after: OpportunityState,
    /// Field-level diff against the pre-patch state.
    pub diff: Vec<FieldChange>,
    /// Policy-check records produced while sanitizing the patch.
    pub policy_checks: Vec<rfp_core::PolicyCheckRecord>,
}

/// Dry-runs a patch against a state file without touching any store:
/// sanitizes the raw patch the same way [`rfp_opportunity::OpportunityRepo::patch_state`]
/// would, applies it in memory, and reports the resulting diff.
pub fn patch_dry_run(state_path: &Path, patch_path: &Path, now: DateTime<Utc>) -> Result<PatchDryRunResult> {
    let state_content =
        std::fs::read_to_string(state_path).with_context(|| format!("read state file '{}'", state_path.display()))?;
    let before: OpportunityState =
        serde_json::from_str(&state_content).with_context(|| format!("parse opportunity state from '{}'", state_path.display()))?;

    let patch_content =
        std::fs::read_to_string(patch_path).with_context(|| format!("read patch file '{}'", patch_path.display()))?;
    let raw_patch: RawOpportunityPatch =
        serde_json::from_str(&patch_content).with_context(|| format!("parse patch from '{}'", patch_path.display()))?;

    let sanitized = sanitize_opportunity_patch(raw_patch, now);
    let after = before.apply_patch(&sanitized.patch, now);
    let diff = diff_opportunity_state(&before, &after);

    Ok(PatchDryRunResult {
        after,
        diff,
        policy_checks: sanitized.policy_checks,
    })
}

/// Everything needed to drive one [`AgentRuntime::handle_message`] call
/// against a fresh in-memory backing store, plus the repos used to read
/// back what the turn wrote.
struct Harness {
    runtime: AgentRuntime,
    ctx: ToolContext,
    opportunity: OpportunityRepo,
}

fn build_harness(config: &PlatformConfig, script: Vec<ScriptedCall>) -> Harness {
    let store = InMemoryKeyValueStore::shared();
    let objects = InMemoryObjectStore::shared().expect("in-memory object store never fails to construct");
    let allowlist = AllowlistConfig {
        allowed_channels: config.allowlists.slack_channels.clone(),
        allowed_repos: config.allowlists.github_repos.clone(),
        allowed_domains: config.allowlists.browser_domains.clone(),
        allowed_key_prefixes: config.allowlists.object_key_prefixes.clone(),
        ..Default::default()
    };
    let policy = PolicyEngine::new(&allowlist).expect("allowlist globs from a validated config always compile");
    let ctx = ToolContext::new(store.clone(), objects, policy.clone());
    let ai_client = Arc::new(AiClient::new(
        Arc::new(MockChatProvider::new(script)),
        &config.resilience,
        config.model_chains.clone(),
        "gpt-4o",
    ));
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
    let opportunity = OpportunityRepo::new(store.clone());
    Harness { runtime, ctx, opportunity }
}

/// The outcome of [`submit_message`]: the turn outcome plus, when the turn
/// ended up scoped to an RFP, that RFP's resulting journal and event log.
pub struct SubmitOutcome {
    /// What [`AgentRuntime::handle_message`] returned.
    pub turn: TurnOutcome,
    /// The bound RFP's journal, newest first, if any.
    pub journal: Vec<JournalEntry>,
    /// The bound RFP's event log, newest first, if any.
    pub events: Vec<EventLogEntry>,
}

/// Submits one message to a freshly constructed [`AgentRuntime`], seeded
/// from an optional [`OpportunityState`] snapshot file so a caller can
/// dry-run a turn against pre-existing state.
///
/// There is no live model provider wired into this workspace (`spec.md`
/// §4.5 scopes the AI client generically over [`rfp_ai_client::provider::ChatProvider`]
/// for exactly this reason); absent a `script` of scripted responses the
/// turn runs entirely on the template/keyword-heuristic fallbacks built
/// into `rfp-agent`, which is enough to exercise shortcuts, scope
/// detection, and protocol enforcement end to end.
#[allow(clippy::too_many_arguments)]
pub async fn submit_message(
    config: &PlatformConfig,
    channel_id: &str,
    thread_ts: &str,
    slack_user_id: Option<String>,
    slack_team_id: Option<String>,
    acting_as: &str,
    text: &str,
    seed_state: Option<&Path>,
    script: Vec<ScriptedCall>,
    now: DateTime<Utc>,
) -> Result<SubmitOutcome> {
    let harness = build_harness(config, script);

    if let Some(path) = seed_state {
        let content = std::fs::read_to_string(path).with_context(|| format!("read seed state file '{}'", path.display()))?;
        let state: OpportunityState =
            serde_json::from_str(&content).with_context(|| format!("parse seed state from '{}'", path.display()))?;
        harness
            .opportunity
            .ensure_state_exists(&state.rfp_id, now)
            .await
            .context("seed opportunity state")?;
        let raw = RawOpportunityPatch {
            stage: Some(state.stage.clone()),
            summary: Some(state.summary.clone()),
            ..Default::default()
        };
        harness
            .opportunity
            .patch_state(&state.rfp_id, raw, false, now)
            .await
            .context("apply seed state")?;
    }

    let msg = IncomingMessage {
        channel_id: channel_id.to_string(),
        thread_ts: thread_ts.to_string(),
        slack_user_id,
        slack_team_id,
        acting_as: acting_as.to_string(),
        text: text.to_string(),
        thread_participant_ids: vec![acting_as.to_string()],
    };

    let turn = harness
        .runtime
        .handle_message(&harness.ctx, msg, now)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("handle message")?;

    let (journal, events) = match &turn.rfp_id {
        Some(rfp_id) => (
            harness.opportunity.list_journal(rfp_id, 50).await.map_err(|e| anyhow::anyhow!("{e}"))?,
            harness.opportunity.list_events(rfp_id, 50).await.map_err(|e| anyhow::anyhow!("{e}"))?,
        ),
        None => (Vec::new(), Vec::new()),
    };

    Ok(SubmitOutcome { turn, journal, events })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_platform_config_is_valid_json() {
        let s = schema_json(SchemaKind::PlatformConfig).unwrap();
        let v: serde_json::Value = serde_json::from_str(&s).unwrap();
        assert!(v.get("properties").is_some() || v.get("$defs").is_some());
    }

    #[test]
    fn schema_job_is_valid_json() {
        let s = schema_json(SchemaKind::Job).unwrap();
        let _: serde_json::Value = serde_json::from_str(&s).unwrap();
    }

    #[test]
    fn schema_opportunity_state_is_valid_json() {
        let s = schema_json(SchemaKind::OpportunityState).unwrap();
        let _: serde_json::Value = serde_json::from_str(&s).unwrap();
    }

    #[test]
    fn config_check_defaults_validate_with_advisory_warnings() {
        // defaults carry no model chain and no slack allowlist, both of
        // which are warnings rather than hard validation errors.
        let diags = config_check(None).unwrap();
        assert!(!diags.iter().any(|d| d.starts_with("error:")));
        assert!(diags.iter().any(|d| d.starts_with("warning:")));
    }

    #[test]
    fn config_check_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid [toml =").unwrap();
        let diags = config_check(Some(&path)).unwrap();
        assert!(diags.iter().any(|d| d.starts_with("error:")));
    }

    #[test]
    fn read_job_file_round_trips() {
        let now = Utc::now();
        let job = AgentJob::new("j1", "ai_agent_execute", Default::default(), serde_json::json!({}), now, now);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(&path, serde_json::to_string_pretty(&job).unwrap()).unwrap();
        let loaded = read_job_file(&path).unwrap();
        assert_eq!(loaded.id, "j1");
    }

    #[test]
    fn read_journal_file_sorts_newest_first() {
        let now = Utc::now();
        let e1 = JournalEntry::new("r1", "first", "why", "agent", now);
        let e2 = JournalEntry::new("r1", "second", "why", "agent", now + chrono::Duration::seconds(5));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.json");
        std::fs::write(&path, serde_json::to_string(&vec![e1, e2]).unwrap()).unwrap();
        let entries = read_journal_file(&path).unwrap();
        assert_eq!(entries[0].what_changed, "second");
    }

    #[test]
    fn patch_dry_run_reports_diff_without_mutating_the_file() {
        let now = Utc::now();
        let state = OpportunityState::default_for("r1", now);
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("state.json");
        std::fs::write(&state_path, serde_json::to_string(&state).unwrap()).unwrap();

        let patch_path = dir.path().join("patch.json");
        std::fs::write(&patch_path, serde_json::json!({"stage": "in-review"}).to_string()).unwrap();

        let result = patch_dry_run(&state_path, &patch_path, now).unwrap();
        assert_eq!(result.after.stage, "in-review");
        assert!(result.diff.iter().any(|c| c.field == "stage"));

        let on_disk: OpportunityState = serde_json::from_str(&std::fs::read_to_string(&state_path).unwrap()).unwrap();
        assert_eq!(on_disk.stage, "new");
    }

    #[test]
    fn patch_dry_run_drops_commitments_without_provenance() {
        let now = Utc::now();
        let state = OpportunityState::default_for("r1", now);
        let dir = tempfile::tempdir().unwrap();
        let state_path = dir.path().join("state.json");
        std::fs::write(&state_path, serde_json::to_string(&state).unwrap()).unwrap();

        let patch_path = dir.path().join("patch.json");
        std::fs::write(
            &patch_path,
            serde_json::json!({"commitments_append": [{"text": "no provenance"}]}).to_string(),
        )
        .unwrap();

        let result = patch_dry_run(&state_path, &patch_path, now).unwrap();
        assert!(result.after.commitments.is_empty());
        assert_eq!(result.policy_checks.len(), 1);
    }

    #[tokio::test]
    async fn submit_message_link_shortcut_needs_no_model_call() {
        let config = PlatformConfig::default();
        let now = rfp_core::now();
        let outcome = submit_message(&config, "C1", "T1", Some("U1".into()), Some("W1".into()), "U1", "link rfp_01h9zz8abcdefg", None, vec![], now)
            .await
            .unwrap();
        assert!(outcome.turn.reply_text.unwrap().contains("rfp_01h9zz8abcdefg"));
    }

    #[tokio::test]
    async fn submit_message_general_question_falls_back_to_keyword_heuristic() {
        let config = PlatformConfig::default();
        let now = rfp_core::now();
        let outcome = submit_message(&config, "C1", "T2", Some("U1".into()), Some("W1".into()), "U1", "how do i use this bot?", None, vec![], now)
            .await
            .unwrap();
        assert_eq!(outcome.turn.rfp_id, None);
    }
}
