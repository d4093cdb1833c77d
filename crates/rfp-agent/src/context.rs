//! Context Builder: assembles a turn's context as priority-ordered text
//! blocks and truncates the lowest-priority ones first when the token
//! budget is tight (`spec.md` §4.6, `SPEC_FULL.md` §9 "Identity & Context
//! Builder").

use chrono::{DateTime, Utc};
use rfp_budget::TokenBudgetTracker;
use rfp_core::memory::MemoryType;
use rfp_identity::{IdentityResolver, UserIdentity};
use rfp_jobs::JobQueueRepo;
use rfp_memory::MemoryRepo;
use rfp_opportunity::{CatalogueRepo, OpportunityRepo};

/// One assembled block of context, highest priority first.
#[derive(Debug, Clone)]
pub struct ContextBlock {
    /// Block label, e.g. `"identity"`, `"rfp_state"`.
    pub label: &'static str,
    /// Lower number = dropped last. Identity is always kept.
    pub priority: u8,
    /// Rendered text for this block.
    pub text: String,
}

/// Everything known about who is speaking and what they're speaking about.
pub struct TurnContext {
    /// The resolved identity of the message's sender.
    pub identity: UserIdentity,
    /// The RFP this turn is scoped to, if any.
    pub rfp_id: Option<String>,
}

/// Inputs the Context Builder draws on to assemble a turn's blocks.
pub struct ContextBuilder<'a> {
    identity: &'a IdentityResolver,
    opportunity: &'a OpportunityRepo,
    catalogue: &'a CatalogueRepo,
    memory: &'a MemoryRepo,
    jobs: &'a JobQueueRepo,
}

impl<'a> ContextBuilder<'a> {
    /// Construct a builder over the repositories a turn needs.
    pub fn new(identity: &'a IdentityResolver, opportunity: &'a OpportunityRepo, catalogue: &'a CatalogueRepo, memory: &'a MemoryRepo, jobs: &'a JobQueueRepo) -> Self {
        Self { identity, opportunity, catalogue, memory, jobs }
    }

    /// Resolves the speaker's identity and assembles every context block
    /// for one turn, in priority order (identity first).
    pub async fn build(
        &self,
        slack_user_id: Option<&str>,
        slack_team_id: Option<&str>,
        query: &str,
        rfp_id: Option<&str>,
        case_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(TurnContext, Vec<ContextBlock>), rfp_error::RfpError> {
        let identity = self.identity.resolve_from_slack(slack_user_id, slack_team_id, None, false).await?;

        let mut blocks = Vec::new();
        blocks.push(ContextBlock {
            label: "identity",
            priority: 100,
            text: format!("Speaker: {}", identity.display_name.clone().or_else(|| identity.email.clone()).unwrap_or_else(|| "unknown user".to_string())),
        });

        if let Some(rfp_id) = rfp_id {
            if let Some(state) = self.opportunity.get_state(rfp_id).await? {
                blocks.push(ContextBlock {
                    label: "rfp_state",
                    priority: 90,
                    text: format!(
                        "RFP {} — stage: {}, summary: {}, open risks: {}, owners: {}",
                        state.rfp_id,
                        state.stage,
                        state.summary,
                        state.risks.join(", "),
                        state.owners.join(", ")
                    ),
                });
            }

            let scope_id = rfp_core::keys::rfp_scope(rfp_id);
            let memories = self
                .memory
                .get_memories_for_context(&scope_id, &[MemoryType::Episodic, MemoryType::Semantic, MemoryType::Procedural], Some(query), 5, now)
                .await?;
            if !memories.is_empty() {
                let text = memories.iter().map(|m| format!("- {}", m.summary.clone().unwrap_or_else(|| m.content.clone()))).collect::<Vec<_>>().join("\n");
                blocks.push(ContextBlock { label: "recent_memories", priority: 70, text: format!("Recent context:\n{text}") });
            }

            let related = self.catalogue.search_rfps(query, 3).await.unwrap_or_default();
            let related: Vec<_> = related.into_iter().filter(|r| r.id != rfp_id).collect();
            if !related.is_empty() {
                let text = related.iter().map(|r| format!("- {} ({})", r.id, r.title)).collect::<Vec<_>>().join("\n");
                blocks.push(ContextBlock { label: "related_rfps", priority: 40, text: format!("Related RFPs:\n{text}") });
            }
        }

        if let Some(case_id) = case_id {
            let jobs = self.jobs.list_for_case(case_id, 5).await.unwrap_or_default();
            if !jobs.is_empty() {
                let text = jobs.iter().map(|j| format!("- {} [{:?}] {}", j.job_type, j.status, j.progress.message)).collect::<Vec<_>>().join("\n");
                blocks.push(ContextBlock { label: "recent_jobs", priority: 30, text: format!("Recent jobs:\n{text}") });
            }
        }

        Ok((TurnContext { identity, rfp_id: rfp_id.map(str::to_string) }, blocks))
    }
}

/// Renders blocks into one prompt string, dropping the lowest-priority
/// blocks first until the remainder fits the tracker's remaining budget.
pub fn render_within_budget(mut blocks: Vec<ContextBlock>, tracker: &TokenBudgetTracker) -> String {
    blocks.sort_by(|a, b| b.priority.cmp(&a.priority));
    loop {
        let rendered = blocks.iter().map(|b| b.text.clone()).collect::<Vec<_>>().join("\n\n");
        if tracker.can_add(&rendered) || blocks.len() <= 1 {
            return rendered;
        }
        blocks.pop();
    }
}
