//! Background jobs, idempotency records, and checkpoints (`spec.md` §3,
//! "AgentJob" / "AgentCheckpoint", §4.8, §4.9).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Job lifecycle state. Transitions are `queued -> running -> (completed |
/// failed | cancelled)` (`spec.md` §4.9); `try_mark_running` is the only
/// path from `queued` to `running` and is a conditional update so two
/// workers racing on the same job cannot both win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for its `due_at` or its dependencies.
    Queued,
    /// Claimed by a worker and executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an unrecoverable error.
    Failed,
    /// Cancelled before or during execution.
    Cancelled,
}

impl JobStatus {
    /// Whether this status is terminal (no further transitions expected).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Progress reporting for a running job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobProgress {
    /// Percent complete, `0..=100`.
    pub pct: u8,
    /// Current step name or number, for display.
    pub step: String,
    /// Free-text progress message.
    pub message: String,
}

/// Scope a job is bound to, used for indexing (`CASE_JOBS#{caseId}`) and
/// for restricting RFP-scoped tool access during execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobScope {
    /// RFP this job concerns, if any.
    pub rfp_id: Option<String>,
    /// Environment/case this job concerns, if any.
    pub env: Option<String>,
}

/// `pk=JOB#{id}`, `sk=PROFILE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgentJob {
    /// Stable job id.
    pub id: String,
    /// Job type, e.g. `"ai_agent_execute"`, `"opportunity_maintenance"`,
    /// `"slack_nudge"`, `"self_modify_open_pr"`.
    pub job_type: String,
    /// Scope this job is bound to.
    pub scope: JobScope,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// When this job becomes eligible to run.
    pub due_at: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// When a worker claimed this job.
    pub started_at: Option<DateTime<Utc>>,
    /// When this job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// Job-type-specific payload.
    pub payload: serde_json::Value,
    /// Ids of jobs that must complete before this one may run.
    pub depends_on: Vec<String>,
    /// Progress reporting.
    pub progress: JobProgress,
    /// Result payload, set on successful completion.
    pub result: Option<serde_json::Value>,
    /// Error string, set on failure. Bounded to 800 characters (§7).
    pub error: Option<String>,
    /// The user sub that requested this job, if user-triggered.
    pub requested_by_user_sub: Option<String>,
}

/// Maximum length of a stored job error string (§7 "Propagation").
pub const MAX_JOB_ERROR_CHARS: usize = 800;

impl AgentJob {
    /// Constructs a new queued job.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        job_type: impl Into<String>,
        scope: JobScope,
        payload: serde_json::Value,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            job_type: job_type.into(),
            scope,
            status: JobStatus::Queued,
            due_at,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
            payload,
            depends_on: Vec::new(),
            progress: JobProgress::default(),
            result: None,
            error: None,
            requested_by_user_sub: None,
        }
    }

    /// All dependencies are satisfied given the statuses of this job's
    /// dependencies.
    pub fn dependencies_satisfied(&self, dependency_statuses: &BTreeMap<String, JobStatus>) -> bool {
        self.depends_on
            .iter()
            .all(|dep| matches!(dependency_statuses.get(dep), Some(JobStatus::Completed)))
    }

    /// Attempts the `queued -> running` transition. Returns `None` (no
    /// mutation) if the job was not `queued`, modeling the conditional
    /// update's failure-to-match case; the caller (the in-memory or real
    /// store) is responsible for actually making this check-and-set atomic
    /// against concurrent claimers.
    pub fn try_mark_running(&self, now: DateTime<Utc>) -> Option<Self> {
        if self.status != JobStatus::Queued {
            return None;
        }
        let mut next = self.clone();
        next.status = JobStatus::Running;
        next.started_at = Some(now);
        next.updated_at = now;
        Some(next)
    }

    /// Updates progress. Valid in any (non-cloned) state per §4.9.
    pub fn update_progress(&self, pct: u8, step: impl Into<String>, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.progress = JobProgress {
            pct: pct.min(100),
            step: step.into(),
            message: message.into(),
        };
        next.updated_at = now;
        next
    }

    /// Marks the job completed with a result, setting progress to 100%.
    pub fn complete(&self, result: serde_json::Value, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.status = JobStatus::Completed;
        next.result = Some(result);
        next.progress.pct = 100;
        next.finished_at = Some(now);
        next.updated_at = now;
        next
    }

    /// Marks the job failed with an error, clipping the error to
    /// [`MAX_JOB_ERROR_CHARS`] and setting progress to 100%.
    pub fn fail(&self, error: &str, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.status = JobStatus::Failed;
        next.error = Some(error.chars().take(MAX_JOB_ERROR_CHARS).collect());
        next.progress.pct = 100;
        next.finished_at = Some(now);
        next.updated_at = now;
        next
    }
}

/// Maps a client-supplied idempotency key to the job it created:
/// `pk=IDEMPOTENCY#{sha256}`, `sk=PROFILE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IdempotencyRecord {
    /// SHA-256 hex digest of the caller's idempotency key.
    pub key_hash: String,
    /// The job id this key resolved to.
    pub job_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Serialized progress of a job orchestrator, keyed by `(rfpId, jobId)`.
/// `get_latest_checkpoint` reads the most recent row by descending
/// sequence; `restore_from_checkpoint` returns this payload unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgentCheckpoint {
    /// Owning RFP id (or a synthetic scope id for RFP-less jobs).
    pub rfp_id: String,
    /// Owning job id.
    pub job_id: String,
    /// Monotonically increasing checkpoint sequence number.
    pub sequence: u64,
    /// Step ids completed so far.
    pub completed_steps: BTreeSet<String>,
    /// Step ids that failed so far (may later be retried and moved to
    /// `completed_steps`).
    pub failed_steps: BTreeSet<String>,
    /// Per-step result payloads, keyed by step id.
    pub step_results: BTreeMap<String, serde_json::Value>,
    /// The step the orchestrator was about to run when checkpointed.
    pub current_step: Option<String>,
    /// Serialized token/cost budget tracker (`rfp_budget::TokenBudgetTracker::to_dict`).
    pub budget_tracker: serde_json::Value,
    /// Ordered log of tool calls made so far, for diagnostics.
    pub tool_calls: Vec<serde_json::Value>,
    /// Intermediate results not yet attributed to a specific step.
    pub intermediate_results: Vec<serde_json::Value>,
    /// Arbitrary extra metadata.
    pub metadata: BTreeMap<String, String>,
    /// When this checkpoint was written.
    pub created_at: DateTime<Utc>,
}

impl AgentCheckpoint {
    /// Constructs an empty checkpoint at sequence 0.
    pub fn empty(rfp_id: impl Into<String>, job_id: impl Into<String>, budget_tracker: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            rfp_id: rfp_id.into(),
            job_id: job_id.into(),
            sequence: 0,
            completed_steps: BTreeSet::new(),
            failed_steps: BTreeSet::new(),
            step_results: BTreeMap::new(),
            current_step: None,
            budget_tracker,
            tool_calls: Vec::new(),
            intermediate_results: Vec::new(),
            metadata: BTreeMap::new(),
            created_at: now,
        }
    }

    /// Returns the next checkpoint in sequence, steps-since-last-checkpoint
    /// counting reset to zero by the caller.
    pub fn next(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.sequence += 1;
        next.created_at = now;
        next
    }
}
