//! Drives one job end to end: plan, execute steps with checkpointing and
//! resume, record the outcome (`spec.md` §4.8 "Orchestration", §4.9).

use crate::plan::{Plan, Planner};
use crate::retrieval::{record_successful_run, similar_successful_jobs};
use crate::step::{as_tool_error, run_step};
use rfp_budget::TokenBudgetTracker;
use rfp_core::AgentJob;
use rfp_error::RfpError;
use rfp_jobs::{case_id_for_scope, CheckpointRepo, JobQueueRepo};
use rfp_memory::MemoryRepo;
use rfp_policy::PolicyEngine;
use rfp_tools::{ToolContext, ToolRegistry};
use std::sync::Arc;

const PLAN_METADATA_KEY: &str = "plan";
/// Token budget given to a single job's full tool-using run.
pub const DEFAULT_JOB_BUDGET_TOKENS: u64 = 60_000;

/// Ties the job queue, checkpoint store, planner, and tool registry
/// together to drive jobs claimed off the queue.
pub struct Orchestrator {
    queue: JobQueueRepo,
    checkpoints: CheckpointRepo,
    memory: MemoryRepo,
    registry: Arc<ToolRegistry>,
    policy: PolicyEngine,
    planner: Arc<dyn Planner>,
}

impl Orchestrator {
    /// Construct an orchestrator over the given repositories.
    pub fn new(queue: JobQueueRepo, checkpoints: CheckpointRepo, memory: MemoryRepo, registry: Arc<ToolRegistry>, policy: PolicyEngine, planner: Arc<dyn Planner>) -> Self {
        Self { queue, checkpoints, memory, registry, policy, planner }
    }

    fn tool_context(&self, store: std::sync::Arc<dyn rfp_store::KeyValueStore>, objects: std::sync::Arc<dyn rfp_store::ObjectStore>) -> ToolContext {
        ToolContext::new(store, objects, self.policy.clone())
    }

    /// Drives `job` (already claimed as `Running`) through its plan,
    /// resuming from the latest checkpoint if one exists, and writes the
    /// job's terminal state when finished.
    pub async fn run(
        &self,
        job: &AgentJob,
        ctx: &ToolContext,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<AgentJob, RfpError> {
        let case_id = case_id_for_scope(&job.scope).to_string();
        let mut checkpoint = self.checkpoints.resume_or_start(&case_id, &job.id, serde_json::to_value(TokenBudgetTracker::new(DEFAULT_JOB_BUDGET_TOKENS, "gpt-4o")).unwrap_or_default(), now).await?;

        let mut tracker: TokenBudgetTracker = serde_json::from_value(checkpoint.budget_tracker.clone()).unwrap_or_else(|_| TokenBudgetTracker::new(DEFAULT_JOB_BUDGET_TOKENS, "gpt-4o"));

        let plan: Plan = match checkpoint.metadata.get(PLAN_METADATA_KEY) {
            Some(raw) => serde_json::from_str(raw).map_err(|e| RfpError::new(rfp_error::ErrorCode::Internal, format!("failed to deserialize checkpointed plan: {e}")))?,
            None => {
                let similar = similar_successful_jobs(&self.memory, &job.scope, &job.job_type).await?;
                let plan = self.planner.plan(job, &similar, &mut tracker).await?;
                checkpoint.metadata.insert(PLAN_METADATA_KEY.to_string(), serde_json::to_string(&plan).map_err(|e| RfpError::new(rfp_error::ErrorCode::Internal, e.to_string()))?);
                checkpoint.budget_tracker = serde_json::to_value(&tracker).unwrap_or_default();
                self.checkpoints.save(&checkpoint).await?;
                plan
            }
        };

        let total_steps = plan.steps.len().max(1);
        let mut tool_sequence = Vec::new();

        for (index, step) in plan.steps.iter().enumerate() {
            if checkpoint.completed_steps.contains(&step.id) {
                if let Some(served_by) = checkpoint.metadata.get(&format!("{}:served_by", step.id)) {
                    tool_sequence.push(served_by.clone());
                }
                continue;
            }

            checkpoint.current_step = Some(step.id.clone());
            self.checkpoints.save(&checkpoint).await?;

            let pct = ((index * 100) / total_steps) as u8;
            self.queue.update_progress(job, pct, step.id.clone(), step.description.clone(), now).await?;

            let outcome = run_step(&self.registry, ctx, &self.policy, step, &checkpoint.step_results).await;
            tool_sequence.push(outcome.served_by.clone());

            if !outcome.ok {
                checkpoint.failed_steps.insert(step.id.clone());
                checkpoint = checkpoint.next(now);
                self.checkpoints.save(&checkpoint).await?;

                let tool_error = as_tool_error(&outcome.result);
                let message = tool_error.map(|e| e.error).unwrap_or_else(|| "step failed with no error detail".to_string());
                return self.queue.fail(job, &format!("step '{}' failed: {message}", step.id), now).await;
            }

            checkpoint.completed_steps.insert(step.id.clone());
            checkpoint.step_results.insert(step.id.clone(), outcome.result.clone());
            checkpoint.metadata.insert(format!("{}:served_by", step.id), outcome.served_by.clone());
            checkpoint.tool_calls.push(serde_json::json!({"stepId": step.id, "tool": outcome.served_by, "attempted": outcome.tools_attempted}));
            checkpoint.budget_tracker = serde_json::to_value(&tracker).unwrap_or_default();
            checkpoint = checkpoint.next(now);
            self.checkpoints.save(&checkpoint).await?;
        }

        let result = serde_json::json!({ "goal": plan.goal, "stepResults": checkpoint.step_results });
        let completed = self.queue.complete(job, result.clone(), now).await?;

        record_successful_run(&self.memory, &job.scope, &job.job_type, tool_sequence, &format!("completed: {}", plan.goal), now).await?;

        Ok(completed)
    }
}
