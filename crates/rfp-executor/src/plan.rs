//! Plans: an ordered list of tool-calling [`Step`]s the orchestrator
//! executes, each with optional [`AlternativeApproach`]es to fall back to
//! (`spec.md` §4.8 "Planning").

use rfp_ai_client::{AiClient, ReasoningEffort};
use rfp_budget::{Message, TokenBudgetTracker};
use rfp_core::AgentJob;
use rfp_error::RfpError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One alternative way to attempt a step, tried only after the primary
/// tool's retries are exhausted or it fails non-retryably.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeApproach {
    /// Tool to call instead.
    pub tool: String,
    /// Arguments for that call.
    pub args: Value,
    /// Why this is a reasonable fallback, for diagnostics.
    pub rationale: String,
}

/// One step of a plan: a primary tool call plus ordered fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Stable id, unique within the plan, used as the checkpoint key.
    pub id: String,
    /// Human-readable description of what this step accomplishes.
    pub description: String,
    /// Primary tool to call.
    pub tool: String,
    /// Arguments for the primary call.
    pub args: Value,
    /// Ordered fallbacks, tried only after the primary is exhausted.
    #[serde(default)]
    pub alternative_approaches: Vec<AlternativeApproach>,
}

/// A job's execution plan: an ordered list of steps toward `goal`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// One-line statement of what the plan accomplishes.
    pub goal: String,
    /// Steps, executed in order. A later step may depend on an earlier
    /// step's `step_results` entry via its `args` (the orchestrator
    /// substitutes `"$step:<id>"` placeholders before dispatch).
    pub steps: Vec<Step>,
}

/// A prior job's tool sequence and outcome, handed to the planner as
/// few-shot context (`spec.md` §4.8 "Retrieval-augmented planning").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarJob {
    /// The job type this example came from.
    pub job_type: String,
    /// Tool names called, in order.
    pub tool_sequence: Vec<String>,
    /// One-line summary of the outcome.
    pub outcome: String,
}

/// Maximum similar-job examples handed to the planner.
pub const MAX_SIMILAR_JOBS: usize = 2;

/// Produces a [`Plan`] for a job.
#[async_trait::async_trait]
pub trait Planner: Send + Sync {
    /// Plans `job`, optionally informed by up to
    /// [`MAX_SIMILAR_JOBS`] prior successful runs of the same job type.
    async fn plan(&self, job: &AgentJob, similar_jobs: &[SimilarJob], tracker: &mut TokenBudgetTracker) -> Result<Plan, RfpError>;
}

const PLAN_SCHEMA_DESCRIPTION: &str = "a JSON object: {\"goal\": string, \"steps\": [{\"id\": string, \"description\": string, \"tool\": string, \"args\": object, \"alternativeApproaches\": [{\"tool\": string, \"args\": object, \"rationale\": string}]}]}";

/// A planner backed by [`AiClient`]'s structured-output call.
pub struct AiPlanner {
    client: std::sync::Arc<AiClient>,
    tool_catalogue: Vec<rfp_tools::ToolDef>,
}

impl AiPlanner {
    /// Construct a planner over `client`, describing `tool_catalogue` to the
    /// model so it only proposes tools that actually exist.
    pub fn new(client: std::sync::Arc<AiClient>, tool_catalogue: Vec<rfp_tools::ToolDef>) -> Self {
        Self { client, tool_catalogue }
    }

    fn system_prompt(&self, job: &AgentJob, similar_jobs: &[SimilarJob]) -> String {
        let tools: Vec<String> = self.tool_catalogue.iter().map(|t| format!("- {} ({}): {}", t.name, if t.write { "write" } else { "read" }, t.description)).collect();
        let mut prompt = format!(
            "You are planning execution of a background job.\nJob type: {}\nPayload: {}\n\nAvailable tools:\n{}\n\nRespond with {PLAN_SCHEMA_DESCRIPTION}\n",
            job.job_type,
            job.payload,
            tools.join("\n"),
        );
        if !similar_jobs.is_empty() {
            prompt.push_str("\nSimilar successful jobs for reference:\n");
            for similar in similar_jobs.iter().take(MAX_SIMILAR_JOBS) {
                prompt.push_str(&format!("- {} used [{}] -> {}\n", similar.job_type, similar.tool_sequence.join(", "), similar.outcome));
            }
        }
        prompt
    }
}

#[derive(Debug, Deserialize)]
struct RawAlternative {
    tool: String,
    args: Value,
    #[serde(default)]
    rationale: String,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    id: String,
    #[serde(default)]
    description: String,
    tool: String,
    #[serde(default)]
    args: Value,
    #[serde(default, rename = "alternativeApproaches")]
    alternative_approaches: Vec<RawAlternative>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    goal: String,
    steps: Vec<RawStep>,
}

fn plan_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "goal": {"type": "string"},
            "steps": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "description": {"type": "string"},
                        "tool": {"type": "string"},
                        "args": {"type": "object"},
                        "alternativeApproaches": {"type": "array"}
                    },
                    "required": ["id", "tool"]
                }
            }
        },
        "required": ["goal", "steps"]
    })
}

#[async_trait::async_trait]
impl Planner for AiPlanner {
    async fn plan(&self, job: &AgentJob, similar_jobs: &[SimilarJob], tracker: &mut TokenBudgetTracker) -> Result<Plan, RfpError> {
        let messages = vec![Message { role: "user".to_string(), content: self.system_prompt(job, similar_jobs) }];
        let schema = plan_schema();
        let fallback_job_type = job.job_type.clone();
        let raw: RawPlan = self
            .client
            .call_json(
                "planning",
                &schema,
                messages,
                ReasoningEffort::Medium,
                8000,
                |_: &RawPlan| None,
                Some(move || RawPlan { goal: format!("run {fallback_job_type}"), steps: Vec::new() }),
                Some(tracker),
            )
            .await?;

        Ok(Plan {
            goal: raw.goal,
            steps: raw
                .steps
                .into_iter()
                .map(|s| Step {
                    id: s.id,
                    description: s.description,
                    tool: s.tool,
                    args: s.args,
                    alternative_approaches: s
                        .alternative_approaches
                        .into_iter()
                        .map(|a| AlternativeApproach { tool: a.tool, args: a.args, rationale: a.rationale })
                        .collect(),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfp_ai_client::mock::{MockChatProvider, ScriptedCall};
    use rfp_config::ResilienceConfig;
    use rfp_core::job::JobScope;
    use std::sync::Arc;

    fn job() -> AgentJob {
        let now = rfp_core::now();
        AgentJob::new("j1", "opportunity_maintenance", JobScope::default(), serde_json::json!({}), now, now)
    }

    #[tokio::test]
    async fn ai_planner_parses_a_schema_conformant_plan() {
        let script = vec![ScriptedCall::Ok(
            r#"{"goal":"refresh opportunity state","steps":[{"id":"s1","description":"load state","tool":"opportunity_load","args":{"rfpId":"r1"}}]}"#.to_string(),
        )];
        let provider = Arc::new(MockChatProvider::new(script));
        let client = Arc::new(AiClient::new(provider, &ResilienceConfig::default(), vec![], "gpt-4o"));
        let planner = AiPlanner::new(client, rfp_tools::read_tools().defs());
        let mut tracker = TokenBudgetTracker::new(100_000, "gpt-4o");
        let plan = planner.plan(&job(), &[], &mut tracker).await.unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].tool, "opportunity_load");
    }

    #[tokio::test]
    async fn ai_planner_falls_back_to_an_empty_plan_on_repeated_failure() {
        let script = std::iter::repeat_with(|| ScriptedCall::Err("upstream down".to_string())).take(9).collect();
        let provider = Arc::new(MockChatProvider::new(script));
        let client = Arc::new(AiClient::new(provider, &ResilienceConfig::default(), vec![], "gpt-4o"));
        let planner = AiPlanner::new(client, rfp_tools::read_tools().defs());
        let mut tracker = TokenBudgetTracker::new(100_000, "gpt-4o");
        let plan = planner.plan(&job(), &[], &mut tracker).await.unwrap();
        assert!(plan.steps.is_empty());
    }
}
