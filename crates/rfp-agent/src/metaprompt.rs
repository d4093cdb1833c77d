//! Metaprompt analysis: classifies a message's intent and complexity so
//! the runtime can pick a tool set and a step budget before entering the
//! tool loop (`spec.md` §4.7, step 3 "Metaprompt analysis", step 4 "Step
//! budget").

use rfp_ai_client::{AiClient, ReasoningEffort};
use rfp_budget::{Message, TokenBudgetTracker};
use rfp_error::RfpError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Coarse complexity bucket driving the step budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// A single lookup or a one-field update.
    Simple,
    /// A few related reads/writes.
    Moderate,
    /// Multi-step research, drafting, or cross-RFP work.
    Complex,
}

/// The structured result of analyzing one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetapromptAnalysis {
    /// Short label for what the user wants, e.g. `"status_check"`.
    pub intent: String,
    /// Complexity bucket.
    pub complexity: Complexity,
    /// Tool names the analysis expects the loop to need.
    pub required_tools: Vec<String>,
    /// Rough estimate of how many tool calls completing this will take.
    pub likely_steps: u32,
    /// Information the agent will likely need to ask the user for.
    pub missing_info: Vec<String>,
    /// Confidence in this analysis, `0.0..=1.0`.
    pub confidence: f64,
    /// Short human-readable justification.
    pub reasoning: String,
}

/// A canonical intent whose analysis is known ahead of time, skipping the
/// AI call entirely when its trigger phrase matches.
struct Template {
    trigger: &'static str,
    intent: &'static str,
    complexity: Complexity,
    required_tools: &'static [&'static str],
    likely_steps: u32,
}

const TEMPLATES: &[Template] = &[
    Template { trigger: "status", intent: "status_check", complexity: Complexity::Simple, required_tools: &["opportunity_load"], likely_steps: 1 },
    Template { trigger: "list tasks", intent: "list_tasks", complexity: Complexity::Simple, required_tools: &["list_tasks_for_rfp"], likely_steps: 1 },
    Template { trigger: "summarize", intent: "summarize", complexity: Complexity::Simple, required_tools: &["opportunity_load", "memory_get_context"], likely_steps: 2 },
];

fn match_template(text: &str) -> Option<MetapromptAnalysis> {
    let lower = text.to_lowercase();
    TEMPLATES.iter().find(|t| lower.contains(t.trigger)).map(|t| MetapromptAnalysis {
        intent: t.intent.to_string(),
        complexity: t.complexity,
        required_tools: t.required_tools.iter().map(|s| s.to_string()).collect(),
        likely_steps: t.likely_steps,
        missing_info: Vec::new(),
        confidence: 0.95,
        reasoning: format!("matched template trigger {:?}", t.trigger),
    })
}

/// Keyword fallback used when the AI call itself fails (bad credentials,
/// exhausted retries, non-conforming output after every schema mode).
fn keyword_heuristic(text: &str) -> MetapromptAnalysis {
    let lower = text.to_lowercase();
    let (complexity, likely_steps) = if lower.split_whitespace().count() > 40 || lower.contains(" and ") {
        (Complexity::Complex, 14)
    } else if lower.contains("draft") || lower.contains("review") || lower.contains("update") {
        (Complexity::Moderate, 7)
    } else {
        (Complexity::Simple, 3)
    };
    MetapromptAnalysis {
        intent: "general".to_string(),
        complexity,
        required_tools: Vec::new(),
        likely_steps,
        missing_info: Vec::new(),
        confidence: 0.4,
        reasoning: "keyword heuristic fallback after AI analysis failed".to_string(),
    }
}

fn analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "intent": {"type": "string"},
            "complexity": {"type": "string", "enum": ["simple", "moderate", "complex"]},
            "requiredTools": {"type": "array", "items": {"type": "string"}},
            "likelySteps": {"type": "integer", "minimum": 1},
            "missingInfo": {"type": "array", "items": {"type": "string"}},
            "confidence": {"type": "number", "minimum": 0.0, "maximum": 1.0},
            "reasoning": {"type": "string"}
        },
        "required": ["intent", "complexity", "likelySteps", "confidence"]
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    intent: String,
    complexity: Complexity,
    #[serde(default)]
    required_tools: Vec<String>,
    likely_steps: u32,
    #[serde(default)]
    missing_info: Vec<String>,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

impl From<RawAnalysis> for MetapromptAnalysis {
    fn from(raw: RawAnalysis) -> Self {
        Self {
            intent: raw.intent,
            complexity: raw.complexity,
            required_tools: raw.required_tools,
            likely_steps: raw.likely_steps,
            missing_info: raw.missing_info,
            confidence: raw.confidence,
            reasoning: raw.reasoning,
        }
    }
}

/// Analyzes a message: template match first, then an AI call, falling
/// back to a keyword heuristic if the AI call is exhausted.
pub async fn analyze(client: &AiClient, text: &str, tool_catalogue: &[rfp_tools::ToolDef], tracker: &mut TokenBudgetTracker) -> Result<MetapromptAnalysis, RfpError> {
    if let Some(template_hit) = match_template(text) {
        return Ok(template_hit);
    }

    let tool_list = tool_catalogue.iter().map(|t| format!("- {}: {}", t.name, t.description)).collect::<Vec<_>>().join("\n");
    let system = format!(
        "Classify the user's request. Available tools:\n{tool_list}\n\nRespond with intent, complexity (simple/moderate/complex), requiredTools, likelySteps, missingInfo, confidence, and reasoning."
    );
    let messages = vec![Message { role: "system".to_string(), content: system }, Message { role: "user".to_string(), content: text.to_string() }];

    let text_owned = text.to_string();
    let schema = analysis_schema();
    let result = client
        .call_json::<RawAnalysis, _, _>(
            "metaprompt_analysis",
            &schema,
            messages,
            ReasoningEffort::Low,
            4000,
            |_: &RawAnalysis| None,
            Some(move || {
                let fallback = keyword_heuristic(&text_owned);
                RawAnalysis {
                    intent: fallback.intent,
                    complexity: fallback.complexity,
                    required_tools: fallback.required_tools,
                    likely_steps: fallback.likely_steps,
                    missing_info: fallback.missing_info,
                    confidence: fallback.confidence,
                    reasoning: fallback.reasoning,
                }
            }),
            Some(tracker),
        )
        .await?;

    Ok(result.into())
}

/// Maps a complexity bucket and the analysis's own step estimate to a
/// step budget, capped at twice the bucket's ceiling and floored at the
/// estimate plus 2 (`spec.md` §4.7 step 4).
pub fn step_budget(complexity: Complexity, likely_steps: u32) -> u32 {
    let (min_steps, max_steps) = match complexity {
        Complexity::Simple => (3, 5),
        Complexity::Moderate => (6, 10),
        Complexity::Complex => (12, 20),
    };
    let floor = (likely_steps + 2).max(min_steps);
    floor.min(max_steps * 2)
}
