//! Budget tracking for a long-running agent job (`spec.md` §4.1).

use crate::counter::{
    calculate_cost, count_tokens, estimate_time_to_tokens, tokens_to_time_budget,
    DEFAULT_BUDGET_MODEL,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cumulative token and cost usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TokenUsage {
    /// Cumulative input tokens.
    pub input_tokens: u64,
    /// Cumulative output tokens.
    pub output_tokens: u64,
    /// `input_tokens + output_tokens`.
    pub total_tokens: u64,
    /// Cumulative cost in USD.
    pub cost_usd: f64,
    /// Model these totals were priced against.
    pub model: Option<String>,
}

/// Self-reported status band for [`TokenBudgetTracker::budget_status_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    /// More than 50% of the budget remains.
    Healthy,
    /// 25-50% remains.
    Moderate,
    /// 10-25% remains.
    Low,
    /// 10% or less remains.
    Critical,
}

impl BudgetStatus {
    fn from_percent(percent: f64) -> Self {
        if percent > 50.0 {
            Self::Healthy
        } else if percent > 25.0 {
            Self::Moderate
        } else if percent > 10.0 {
            Self::Low
        } else {
            Self::Critical
        }
    }

    /// Uppercase band name, e.g. `"HEALTHY"`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Healthy => "HEALTHY",
            Self::Moderate => "MODERATE",
            Self::Low => "LOW",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Tracks token budget and usage for a long-running job, the way the
/// agent runtime checkpoints it between steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TokenBudgetTracker {
    /// Total token budget.
    pub budget_tokens: u64,
    /// Model this tracker prices against.
    pub model: String,
    /// Cumulative usage so far.
    pub usage: TokenUsage,
}

impl TokenBudgetTracker {
    /// Construct a tracker with an explicit token budget.
    pub fn new(budget_tokens: u64, model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            budget_tokens,
            model: model.clone(),
            usage: TokenUsage {
                model: Some(model),
                ..TokenUsage::default()
            },
        }
    }

    /// Records one LLM call's usage, counting missing sides from raw text
    /// if token counts are not already known, and returns that call's
    /// [`TokenUsage`] (not the cumulative total).
    pub fn record_llm_call(
        &mut self,
        input_text: Option<&str>,
        output_text: Option<&str>,
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
    ) -> TokenUsage {
        let input_tokens =
            input_tokens.unwrap_or_else(|| count_tokens(input_text.unwrap_or(""), Some(&self.model)) as u64);
        let output_tokens =
            output_tokens.unwrap_or_else(|| count_tokens(output_text.unwrap_or(""), Some(&self.model)) as u64);
        let total = input_tokens + output_tokens;
        let cost = calculate_cost(input_tokens, output_tokens, Some(&self.model));

        self.usage.input_tokens += input_tokens;
        self.usage.output_tokens += output_tokens;
        self.usage.total_tokens += total;
        self.usage.cost_usd += cost;

        tracing::debug!(
            target: "rfp.budget",
            call_input_tokens = input_tokens,
            call_output_tokens = output_tokens,
            call_total = total,
            call_cost = cost,
            total_used = self.usage.total_tokens,
            remaining = self.remaining_tokens(),
            "token_usage_recorded"
        );

        TokenUsage {
            input_tokens,
            output_tokens,
            total_tokens: total,
            cost_usd: cost,
            model: Some(self.model.clone()),
        }
    }

    /// Remaining token budget, floored at zero.
    pub fn remaining_tokens(&self) -> u64 {
        self.budget_tokens.saturating_sub(self.usage.total_tokens)
    }

    /// Remaining budget as a percentage of the total.
    pub fn remaining_budget_percent(&self) -> f64 {
        if self.budget_tokens == 0 {
            return 100.0;
        }
        (self.remaining_tokens() as f64 / self.budget_tokens as f64) * 100.0
    }

    /// Whether the budget has been fully consumed.
    pub fn is_budget_exhausted(&self) -> bool {
        self.remaining_tokens() == 0
    }

    /// Whether `estimated_tokens` more can be spent without exceeding the
    /// budget.
    pub fn can_afford(&self, estimated_tokens: u64) -> bool {
        self.remaining_tokens() >= estimated_tokens
    }

    /// Token estimate for `text` under this tracker's model.
    pub fn estimate_tokens(&self, text: &str) -> u64 {
        count_tokens(text, Some(&self.model)) as u64
    }

    /// Whether `text` can be added without exceeding the budget.
    pub fn can_add(&self, text: &str) -> bool {
        self.can_afford(self.estimate_tokens(text))
    }

    /// Builds a tracker from an explicit cost budget, a minutes budget, or
    /// (if neither is given) a default of 15 minutes. A cost budget takes
    /// precedence over a minutes budget when both are supplied.
    pub fn from_time_budget(
        minutes: Option<f64>,
        cost_budget_usd: Option<f64>,
        model: Option<&str>,
        default_minutes: f64,
    ) -> Self {
        let model = model.unwrap_or(DEFAULT_BUDGET_MODEL);
        let budget_tokens = if let Some(cost) = cost_budget_usd {
            tokens_to_time_budget(cost, Some(model))
        } else if let Some(minutes) = minutes {
            estimate_time_to_tokens(minutes, Some(model))
        } else {
            estimate_time_to_tokens(default_minutes, Some(model))
        };
        Self::new(budget_tokens, model)
    }

    /// Self-reported status band.
    pub fn status(&self) -> BudgetStatus {
        BudgetStatus::from_percent(self.remaining_budget_percent())
    }

    /// Human-readable budget status block for the agent's own awareness
    /// (embedded in its system prompt's budget line).
    pub fn budget_status_message(&self) -> String {
        let remaining = self.remaining_tokens();
        let percent = self.remaining_budget_percent();
        let used = self.usage.total_tokens;
        let cost = self.usage.cost_usd;
        let status = self.status();

        let mut message = format!("Token Budget Status: {}\n", status.label());
        message.push_str(&format!("- Budget: {} tokens\n", self.budget_tokens));
        message.push_str(&format!("- Used: {used} tokens ({:.1}%)\n", 100.0 - percent));
        message.push_str(&format!("- Remaining: {remaining} tokens ({percent:.1}%)\n"));
        message.push_str(&format!("- Cost so far: ${cost:.4}\n"));

        message.push_str(match status {
            BudgetStatus::Critical => {
                "\nBudget is critically low. Prioritize completing the current task and providing a final answer.\n"
            }
            BudgetStatus::Low => "\nBudget is low. Consider wrapping up and providing a final answer soon.\n",
            BudgetStatus::Moderate => "\nBudget is moderate. Continue working but be mindful of remaining budget.\n",
            BudgetStatus::Healthy => "\nBudget is healthy. Continue exploring and refining the solution.\n",
        });
        message
    }
}
