// SPDX-License-Identifier: MIT OR Apache-2.0
//! Agent runtime for the RFP operator platform (`spec.md` §4.7): thread
//! shortcuts, RFP-scope detection, metaprompt analysis and step budgeting,
//! context assembly, load-before-write/write-before-talk protocol
//! enforcement, the tool-using conversational loop itself in
//! [`runtime::AgentRuntime`], and the post-turn learning hooks in
//! [`learning`].
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Assembles a turn's context as priority-ordered, budget-truncated text
/// blocks.
pub mod context;
/// Post-turn learning hooks: episodic memory, collaboration detection,
/// temporal event extraction, relationship linking.
pub mod learning;
/// Classifies a message's intent/complexity and derives a step budget.
pub mod metaprompt;
/// Load-before-write and write-before-talk enforcement for one tool loop.
pub mod protocol;
/// The tool-using conversational loop tying every other module together.
pub mod runtime;
/// RFP-scope detection: pulling an id out of a message or classifying
/// whether one is needed at all.
pub mod scope;
/// Thread shortcuts handled without the metaprompt or tool loop.
pub mod shortcuts;

pub use context::{ContextBlock, ContextBuilder, TurnContext};
pub use protocol::ProtocolState;
pub use runtime::{AgentRuntime, IncomingMessage, TurnOutcome};
pub use scope::{IntentClassifier, KeywordIntentClassifier, RequiresRfp};
pub use shortcuts::Shortcut;

/// Default per-turn token budget for context assembly and the tool loop,
/// absent a more specific time- or plan-derived budget.
pub const DEFAULT_TURN_BUDGET_TOKENS: u64 = 16_000;
