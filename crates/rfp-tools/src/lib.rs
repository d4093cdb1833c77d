// SPDX-License-Identifier: MIT OR Apache-2.0
//! Agent tool registry for the RFP operator platform (`spec.md` §4.4
//! "Tools"): a uniform [`registry::ToolHandler`] contract, the
//! [`context::ToolContext`] every handler is called with, the integration
//! adapter traits a deployment wires in, and the concrete tool
//! implementations grouped by category.
//!
//! Every tool call goes through [`registry::ToolRegistry::dispatch`], which
//! enforces the allowlist, clips arguments, slims output, and always
//! returns a uniformly-shaped JSON value — never a Rust `Err` — per §7.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod action_proposal;
pub mod aws_runtime;
pub mod browser;
pub mod chat;
pub mod context;
pub mod github;
pub mod jobs;
pub mod memory;
pub mod opportunity;
pub mod registry;
pub mod rfp_proposal;
pub mod slim;
pub mod storage;

pub use context::ToolContext;
pub use registry::{ToolDef, ToolHandler, ToolRegistry};

use std::sync::Arc;

/// Builds a registry containing every read-only tool: catalogue/opportunity
/// reads, memory retrieval, external context, and direct storage reads.
/// Suitable for a caller that should never mutate durable state.
pub fn read_tools() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(rfp_proposal::ListRfpsTool));
    registry.register(Arc::new(rfp_proposal::SearchRfpsTool));
    registry.register(Arc::new(rfp_proposal::GetRfpTool));
    registry.register(Arc::new(rfp_proposal::ListProposalsTool));
    registry.register(Arc::new(rfp_proposal::SearchProposalsTool));
    registry.register(Arc::new(rfp_proposal::GetProposalTool));
    registry.register(Arc::new(rfp_proposal::ListTasksForRfpTool));

    registry.register(Arc::new(opportunity::OpportunityLoadTool));

    registry.register(Arc::new(memory::MemoryListByScopeTool));
    registry.register(Arc::new(memory::MemoryGetContextTool));
    registry.register(Arc::new(memory::RelationshipListFromTool));
    registry.register(Arc::new(memory::ExternalContextFetchTool));

    registry.register(Arc::new(storage::DdbGetItemTool));
    registry.register(Arc::new(storage::DdbQueryPkTool));
    registry.register(Arc::new(storage::DdbQueryGsi1Tool));
    registry.register(Arc::new(storage::S3HeadObjectTool));
    registry.register(Arc::new(storage::S3GetObjectTextTool));
    registry.register(Arc::new(storage::S3PresignGetTool));

    registry.register(Arc::new(jobs::AgentJobGetTool));
    registry.register(Arc::new(jobs::AgentJobListTool));
    registry.register(Arc::new(jobs::AgentJobQueryDueTool));

    registry.register(Arc::new(action_proposal::GetActionProposalTool));

    registry.register(Arc::new(aws_runtime::EcsDescribeServiceTool));
    registry.register(Arc::new(aws_runtime::EcsListTasksTool));
    registry.register(Arc::new(aws_runtime::EcsDescribeTaskDefinitionTool));
    registry.register(Arc::new(aws_runtime::SqsGetQueueDepthTool));
    registry.register(Arc::new(aws_runtime::SqsGetQueueAttributesTool));
    registry.register(Arc::new(aws_runtime::SecretsDescribeTool));
    registry.register(Arc::new(aws_runtime::LogsTailTool));
    registry.register(Arc::new(aws_runtime::TelemetrySearchLogsTool));
    registry.register(Arc::new(aws_runtime::TelemetryTopErrorsTool));

    registry.register(Arc::new(github::GetPullTool));
    registry.register(Arc::new(github::ListPullsTool));
    registry.register(Arc::new(github::ListCheckRunsTool));

    registry.register(Arc::new(chat::SlackListRecentMessagesTool));
    registry.register(Arc::new(chat::SlackGetThreadTool));

    registry
}

/// Builds a registry containing every tool, including the write tools that
/// mutate durable state or send outbound messages. Used for the operator
/// agent loop, which enforces load-before-write/write-before-talk itself
/// around this broader surface.
pub fn operator_tools() -> ToolRegistry {
    let mut registry = read_tools();

    registry.register(Arc::new(opportunity::OpportunityPatchTool));
    registry.register(Arc::new(opportunity::JournalAppendTool));
    registry.register(Arc::new(opportunity::EventAppendTool));

    registry.register(Arc::new(memory::MemoryCreateTool));
    registry.register(Arc::new(memory::RelationshipAddTool));

    registry.register(Arc::new(storage::S3PresignPutTool));

    registry.register(Arc::new(jobs::ScheduleJobTool));

    registry.register(Arc::new(action_proposal::ProposeActionTool));

    registry.register(Arc::new(github::CreateIssueTool));
    registry.register(Arc::new(github::CommentOnIssueOrPrTool));
    registry.register(Arc::new(github::AddLabelsTool));
    registry.register(Arc::new(github::RerunWorkflowRunTool));
    registry.register(Arc::new(github::DispatchWorkflowTool));

    registry.register(Arc::new(chat::SlackCreateCanvasTool));
    registry.register(Arc::new(chat::SlackPostSummaryTool));
    registry.register(Arc::new(chat::SlackAskClarifyingQuestionTool));
    registry.register(Arc::new(chat::SlackSendDmTool));
    registry.register(Arc::new(chat::RfpCreateFromSlackFileTool));

    registry.register(Arc::new(browser::BrowserNewContextTool));
    registry.register(Arc::new(browser::BrowserNewPageTool));
    registry.register(Arc::new(browser::BrowserGotoTool));
    registry.register(Arc::new(browser::BrowserClickTool));
    registry.register(Arc::new(browser::BrowserTypeTextTool));
    registry.register(Arc::new(browser::BrowserWaitForTool));
    registry.register(Arc::new(browser::BrowserExtractTool));
    registry.register(Arc::new(browser::BrowserScreenshotTool));
    registry.register(Arc::new(browser::BrowserTraceStartTool));
    registry.register(Arc::new(browser::BrowserTraceStopTool));
    registry.register(Arc::new(browser::BrowserCloseTool));

    registry
}
