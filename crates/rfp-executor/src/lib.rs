// SPDX-License-Identifier: MIT OR Apache-2.0
//! Job executor for the RFP operator platform (`spec.md` §4.8): retrieval-
//! augmented planning via [`plan::Planner`], checkpointed step-by-step
//! execution with per-step fallback via [`step::run_step`], and
//! [`orchestrator::Orchestrator`] tying both to [`rfp_jobs`]'s durable
//! queue and checkpoint store.
#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Ties the job queue, checkpoint store, planner, and tool registry
/// together to drive one claimed job end to end.
pub mod orchestrator;
/// Plan/step/alternative types and the AI-backed planner.
pub mod plan;
/// Retrieval-augmented planning context sourced from procedural memories.
pub mod retrieval;
/// Per-step tool dispatch with retry and alternative-approach fallback.
pub mod step;

pub use orchestrator::Orchestrator;
pub use plan::{AiPlanner, AlternativeApproach, Plan, Planner, SimilarJob, Step};
