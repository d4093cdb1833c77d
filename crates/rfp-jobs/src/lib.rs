// SPDX-License-Identifier: MIT OR Apache-2.0
//! Durable job queue for the RFP operator platform (`spec.md` §4.9): a
//! [`queue::JobQueueRepo`] for idempotent scheduling, due-polling, and
//! atomic claim, plus [`checkpoint::CheckpointRepo`] for orchestrator
//! write-ahead progress (`spec.md` §4.8). `rfp-executor` is the worker that
//! drives both against an actual execution plan.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod checkpoint;
pub mod queue;

pub use checkpoint::CheckpointRepo;
pub use queue::{case_id_for_scope, JobQueueRepo};
