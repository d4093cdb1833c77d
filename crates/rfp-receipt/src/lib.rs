// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical JSON hashing, hash-chained event logs, and state diffing for
//! the RFP operator platform's audit trail (`spec.md` §3, §7).
//!
//! - [`canon`] turns any serializable value into a deterministic byte
//!   string and SHA-256 digest, independent of field order.
//! - [`chain`] links successive [`rfp_core::EventLogEntry`] rows into a
//!   tamper-evident chain via [`canon::hash_link`].
//! - [`diff`] summarizes what a patch changed between two
//!   [`rfp_core::OpportunityState`] snapshots, for compact audit entries.
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod canon;
pub mod chain;
pub mod diff;

pub use canon::{canonical_json, hash_link, hash_value, sha256_hex, CanonError};
pub use chain::{ChainError, EventChain};
pub use diff::{diff_opportunity_state, FieldChange};
