// SPDX-License-Identifier: MIT OR Apache-2.0
//! Allowlist policy and durable-write sanitization for the RFP operator
//! platform (`spec.md` §4.3, §6, §9).
//!
//! Two independent concerns live here: [`PolicyEngine`] answers "is this
//! tool/channel/repo/domain/key allowed at all" (glob-compiled allowlists,
//! mirroring the teacher's include/exclude policy engine), and
//! [`sanitize_opportunity_patch`] answers "does this specific durable write
//! satisfy the invariants it must carry" (commitment provenance). Neither
//! crate downstream of this one should re-derive either check.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod allowlist;
mod sanitize;

pub use allowlist::{AllowlistConfig, Decision, PolicyEngine, DEFAULT_KEY_PREFIXES};
pub use sanitize::{
    sanitize_opportunity_patch, RawCommitment, RawOpportunityPatch, RawProvenance, SanitizedPatch,
};
