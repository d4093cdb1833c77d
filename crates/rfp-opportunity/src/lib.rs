// SPDX-License-Identifier: MIT OR Apache-2.0
//! RFP/proposal catalogue, opportunity state, journal/event-log,
//! thread-binding, and contracting repositories for the RFP operator
//! platform (`spec.md` §3, §4.3, §4.4).
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod catalogue_repo;
pub mod contracting_repo;
pub mod opportunity_repo;

pub use catalogue_repo::{CatalogueRepo, ListPage};
pub use contracting_repo::ContractingRepo;
pub use opportunity_repo::{OpportunityRepo, PatchOutcome};
