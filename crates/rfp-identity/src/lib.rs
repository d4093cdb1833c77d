// SPDX-License-Identifier: MIT OR Apache-2.0
//! User identity resolution across Slack, email, and account sub, with a
//! short-lived cache (`spec.md` §4.6).
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod directory;
pub mod identity;
pub mod resolver;

pub use directory::{DirectoryLookup, InMemoryDirectory, SlackUser};
pub use identity::UserIdentity;
pub use resolver::{IdentityResolver, CACHE_TTL};
