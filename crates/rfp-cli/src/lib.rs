// SPDX-License-Identifier: MIT OR Apache-2.0
//! Library surface backing the `rfp` CLI binary, so integration tests can
//! exercise command logic without spawning the process.
#![deny(unsafe_code)]

pub mod commands;
pub mod config;
pub mod format;
