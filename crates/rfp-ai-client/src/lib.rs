// SPDX-License-Identifier: MIT OR Apache-2.0
//! Model invocation for the RFP operator platform (`spec.md` §4.5).
//!
//! [`ChatProvider`] is the seam a concrete backend implements; [`AiClient`]
//! layers the per-purpose model chain, circuit breaker, retry backoff, and
//! budget accounting on top of it. [`mock::MockChatProvider`] backs tests
//! without a live model.
#![deny(unsafe_code)]
#![warn(missing_docs)]

mod circuit_breaker;
mod client;
mod model_chain;
pub mod mock;
mod provider;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use client::AiClient;
pub use model_chain::{ModelChain, KNOWN_SAFE_MODEL};
pub use provider::{ChatJsonResponse, ChatProvider, ChatRequest, ChatTextResponse, JsonMode, ReasoningEffort};
