//! Shared dependencies every tool handler is called with.

use crate::aws_runtime::{AwsRuntime, UnconfiguredAwsRuntime};
use crate::browser::{BrowserWorker, UnconfiguredBrowserWorker};
use crate::chat::{ChatAdapter, UnconfiguredChatAdapter};
use crate::github::{GitHubClient, UnconfiguredGitHubClient};
use rfp_memory::{ExternalContextCache, ExternalContextFetcher, ExternalSource, MemoryRepo, RelationshipStore};
use rfp_opportunity::{CatalogueRepo, OpportunityRepo};
use rfp_policy::PolicyEngine;
use rfp_store::{KeyValueStore, ObjectStore};
use std::sync::Arc;

/// Everything a tool handler needs to serve one call: repositories over the
/// shared key-value store, the allowlist policy engine, and the integration
/// adapters (AWS runtime, GitHub, chat, browser worker) a deployment wires
/// in. Adapters default to an "unconfigured" stub that fails closed with
/// [`rfp_error::ErrorCode::NotConfigured`], so a registry built without a
/// live integration still dispatches every tool — it just reports honestly
/// that the integration isn't available.
pub struct ToolContext {
    /// The wide key-value table.
    pub store: Arc<dyn KeyValueStore>,
    /// The content-addressed object store.
    pub objects: Arc<dyn ObjectStore>,
    /// RFP/proposal catalogue repository.
    pub catalogue: CatalogueRepo,
    /// Opportunity state/journal/event-log/binding repository.
    pub opportunity: OpportunityRepo,
    /// Typed memory repository.
    pub memory: MemoryRepo,
    /// Memory relationship graph.
    pub relationships: RelationshipStore,
    /// External-context fetch cache.
    pub external_context: ExternalContextCache,
    /// Fetchers registered per external-context source. A source with no
    /// fetcher registered reports [`rfp_error::ErrorCode::NotConfigured`].
    /// `ExternalSource` has no total order, so this is a small linear-scan
    /// association list rather than a map — fine at the handful of sources
    /// `spec.md` §4.10 defines.
    pub external_fetchers: Vec<(ExternalSource, Arc<dyn ExternalContextFetcher>)>,
    /// Tool/channel/repo/domain/key allowlist.
    pub policy: PolicyEngine,
    /// AWS runtime introspection (ECS/SQS/Secrets/Logs/telemetry).
    pub aws_runtime: Arc<dyn AwsRuntime>,
    /// GitHub API access.
    pub github: Arc<dyn GitHubClient>,
    /// Chat (Slack) read/reply adapter.
    pub chat: Arc<dyn ChatAdapter>,
    /// Remote browser-automation worker.
    pub browser: Arc<dyn BrowserWorker>,
}

impl ToolContext {
    /// Construct a context with every integration adapter left
    /// unconfigured; callers wire in real adapters with the `with_*`
    /// builders below.
    pub fn new(store: Arc<dyn KeyValueStore>, objects: Arc<dyn ObjectStore>, policy: PolicyEngine) -> Self {
        Self {
            catalogue: CatalogueRepo::new(store.clone()),
            opportunity: OpportunityRepo::new(store.clone()),
            memory: MemoryRepo::new(store.clone()),
            relationships: RelationshipStore::new(store.clone()),
            external_context: ExternalContextCache::new(store.clone()),
            external_fetchers: Vec::new(),
            store,
            objects,
            policy,
            aws_runtime: Arc::new(UnconfiguredAwsRuntime),
            github: Arc::new(UnconfiguredGitHubClient),
            chat: Arc::new(UnconfiguredChatAdapter),
            browser: Arc::new(UnconfiguredBrowserWorker),
        }
    }

    /// Registers a fetcher for one external-context source, replacing any
    /// fetcher already registered for it.
    pub fn with_external_fetcher(mut self, source: ExternalSource, fetcher: Arc<dyn ExternalContextFetcher>) -> Self {
        self.external_fetchers.retain(|(s, _)| *s != source);
        self.external_fetchers.push((source, fetcher));
        self
    }

    /// Looks up the fetcher registered for `source`, if any.
    pub fn external_fetcher(&self, source: ExternalSource) -> Option<&Arc<dyn ExternalContextFetcher>> {
        self.external_fetchers.iter().find(|(s, _)| *s == source).map(|(_, f)| f)
    }

    /// Wires in a live AWS runtime adapter.
    pub fn with_aws_runtime(mut self, aws_runtime: Arc<dyn AwsRuntime>) -> Self {
        self.aws_runtime = aws_runtime;
        self
    }

    /// Wires in a live GitHub adapter.
    pub fn with_github(mut self, github: Arc<dyn GitHubClient>) -> Self {
        self.github = github;
        self
    }

    /// Wires in a live chat adapter.
    pub fn with_chat(mut self, chat: Arc<dyn ChatAdapter>) -> Self {
        self.chat = chat;
        self
    }

    /// Wires in a live browser-automation worker.
    pub fn with_browser(mut self, browser: Arc<dyn BrowserWorker>) -> Self {
        self.browser = browser;
        self
    }
}
