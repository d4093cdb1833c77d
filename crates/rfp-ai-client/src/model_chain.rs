//! Per-purpose model chain resolution: configured primary → global default
//! → known-safe (`spec.md` §4.5).

use rfp_config::ModelChainConfig;

/// A model the client can fail over to if the current one returns a
/// model-access error.
pub const KNOWN_SAFE_MODEL: &str = "gpt-4o-mini";

/// Resolves the ordered list of models to try for one purpose.
pub struct ModelChain {
    models: Vec<String>,
}

impl ModelChain {
    /// Build a chain for `purpose` from configured chains, falling back to
    /// `global_default` and finally [`KNOWN_SAFE_MODEL`]. Duplicates are
    /// dropped, preserving first occurrence.
    pub fn for_purpose(purpose: &str, chains: &[ModelChainConfig], global_default: &str) -> Self {
        let mut models = Vec::new();
        if let Some(chain) = chains.iter().find(|c| c.purpose == purpose) {
            models.extend(chain.models.iter().cloned());
        }
        models.push(global_default.to_string());
        models.push(KNOWN_SAFE_MODEL.to_string());

        let mut seen = std::collections::BTreeSet::new();
        models.retain(|m| seen.insert(m.clone()));

        Self { models }
    }

    /// The model to try first.
    pub fn primary(&self) -> &str {
        &self.models[0]
    }

    /// The next model after `tried`, if any remain. On a model-access
    /// error the caller breaks to this model without retrying the
    /// current one.
    pub fn next_after(&self, tried: &str) -> Option<&str> {
        let idx = self.models.iter().position(|m| m == tried)?;
        self.models.get(idx + 1).map(|s| s.as_str())
    }

    /// All models in try order.
    pub fn models(&self) -> &[String] {
        &self.models
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_through_default_then_known_safe() {
        let chain = ModelChain::for_purpose("rfp_extraction", &[], "gpt-4o");
        assert_eq!(chain.models(), &["gpt-4o".to_string(), KNOWN_SAFE_MODEL.to_string()]);
    }

    #[test]
    fn configured_purpose_chain_comes_first() {
        let configured = vec![ModelChainConfig { purpose: "rfp_extraction".to_string(), models: vec!["gpt-5.2".to_string()], default_effort: "medium".to_string() }];
        let chain = ModelChain::for_purpose("rfp_extraction", &configured, "gpt-4o");
        assert_eq!(chain.primary(), "gpt-5.2");
        assert_eq!(chain.next_after("gpt-5.2"), Some("gpt-4o"));
        assert_eq!(chain.next_after("gpt-4o"), Some(KNOWN_SAFE_MODEL));
        assert_eq!(chain.next_after(KNOWN_SAFE_MODEL), None);
    }

    #[test]
    fn deduplicates_models_across_tiers() {
        let configured = vec![ModelChainConfig { purpose: "x".to_string(), models: vec!["gpt-4o".to_string()], default_effort: "medium".to_string() }];
        let chain = ModelChain::for_purpose("x", &configured, "gpt-4o");
        assert_eq!(chain.models(), &["gpt-4o".to_string(), KNOWN_SAFE_MODEL.to_string()]);
    }
}
