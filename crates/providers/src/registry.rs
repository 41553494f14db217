//! Provider registry.
//!
//! Holds one adapter per provider type plus the optional embedder used
//! by the semantic safety filter. Built once at startup from config;
//! tests swap in scripted providers via [`ProviderRegistry::with_provider`].

use std::collections::HashMap;
use std::sync::Arc;

use da_domain::config::Config;
use da_domain::error::{Error, ProviderType, Result};

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::{DebateProvider, Embedder};

pub struct ProviderRegistry {
    providers: HashMap<ProviderType, Arc<dyn DebateProvider>>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl ProviderRegistry {
    /// Build real adapters from the configured API keys.
    ///
    /// Unconfigured providers still get an adapter (so `is_configured`
    /// and health checks have something to report); they fail with an
    /// auth error when actually invoked.
    pub fn from_config(config: &Config) -> Self {
        let openai = Arc::new(OpenAiCompatProvider::openai(config.openai_api_key.clone()));
        let embedder: Option<Arc<dyn Embedder>> = if openai.is_configured() {
            Some(openai.clone())
        } else {
            None
        };

        let mut providers: HashMap<ProviderType, Arc<dyn DebateProvider>> = HashMap::new();
        providers.insert(ProviderType::Openai, openai);
        providers.insert(
            ProviderType::Anthropic,
            Arc::new(AnthropicProvider::new(config.anthropic_api_key.clone())),
        );
        providers.insert(
            ProviderType::Xai,
            Arc::new(OpenAiCompatProvider::xai(config.xai_api_key.clone())),
        );

        Self {
            providers,
            embedder,
        }
    }

    /// Empty registry for tests; populate with [`Self::with_provider`].
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
            embedder: None,
        }
    }

    /// Replace (or install) the adapter for its provider type.
    pub fn with_provider(mut self, provider: Arc<dyn DebateProvider>) -> Self {
        self.providers.insert(provider.provider_type(), provider);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Look up the adapter for a provider type.
    pub fn get(&self, provider: ProviderType) -> Result<Arc<dyn DebateProvider>> {
        self.providers
            .get(&provider)
            .cloned()
            .ok_or_else(|| Error::Config(format!("no adapter registered for {provider}")))
    }

    /// The moderator/judge provider (always Anthropic).
    pub fn moderator(&self) -> Result<Arc<dyn DebateProvider>> {
        self.get(ProviderType::Anthropic)
    }

    pub fn embedder(&self) -> Option<Arc<dyn Embedder>> {
        self.embedder.clone()
    }

    /// Provider types with credentials present.
    pub fn configured(&self) -> Vec<ProviderType> {
        let mut list: Vec<ProviderType> = self
            .providers
            .values()
            .filter(|p| p.is_configured())
            .map(|p| p.provider_type())
            .collect();
        list.sort_by_key(|p| p.as_str());
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use da_domain::config::{BudgetConfig, SafetyConfig};

    fn config_with_keys() -> Config {
        Config {
            session_secret: "0123456789abcdef0123456789abcdef".into(),
            anthropic_api_key: Some("a".into()),
            openai_api_key: Some("o".into()),
            xai_api_key: None,
            budget: BudgetConfig::default(),
            safety: SafetyConfig::default(),
            bind_addr: "127.0.0.1:0".into(),
            session_ttl_secs: 3_600,
        }
    }

    #[test]
    fn builds_all_three_adapters() {
        let registry = ProviderRegistry::from_config(&config_with_keys());
        for p in ProviderType::ALL {
            assert!(registry.get(p).is_ok());
        }
        assert!(registry.moderator().unwrap().is_configured());
    }

    #[test]
    fn configured_reflects_present_keys() {
        let registry = ProviderRegistry::from_config(&config_with_keys());
        let configured = registry.configured();
        assert!(configured.contains(&ProviderType::Openai));
        assert!(configured.contains(&ProviderType::Anthropic));
        assert!(!configured.contains(&ProviderType::Xai));
    }

    #[test]
    fn embedder_requires_openai_key() {
        let registry = ProviderRegistry::from_config(&config_with_keys());
        assert!(registry.embedder().is_some());

        let mut cfg = config_with_keys();
        cfg.openai_api_key = None;
        let registry = ProviderRegistry::from_config(&cfg);
        assert!(registry.embedder().is_none());
    }
}
