//! Name-keyed registry of provider adapters.
//!
//! Model specs reference providers by name ("anthropic", "openai", "google",
//! "lmstudio"); the registry resolves those names to shared adapter handles.
//! Unconfigured providers stay registered so a run that selects one fails at
//! the model level with a clear error instead of failing resolution.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::{
    AnthropicAdapter, GoogleAdapter, LmStudioAdapter, OpenAiAdapter, SharedProviderAdapter,
};
use crate::config::CouncilConfig;

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

pub struct AdapterRegistry {
    adapters: BTreeMap<String, SharedProviderAdapter>,
}

/// Shared handle to the registry.
pub type SharedAdapterRegistry = Arc<AdapterRegistry>;

impl AdapterRegistry {
    /// Registry with no providers; callers register their own.
    pub fn empty() -> Self {
        Self {
            adapters: BTreeMap::new(),
        }
    }

    /// Registry with every built-in provider, sharing one HTTP client.
    pub fn from_config(config: &CouncilConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

        let mut registry = Self::empty();
        registry.register(
            "anthropic",
            Arc::new(AnthropicAdapter::new(
                config.anthropic_api_key.clone(),
                client.clone(),
            )),
        );
        registry.register(
            "openai",
            Arc::new(OpenAiAdapter::new(
                config.openai_api_key.clone(),
                client.clone(),
            )),
        );
        registry.register(
            "google",
            Arc::new(GoogleAdapter::new(
                config.google_api_key.clone(),
                client.clone(),
            )),
        );
        registry.register(
            "lmstudio",
            Arc::new(LmStudioAdapter::new(config.lmstudio_base_url.clone(), client)),
        );
        Ok(registry)
    }

    pub fn register(&mut self, name: impl Into<String>, adapter: SharedProviderAdapter) {
        self.adapters.insert(name.into(), adapter);
    }

    pub fn get(&self, provider: &str) -> Result<SharedProviderAdapter, RegistryError> {
        self.adapters
            .get(provider)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownProvider(provider.to_string()))
    }

    /// Registered provider names in stable order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SharedProviderAdapter)> {
        self.adapters
            .iter()
            .map(|(name, adapter)| (name.as_str(), adapter))
    }

    /// Wrap in an `Arc` for sharing across tasks.
    pub fn shared(self) -> SharedAdapterRegistry {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{AnswerOutput, ModelInfo, ProviderAdapter, ReviewOutput};
    use async_trait::async_trait;

    struct StubAdapter;

    #[async_trait]
    impl ProviderAdapter for StubAdapter {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn list_models(&self) -> Vec<ModelInfo> {
            vec![ModelInfo::new("stub-1", "Stub 1")]
        }

        async fn generate_answer(
            &self,
            _model: &str,
            _question: &str,
            _temperature: f64,
            _max_tokens: u32,
            _system_prompt: Option<&str>,
        ) -> AnswerOutput {
            AnswerOutput {
                text: "stub answer".to_string(),
                latency_ms: 1,
                tokens_in: None,
                tokens_out: None,
                error: None,
            }
        }

        async fn generate_review(
            &self,
            _model: &str,
            _review_prompt: &str,
            _temperature: f64,
            _max_tokens: u32,
        ) -> ReviewOutput {
            ReviewOutput::failure("stub has no reviews", 1)
        }
    }

    #[test]
    fn test_from_config_registers_builtin_providers() {
        let registry = AdapterRegistry::from_config(&CouncilConfig::default())
            .expect("client should build");

        assert_eq!(
            registry.provider_names(),
            vec!["anthropic", "google", "lmstudio", "openai"]
        );
        // Empty config: registered but unavailable.
        for (_, adapter) in registry.iter() {
            assert!(!adapter.is_available());
        }
    }

    #[test]
    fn test_unknown_provider_error() {
        let registry = AdapterRegistry::empty();
        let err = registry.get("petstore").unwrap_err();

        assert_eq!(err.to_string(), "Unknown provider: petstore");
    }

    #[tokio::test]
    async fn test_registered_adapter_resolves() {
        let mut registry = AdapterRegistry::empty();
        registry.register("stub", Arc::new(StubAdapter));

        let adapter = registry.get("stub").expect("stub is registered");
        let output = adapter.generate_answer("stub-1", "q", 0.7, 64, None).await;

        assert_eq!(output.text, "stub answer");
    }
}
