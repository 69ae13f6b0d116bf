//! Runtime configuration for the council.

use std::path::PathBuf;

/// Sampling temperature for answer generation when a model spec has none.
pub const DEFAULT_ANSWER_TEMPERATURE: f64 = 0.7;
/// Token budget for answer generation when a model spec has none.
pub const DEFAULT_ANSWER_MAX_TOKENS: u32 = 2048;
/// Reviews run cooler than answers so rankings stay consistent.
pub const DEFAULT_REVIEW_TEMPERATURE: f64 = 0.3;
/// Reviews need room for per-answer critiques on top of the rankings.
pub const DEFAULT_REVIEW_MAX_TOKENS: u32 = 4096;
/// Upper bound on concurrent provider calls per phase.
pub const DEFAULT_MAX_CONCURRENCY: usize = 6;
/// On-disk state directory when none is configured.
pub const DEFAULT_STATE_PATH: &str = ".council-state";

/// Provider credentials plus orchestration knobs.
///
/// An empty credential leaves the matching provider registered but
/// unavailable; runs that select it get per-model error results rather than
/// a startup failure.
#[derive(Debug, Clone)]
pub struct CouncilConfig {
    pub anthropic_api_key: String,
    pub openai_api_key: String,
    pub google_api_key: String,
    pub lmstudio_base_url: String,
    pub max_concurrency: usize,
    pub state_path: PathBuf,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: String::new(),
            openai_api_key: String::new(),
            google_api_key: String::new(),
            lmstudio_base_url: String::new(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}

impl CouncilConfig {
    /// Load configuration from the environment, keeping defaults for
    /// anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.anthropic_api_key = key;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = key;
        }
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            config.google_api_key = key;
        }
        if let Ok(url) = std::env::var("LMSTUDIO_BASE_URL") {
            config.lmstudio_base_url = url;
        }
        if let Ok(value) = std::env::var("COUNCIL_MAX_CONCURRENCY") {
            if let Ok(parsed) = value.parse::<usize>() {
                if parsed > 0 {
                    config.max_concurrency = parsed;
                }
            }
        }
        if let Ok(path) = std::env::var("COUNCIL_STATE_PATH") {
            config.state_path = PathBuf::from(path);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CouncilConfig::default();

        assert!(config.anthropic_api_key.is_empty());
        assert!(config.lmstudio_base_url.is_empty());
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.state_path, PathBuf::from(DEFAULT_STATE_PATH));
    }

    #[test]
    fn test_invalid_concurrency_falls_back_to_default() {
        std::env::set_var("COUNCIL_MAX_CONCURRENCY", "zero");
        let config = CouncilConfig::from_env();
        std::env::remove_var("COUNCIL_MAX_CONCURRENCY");

        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
    }
}
