//! Provider and factory configuration.
//!
//! Configuration is explicit structs with defaults resolved in one place;
//! providers receive a fully-formed [`ProviderConfig`] at `initialize` and
//! never probe for missing fields afterwards.

use std::collections::HashMap;
use std::time::Duration;

/// Per-provider setup supplied at `initialize`.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Credential for network-backed providers.
    pub api_key: Option<String>,
    /// Whole-call deadline covering retries and backoff sleeps.
    pub timeout: Duration,
    /// Maximum attempts for one upstream request.
    pub max_retries: u32,
    /// Base delay for the linear backoff curve (`base_delay * attempt`).
    pub base_delay: Duration,
    /// Endpoint override for network-backed providers.
    pub endpoint: Option<String>,
    /// Provider-specific string options (mock tuning, language, region).
    pub options: HashMap<String, String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            timeout: Duration::from_secs(10),
            max_retries: 3,
            base_delay: Duration::from_millis(300),
            endpoint: None,
            options: HashMap::new(),
        }
    }
}

impl ProviderConfig {
    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the endpoint override.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Adds a provider-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Factory bootstrap configuration, one per process lifetime.
#[derive(Debug, Clone)]
pub struct ProviderFactoryConfig {
    /// Name the factory resolves when a caller asks for no provider in
    /// particular. Must be registered and configured after `initialize`.
    pub default_provider: String,
    /// Per-provider configurations keyed by registered name.
    pub providers: HashMap<String, ProviderConfig>,
    /// Failover candidates, walked strictly in this order.
    pub fallbacks: Vec<String>,
    /// Whether failover-aware lookup health-checks and substitutes providers.
    pub enable_failover: bool,
}

impl ProviderFactoryConfig {
    /// Creates a configuration with the given default provider, no fallback
    /// chain, and failover enabled.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            default_provider: default_provider.into(),
            providers: HashMap::new(),
            fallbacks: Vec::new(),
            enable_failover: true,
        }
    }

    /// Adds a provider configuration.
    pub fn with_provider(mut self, name: impl Into<String>, config: ProviderConfig) -> Self {
        self.providers.insert(name.into(), config);
        self
    }

    /// Sets the fallback chain.
    pub fn with_fallbacks<S: Into<String>>(mut self, fallbacks: Vec<S>) -> Self {
        self.fallbacks = fallbacks.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables failover.
    pub fn with_failover(mut self, enable_failover: bool) -> Self {
        self.enable_failover = enable_failover;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_provider_config_values() {
        let config = ProviderConfig::default();

        assert!(config.api_key.is_none());
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay, Duration::from_millis(300));
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_factory_config_builder() {
        let config = ProviderFactoryConfig::new("google_places")
            .with_provider("google_places", ProviderConfig::default().with_api_key("k"))
            .with_provider("mock", ProviderConfig::default())
            .with_fallbacks(vec!["mock"])
            .with_failover(true);

        assert_eq!(config.default_provider, "google_places");
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.fallbacks, vec!["mock".to_string()]);
        assert!(config.enable_failover);
    }
}
