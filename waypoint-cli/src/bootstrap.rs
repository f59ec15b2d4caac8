//! Environment-driven factory bootstrap.
//!
//! Static registration happens here: the entry point constructs each concrete
//! provider, registers it by name, and builds the factory configuration from
//! environment variables. The factory refuses to start when the resolved
//! default provider cannot be configured.

use std::sync::Arc;
use std::time::Duration;

use waypoint_search::providers::{google_places, mock};
use waypoint_search::{
    GooglePlacesProvider, MockPlacesProvider, ProviderConfig, ProviderFactory,
    ProviderFactoryConfig,
};

/// Constructs a factory with every concrete provider registered.
pub fn build_factory() -> ProviderFactory {
    let factory = ProviderFactory::new();
    factory.register(
        google_places::PROVIDER_NAME,
        Arc::new(GooglePlacesProvider::new()),
    );
    factory.register(mock::PROVIDER_NAME, Arc::new(MockPlacesProvider::new()));
    factory
}

/// Builds the factory configuration from the process environment.
///
/// The Google provider is only configured when `GOOGLE_PLACES_API_KEY` is
/// present; without it the default provider falls back to the mock so the
/// tool still works offline.
pub fn factory_config_from_env() -> ProviderFactoryConfig {
    let api_key = non_empty_var("GOOGLE_PLACES_API_KEY");

    let mut shared = ProviderConfig::default();
    if let Some(ms) = parse_var::<u64>("PLACES_TIMEOUT_MS") {
        shared.timeout = Duration::from_millis(ms);
    }
    if let Some(retries) = parse_var::<u32>("PLACES_MAX_RETRIES") {
        shared.max_retries = retries;
    }
    if let Some(ms) = parse_var::<u64>("PLACES_BASE_DELAY_MS") {
        shared.base_delay = Duration::from_millis(ms);
    }

    let mut mock_config = shared.clone();
    for (env_name, option) in [
        ("MOCK_DELAY_MS", "delay_ms"),
        ("MOCK_SIMULATE_FAILURES", "simulate_failures"),
        ("MOCK_FAILURE_RATE", "failure_rate"),
        ("MOCK_MAX_RESULTS", "max_results"),
    ] {
        if let Some(value) = non_empty_var(env_name) {
            mock_config.options.insert(option.to_string(), value);
        }
    }

    let default_provider = non_empty_var("PLACES_PROVIDER").unwrap_or_else(|| {
        if api_key.is_some() {
            google_places::PROVIDER_NAME.to_string()
        } else {
            mock::PROVIDER_NAME.to_string()
        }
    });

    let enable_failover = parse_var::<bool>("ENABLE_PROVIDER_FAILOVER").unwrap_or(true);

    let mut config = ProviderFactoryConfig::new(default_provider)
        .with_provider(mock::PROVIDER_NAME, mock_config)
        .with_fallbacks(vec![mock::PROVIDER_NAME])
        .with_failover(enable_failover);

    if let Some(api_key) = api_key {
        let mut google = shared.with_api_key(api_key);
        if let Some(endpoint) = non_empty_var("GOOGLE_PLACES_ENDPOINT") {
            google.endpoint = Some(endpoint);
        }
        if let Some(language) = non_empty_var("PLACES_LANGUAGE") {
            google.options.insert("language".to_string(), language);
        }
        if let Some(region) = non_empty_var("PLACES_REGION") {
            google.options.insert("region".to_string(), region);
        }
        config = config.with_provider(google_places::PROVIDER_NAME, google);
    }

    config
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    match non_empty_var(name) {
        Some(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(var = name, value = raw.as_str(), "ignoring unparseable value");
                None
            }
        },
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_registers_both_providers() {
        let factory = build_factory();
        let stats = factory.stats();

        assert!(!stats.initialized);
        assert_eq!(stats.registered, vec!["google_places", "mock"]);
    }

    #[test]
    fn test_env_overrides_and_defaults() {
        unsafe {
            std::env::remove_var("GOOGLE_PLACES_API_KEY");
            std::env::remove_var("PLACES_PROVIDER");
            std::env::set_var("PLACES_TIMEOUT_MS", "2500");
            std::env::set_var("PLACES_MAX_RETRIES", "5");
            std::env::set_var("MOCK_DELAY_MS", "0");
            std::env::set_var("ENABLE_PROVIDER_FAILOVER", "false");
        }

        let config = factory_config_from_env();

        // No API key: mock becomes the default and Google is not configured.
        assert_eq!(config.default_provider, "mock");
        assert!(!config.providers.contains_key("google_places"));
        assert!(!config.enable_failover);

        let mock_config = &config.providers["mock"];
        assert_eq!(mock_config.timeout, Duration::from_millis(2500));
        assert_eq!(mock_config.max_retries, 5);
        assert_eq!(
            mock_config.options.get("delay_ms").map(String::as_str),
            Some("0")
        );

        unsafe {
            std::env::remove_var("PLACES_TIMEOUT_MS");
            std::env::remove_var("PLACES_MAX_RETRIES");
            std::env::remove_var("MOCK_DELAY_MS");
            std::env::remove_var("ENABLE_PROVIDER_FAILOVER");
        }
    }
}
