//! Provider factory and failover orchestration.
//!
//! The factory is the sole owner of provider instances. It is an explicit,
//! injected value rather than a process-wide global, so tests can build
//! isolated registries. Registration happens up front (static registration by
//! the process entry point); after `initialize` the registry is effectively
//! read-only.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::{join_all, try_join_all};
use parking_lot::RwLock;
use serde::Serialize;

use crate::config::ProviderFactoryConfig;
use crate::errors::ProviderError;
use crate::providers::PlaceSearchProvider;
use crate::types::HealthCheckResult;

/// Provider name attached to errors originating in the factory itself.
pub const FACTORY_NAME: &str = "factory";

/// Registry of named providers with health-checked failover.
#[derive(Debug, Default)]
pub struct ProviderFactory {
    registry: RwLock<HashMap<String, Arc<dyn PlaceSearchProvider>>>,
    config: RwLock<Option<ProviderFactoryConfig>>,
    initialized: AtomicBool,
}

/// Read-only snapshot of factory state, side-effect free.
#[derive(Debug, Clone, Serialize)]
pub struct FactoryStats {
    /// Whether `initialize` has completed.
    pub initialized: bool,
    /// Registered provider names, sorted.
    pub registered: Vec<String>,
    /// Configured default provider, when initialized.
    pub default_provider: Option<String>,
    /// Whether failover-aware lookup substitutes unhealthy providers.
    pub failover_enabled: bool,
    /// Configured fallback chain, in declared order.
    pub fallbacks: Vec<String>,
}

impl ProviderFactory {
    /// Creates an empty factory in the not-ready state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or silently overwrites a provider binding.
    ///
    /// No configuration or health check happens here; that is `initialize`'s
    /// job.
    pub fn register(&self, name: impl Into<String>, provider: Arc<dyn PlaceSearchProvider>) {
        let name = name.into();
        let previous = self.registry.write().insert(name.clone(), provider);
        if previous.is_some() {
            tracing::debug!(
                provider = name.as_str(),
                "re-registered provider, previous binding replaced"
            );
        }
    }

    /// Initializes every configured provider and transitions the factory to
    /// ready.
    ///
    /// Initializations run in parallel. Configurations naming unregistered
    /// providers are logged and skipped; a single initialization failure
    /// aborts the whole call. The default provider must end up registered and
    /// configured or this is a hard startup failure.
    ///
    /// # Errors
    /// - Any error a provider's `initialize` surfaces, unchanged
    /// - `ProviderErrorKind::InvalidRequest` - default provider unregistered
    ///   or unconfigured after initialization
    pub async fn initialize(&self, config: ProviderFactoryConfig) -> Result<(), ProviderError> {
        let mut pending = Vec::new();
        {
            let registry = self.registry.read();
            for (name, provider_config) in &config.providers {
                match registry.get(name) {
                    Some(provider) => {
                        pending.push((name.clone(), Arc::clone(provider), provider_config.clone()));
                    }
                    None => tracing::warn!(
                        provider = name.as_str(),
                        "configuration references unregistered provider, skipping"
                    ),
                }
            }
        }

        try_join_all(pending.into_iter().map(
            |(name, provider, provider_config)| async move {
                provider.initialize(provider_config).await.map_err(|error| {
                    tracing::error!(
                        provider = name.as_str(),
                        error = %error,
                        "provider initialization failed"
                    );
                    error
                })?;
                tracing::info!(provider = name.as_str(), "provider initialized");
                Ok::<(), ProviderError>(())
            },
        ))
        .await?;

        let default = self
            .registry
            .read()
            .get(&config.default_provider)
            .cloned()
            .ok_or_else(|| {
                ProviderError::invalid_request(
                    FACTORY_NAME,
                    format!(
                        "Default provider '{}' is not registered",
                        config.default_provider
                    ),
                )
            })?;
        if !default.is_configured() {
            return Err(ProviderError::invalid_request(
                FACTORY_NAME,
                format!(
                    "Default provider '{}' is not configured",
                    config.default_provider
                ),
            ));
        }

        *self.config.write() = Some(config);
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Returns the named (or default) provider without any health check.
    ///
    /// # Errors
    /// - `ProviderErrorKind::ServiceUnavailable` - factory not ready, or the
    ///   resolved provider is not configured
    /// - `ProviderErrorKind::InvalidRequest` - name is not registered
    pub fn provider(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<dyn PlaceSearchProvider>, ProviderError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(ProviderError::service_unavailable(
                FACTORY_NAME,
                "Factory is not initialized",
            ));
        }

        let resolved = match name {
            Some(name) => name.to_string(),
            None => self
                .config
                .read()
                .as_ref()
                .map(|c| c.default_provider.clone())
                .ok_or_else(|| {
                    ProviderError::service_unavailable(FACTORY_NAME, "Factory is not initialized")
                })?,
        };

        let provider = self
            .registry
            .read()
            .get(&resolved)
            .cloned()
            .ok_or_else(|| {
                ProviderError::invalid_request(
                    FACTORY_NAME,
                    format!("Provider '{resolved}' is not registered"),
                )
            })?;

        if !provider.is_configured() {
            return Err(ProviderError::service_unavailable(
                FACTORY_NAME,
                format!("Provider '{resolved}' is not configured"),
            ));
        }

        Ok(provider)
    }

    /// Returns a provider known-healthy at call time, walking the fallback
    /// chain when the primary is unavailable or unhealthy.
    ///
    /// With failover disabled this behaves exactly like [`Self::provider`].
    /// Candidates after the first healthy one are never queried.
    ///
    /// # Errors
    /// - `ProviderErrorKind::ServiceUnavailable` with provider `"factory"`
    ///   and `retryable: true` when every candidate is unavailable or
    ///   unhealthy
    pub async fn provider_with_failover(
        &self,
        preferred: Option<&str>,
    ) -> Result<Arc<dyn PlaceSearchProvider>, ProviderError> {
        let (enable_failover, default_provider, fallbacks) = match self.config.read().as_ref() {
            Some(config) => (
                config.enable_failover,
                config.default_provider.clone(),
                config.fallbacks.clone(),
            ),
            None => {
                return Err(ProviderError::service_unavailable(
                    FACTORY_NAME,
                    "Factory is not initialized",
                ));
            }
        };

        if !enable_failover {
            return self.provider(preferred);
        }

        let primary = preferred.map_or(default_provider, str::to_string);
        let mut candidates = vec![primary.clone()];
        candidates.extend(fallbacks);

        for candidate in &candidates {
            let provider = match self.provider(Some(candidate)) {
                Ok(provider) => provider,
                Err(error) => {
                    tracing::warn!(
                        provider = candidate.as_str(),
                        error = %error,
                        "failover candidate unavailable"
                    );
                    continue;
                }
            };

            let health = provider.health_check().await;
            if health.healthy {
                if *candidate != primary {
                    tracing::info!(
                        provider = candidate.as_str(),
                        primary = primary.as_str(),
                        "failing over to healthy fallback"
                    );
                }
                return Ok(provider);
            }
            tracing::warn!(
                provider = candidate.as_str(),
                error = health.error.as_deref().unwrap_or("unhealthy"),
                "failover candidate unhealthy"
            );
        }

        Err(ProviderError::service_unavailable(
            FACTORY_NAME,
            format!("No healthy provider available (tried: {})", candidates.join(", ")),
        ))
    }

    /// Health-checks the named providers (default: all registered)
    /// concurrently.
    ///
    /// The returned map contains exactly one entry per requested name;
    /// unregistered names yield a synthetic unhealthy result.
    pub async fn check_health(
        &self,
        names: Option<&[String]>,
    ) -> HashMap<String, HealthCheckResult> {
        let requested: Vec<String> = match names {
            Some(names) => names.to_vec(),
            None => {
                let mut all: Vec<String> = self.registry.read().keys().cloned().collect();
                all.sort();
                all
            }
        };

        let checks = requested.into_iter().map(|name| {
            let provider = self.registry.read().get(&name).cloned();
            async move {
                let result = match provider {
                    Some(provider) => provider.health_check().await,
                    None => HealthCheckResult::unhealthy(name.clone(), 0, "Provider not found"),
                };
                (name, result)
            }
        });

        join_all(checks).await.into_iter().collect()
    }

    /// Tears every registered provider down concurrently and marks the
    /// factory not ready. Safe to call repeatedly; never fails.
    pub async fn cleanup(&self) {
        let providers: Vec<(String, Arc<dyn PlaceSearchProvider>)> = self
            .registry
            .read()
            .iter()
            .map(|(name, provider)| (name.clone(), Arc::clone(provider)))
            .collect();

        join_all(providers.into_iter().map(|(name, provider)| async move {
            provider.cleanup().await;
            tracing::debug!(provider = name.as_str(), "provider cleaned up");
        }))
        .await;

        *self.config.write() = None;
        self.initialized.store(false, Ordering::SeqCst);
        tracing::info!("provider factory cleaned up");
    }

    /// Read-only snapshot of factory state.
    pub fn stats(&self) -> FactoryStats {
        let mut registered: Vec<String> = self.registry.read().keys().cloned().collect();
        registered.sort();

        let config = self.config.read();
        FactoryStats {
            initialized: self.initialized.load(Ordering::SeqCst),
            registered,
            default_provider: config.as_ref().map(|c| c.default_provider.clone()),
            failover_enabled: config.as_ref().is_some_and(|c| c.enable_failover),
            fallbacks: config
                .as_ref()
                .map(|c| c.fallbacks.clone())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;
    use std::time::Instant;

    use async_trait::async_trait;

    use super::*;
    use crate::config::ProviderConfig;
    use crate::errors::ProviderErrorKind;
    use crate::ranking;
    use crate::types::{PlaceSearchParams, SearchResponse};

    /// Test provider with scripted configuration and health behavior.
    #[derive(Debug)]
    struct ScriptedProvider {
        id: String,
        fail_initialize: bool,
        healthy: AtomicBool,
        configured: AtomicBool,
        health_checks: AtomicU64,
        cleanups: AtomicU64,
    }

    impl ScriptedProvider {
        fn new(id: &str, healthy: bool) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                fail_initialize: false,
                healthy: AtomicBool::new(healthy),
                configured: AtomicBool::new(false),
                health_checks: AtomicU64::new(0),
                cleanups: AtomicU64::new(0),
            })
        }

        fn failing_initialize(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                fail_initialize: true,
                healthy: AtomicBool::new(true),
                configured: AtomicBool::new(false),
                health_checks: AtomicU64::new(0),
                cleanups: AtomicU64::new(0),
            })
        }

        fn health_check_count(&self) -> u64 {
            self.health_checks.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PlaceSearchProvider for ScriptedProvider {
        fn name(&self) -> &str {
            &self.id
        }

        fn version(&self) -> &str {
            "test"
        }

        fn is_configured(&self) -> bool {
            self.configured.load(Ordering::SeqCst)
        }

        async fn initialize(&self, _config: ProviderConfig) -> Result<(), ProviderError> {
            if self.fail_initialize {
                return Err(ProviderError::authentication_failed(
                    self.id.clone(),
                    "scripted initialization failure",
                ));
            }
            self.configured.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn search_places(
            &self,
            params: &PlaceSearchParams,
        ) -> Result<SearchResponse, ProviderError> {
            Ok(ranking::finalize_response(
                &self.id,
                params,
                Vec::new(),
                Instant::now(),
            ))
        }

        async fn health_check(&self) -> HealthCheckResult {
            self.health_checks.fetch_add(1, Ordering::SeqCst);
            if self.healthy.load(Ordering::SeqCst) {
                HealthCheckResult::healthy(self.id.clone(), 1)
            } else {
                HealthCheckResult::unhealthy(self.id.clone(), 1, "scripted unhealthy")
            }
        }

        async fn cleanup(&self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            self.configured.store(false, Ordering::SeqCst);
        }
    }

    fn factory_config(default: &str, names: &[&str]) -> ProviderFactoryConfig {
        let mut config = ProviderFactoryConfig::new(default);
        for name in names {
            config = config.with_provider(*name, ProviderConfig::default());
        }
        config
    }

    #[tokio::test]
    async fn test_initialize_transitions_to_ready() {
        let factory = ProviderFactory::new();
        factory.register("primary", ScriptedProvider::new("primary", true));
        factory.register("backup", ScriptedProvider::new("backup", true));

        factory
            .initialize(factory_config("primary", &["primary", "backup"]))
            .await
            .unwrap();

        let stats = factory.stats();
        assert!(stats.initialized);
        assert_eq!(stats.registered, vec!["backup", "primary"]);
        assert_eq!(stats.default_provider.as_deref(), Some("primary"));
    }

    #[tokio::test]
    async fn test_initialize_skips_unregistered_config_entries() {
        let factory = ProviderFactory::new();
        factory.register("primary", ScriptedProvider::new("primary", true));

        // "ghost" is configured but never registered: warn and skip.
        factory
            .initialize(factory_config("primary", &["primary", "ghost"]))
            .await
            .unwrap();

        assert!(factory.stats().initialized);
    }

    #[tokio::test]
    async fn test_initialize_rejects_unregistered_default() {
        let factory = ProviderFactory::new();
        factory.register("other", ScriptedProvider::new("other", true));

        let error = factory
            .initialize(factory_config("missing", &["other"]))
            .await
            .unwrap_err();

        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
        assert_eq!(error.provider, FACTORY_NAME);
        assert!(!factory.stats().initialized);
    }

    #[tokio::test]
    async fn test_initialize_rejects_unconfigured_default() {
        let factory = ProviderFactory::new();
        factory.register("primary", ScriptedProvider::new("primary", true));

        // Registered, but no config entry means initialize never ran for it.
        let error = factory
            .initialize(factory_config("primary", &[]))
            .await
            .unwrap_err();

        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_single_initialization_failure_aborts() {
        let factory = ProviderFactory::new();
        factory.register("primary", ScriptedProvider::new("primary", true));
        factory.register("broken", ScriptedProvider::failing_initialize("broken"));

        let error = factory
            .initialize(factory_config("primary", &["primary", "broken"]))
            .await
            .unwrap_err();

        assert_eq!(error.kind, ProviderErrorKind::AuthenticationFailed);
        assert!(!factory.stats().initialized);
    }

    #[tokio::test]
    async fn test_provider_lookup_requires_ready_factory() {
        let factory = ProviderFactory::new();
        factory.register("primary", ScriptedProvider::new("primary", true));

        let error = factory.provider(None).unwrap_err();
        assert_eq!(error.kind, ProviderErrorKind::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_provider_lookup_paths() {
        let factory = ProviderFactory::new();
        factory.register("primary", ScriptedProvider::new("primary", true));
        factory.register("backup", ScriptedProvider::new("backup", true));
        factory
            .initialize(factory_config("primary", &["primary", "backup"]))
            .await
            .unwrap();

        assert_eq!(factory.provider(None).unwrap().name(), "primary");
        assert_eq!(factory.provider(Some("backup")).unwrap().name(), "backup");

        let error = factory.provider(Some("nope")).unwrap_err();
        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_reregistration_overwrites_silently() {
        let factory = ProviderFactory::new();
        factory.register("dup", ScriptedProvider::new("first", true));
        factory.register("dup", ScriptedProvider::new("second", true));
        factory
            .initialize(factory_config("dup", &["dup"]))
            .await
            .unwrap();

        assert_eq!(factory.provider(None).unwrap().name(), "second");
    }

    #[tokio::test]
    async fn test_failover_disabled_skips_health_checks() {
        let factory = ProviderFactory::new();
        let primary = ScriptedProvider::new("primary", false);
        factory.register("primary", primary.clone());
        factory
            .initialize(factory_config("primary", &["primary"]).with_failover(false))
            .await
            .unwrap();

        let provider = factory.provider_with_failover(None).await.unwrap();
        assert_eq!(provider.name(), "primary");
        assert_eq!(primary.health_check_count(), 0);
    }

    #[tokio::test]
    async fn test_failover_walks_fallbacks_in_order() {
        let factory = ProviderFactory::new();
        let primary = ScriptedProvider::new("primary", false);
        let first = ScriptedProvider::new("first", false);
        let second = ScriptedProvider::new("second", true);
        let third = ScriptedProvider::new("third", true);
        factory.register("primary", primary.clone());
        factory.register("first", first.clone());
        factory.register("second", second.clone());
        factory.register("third", third.clone());

        factory
            .initialize(
                factory_config("primary", &["primary", "first", "second", "third"])
                    .with_fallbacks(vec!["first", "second", "third"]),
            )
            .await
            .unwrap();

        let provider = factory.provider_with_failover(None).await.unwrap();
        assert_eq!(provider.name(), "second");

        // Everything up to the first healthy candidate is checked once;
        // nothing after it is queried.
        assert_eq!(primary.health_check_count(), 1);
        assert_eq!(first.health_check_count(), 1);
        assert_eq!(second.health_check_count(), 1);
        assert_eq!(third.health_check_count(), 0);
    }

    #[tokio::test]
    async fn test_failover_exhaustion_raises_factory_error() {
        let factory = ProviderFactory::new();
        factory.register("primary", ScriptedProvider::new("primary", false));
        factory.register("backup", ScriptedProvider::new("backup", false));

        factory
            .initialize(
                factory_config("primary", &["primary", "backup"])
                    .with_fallbacks(vec!["backup"]),
            )
            .await
            .unwrap();

        let error = factory.provider_with_failover(None).await.unwrap_err();
        assert_eq!(error.kind, ProviderErrorKind::ServiceUnavailable);
        assert_eq!(error.provider, FACTORY_NAME);
        assert!(error.retryable);
    }

    #[tokio::test]
    async fn test_failover_skips_unregistered_fallbacks() {
        let factory = ProviderFactory::new();
        factory.register("primary", ScriptedProvider::new("primary", false));
        factory.register("backup", ScriptedProvider::new("backup", true));

        factory
            .initialize(
                factory_config("primary", &["primary", "backup"])
                    .with_fallbacks(vec!["ghost", "backup"]),
            )
            .await
            .unwrap();

        let provider = factory.provider_with_failover(None).await.unwrap();
        assert_eq!(provider.name(), "backup");
    }

    #[tokio::test]
    async fn test_failover_honors_preferred_provider() {
        let factory = ProviderFactory::new();
        let primary = ScriptedProvider::new("primary", true);
        let backup = ScriptedProvider::new("backup", true);
        factory.register("primary", primary.clone());
        factory.register("backup", backup.clone());

        factory
            .initialize(factory_config("primary", &["primary", "backup"]))
            .await
            .unwrap();

        let provider = factory.provider_with_failover(Some("backup")).await.unwrap();
        assert_eq!(provider.name(), "backup");
        assert_eq!(primary.health_check_count(), 0);
    }

    #[tokio::test]
    async fn test_check_health_covers_every_requested_name() {
        let factory = ProviderFactory::new();
        factory.register("primary", ScriptedProvider::new("primary", true));
        factory.register("backup", ScriptedProvider::new("backup", false));

        let names = vec![
            "primary".to_string(),
            "backup".to_string(),
            "ghost".to_string(),
        ];
        let health = factory.check_health(Some(&names)).await;

        assert_eq!(health.len(), 3);
        assert!(health["primary"].healthy);
        assert!(!health["backup"].healthy);
        assert!(!health["ghost"].healthy);
        assert_eq!(health["ghost"].error.as_deref(), Some("Provider not found"));
    }

    #[tokio::test]
    async fn test_check_health_defaults_to_all_registered() {
        let factory = ProviderFactory::new();
        factory.register("primary", ScriptedProvider::new("primary", true));
        factory.register("backup", ScriptedProvider::new("backup", true));

        let health = factory.check_health(None).await;
        assert_eq!(health.len(), 2);
        assert!(health.contains_key("primary"));
        assert!(health.contains_key("backup"));
    }

    #[tokio::test]
    async fn test_cleanup_returns_factory_to_not_ready() {
        let factory = ProviderFactory::new();
        let primary = ScriptedProvider::new("primary", true);
        factory.register("primary", primary.clone());
        factory
            .initialize(factory_config("primary", &["primary"]))
            .await
            .unwrap();

        factory.cleanup().await;

        assert!(!factory.stats().initialized);
        assert_eq!(primary.cleanups.load(Ordering::SeqCst), 1);
        assert!(!primary.is_configured());
        assert!(factory.provider(None).is_err());

        // A fresh initialize starts clean.
        factory
            .initialize(factory_config("primary", &["primary"]))
            .await
            .unwrap();
        assert!(factory.stats().initialized);
    }
}
