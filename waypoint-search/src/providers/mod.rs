//! Provider implementations for place search functionality.

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::errors::ProviderError;
use crate::types::{HealthCheckResult, PlaceSearchParams, SearchResponse};

pub mod google_places;
pub mod mock;

pub use google_places::GooglePlacesProvider;
pub use mock::MockPlacesProvider;

/// Capability contract every place-search backend implements.
///
/// Implementations provide place search through different backends (a real
/// HTTP text-search API, a deterministic mock for tests and degraded-mode
/// operation). All methods take `&self` and must be safe under concurrent
/// callers; per-call state lives on the stack, configuration behind interior
/// locks.
#[async_trait]
pub trait PlaceSearchProvider: Send + Sync + std::fmt::Debug {
    /// Stable provider name, unique within a factory registry.
    fn name(&self) -> &str;

    /// Implementation version, for diagnostics.
    fn version(&self) -> &str;

    /// True iff `initialize` completed successfully and required credentials
    /// are present. False before `initialize` and after `cleanup`.
    fn is_configured(&self) -> bool;

    /// Validates and stores configuration; network-backed providers perform
    /// one verification call.
    ///
    /// # Errors
    /// - `ProviderErrorKind::AuthenticationFailed` - Missing or rejected
    ///   credentials; `is_configured` stays false
    /// - `ProviderErrorKind::InvalidRequest` - Malformed configuration
    async fn initialize(&self, config: ProviderConfig) -> Result<(), ProviderError>;

    /// Searches for places and returns a normalized, sorted, paginated
    /// response.
    ///
    /// # Errors
    /// All failures surface as [`ProviderError`]; no transport error escapes
    /// unwrapped.
    async fn search_places(
        &self,
        params: &PlaceSearchParams,
    ) -> Result<SearchResponse, ProviderError>;

    /// Probes whether the provider can currently serve requests.
    ///
    /// Infallible by signature: internal failures are folded into an
    /// unhealthy result. Duration is measured from entry to return.
    async fn health_check(&self) -> HealthCheckResult;

    /// Resets internal state so a subsequent `initialize` starts clean.
    /// Idempotent.
    async fn cleanup(&self);
}
