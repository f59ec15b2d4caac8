//! Waypoint Search - pluggable place-search providers

#![deny(missing_docs)]
#![deny(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Queries one or more external place-search backends through a shared
//! capability trait, normalizes their responses into one shape, and provides
//! automatic failover and health monitoring across registered providers.

pub mod config;
pub mod errors;
pub mod factory;
pub mod geo;
pub mod providers;
pub mod ranking;
pub mod types;

// Re-export main types
pub use config::{ProviderConfig, ProviderFactoryConfig};
pub use errors::{ProviderError, ProviderErrorKind};
pub use factory::{FactoryStats, ProviderFactory};
pub use providers::{GooglePlacesProvider, MockPlacesProvider, PlaceSearchProvider};
pub use types::{
    HealthCheckResult, Location, PlaceCategory, PlaceResult, PlaceSearchParams, SearchMetadata,
    SearchResponse, SortOrder,
};

/// Convenience type alias for Results with ProviderError.
pub type Result<T> = std::result::Result<T, ProviderError>;
