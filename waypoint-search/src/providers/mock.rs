//! Deterministic mock provider for testing and degraded-mode operation.
//!
//! Generates synthetic results with no network dependency. The result count
//! and name pool are pure functions of the query and category, so tests can
//! assert on shape while coordinates, ratings, and opening hours stay
//! randomized.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;

use super::PlaceSearchProvider;
use crate::config::ProviderConfig;
use crate::errors::ProviderError;
use crate::geo;
use crate::ranking;
use crate::types::{
    HealthCheckDetails, HealthCheckResult, Location, PlaceCategory, PlaceResult,
    PlaceSearchParams, SearchResponse,
};

/// Name this provider registers under.
pub const PROVIDER_NAME: &str = "mock";

/// Bias location used when the caller supplies none.
const DEFAULT_BIAS: Location = Location {
    lat: 37.7749,
    lng: -122.4194,
};

/// Coordinate jitter around the bias location, roughly one kilometer.
const JITTER_DEGREES: f64 = 0.009;

/// Rating pool, weighted toward the 3.5-5.0 band.
const RATING_POOL: &[f32] = &[
    3.5, 3.7, 3.9, 4.0, 4.1, 4.2, 4.3, 4.5, 4.6, 4.8, 5.0, 2.9, 3.2,
];

const STREETS: &[&str] = &[
    "Main Street",
    "Harbor Road",
    "Oak Avenue",
    "Station Lane",
    "Market Street",
    "Elm Drive",
];

const CITIES: &[&str] = &["Springfield", "Riverton", "Lakewood", "Fairview", "Brookside"];

/// Fixed per-category result counts.
const RESULT_COUNT_TABLE: &[(PlaceCategory, usize)] = &[
    (PlaceCategory::Restaurant, 15),
    (PlaceCategory::Cafe, 10),
    (PlaceCategory::Bar, 8),
    (PlaceCategory::Hotel, 6),
    (PlaceCategory::Attraction, 12),
    (PlaceCategory::Shopping, 14),
    (PlaceCategory::Entertainment, 9),
    (PlaceCategory::Transportation, 5),
    (PlaceCategory::Health, 7),
    (PlaceCategory::Services, 11),
    (PlaceCategory::Other, 8),
];

fn category_result_count(category: PlaceCategory) -> usize {
    RESULT_COUNT_TABLE
        .iter()
        .find(|(entry, _)| *entry == category)
        .map_or(8, |(_, count)| *count)
}

fn keyword_result_count(query: &str) -> usize {
    let query = query.to_lowercase();
    if query.contains("restaurant") || query.contains("food") {
        15
    } else if query.contains("coffee") || query.contains("cafe") {
        10
    } else if query.contains("hotel") || query.contains("accommodation") {
        8
    } else if query.contains("shop") || query.contains("store") {
        12
    } else {
        5
    }
}

fn name_pool(category: PlaceCategory) -> &'static [&'static str] {
    match category {
        PlaceCategory::Restaurant => &[
            "The Golden Fork",
            "Harbor Grill",
            "Casa Verde",
            "The Spice Route",
            "Juniper Kitchen",
        ],
        PlaceCategory::Cafe => &[
            "Morning Brew",
            "The Daily Grind",
            "Cafe Luna",
            "Roast & Co",
            "Velvet Bean",
        ],
        PlaceCategory::Bar => &[
            "The Rusty Anchor",
            "Nightcap Lounge",
            "Barrel House",
            "The Tipsy Crow",
        ],
        PlaceCategory::Hotel => &[
            "Grand Meridian Hotel",
            "The Parkview",
            "Harbor Lights Inn",
            "Hotel Aurora",
        ],
        PlaceCategory::Attraction => &[
            "Old Town Observatory",
            "Riverside Gardens",
            "Heritage Museum",
            "Falcon Point Lookout",
        ],
        PlaceCategory::Shopping => &[
            "Central Galleria",
            "Market Square",
            "Northgate Mall",
            "The Arcade",
        ],
        PlaceCategory::Entertainment => &[
            "Starlight Cinema",
            "Funland Park",
            "The Comedy Cellar",
            "Arcadia Games",
        ],
        PlaceCategory::Transportation => &[
            "Central Station",
            "Harbor Ferry Terminal",
            "Airport Express Stop",
            "Union Depot",
        ],
        PlaceCategory::Health => &[
            "City General Hospital",
            "Lakeside Clinic",
            "Summit Medical Center",
            "Wellness Pharmacy",
        ],
        PlaceCategory::Services => &[
            "Quick Print Shop",
            "Harbor Bank",
            "City Hall Annex",
            "Baxter & Sons Repairs",
        ],
        PlaceCategory::Other => &[
            "The Corner Spot",
            "Main Street Venue",
            "Civic Center",
            "The Local",
        ],
    }
}

fn price_level_pool(category: PlaceCategory) -> &'static [u8] {
    match category {
        PlaceCategory::Restaurant => &[1, 2, 2, 3],
        PlaceCategory::Cafe => &[1, 1, 2],
        PlaceCategory::Bar => &[2, 2, 3],
        PlaceCategory::Hotel => &[2, 3, 3, 4],
        PlaceCategory::Attraction => &[0, 1, 2],
        PlaceCategory::Shopping => &[1, 2, 3],
        PlaceCategory::Entertainment => &[1, 2, 2],
        PlaceCategory::Transportation => &[0, 0, 1],
        PlaceCategory::Health => &[2, 3],
        PlaceCategory::Services => &[1, 2],
        PlaceCategory::Other => &[1, 2],
    }
}

/// Typed tuning values, parsed once from `ProviderConfig.options`.
#[derive(Debug, Clone, Copy)]
struct MockTuning {
    delay: Duration,
    simulate_failures: bool,
    failure_rate: f64,
    max_results: usize,
    timeout: Duration,
}

impl MockTuning {
    fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let mut tuning = Self {
            delay: Duration::from_millis(100),
            simulate_failures: false,
            failure_rate: 0.1,
            max_results: 20,
            timeout: config.timeout,
        };

        if let Some(raw) = config.options.get("delay_ms") {
            let ms: u64 = raw.parse().map_err(|_| {
                ProviderError::invalid_request(PROVIDER_NAME, format!("Invalid delay_ms: {raw}"))
            })?;
            tuning.delay = Duration::from_millis(ms);
        }
        if let Some(raw) = config.options.get("simulate_failures") {
            tuning.simulate_failures = raw.parse().map_err(|_| {
                ProviderError::invalid_request(
                    PROVIDER_NAME,
                    format!("Invalid simulate_failures: {raw}"),
                )
            })?;
        }
        if let Some(raw) = config.options.get("failure_rate") {
            let rate: f64 = raw.parse().map_err(|_| {
                ProviderError::invalid_request(
                    PROVIDER_NAME,
                    format!("Invalid failure_rate: {raw}"),
                )
            })?;
            if !(0.0..=1.0).contains(&rate) {
                return Err(ProviderError::invalid_request(
                    PROVIDER_NAME,
                    format!("failure_rate must be within [0, 1], got {rate}"),
                ));
            }
            tuning.failure_rate = rate;
        }
        if let Some(raw) = config.options.get("max_results") {
            tuning.max_results = raw.parse().map_err(|_| {
                ProviderError::invalid_request(
                    PROVIDER_NAME,
                    format!("Invalid max_results: {raw}"),
                )
            })?;
        }

        Ok(tuning)
    }
}

/// Network-free provider producing reproducible synthetic results.
#[derive(Debug, Default)]
pub struct MockPlacesProvider {
    tuning: RwLock<Option<MockTuning>>,
    request_count: AtomicU64,
    failure_count: AtomicU64,
}

impl MockPlacesProvider {
    /// Creates an unconfigured provider; `initialize` must run before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total `search_places` calls served by this instance.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    fn effective_category(params: &PlaceSearchParams) -> PlaceCategory {
        match params.category.as_deref() {
            Some(raw) => raw.parse().unwrap_or(PlaceCategory::Other),
            None => PlaceCategory::from_keywords(&params.query),
        }
    }

    fn result_count(params: &PlaceSearchParams) -> usize {
        match params.category.as_deref() {
            Some(raw) => category_result_count(raw.parse().unwrap_or(PlaceCategory::Other)),
            None => keyword_result_count(&params.query),
        }
    }

    async fn generate(
        tuning: MockTuning,
        params: &PlaceSearchParams,
    ) -> Result<Vec<PlaceResult>, ProviderError> {
        if !tuning.delay.is_zero() {
            tokio::time::sleep(tuning.delay).await;
        }

        if tuning.simulate_failures {
            let draw: f64 = rand::rng().random_range(0.0..1.0);
            if draw < tuning.failure_rate {
                return Err(ProviderError::service_unavailable(
                    PROVIDER_NAME,
                    "Simulated backend outage",
                ));
            }
        }

        let category = Self::effective_category(params);
        let count = Self::result_count(params).min(tuning.max_results);
        let bias = params.location.unwrap_or(DEFAULT_BIAS);
        let names = name_pool(category);
        let prices = price_level_pool(category);

        let mut rng = rand::rng();
        let mut results = Vec::with_capacity(count);
        for index in 0..count {
            let location = Some(Location::new(
                bias.lat + rng.random_range(-JITTER_DEGREES..JITTER_DEGREES),
                bias.lng + rng.random_range(-JITTER_DEGREES..JITTER_DEGREES),
            ));

            results.push(PlaceResult {
                name: names[index % names.len()].to_string(),
                address: format!(
                    "{} {}, {}",
                    100 + index * 25,
                    STREETS[index % STREETS.len()],
                    CITIES[index % CITIES.len()]
                ),
                rating: Some(RATING_POOL[rng.random_range(0..RATING_POOL.len())]),
                place_id: format!("mock-{category}-{index}"),
                location,
                category: Some(category),
                distance_m: geo::distance_between(params.location, location),
                price_level: Some(prices[rng.random_range(0..prices.len())]),
                open_now: Some(rng.random_bool(0.7)),
            });
        }

        Ok(results)
    }
}

#[async_trait]
impl PlaceSearchProvider for MockPlacesProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn is_configured(&self) -> bool {
        self.tuning.read().is_some()
    }

    async fn initialize(&self, config: ProviderConfig) -> Result<(), ProviderError> {
        let tuning = MockTuning::from_config(&config)?;
        *self.tuning.write() = Some(tuning);
        tracing::info!(
            provider = PROVIDER_NAME,
            delay_ms = tuning.delay.as_millis() as u64,
            simulate_failures = tuning.simulate_failures,
            "mock provider initialized"
        );
        Ok(())
    }

    async fn search_places(
        &self,
        params: &PlaceSearchParams,
    ) -> Result<SearchResponse, ProviderError> {
        ranking::validate_params(params, PROVIDER_NAME)?;

        let tuning = self.tuning.read().as_ref().copied().ok_or_else(|| {
            ProviderError::service_unavailable(PROVIDER_NAME, "Provider not initialized")
        })?;

        self.request_count.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        let generated =
            match tokio::time::timeout(tuning.timeout, Self::generate(tuning, params)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::timeout(
                    PROVIDER_NAME,
                    format!(
                        "Search deadline of {} ms elapsed",
                        tuning.timeout.as_millis()
                    ),
                )),
            };

        match generated {
            Ok(results) => Ok(ranking::finalize_response(
                PROVIDER_NAME,
                params,
                results,
                started,
            )),
            Err(error) => {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
                Err(error)
            }
        }
    }

    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        let tuning = self.tuning.read().as_ref().copied();

        let result = match tuning {
            None => HealthCheckResult::unhealthy(
                PROVIDER_NAME,
                started.elapsed().as_millis() as u64,
                "Provider not initialized",
            ),
            Some(tuning)
                if tuning.simulate_failures
                    && rand::rng().random_range(0.0..1.0) < tuning.failure_rate =>
            {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
                HealthCheckResult::unhealthy(
                    PROVIDER_NAME,
                    started.elapsed().as_millis() as u64,
                    "Simulated health check failure",
                )
            }
            Some(_) => {
                HealthCheckResult::healthy(PROVIDER_NAME, started.elapsed().as_millis() as u64)
            }
        };

        result.with_details(HealthCheckDetails {
            endpoint: None,
            last_checked: chrono::Utc::now(),
            error_count: Some(self.failure_count.load(Ordering::Relaxed)),
        })
    }

    async fn cleanup(&self) {
        *self.tuning.write() = None;
        self.request_count.store(0, Ordering::Relaxed);
        self.failure_count.store(0, Ordering::Relaxed);
    }
}
