//! Google Places text-search provider for production use.
//!
//! Translates [`PlaceSearchParams`] into upstream text-search requests,
//! executes them with bounded retries under a whole-call deadline, and
//! normalizes the response into the shared result shape.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;

use super::PlaceSearchProvider;
use crate::config::ProviderConfig;
use crate::errors::{ProviderError, ProviderErrorKind};
use crate::geo;
use crate::ranking;
use crate::types::{
    HealthCheckDetails, HealthCheckResult, Location, PlaceCategory, PlaceResult,
    PlaceSearchParams, SearchResponse,
};

/// Name this provider registers under.
pub const PROVIDER_NAME: &str = "google_places";

const DEFAULT_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/place/textsearch/json";

/// Minimum fetch size when a client-side sort needs a wider candidate set
/// than the requested page. The upstream API orders by relevance only, so
/// rating and name sorts operate on `max(limit * 2, this)` results.
const CLIENT_SORT_FETCH_FLOOR: usize = 40;

/// Upper bound on followed result pages per search.
const MAX_RESULT_PAGES: usize = 3;

/// Upstream page tokens are not valid immediately after issuance.
const PAGE_TOKEN_ACTIVATION_DELAY: Duration = Duration::from_millis(200);

/// Place search provider backed by the Google Places text-search API.
///
/// Handles retries, pagination, and response normalization. Configuration is
/// stored behind a lock at `initialize` and snapshotted per call, so
/// concurrent searches share nothing mutable but the error counter.
#[derive(Debug)]
pub struct GooglePlacesProvider {
    state: RwLock<Option<ProviderState>>,
    transport_override: Option<Arc<dyn TextSearchTransport>>,
    error_count: AtomicU64,
}

/// Immutable per-initialization snapshot used by every call.
#[derive(Debug, Clone)]
struct ProviderState {
    api_key: String,
    endpoint: String,
    timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
    default_language: Option<String>,
    region: Option<String>,
    transport: Arc<dyn TextSearchTransport>,
}

/// Minimal transport seam so tests can script upstream responses.
#[async_trait]
trait TextSearchTransport: Send + Sync + std::fmt::Debug {
    async fn get(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<RawResponse, TransportFailure>;
}

#[derive(Debug)]
struct RawResponse {
    status: u16,
    body: String,
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct TransportFailure {
    message: String,
    timed_out: bool,
}

#[derive(Debug)]
struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("waypoint/", env!("CARGO_PKG_VERSION")))
                .build()
                .expect("HTTP client creation should not fail"),
        }
    }
}

#[async_trait]
impl TextSearchTransport for ReqwestTransport {
    async fn get(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> Result<RawResponse, TransportFailure> {
        let response = self
            .client
            .get(endpoint)
            .query(query)
            .send()
            .await
            .map_err(|e| TransportFailure {
                message: format!("Request failed: {e}"),
                timed_out: e.is_timeout(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportFailure {
            message: format!("Failed to read response body: {e}"),
            timed_out: e.is_timeout(),
        })?;

        Ok(RawResponse { status, body })
    }
}

/// Response from the upstream text-search endpoint.
#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    #[serde(default)]
    results: Vec<RawPlace>,
    status: String,
    error_message: Option<String>,
    next_page_token: Option<String>,
}

/// Single raw result from the upstream API.
#[derive(Debug, Deserialize)]
struct RawPlace {
    name: String,
    formatted_address: Option<String>,
    rating: Option<f32>,
    place_id: String,
    geometry: Option<RawGeometry>,
    price_level: Option<u8>,
    opening_hours: Option<RawOpeningHours>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    location: Location,
}

#[derive(Debug, Deserialize)]
struct RawOpeningHours {
    open_now: Option<bool>,
}

impl GooglePlacesProvider {
    /// Creates an unconfigured provider; `initialize` must run before use.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(None),
            transport_override: None,
            error_count: AtomicU64::new(0),
        }
    }

    #[cfg(test)]
    fn with_transport(transport: Arc<dyn TextSearchTransport>) -> Self {
        Self {
            state: RwLock::new(None),
            transport_override: Some(transport),
            error_count: AtomicU64::new(0),
        }
    }

    /// Number of raw results worth retrieving before sort and slice.
    fn fetch_target(params: &PlaceSearchParams) -> usize {
        let limit = params.limit.unwrap_or(ranking::DEFAULT_PAGE_SIZE).max(1);
        let offset = params.offset.unwrap_or(0);

        if params.sort.unwrap_or_default().is_client_side() {
            (limit * 2).max(CLIENT_SORT_FETCH_FLOOR).max(offset + limit)
        } else {
            offset + limit
        }
    }

    /// Builds the upstream query string pairs for one search.
    fn build_query(state: &ProviderState, params: &PlaceSearchParams) -> Vec<(String, String)> {
        let mut query = vec![
            ("query".to_string(), params.query.clone()),
            ("key".to_string(), state.api_key.clone()),
        ];

        if let Some(location) = params.location {
            query.push(("location".to_string(), location.as_query_param()));
        }
        if let Some(radius_m) = params.radius_m {
            query.push(("radius".to_string(), radius_m.to_string()));
        }
        if let Some(language) = params.language.as_ref().or(state.default_language.as_ref()) {
            query.push(("language".to_string(), language.clone()));
        }
        if let Some(region) = &state.region {
            query.push(("region".to_string(), region.clone()));
        }

        // Unknown categories carry no type filter.
        if let Some(search_type) = params
            .category
            .as_deref()
            .and_then(|c| c.parse::<PlaceCategory>().ok())
            .and_then(PlaceCategory::search_type)
        {
            query.push(("type".to_string(), search_type.to_string()));
        }

        for (key, value) in &params.extra {
            query.push((key.clone(), value.clone()));
        }

        query
    }

    /// Runs one full search against the given state snapshot.
    async fn execute_search(
        state: &ProviderState,
        params: &PlaceSearchParams,
    ) -> Result<SearchResponse, ProviderError> {
        let started = Instant::now();

        let collected =
            match tokio::time::timeout(state.timeout, Self::collect_results(state, params)).await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(ProviderError::timeout(
                        PROVIDER_NAME,
                        format!(
                            "Search deadline of {} ms elapsed",
                            state.timeout.as_millis()
                        ),
                    ));
                }
            };

        let results = collected
            .into_iter()
            .map(|raw| Self::normalize(raw, params.location))
            .collect();

        Ok(ranking::finalize_response(PROVIDER_NAME, params, results, started))
    }

    /// Fetches upstream result pages until the fetch target or page bound is
    /// reached.
    async fn collect_results(
        state: &ProviderState,
        params: &PlaceSearchParams,
    ) -> Result<Vec<RawPlace>, ProviderError> {
        let fetch_target = Self::fetch_target(params);
        let base_query = Self::build_query(state, params);

        let mut collected: Vec<RawPlace> = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_RESULT_PAGES {
            let mut query = base_query.clone();
            if let Some(token) = &page_token {
                tokio::time::sleep(PAGE_TOKEN_ACTIVATION_DELAY).await;
                query.push(("pagetoken".to_string(), token.clone()));
            }

            let payload = Self::fetch_with_retry(state, &query).await?;
            collected.extend(payload.results);

            page_token = payload.next_page_token;
            if collected.len() >= fetch_target || page_token.is_none() {
                break;
            }
        }

        collected.truncate(fetch_target);
        Ok(collected)
    }

    /// Executes one request with linear backoff on retryable failures.
    async fn fetch_with_retry(
        state: &ProviderState,
        query: &[(String, String)],
    ) -> Result<TextSearchResponse, ProviderError> {
        let max_attempts = state.max_retries.max(1);
        let mut attempt = 1;

        loop {
            match Self::fetch_once(state, query).await {
                Ok(payload) => return Ok(payload),
                Err(error) if error.retryable && attempt < max_attempts => {
                    let delay = state.base_delay * attempt;
                    tracing::warn!(
                        provider = PROVIDER_NAME,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying upstream search"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// One transport round-trip plus status classification.
    async fn fetch_once(
        state: &ProviderState,
        query: &[(String, String)],
    ) -> Result<TextSearchResponse, ProviderError> {
        let raw = state
            .transport
            .get(&state.endpoint, query)
            .await
            .map_err(|failure| {
                let message = failure.message.clone();
                if failure.timed_out {
                    ProviderError::timeout(PROVIDER_NAME, message).with_source(failure)
                } else {
                    ProviderError::network(PROVIDER_NAME, message).with_source(failure)
                }
            })?;

        if !(200..300).contains(&raw.status) {
            return Err(ProviderError::from_http_status(raw.status, PROVIDER_NAME));
        }

        let payload: TextSearchResponse = serde_json::from_str(&raw.body).map_err(|e| {
            ProviderError::new(
                ProviderErrorKind::UnknownError,
                PROVIDER_NAME,
                "Failed to parse upstream response",
            )
            .with_source(e)
        })?;

        // "ZERO_RESULTS" is an empty success, not an error.
        match payload.status.as_str() {
            "OK" | "ZERO_RESULTS" => Ok(payload),
            status => Err(ProviderError::from_search_status(
                status,
                payload.error_message.as_deref(),
                PROVIDER_NAME,
            )),
        }
    }

    /// Converts one raw upstream result into the shared shape.
    fn normalize(raw: RawPlace, origin: Option<Location>) -> PlaceResult {
        let location = raw.geometry.map(|g| g.location);

        PlaceResult {
            name: raw.name,
            address: raw.formatted_address.unwrap_or_default(),
            rating: raw.rating,
            place_id: raw.place_id,
            location,
            category: Some(PlaceCategory::from_search_types(&raw.types)),
            distance_m: geo::distance_between(origin, location),
            price_level: raw.price_level,
            open_now: raw.opening_hours.and_then(|h| h.open_now),
        }
    }
}

impl Default for GooglePlacesProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaceSearchProvider for GooglePlacesProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn is_configured(&self) -> bool {
        self.state.read().is_some()
    }

    async fn initialize(&self, config: ProviderConfig) -> Result<(), ProviderError> {
        let api_key = match config.api_key {
            Some(ref key) if !key.is_empty() => key.clone(),
            _ => {
                return Err(ProviderError::authentication_failed(
                    PROVIDER_NAME,
                    "API key is required",
                ));
            }
        };

        let transport = match &self.transport_override {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(ReqwestTransport::new(config.timeout)) as Arc<dyn TextSearchTransport>,
        };

        let state = ProviderState {
            api_key,
            endpoint: config
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            timeout: config.timeout,
            max_retries: config.max_retries,
            base_delay: config.base_delay,
            default_language: config.options.get("language").cloned(),
            region: config.options.get("region").cloned(),
            transport,
        };

        // One live verification search; a rejected key must leave the
        // provider unconfigured.
        let probe = PlaceSearchParams::new("restaurant").with_limit(1);
        if let Err(error) = Self::execute_search(&state, &probe).await {
            return Err(ProviderError::authentication_failed(
                PROVIDER_NAME,
                format!("Verification search failed: {}", error.message),
            )
            .with_source(error));
        }

        *self.state.write() = Some(state);
        tracing::info!(provider = PROVIDER_NAME, "place search provider initialized");
        Ok(())
    }

    async fn search_places(
        &self,
        params: &PlaceSearchParams,
    ) -> Result<SearchResponse, ProviderError> {
        ranking::validate_params(params, PROVIDER_NAME)?;

        let state = self.state.read().clone().ok_or_else(|| {
            ProviderError::service_unavailable(PROVIDER_NAME, "Provider not initialized")
        })?;

        match Self::execute_search(&state, params).await {
            Ok(response) => Ok(response),
            Err(error) => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                Err(error)
            }
        }
    }

    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        let state = self.state.read().clone();

        let (healthy, error, endpoint) = match state {
            None => (false, Some("Provider not initialized".to_string()), None),
            Some(state) => {
                let endpoint = state.endpoint.clone();
                let probe = PlaceSearchParams::new("restaurant").with_limit(1);
                match Self::execute_search(&state, &probe).await {
                    Ok(_) => (true, None, Some(endpoint)),
                    Err(error) => {
                        self.error_count.fetch_add(1, Ordering::Relaxed);
                        (false, Some(error.to_string()), Some(endpoint))
                    }
                }
            }
        };

        let response_time_ms = started.elapsed().as_millis() as u64;
        let details = HealthCheckDetails {
            endpoint,
            last_checked: chrono::Utc::now(),
            error_count: Some(self.error_count.load(Ordering::Relaxed)),
        };

        let result = if healthy {
            HealthCheckResult::healthy(PROVIDER_NAME, response_time_ms)
        } else {
            HealthCheckResult::unhealthy(
                PROVIDER_NAME,
                response_time_ms,
                error.unwrap_or_else(|| "Unknown failure".to_string()),
            )
        };
        result.with_details(details)
    }

    async fn cleanup(&self) {
        *self.state.write() = None;
        self.error_count.store(0, Ordering::Relaxed);
        tracing::debug!(provider = PROVIDER_NAME, "provider state cleared");
    }
}
