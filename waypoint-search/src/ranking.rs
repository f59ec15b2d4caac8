//! Shared sorting and pagination rules.
//!
//! Both providers funnel their normalized results through this module so the
//! ordering and slicing semantics cannot drift between backends.

use std::cmp::Ordering;
use std::time::Instant;

use crate::errors::ProviderError;
use crate::types::{PlaceResult, PlaceSearchParams, SearchMetadata, SearchResponse, SortOrder};

/// Page size used when the caller does not supply a limit.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Validates parameters every provider rejects identically.
///
/// # Errors
///
/// - `ProviderErrorKind::InvalidRequest` - empty query or zero limit
pub fn validate_params(params: &PlaceSearchParams, provider: &str) -> Result<(), ProviderError> {
    if params.query.trim().is_empty() {
        return Err(ProviderError::invalid_request(
            provider,
            "Search query must not be empty",
        ));
    }
    if params.limit == Some(0) {
        return Err(ProviderError::invalid_request(
            provider,
            "Limit must be greater than zero",
        ));
    }
    Ok(())
}

/// Applies the requested ordering in place.
///
/// All orderings use a stable sort, so ties preserve the providers' original
/// relative order. Missing ratings sort as 0, missing distances as infinity.
pub fn sort_results(results: &mut [PlaceResult], sort: SortOrder) {
    match sort {
        SortOrder::Relevance => {}
        SortOrder::Rating => results.sort_by(|a, b| {
            b.rating
                .unwrap_or(0.0)
                .partial_cmp(&a.rating.unwrap_or(0.0))
                .unwrap_or(Ordering::Equal)
        }),
        SortOrder::Distance => results.sort_by(|a, b| {
            a.distance_m
                .unwrap_or(f64::INFINITY)
                .partial_cmp(&b.distance_m.unwrap_or(f64::INFINITY))
                .unwrap_or(Ordering::Equal)
        }),
        SortOrder::Name => {
            results.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        }
    }
}

/// Sorts, slices, and wraps a full normalized result set into the response
/// envelope.
///
/// `total_results` reflects the full set (post-sort, pre-slice); the returned
/// page is the pure slice `[offset, offset + limit)`.
pub fn finalize_response(
    provider: &str,
    params: &PlaceSearchParams,
    mut results: Vec<PlaceResult>,
    started: Instant,
) -> SearchResponse {
    let sort = params.sort.unwrap_or_default();
    sort_results(&mut results, sort);

    let total_results = results.len();
    let page_size = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let offset = params.offset.unwrap_or(0);

    let page_results: Vec<PlaceResult> =
        results.into_iter().skip(offset).take(page_size).collect();

    let metadata = SearchMetadata {
        provider: provider.to_string(),
        duration_ms: started.elapsed().as_millis() as u64,
        cached: false,
        total_results,
        page: offset / page_size + 1,
        page_size,
        total_pages: total_results.div_ceil(page_size),
        sort: Some(sort),
        category: params.category.clone(),
    };

    SearchResponse {
        query: params.query.clone(),
        results: page_results,
        metadata,
    }
}
