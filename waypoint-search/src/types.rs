//! Data types for place search functionality.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Geographic coordinate used for search bias and distance calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Location {
    /// Creates a location from latitude and longitude in degrees.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Formats the location as the `"lat,lng"` string upstream APIs expect.
    pub fn as_query_param(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

/// Requested ordering of search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Upstream relevance order, unchanged.
    #[default]
    Relevance,
    /// Descending by rating, unrated results last.
    Rating,
    /// Ascending by distance from the search location.
    Distance,
    /// Case-insensitive name order.
    Name,
}

impl SortOrder {
    /// Whether this ordering must be applied client-side because the
    /// upstream API only returns relevance order.
    pub fn is_client_side(self) -> bool {
        matches!(self, SortOrder::Rating | SortOrder::Name)
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relevance" => Ok(SortOrder::Relevance),
            "rating" => Ok(SortOrder::Rating),
            "distance" => Ok(SortOrder::Distance),
            "name" => Ok(SortOrder::Name),
            _ => Err(format!("Invalid sort order: {s}")),
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Relevance => write!(f, "relevance"),
            SortOrder::Rating => write!(f, "rating"),
            SortOrder::Distance => write!(f, "distance"),
            SortOrder::Name => write!(f, "name"),
        }
    }
}

/// Place classification shared by every provider.
///
/// Carries the fixed mapping to upstream search types and the inverse
/// inference used during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)] // variant names are the documentation
pub enum PlaceCategory {
    Restaurant,
    Cafe,
    Bar,
    Hotel,
    Attraction,
    Shopping,
    Entertainment,
    Transportation,
    Health,
    Services,
    /// Fallback for anything the fixed table does not recognize.
    Other,
}

/// Fixed category-to-upstream-type table, in inference priority order.
const CATEGORY_TYPE_TABLE: &[(PlaceCategory, &str)] = &[
    (PlaceCategory::Restaurant, "restaurant"),
    (PlaceCategory::Cafe, "cafe"),
    (PlaceCategory::Bar, "bar"),
    (PlaceCategory::Hotel, "lodging"),
    (PlaceCategory::Attraction, "tourist_attraction"),
    (PlaceCategory::Shopping, "shopping_mall"),
    (PlaceCategory::Entertainment, "amusement_park"),
    (PlaceCategory::Transportation, "transit_station"),
    (PlaceCategory::Health, "hospital"),
    (PlaceCategory::Services, "establishment"),
];

impl PlaceCategory {
    /// Upstream search type for this category, or `None` when the category
    /// carries no type filter.
    pub fn search_type(self) -> Option<&'static str> {
        CATEGORY_TYPE_TABLE
            .iter()
            .find(|(category, _)| *category == self)
            .map(|(_, search_type)| *search_type)
    }

    /// Infers a category from an upstream type list.
    ///
    /// Scans the fixed table in order and returns the first category whose
    /// upstream type appears in `types`; falls back to [`PlaceCategory::Other`].
    pub fn from_search_types<S: AsRef<str>>(types: &[S]) -> Self {
        for (category, search_type) in CATEGORY_TYPE_TABLE {
            if types.iter().any(|t| t.as_ref() == *search_type) {
                return *category;
            }
        }
        PlaceCategory::Other
    }

    /// Infers a category from free-text keywords in a search query.
    pub fn from_keywords(query: &str) -> Self {
        let query = query.to_lowercase();
        if query.contains("restaurant") || query.contains("food") {
            PlaceCategory::Restaurant
        } else if query.contains("coffee") || query.contains("cafe") {
            PlaceCategory::Cafe
        } else if query.contains("hotel") || query.contains("accommodation") {
            PlaceCategory::Hotel
        } else if query.contains("shop") || query.contains("store") {
            PlaceCategory::Shopping
        } else {
            PlaceCategory::Other
        }
    }
}

impl std::str::FromStr for PlaceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "restaurant" => Ok(PlaceCategory::Restaurant),
            "cafe" => Ok(PlaceCategory::Cafe),
            "bar" => Ok(PlaceCategory::Bar),
            "hotel" => Ok(PlaceCategory::Hotel),
            "attraction" => Ok(PlaceCategory::Attraction),
            "shopping" => Ok(PlaceCategory::Shopping),
            "entertainment" => Ok(PlaceCategory::Entertainment),
            "transportation" => Ok(PlaceCategory::Transportation),
            "health" => Ok(PlaceCategory::Health),
            "services" => Ok(PlaceCategory::Services),
            "other" => Ok(PlaceCategory::Other),
            _ => Err(format!("Unknown place category: {s}")),
        }
    }
}

impl std::fmt::Display for PlaceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PlaceCategory::Restaurant => "restaurant",
            PlaceCategory::Cafe => "cafe",
            PlaceCategory::Bar => "bar",
            PlaceCategory::Hotel => "hotel",
            PlaceCategory::Attraction => "attraction",
            PlaceCategory::Shopping => "shopping",
            PlaceCategory::Entertainment => "entertainment",
            PlaceCategory::Transportation => "transportation",
            PlaceCategory::Health => "health",
            PlaceCategory::Services => "services",
            PlaceCategory::Other => "other",
        };
        write!(f, "{name}")
    }
}

/// Parameters for a single place search, immutable per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceSearchParams {
    /// Search text; must be non-empty.
    pub query: String,
    /// Optional bias location, also the origin for distance calculation.
    pub location: Option<Location>,
    /// Search radius in meters around `location`.
    pub radius_m: Option<u32>,
    /// Page size; defaults to [`crate::ranking::DEFAULT_PAGE_SIZE`].
    pub limit: Option<usize>,
    /// Number of results to skip before the returned page.
    pub offset: Option<usize>,
    /// Requested result ordering.
    pub sort: Option<SortOrder>,
    /// Caller-supplied category filter, free-form.
    pub category: Option<String>,
    /// Result language, overriding any provider default.
    pub language: Option<String>,
    /// Extra key/value pairs passed through to the upstream request verbatim.
    pub extra: HashMap<String, String>,
}

impl PlaceSearchParams {
    /// Creates search parameters for the given query with all options unset.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            location: None,
            radius_m: None,
            limit: None,
            offset: None,
            sort: None,
            category: None,
            language: None,
            extra: HashMap::new(),
        }
    }

    /// Sets the bias location.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets the search radius in meters.
    pub fn with_radius_m(mut self, radius_m: u32) -> Self {
        self.radius_m = Some(radius_m);
        self
    }

    /// Sets the page size.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the pagination offset.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the result ordering.
    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the category filter.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the result language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Adds an extra upstream query parameter.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// One normalized place, provider-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceResult {
    /// Display name of the place.
    pub name: String,
    /// Formatted street address.
    pub address: String,
    /// Rating on the provider's scale, typically 1.0-5.0.
    pub rating: Option<f32>,
    /// Provider-scoped stable identifier.
    pub place_id: String,
    /// Coordinate of the place, when the provider reports one.
    pub location: Option<Location>,
    /// Inferred category.
    pub category: Option<PlaceCategory>,
    /// Great-circle distance from the search location in whole meters.
    ///
    /// Present iff both the search location and this result's location exist.
    pub distance_m: Option<f64>,
    /// Relative price level, 0 (free) to 4 (expensive).
    pub price_level: Option<u8>,
    /// Whether the place reports being open at search time.
    pub open_now: Option<bool>,
}

/// Envelope information attached to every search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// Name of the provider that produced the results.
    pub provider: String,
    /// Wall-clock duration of the search in milliseconds.
    pub duration_ms: u64,
    /// Always false at this layer; a hosting cache layer may flip it.
    pub cached: bool,
    /// Size of the full normalized result set, pre-slice.
    pub total_results: usize,
    /// 1-based page number derived from offset and page size.
    pub page: usize,
    /// Page size used for slicing.
    pub page_size: usize,
    /// `ceil(total_results / page_size)`.
    pub total_pages: usize,
    /// Ordering that was applied.
    pub sort: Option<SortOrder>,
    /// Echo of the caller's category filter.
    pub category: Option<String>,
}

/// Full result of one place search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Echo of the search query.
    pub query: String,
    /// The sliced, normalized result page.
    pub results: Vec<PlaceResult>,
    /// Response envelope.
    pub metadata: SearchMetadata,
}

/// Point-in-time health snapshot for one provider, recomputed on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Name of the checked provider.
    pub provider: String,
    /// Whether the provider can currently serve requests.
    pub healthy: bool,
    /// Duration of the check in milliseconds, entry to return.
    pub response_time_ms: u64,
    /// Failure description when unhealthy.
    pub error: Option<String>,
    /// Optional diagnostic details.
    pub details: Option<HealthCheckDetails>,
}

/// Diagnostic details attached to a health check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckDetails {
    /// Endpoint the provider talks to, when network-backed.
    pub endpoint: Option<String>,
    /// When the check completed.
    pub last_checked: chrono::DateTime<chrono::Utc>,
    /// Cumulative error count observed by the provider instance.
    pub error_count: Option<u64>,
}

impl HealthCheckResult {
    /// Creates a healthy snapshot.
    pub fn healthy(provider: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            provider: provider.into(),
            healthy: true,
            response_time_ms,
            error: None,
            details: None,
        }
    }

    /// Creates an unhealthy snapshot with a failure description.
    pub fn unhealthy(
        provider: impl Into<String>,
        response_time_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            healthy: false,
            response_time_ms,
            error: Some(error.into()),
            details: None,
        }
    }

    /// Attaches diagnostic details to the snapshot.
    pub fn with_details(mut self, details: HealthCheckDetails) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_query_param_format() {
        let location = Location::new(59.3293, 18.0686);
        assert_eq!(location.as_query_param(), "59.3293,18.0686");
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!("rating".parse::<SortOrder>().unwrap(), SortOrder::Rating);
        assert_eq!("NAME".parse::<SortOrder>().unwrap(), SortOrder::Name);
        assert!("seeders".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_client_side_sorts() {
        assert!(SortOrder::Rating.is_client_side());
        assert!(SortOrder::Name.is_client_side());
        assert!(!SortOrder::Relevance.is_client_side());
        assert!(!SortOrder::Distance.is_client_side());
    }

    #[test]
    fn test_category_type_mapping() {
        assert_eq!(PlaceCategory::Hotel.search_type(), Some("lodging"));
        assert_eq!(
            PlaceCategory::Entertainment.search_type(),
            Some("amusement_park")
        );
        assert_eq!(PlaceCategory::Other.search_type(), None);
    }

    #[test]
    fn test_category_inference_from_types() {
        let types = vec!["point_of_interest".to_string(), "cafe".to_string()];
        assert_eq!(
            PlaceCategory::from_search_types(&types),
            PlaceCategory::Cafe
        );

        // Table order wins when several types match.
        let types = vec!["lodging".to_string(), "restaurant".to_string()];
        assert_eq!(
            PlaceCategory::from_search_types(&types),
            PlaceCategory::Restaurant
        );
    }

    #[test]
    fn test_category_inference_unrecognized_falls_back_to_other() {
        let types = vec!["aquarium".to_string(), "zoo".to_string()];
        assert_eq!(
            PlaceCategory::from_search_types(&types),
            PlaceCategory::Other
        );
        assert_eq!(
            PlaceCategory::from_search_types::<String>(&[]),
            PlaceCategory::Other
        );
    }

    #[test]
    fn test_category_keyword_inference() {
        assert_eq!(
            PlaceCategory::from_keywords("best coffee near me"),
            PlaceCategory::Cafe
        );
        assert_eq!(
            PlaceCategory::from_keywords("street food market"),
            PlaceCategory::Restaurant
        );
        assert_eq!(
            PlaceCategory::from_keywords("municipal archives"),
            PlaceCategory::Other
        );
    }

    #[test]
    fn test_params_builder() {
        let params = PlaceSearchParams::new("pizza")
            .with_location(Location::new(40.0, -74.0))
            .with_limit(5)
            .with_sort(SortOrder::Rating)
            .with_extra("opennow", "true");

        assert_eq!(params.query, "pizza");
        assert_eq!(params.limit, Some(5));
        assert_eq!(params.extra.get("opennow").map(String::as_str), Some("true"));
    }
}
