//! CLI command implementations

use anyhow::Context;
use clap::Subcommand;
use waypoint_search::{Location, PlaceSearchParams, SearchResponse, SortOrder};

use crate::bootstrap;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Search for places
    Search {
        /// Search text
        query: String,
        /// Bias latitude, requires --lng
        #[arg(long)]
        lat: Option<f64>,
        /// Bias longitude, requires --lat
        #[arg(long)]
        lng: Option<f64>,
        /// Search radius in meters
        #[arg(long)]
        radius: Option<u32>,
        /// Page size
        #[arg(short, long)]
        limit: Option<usize>,
        /// Results to skip before the returned page
        #[arg(long)]
        offset: Option<usize>,
        /// Result ordering: relevance, rating, distance, name
        #[arg(short, long)]
        sort: Option<String>,
        /// Category filter
        #[arg(short, long)]
        category: Option<String>,
        /// Result language
        #[arg(long)]
        language: Option<String>,
        /// Provider to prefer instead of the configured default
        #[arg(short, long)]
        provider: Option<String>,
        /// Emit the raw response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check health of registered providers
    Health {
        /// Provider names to check; all registered when omitted
        providers: Vec<String>,
        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show factory state and registered providers
    Providers,
}

/// Handle the CLI command
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Search {
            query,
            lat,
            lng,
            radius,
            limit,
            offset,
            sort,
            category,
            language,
            provider,
            json,
        } => {
            let params = build_params(
                query, lat, lng, radius, limit, offset, sort, category, language,
            )?;
            search(params, provider, json).await
        }
        Commands::Health { providers, json } => health(providers, json).await,
        Commands::Providers => show_providers().await,
    }
}

#[allow(clippy::too_many_arguments)]
fn build_params(
    query: String,
    lat: Option<f64>,
    lng: Option<f64>,
    radius: Option<u32>,
    limit: Option<usize>,
    offset: Option<usize>,
    sort: Option<String>,
    category: Option<String>,
    language: Option<String>,
) -> anyhow::Result<PlaceSearchParams> {
    let mut params = PlaceSearchParams::new(query);

    if let Some(location) = bias_location(lat, lng)? {
        params = params.with_location(location);
    }
    if let Some(radius) = radius {
        params = params.with_radius_m(radius);
    }
    if let Some(limit) = limit {
        params = params.with_limit(limit);
    }
    if let Some(offset) = offset {
        params = params.with_offset(offset);
    }
    if let Some(sort) = sort {
        let sort = sort.parse::<SortOrder>().map_err(anyhow::Error::msg)?;
        params = params.with_sort(sort);
    }
    if let Some(category) = category {
        params = params.with_category(category);
    }
    if let Some(language) = language {
        params = params.with_language(language);
    }

    Ok(params)
}

fn bias_location(lat: Option<f64>, lng: Option<f64>) -> anyhow::Result<Option<Location>> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Ok(Some(Location::new(lat, lng))),
        (None, None) => Ok(None),
        _ => anyhow::bail!("--lat and --lng must be provided together"),
    }
}

async fn search(
    params: PlaceSearchParams,
    preferred: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let factory = bootstrap::build_factory();
    factory
        .initialize(bootstrap::factory_config_from_env())
        .await
        .context("factory initialization failed")?;

    let provider = factory.provider_with_failover(preferred.as_deref()).await?;
    let response = provider.search_places(&params).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }

    factory.cleanup().await;
    Ok(())
}

fn print_response(response: &SearchResponse) {
    let meta = &response.metadata;
    println!(
        "Results for '{}' via {} ({} ms)",
        response.query, meta.provider, meta.duration_ms
    );
    println!("{:-<60}", "");

    if response.results.is_empty() {
        println!("No results.");
    } else {
        let first_index = (meta.page - 1) * meta.page_size;
        for (i, place) in response.results.iter().enumerate() {
            println!("{:2}. {}", first_index + i + 1, place.name);
            println!("    {}", place.address);

            let mut details = Vec::new();
            if let Some(rating) = place.rating {
                details.push(format!("rating {rating:.1}"));
            }
            if let Some(distance) = place.distance_m {
                details.push(format!("{distance:.0} m away"));
            }
            if let Some(category) = place.category {
                details.push(category.to_string());
            }
            if place.open_now == Some(true) {
                details.push("open now".to_string());
            }
            if !details.is_empty() {
                println!("    {}", details.join(" | "));
            }
        }
    }

    println!();
    println!(
        "Page {}/{} ({} results total)",
        meta.page,
        meta.total_pages.max(1),
        meta.total_results
    );
}

async fn health(providers: Vec<String>, json: bool) -> anyhow::Result<()> {
    let factory = bootstrap::build_factory();
    if let Err(error) = factory
        .initialize(bootstrap::factory_config_from_env())
        .await
    {
        tracing::warn!(error = %error, "factory initialization failed, checking health anyway");
    }

    let names = if providers.is_empty() {
        None
    } else {
        Some(providers)
    };
    let health = factory.check_health(names.as_deref()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&health)?);
    } else {
        let mut names: Vec<&String> = health.keys().collect();
        names.sort();
        for name in names {
            let result = &health[name];
            let status = if result.healthy { "healthy" } else { "unhealthy" };
            match &result.error {
                Some(error) => println!(
                    "{name:16} {status:10} {:5} ms  {error}",
                    result.response_time_ms
                ),
                None => println!("{name:16} {status:10} {:5} ms", result.response_time_ms),
            }
        }
    }

    factory.cleanup().await;
    Ok(())
}

async fn show_providers() -> anyhow::Result<()> {
    let factory = bootstrap::build_factory();
    if let Err(error) = factory
        .initialize(bootstrap::factory_config_from_env())
        .await
    {
        tracing::warn!(error = %error, "factory initialization failed");
    }

    let stats = factory.stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);

    factory.cleanup().await;
    Ok(())
}
