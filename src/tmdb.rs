//! TMDB watch-provider client.
//!
//! Wraps the two TMDB v3 endpoints availarr needs: the per-region provider
//! catalog and the per-movie watch-provider lookup. Only flat-rate
//! (subscription streaming) offers count as availability; rentals and
//! purchases are ignored.
//!
//! Features:
//! - Token-bucket rate limiting at 4 requests / second via [`governor`].
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).
//! - 30-second request timeout.

use std::collections::HashMap;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// A streaming service as listed in the TMDB watch-provider catalog.
///
/// Plain data record; services have no behavioral differences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    /// TMDB's stable provider id.
    pub id: u64,
    /// Display name, e.g. "Netflix".
    pub name: String,
}

/// A region TMDB publishes watch-provider data for.
#[derive(Debug, Clone)]
pub struct Region {
    /// ISO 3166-1 code, e.g. "GB".
    pub code: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// Read-only availability data source.
///
/// The reconciliation engine only talks to this trait, so tests can swap in
/// a fake without any HTTP.
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// Fetch the catalog of known streaming providers for a region.
    ///
    /// An empty catalog is valid and means there is nothing to track.
    async fn fetch_providers(&self, region: &str) -> Result<Vec<Provider>>;

    /// Fetch the set of provider ids offering a movie via flat-rate
    /// streaming in `region`.
    ///
    /// Returns [`Error::NotFound`] when TMDB has no record of the movie;
    /// an empty set when it knows the movie but lists no streaming offers.
    async fn fetch_availability(&self, tmdb_id: u64, region: &str) -> Result<HashSet<u64>>;
}

// ---------------------------------------------------------------------------
// TMDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ProviderCatalogResponse {
    results: Vec<ProviderEntry>,
}

#[derive(Debug, Deserialize)]
struct ProviderEntry {
    provider_id: u64,
    provider_name: String,
}

#[derive(Debug, Deserialize)]
struct MovieProvidersResponse {
    /// Keyed by region code; absent regions simply have no offers.
    #[serde(default)]
    results: HashMap<String, RegionOffers>,
}

#[derive(Debug, Deserialize)]
struct RegionOffers {
    /// Subscription streaming offers. TMDB omits the key entirely when a
    /// movie is only rentable/buyable in the region.
    #[serde(default)]
    flatrate: Option<Vec<ProviderEntry>>,
}

#[derive(Debug, Deserialize)]
struct RegionListResponse {
    results: Vec<RegionEntry>,
}

#[derive(Debug, Deserialize)]
struct RegionEntry {
    iso_3166_1: String,
    english_name: String,
}

// ---------------------------------------------------------------------------
// Client implementation
// ---------------------------------------------------------------------------

/// TMDB v3 API client with built-in rate limiting and 429 retry.
pub struct TmdbClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TmdbClient {
    /// Create a client against the public TMDB API.
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, TMDB_BASE_URL.to_string())
    }

    /// Create a client against a custom base URL (proxies, tests).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");

        let quota = Quota::per_second(NonZeroU32::new(4).unwrap());
        let rate_limiter = RateLimiter::direct(quota);

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter,
        }
    }

    fn url(&self, path: &str, extra_params: &[(&str, &str)]) -> String {
        let mut url = format!("{}{}?api_key={}", self.base_url, path, self.api_key);
        for (key, value) in extra_params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }
        url
    }

    /// Execute a GET request with rate limiting and 429-retry logic.
    ///
    /// Maps 404 to [`Error::NotFound`] and every other failure to
    /// [`Error::Upstream`].
    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let mut retries = 0u32;
        loop {
            self.rate_limiter.until_ready().await;

            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| Error::upstream(format!("TMDB request failed: {e}")))?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    retry = retries,
                    wait_secs = wait,
                    "TMDB returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            if resp.status() == StatusCode::NOT_FOUND {
                return Err(Error::not_found(format!("TMDB has no data for {url}")));
            }
            if !resp.status().is_success() {
                return Err(Error::upstream(format!(
                    "TMDB request returned {}",
                    resp.status()
                )));
            }

            return Ok(resp);
        }
    }

    /// List the regions TMDB publishes watch-provider data for.
    pub async fn fetch_regions(&self) -> Result<Vec<Region>> {
        let url = self.url("/watch/providers/regions", &[]);
        debug!(url = %url, "TMDB list regions");

        let body: RegionListResponse = self
            .get(&url)
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream(format!("malformed TMDB region list: {e}")))?;

        Ok(body
            .results
            .into_iter()
            .map(|r| Region {
                code: r.iso_3166_1,
                name: r.english_name,
            })
            .collect())
    }
}

#[async_trait]
impl AvailabilitySource for TmdbClient {
    async fn fetch_providers(&self, region: &str) -> Result<Vec<Provider>> {
        let url = self.url("/watch/providers/movie", &[("watch_region", region)]);
        debug!(url = %url, "TMDB provider catalog");

        let body: ProviderCatalogResponse = self
            .get(&url)
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream(format!("malformed TMDB provider catalog: {e}")))?;

        Ok(body
            .results
            .into_iter()
            .map(|p| Provider {
                id: p.provider_id,
                name: p.provider_name,
            })
            .collect())
    }

    async fn fetch_availability(&self, tmdb_id: u64, region: &str) -> Result<HashSet<u64>> {
        let url = self.url(&format!("/movie/{tmdb_id}/watch/providers"), &[]);
        debug!(url = %url, "TMDB movie watch providers");

        let body: MovieProvidersResponse = self
            .get(&url)
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream(format!("malformed TMDB availability response: {e}")))?;

        // A missing region or missing flatrate block means no streaming
        // offers there, which is normal.
        let ids = body
            .results
            .get(region)
            .and_then(|offers| offers.flatrate.as_ref())
            .map(|entries| entries.iter().map(|p| p.provider_id).collect())
            .unwrap_or_default();

        Ok(ids)
    }
}
