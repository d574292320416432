//! Radarr v3 API client.
//!
//! Covers the four operations the engine needs: list all movies (consuming
//! every page), list tags, create a tag, and replace a movie's tag set.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::RadarrConfig;
use crate::error::{Error, Result};

/// Timeout for Radarr API requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Movies fetched per page when listing the library.
const PAGE_SIZE: usize = 500;

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// Per-run snapshot of a Radarr movie. Only the tag set is ever written back.
#[derive(Debug, Clone)]
pub struct Movie {
    /// Radarr's internal id.
    pub id: i64,
    pub title: String,
    /// TMDB cross-reference, `None` when Radarr has no link.
    pub tmdb_id: Option<u64>,
    /// Tag ids currently applied to the movie.
    pub tags: HashSet<i64>,
}

/// A Radarr tag.
#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovieRecord {
    id: i64,
    title: String,
    #[serde(default)]
    tmdb_id: u64,
    #[serde(default)]
    tags: Vec<i64>,
}

impl From<MovieRecord> for Movie {
    fn from(r: MovieRecord) -> Self {
        Self {
            id: r.id,
            title: r.title,
            // Radarr uses 0 for "no TMDB link"
            tmdb_id: (r.tmdb_id != 0).then_some(r.tmdb_id),
            tags: r.tags.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Library trait
// ---------------------------------------------------------------------------

/// The library manager as seen by the reconciliation engine.
///
/// Tests substitute a fake; production uses [`RadarrClient`].
#[async_trait]
pub trait LibraryClient: Send + Sync {
    /// List every movie in the library. Pagination is consumed internally;
    /// any page failing aborts the whole listing rather than returning a
    /// truncated library.
    async fn list_movies(&self) -> Result<Vec<Movie>>;

    /// List all tags known to the library manager.
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Create a tag with the given label. Callers de-duplicate against
    /// `list_tags` first; Radarr itself does not reject duplicate labels.
    async fn create_tag(&self, label: &str) -> Result<Tag>;

    /// Replace a movie's tag set in one atomic update.
    async fn update_movie_tags(&self, movie_id: i64, tags: &HashSet<i64>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Client implementation
// ---------------------------------------------------------------------------

pub struct RadarrClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RadarrClient {
    pub fn new(config: &RadarrConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v3{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let resp = self
            .client
            .get(self.url(path))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("Radarr GET {path} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::upstream(format!(
                "Radarr GET {path} returned {}",
                resp.status()
            )));
        }
        Ok(resp)
    }

    async fn send_json(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response> {
        let resp = self
            .client
            .request(method.clone(), self.url(path))
            .header("X-Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("Radarr {method} {path} failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(Error::upstream(format!(
                "Radarr {method} {path} returned {status}: {detail}"
            )));
        }
        Ok(resp)
    }
}

#[async_trait]
impl LibraryClient for RadarrClient {
    async fn list_movies(&self) -> Result<Vec<Movie>> {
        let mut movies = Vec::new();
        let mut page = 1usize;

        loop {
            let path = format!("/movie?page={page}&pageSize={PAGE_SIZE}");
            let records: Vec<MovieRecord> = self
                .get(&path)
                .await?
                .json()
                .await
                .map_err(|e| Error::upstream(format!("malformed Radarr movie list: {e}")))?;

            let count = records.len();
            debug!(page, count, "fetched Radarr movie page");
            movies.extend(records.into_iter().map(Movie::from));

            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(movies)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.get("/tag")
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream(format!("malformed Radarr tag list: {e}")))
    }

    async fn create_tag(&self, label: &str) -> Result<Tag> {
        let body = serde_json::json!({ "label": label });
        self.send_json(reqwest::Method::POST, "/tag", &body)
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream(format!("malformed Radarr create-tag response: {e}")))
    }

    async fn update_movie_tags(&self, movie_id: i64, tags: &HashSet<i64>) -> Result<()> {
        // Radarr has no tags-only endpoint; re-fetch the full record and PUT
        // it back with the tags array replaced. The PUT is the atomic step.
        let path = format!("/movie/{movie_id}");
        let mut record: serde_json::Value = self
            .get(&path)
            .await?
            .json()
            .await
            .map_err(|e| Error::upstream(format!("malformed Radarr movie record: {e}")))?;

        let mut sorted: Vec<i64> = tags.iter().copied().collect();
        sorted.sort_unstable();
        record["tags"] = serde_json::json!(sorted);

        self.send_json(reqwest::Method::PUT, &path, &record).await?;
        Ok(())
    }
}
