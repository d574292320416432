//! Reconciliation engine.
//!
//! One run: pull the provider catalog once, pull the full movie list once,
//! then per movie look up current streaming availability and converge the
//! movie's managed tags to it. Only the minimal diff is written, foreign
//! (non-prefix) tags are never touched, and repeated runs with unchanged
//! upstream data issue zero writes.
//!
//! The run is a sequential batch. The tag registry is warmed serially for
//! every tracked provider before movie processing starts, so no tag
//! creation happens mid-run (the create-if-absent path is not safe to race).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::radarr::{LibraryClient, Movie};
use crate::tags::{self, TagRegistry};
use crate::tmdb::{AvailabilitySource, Provider};

/// Engine options derived from configuration.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// ISO 3166-1 region availability is evaluated in.
    pub region: String,
    /// Tracked provider names from config (matched ignoring case and
    /// punctuation).
    pub tracked_providers: Vec<String>,
    /// Managed tag label prefix.
    pub tag_prefix: String,
    /// Compute and log diffs without writing anything.
    pub dry_run: bool,
}

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Movies whose tag set was written (or would be, in dry-run).
    pub updated: usize,
    /// Movies already converged; no write issued.
    pub unchanged: usize,
    /// Movies skipped for lack of a TMDB id.
    pub skipped: usize,
    /// Movies that hit a per-movie upstream failure.
    pub errored: usize,
}

/// Orchestrates one reconciliation run over substitutable clients.
pub struct Reconciler {
    library: Arc<dyn LibraryClient>,
    availability: Arc<dyn AvailabilitySource>,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(
        library: Arc<dyn LibraryClient>,
        availability: Arc<dyn AvailabilitySource>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            library,
            availability,
            options,
        }
    }

    /// Execute one full reconciliation pass.
    ///
    /// Fails fast on the global prerequisites (provider catalog, tag list,
    /// movie list); per-movie failures are counted and skipped.
    pub async fn run(&self) -> Result<RunSummary> {
        let region = &self.options.region;

        let catalog = self.availability.fetch_providers(region).await?;
        let tracked = self.tracked_from_catalog(&catalog);
        info!(
            region,
            catalog = catalog.len(),
            tracked = tracked.len(),
            dry_run = self.options.dry_run,
            "starting reconciliation run"
        );

        let mut registry = TagRegistry::new(self.library.clone(), &self.options.tag_prefix);
        registry.load().await?;
        if !self.options.dry_run {
            // Pre-warm phase: all tag creation happens here, serially.
            registry.warm(&tracked).await?;
        }

        let tracked_by_id: HashMap<u64, &Provider> =
            tracked.iter().map(|p| (p.id, p)).collect();

        let movies = self.library.list_movies().await?;
        info!(movies = movies.len(), "fetched movie library");

        let mut summary = RunSummary::default();
        for movie in &movies {
            match self
                .reconcile_movie(movie, &tracked_by_id, &mut registry)
                .await
            {
                Ok(outcome) => match outcome {
                    Outcome::Updated => summary.updated += 1,
                    Outcome::Unchanged => summary.unchanged += 1,
                    Outcome::Skipped => summary.skipped += 1,
                },
                Err(e) => {
                    warn!(
                        movie_id = movie.id,
                        title = %movie.title,
                        error = %e,
                        "movie reconciliation failed, continuing"
                    );
                    summary.errored += 1;
                }
            }
        }

        info!(
            updated = summary.updated,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            errored = summary.errored,
            "reconciliation run complete"
        );
        Ok(summary)
    }

    /// Intersect the configured provider names with the region's catalog.
    fn tracked_from_catalog(&self, catalog: &[Provider]) -> Vec<Provider> {
        let wanted: HashSet<String> = self
            .options
            .tracked_providers
            .iter()
            .map(|n| tags::normalize_name(n))
            .collect();

        let tracked: Vec<Provider> = catalog
            .iter()
            .filter(|p| wanted.contains(&tags::normalize_name(&p.name)))
            .cloned()
            .collect();

        let found: HashSet<String> =
            tracked.iter().map(|p| tags::normalize_name(&p.name)).collect();
        for name in &self.options.tracked_providers {
            if !found.contains(&tags::normalize_name(name)) {
                warn!(provider = %name, "tracked provider not in TMDB catalog for this region");
            }
        }

        tracked
    }

    async fn reconcile_movie(
        &self,
        movie: &Movie,
        tracked_by_id: &HashMap<u64, &Provider>,
        registry: &mut TagRegistry,
    ) -> Result<Outcome> {
        let Some(tmdb_id) = movie.tmdb_id else {
            debug!(movie_id = movie.id, title = %movie.title, "no TMDB id, skipping");
            return Ok(Outcome::Skipped);
        };

        let available = match self
            .availability
            .fetch_availability(tmdb_id, &self.options.region)
            .await
        {
            Ok(ids) => ids,
            // No availability data is normal and means "streams nowhere".
            Err(Error::NotFound(_)) => HashSet::new(),
            Err(e) => return Err(e),
        };

        let tracked_available: Vec<&Provider> = available
            .iter()
            .filter_map(|id| tracked_by_id.get(id).copied())
            .collect();

        let mut desired: HashSet<i64> = HashSet::new();
        let mut missing_labels: Vec<String> = Vec::new();
        for provider in &tracked_available {
            if self.options.dry_run {
                // Never create tags in dry-run; report what would be needed.
                match registry.peek(provider) {
                    Some(id) => {
                        desired.insert(id);
                    }
                    None => missing_labels
                        .push(tags::provider_label(&self.options.tag_prefix, &provider.name)),
                }
            } else {
                desired.insert(registry.resolve(provider).await?);
            }
        }

        let current_managed: HashSet<i64> = movie
            .tags
            .intersection(registry.owned_tag_ids())
            .copied()
            .collect();

        if desired == current_managed && missing_labels.is_empty() {
            debug!(movie_id = movie.id, title = %movie.title, "already converged");
            return Ok(Outcome::Unchanged);
        }

        let new_tags: HashSet<i64> = movie
            .tags
            .difference(registry.owned_tag_ids())
            .copied()
            .chain(desired.iter().copied())
            .collect();

        if self.options.dry_run {
            info!(
                movie_id = movie.id,
                title = %movie.title,
                streaming_on = tracked_available.len(),
                would_create = ?missing_labels,
                "dry-run: tag set would change"
            );
            return Ok(Outcome::Updated);
        }

        self.library.update_movie_tags(movie.id, &new_tags).await?;
        info!(
            movie_id = movie.id,
            title = %movie.title,
            streaming_on = tracked_available.len(),
            "updated tags"
        );
        Ok(Outcome::Updated)
    }
}

enum Outcome {
    Updated,
    Unchanged,
    Skipped,
}
