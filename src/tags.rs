//! Tag registry: maps tracked streaming providers to Radarr tag ids.
//!
//! For the duration of one run the registry is the single source of truth
//! for provider → tag resolution. It fetches the existing tag list once,
//! resolves providers by exact label match, and creates missing tags on
//! demand. Resolution is memoized, so a provider costs at most one create
//! call per run.
//!
//! Resolves must not race: callers pre-warm the registry serially for every
//! tracked provider before any parallel work (two concurrent resolves for a
//! not-yet-existing provider would create duplicate tags).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::radarr::LibraryClient;
use crate::tmdb::Provider;

/// Derive the managed tag label for a provider name.
///
/// Deterministic and collision-free for distinct provider names differing by
/// more than case/punctuation: the prefix plus the name stripped of
/// non-alphanumerics, all lowercased. "Disney Plus" with prefix "avail-"
/// becomes "avail-disneyplus". Repeated runs therefore find and reuse the
/// same tag instead of creating duplicates.
pub fn provider_label(prefix: &str, name: &str) -> String {
    let stripped: String = name.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    format!("{prefix}{stripped}").to_lowercase()
}

/// Normalize a provider name for allow-list matching (same stripping rule as
/// labels, without the prefix).
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

pub struct TagRegistry {
    library: Arc<dyn LibraryClient>,
    prefix: String,
    /// Managed-prefix labels already present in Radarr.
    by_label: HashMap<String, i64>,
    /// Every managed tag id: pre-existing prefix tags plus any created this
    /// run. Deliberately includes tags for providers no longer tracked, so
    /// de-tracking a service strips its stale tags instead of orphaning them.
    owned: HashSet<i64>,
    /// Memoized provider id → tag id.
    resolved: HashMap<u64, i64>,
}

impl TagRegistry {
    pub fn new(library: Arc<dyn LibraryClient>, prefix: &str) -> Self {
        Self {
            library,
            prefix: prefix.to_lowercase(),
            by_label: HashMap::new(),
            owned: HashSet::new(),
            resolved: HashMap::new(),
        }
    }

    /// Fetch the existing tag list and index every managed-prefix tag.
    ///
    /// Must be called once before [`resolve`](Self::resolve) or
    /// [`owned_tag_ids`](Self::owned_tag_ids).
    pub async fn load(&mut self) -> Result<()> {
        let tags = self.library.list_tags().await?;
        for tag in tags {
            if tag.label.starts_with(&self.prefix) {
                self.owned.insert(tag.id);
                self.by_label.insert(tag.label, tag.id);
            }
        }
        debug!(managed = self.owned.len(), "tag registry loaded");
        Ok(())
    }

    /// Serially resolve every given provider, creating missing tags.
    ///
    /// After warming, `resolve` for these providers is a pure cache hit and
    /// movie processing performs no tag mutations.
    pub async fn warm(&mut self, providers: &[Provider]) -> Result<()> {
        for provider in providers {
            self.resolve(provider).await?;
        }
        Ok(())
    }

    /// Resolve a provider to its tag id, creating the tag when absent.
    pub async fn resolve(&mut self, provider: &Provider) -> Result<i64> {
        if let Some(&id) = self.resolved.get(&provider.id) {
            return Ok(id);
        }

        let label = provider_label(&self.prefix, &provider.name);
        let id = match self.by_label.get(&label) {
            Some(&id) => id,
            None => {
                info!(%label, provider = %provider.name, "creating tag");
                let tag = self.library.create_tag(&label).await?;
                self.by_label.insert(tag.label, tag.id);
                tag.id
            }
        };

        self.owned.insert(id);
        self.resolved.insert(provider.id, id);
        Ok(id)
    }

    /// Resolve without creating: the tag id if it already exists.
    pub fn peek(&self, provider: &Provider) -> Option<i64> {
        if let Some(&id) = self.resolved.get(&provider.id) {
            return Some(id);
        }
        let label = provider_label(&self.prefix, &provider.name);
        self.by_label.get(&label).copied()
    }

    /// Every tag id this scheme owns, tracked or not.
    pub fn owned_tag_ids(&self) -> &HashSet<i64> {
        &self.owned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_strips_punctuation_and_case() {
        assert_eq!(provider_label("avail-", "Disney Plus"), "avail-disneyplus");
        assert_eq!(provider_label("avail-", "Netflix"), "avail-netflix");
        assert_eq!(
            provider_label("avail-", "Paramount+ with Showtime"),
            "avail-paramountwithshowtime"
        );
    }

    #[test]
    fn label_is_deterministic() {
        assert_eq!(
            provider_label("avail-", "Amazon Prime Video"),
            provider_label("avail-", "Amazon Prime Video")
        );
    }

    #[test]
    fn normalized_names_ignore_case_and_punctuation() {
        assert_eq!(normalize_name("NETFLIX"), "netflix");
        assert_eq!(normalize_name("Apple TV+"), "appletv");
        assert_eq!(normalize_name("Disney Plus"), normalize_name("disney-plus"));
    }
}
