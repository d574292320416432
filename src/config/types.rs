use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub radarr: RadarrConfig,

    #[serde(default)]
    pub tmdb: TmdbConfig,

    /// ISO 3166-1 region code scoping which availability data applies.
    #[serde(default = "default_region")]
    pub region: String,

    /// Streaming services to track, by display name (e.g. "Netflix").
    /// Matching against the TMDB catalog ignores case and punctuation.
    #[serde(default)]
    pub providers: Vec<String>,

    /// Prefix identifying tags owned by availarr. Tags without this prefix
    /// are never touched.
    #[serde(default = "default_tag_prefix")]
    pub tag_prefix: String,

    /// Seconds between reconciliation passes in `start` mode.
    #[serde(default = "default_run_interval")]
    pub run_interval_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RadarrConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TmdbConfig {
    #[serde(default)]
    pub api_key: String,
}

fn default_region() -> String {
    "US".to_string()
}

fn default_tag_prefix() -> String {
    "avail-".to_string()
}

fn default_run_interval() -> u64 {
    // 6 hours; availability data changes slowly
    21600
}
