mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

use crate::error::Error;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./availarr.toml",
        "./config.toml",
        "~/.config/availarr/config.toml",
        "/etc/availarr/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Err(Error::config("no config file found; pass --config or create ./availarr.toml").into())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<(), Error> {
    if config.radarr.url.is_empty() {
        return Err(Error::config("radarr.url is required"));
    }
    if config.radarr.api_key.is_empty() {
        return Err(Error::config("radarr.api_key is required"));
    }
    if config.tmdb.api_key.is_empty() {
        return Err(Error::config("tmdb.api_key is required"));
    }
    if config.region.is_empty() {
        return Err(Error::config("region cannot be empty"));
    }
    // An empty prefix would make every existing tag look managed and the
    // engine would start deleting user tags.
    if config.tag_prefix.is_empty() {
        return Err(Error::config("tag_prefix cannot be empty"));
    }
    if config.run_interval_secs == 0 {
        return Err(Error::config("run_interval_secs cannot be 0"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn valid() -> Config {
        toml::from_str(
            r#"
            region = "GB"
            providers = ["Netflix", "Disney Plus"]

            [radarr]
            url = "http://localhost:7878"
            api_key = "radarr-key"

            [tmdb]
            api_key = "tmdb-key"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn parses_full_config() {
        let config = valid();
        assert_eq!(config.region, "GB");
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.tag_prefix, "avail-");
        assert_eq!(config.run_interval_secs, 21600);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_missing_api_keys() {
        let mut config = valid();
        config.radarr.api_key.clear();
        assert_matches!(validate_config(&config), Err(Error::Config(_)));

        let mut config = valid();
        config.tmdb.api_key.clear();
        assert_matches!(validate_config(&config), Err(Error::Config(_)));
    }

    #[test]
    fn rejects_empty_tag_prefix() {
        let mut config = valid();
        config.tag_prefix.clear();
        assert_matches!(validate_config(&config), Err(Error::Config(_)));
    }

    #[test]
    fn empty_provider_list_is_valid() {
        let mut config = valid();
        config.providers.clear();
        assert!(validate_config(&config).is_ok());
    }
}
