mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

use availarr::config::{self, Config};
use availarr::engine::{ReconcileOptions, Reconciler};
use availarr::radarr::RadarrClient;
use availarr::tmdb::TmdbClient;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "availarr=trace,reqwest=debug".to_string()
        } else {
            "availarr=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Run { dry_run } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_once(cli.config.as_deref(), dry_run))
        }
        Commands::Start => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start(cli.config.as_deref()))
        }
        Commands::Providers { regions } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(list_providers(cli.config.as_deref(), regions))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate(path.as_deref())
        }
        Commands::Version => {
            println!("availarr {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn reconciler(config: &Config, dry_run: bool) -> Reconciler {
    let library = Arc::new(RadarrClient::new(&config.radarr));
    let tmdb = Arc::new(TmdbClient::new(config.tmdb.api_key.clone()));

    Reconciler::new(
        library,
        tmdb,
        ReconcileOptions {
            region: config.region.clone(),
            tracked_providers: config.providers.clone(),
            tag_prefix: config.tag_prefix.clone(),
            dry_run,
        },
    )
}

async fn run_once(config_path: Option<&Path>, dry_run: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let summary = reconciler(&config, dry_run).run().await?;

    println!(
        "Run complete: {} updated, {} unchanged, {} skipped, {} errored",
        summary.updated, summary.unchanged, summary.skipped, summary.errored
    );
    Ok(())
}

async fn start(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let engine = reconciler(&config, false);

    tracing::info!(
        interval_secs = config.run_interval_secs,
        "starting scheduled reconciliation"
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.run_interval_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        // A failed run is not fatal; the next tick is the retry mechanism.
        if let Err(e) = engine.run().await {
            tracing::error!(error = %e, "reconciliation run failed, will retry next tick");
        }
    }
}

async fn list_providers(config_path: Option<&Path>, regions: bool) -> Result<()> {
    use availarr::tmdb::AvailabilitySource;

    let config = config::load_config_or_default(config_path)?;
    let tmdb = TmdbClient::new(config.tmdb.api_key.clone());

    if regions {
        println!("Regions\n-------");
        for region in tmdb.fetch_regions().await? {
            println!("{}\t{}", region.code, region.name);
        }
        println!();
    }

    println!("Providers ({})\n---------", config.region);
    let mut providers = tmdb.fetch_providers(&config.region).await?;
    providers.sort_by(|a, b| a.name.cmp(&b.name));
    for provider in providers {
        println!("{}\t{}", provider.id, provider.name);
    }
    Ok(())
}

fn validate(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Configuration OK");
    println!("  radarr: {}", config.radarr.url);
    println!("  region: {}", config.region);
    println!("  tracked providers: {}", config.providers.len());
    println!("  tag prefix: {}", config.tag_prefix);
    Ok(())
}
