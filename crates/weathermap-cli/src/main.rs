mod commands;
mod console;

use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use weathermap_client::WeatherClient;
use weathermap_core::{AppConfig, LocationRegistry, Tier};
use weathermap_map::{MapSession, WeatherCategory};

use crate::console::{snapshot_line, ConsoleSurface};

#[derive(Debug, Parser)]
#[command(name = "weathermap")]
#[command(about = "Headless China weather map")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load the map once, wait for every fetch, and print the markers
    Snapshot(SnapshotArgs),
    /// Keep the map live with periodic refresh; reads commands from stdin
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Call the upstream API directly with OPENWEATHER_API_KEY instead of the proxy
    #[arg(long)]
    direct: bool,
    /// Fetch the city and county lists from the proxy instead of the local registry
    #[arg(long, conflicts_with = "direct")]
    locations_from_proxy: bool,
}

#[derive(Debug, Args)]
struct SnapshotArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Forecast date (YYYY-MM-DD), today through today+4
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Also show the county tier
    #[arg(long)]
    counties: bool,
    /// Emphasize markers of one category and dim the rest
    #[arg(long)]
    filter: Option<WeatherCategory>,
}

#[derive(Debug, Args)]
struct WatchArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Show the county tier from the start
    #[arg(long)]
    counties: bool,
    /// Override WEATHERMAP_REFRESH_INTERVAL_SECS
    #[arg(long, env = "WEATHERMAP_REFRESH_INTERVAL_SECS")]
    refresh_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so `.env` can supply clap's `env` fallbacks.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = weathermap_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Snapshot(args) => run_snapshot(&config, args).await,
        Commands::Watch(args) => run_watch(&config, args).await,
    }
}

async fn run_snapshot(config: &AppConfig, args: SnapshotArgs) -> anyhow::Result<()> {
    let (client, registry) = connect(config, &args.source).await?;
    let mut session = MapSession::new(
        registry,
        ConsoleSurface::default(),
        client,
        config.local_offset(),
    );

    if let Some(date) = args.date {
        session.select_date(date, Utc::now())?;
    }
    session.load_primary();
    if args.counties {
        session.toggle_secondary();
    }
    session.apply_filter(args.filter);
    session.settle().await;

    for tier in [Tier::Primary, Tier::Secondary] {
        for entry in session.store().all_entries(tier) {
            if entry.visual().visible {
                println!("{}", snapshot_line(entry));
            }
        }
    }
    Ok(())
}

async fn run_watch(config: &AppConfig, args: WatchArgs) -> anyhow::Result<()> {
    let (client, registry) = connect(config, &args.source).await?;
    let lookup = registry.clone();
    let refresh = Duration::from_secs(args.refresh_secs.unwrap_or(config.refresh_interval_secs));
    let mut session = MapSession::new(
        registry,
        ConsoleSurface::default(),
        client,
        config.local_offset(),
    )
    .with_refresh_interval(refresh);

    session.load_primary();
    if args.counties {
        session.toggle_secondary();
    }

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        eprintln!("{}", commands::HELP);
        while let Ok(Some(line)) = lines.next_line().await {
            match commands::parse_command(&line, &lookup) {
                Ok(command) => {
                    if tx.send(command).await.is_err() {
                        break;
                    }
                }
                Err(message) => eprintln!("{message}"),
            }
        }
    });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    session.run(rx, shutdown).await;
    Ok(())
}

/// Picks the weather backend and the location registry.
async fn connect(
    config: &AppConfig,
    source: &SourceArgs,
) -> anyhow::Result<(WeatherClient, LocationRegistry)> {
    let client = if source.direct {
        WeatherClient::upstream_from_config(config)?
            .context("--direct requires OPENWEATHER_API_KEY")?
    } else {
        WeatherClient::proxy_from_config(config)?
    };

    let registry = if source.locations_from_proxy {
        let cities = client
            .locations(Tier::Primary)
            .await
            .context("failed to fetch cities from proxy")?;
        let counties = client
            .locations(Tier::Secondary)
            .await
            .context("failed to fetch counties from proxy")?;
        LocationRegistry::from_lists(cities, counties)?
    } else {
        weathermap_core::load_registry(config.locations_path.as_deref())?
    };

    tracing::info!(
        direct = source.direct,
        cities = registry.cities.len(),
        counties = registry.counties.len(),
        "map source ready"
    );
    Ok((client, registry))
}
