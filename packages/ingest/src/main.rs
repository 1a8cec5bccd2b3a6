#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the earthquake query tool.

use std::path::PathBuf;

use clap::Parser;
use quake_map_database::EarthquakeStore;
use quake_map_database::paths::DataDir;
use quake_map_ingest::{QueryError, QueryParams, QueryService, format_closest, format_row};
use quake_map_source::MalformedPolicy;
use quake_map_source::bounding_box::ensure_bounding_box;
use quake_map_source::fdsn::FdsnClient;
use quake_map_source::registry;

#[derive(Parser)]
#[command(
    name = "quake_map_ingest",
    about = "Fetch recent earthquakes and list the strongest ones"
)]
struct Cli {
    /// Number of days back to fetch and rank
    #[arg(long)]
    days: i64,
    /// Number of earthquakes to list
    #[arg(long = "K")]
    k: i64,
    /// Minimum magnitude (inclusive)
    #[arg(long, allow_negative_numbers = true)]
    magnitude: f64,
    /// Also print the 5 closest municipalities for each earthquake
    #[arg(long)]
    closest_municipalities: bool,
    /// Directory holding the store, bounding box and municipality dataset
    #[arg(long, env = "QUAKE_MAP_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// Event service ID (e.g., "ingv", "usgs"); defaults to the
    /// highest-priority enabled service
    #[arg(long, env = "QUAKE_MAP_SOURCE")]
    source: Option<String>,
    /// Fail on the first malformed event instead of skipping it
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log::error!("{}: {e}", e.kind());
        eprintln!("{}: {e}", e.kind());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), QueryError> {
    let params = QueryParams {
        days: cli.days,
        k: cli.k,
        min_magnitude: cli.magnitude,
        with_proximity: cli.closest_municipalities,
    };
    params.validate()?;

    println!(
        "User parameters: Days: {}, K: {}, Magnitude: {}",
        params.days, params.k, params.min_magnitude
    );

    let service = match cli.source.as_deref() {
        Some(id) => registry::find_service(id).ok_or_else(|| QueryError::InvalidQuery {
            message: format!(
                "unknown event service {id:?}. Available: {}",
                registry::all_services()
                    .iter()
                    .map(|s| s.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })?,
        None => registry::default_service().ok_or_else(|| QueryError::InvalidQuery {
            message: "no enabled event service configured".to_string(),
        })?,
    };
    log::info!("Using event service {} ({})", service.id, service.name);

    let data_dir = DataDir::resolve(cli.data_dir);
    log::debug!("Data directory: {}", data_dir.root().display());

    let bbox = ensure_bounding_box(&data_dir.bounding_box_path())?;
    let store = EarthquakeStore::open(&data_dir.earthquakes_db_path())?;
    let policy = if cli.strict {
        MalformedPolicy::Abort
    } else {
        MalformedPolicy::Skip
    };

    let query = QueryService::new(
        Box::new(FdsnClient::new(service)?),
        store,
        bbox,
        data_dir.settlements_path(),
    )
    .with_policy(policy);

    for row in query.run(&params).await? {
        println!("{}", format_row(&row.earthquake));
        for (name, km) in row.closest.iter().flatten() {
            println!("{}", format_closest(name, *km));
        }
    }

    Ok(())
}
