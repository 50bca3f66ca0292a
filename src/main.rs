use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use placegrid::{
    config::Config,
    crawl::{self, CrawlConfig},
    db,
    grid::GridPlanner,
    nearby::NearbySearch,
    GridKey,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Tile an area into a grid and collect the places around each point")]
struct Cli {
    /// YAML file with defaults for every option below
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    #[arg(long, global = true, env = "PLACES_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, global = true, allow_negative_numbers = true)]
    center_lat: Option<f64>,
    #[arg(long, global = true, allow_negative_numbers = true)]
    center_lng: Option<f64>,
    #[arg(long, global = true)]
    grid_count: Option<u32>,
    #[arg(long, global = true)]
    spacing: Option<f64>,
    /// metres
    #[arg(long, global = true)]
    radius: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Add the configured grid to the database without searching
    Grid,
    /// Search every pending grid point
    Run {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print row counts
    Status,
    /// Print pending grid points
    Pending,
    /// Mark a grid point as searched
    Complete { location: GridKey },
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(x) = &self.database {
            config.database = x.clone();
        }
        if let Some(x) = &self.api_key {
            config.api_key = Some(x.clone());
        }
        if let Some(x) = self.center_lat {
            config.center.lat = x;
        }
        if let Some(x) = self.center_lng {
            config.center.lng = x;
        }
        if let Some(x) = self.grid_count {
            config.grid_count = x;
        }
        if let Some(x) = self.spacing {
            config.spacing = x;
        }
        if let Some(x) = self.radius {
            config.radius = x;
        }

        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config()?;
    let conn = db::open(&config.database)
        .with_context(|| format!("Failed to open {}", config.database.display()))?;

    match cli.command {
        Command::Grid => {
            let outcome = GridPlanner::new(&conn).generate(&config.grid()?)?;
            info!(
                inserted = outcome.inserted,
                total = outcome.total,
                "search grid ready"
            );
        }
        Command::Run { limit } => {
            let api_key = config
                .api_key
                .clone()
                .context("No API key, pass --api-key or set PLACES_API_KEY")?;
            let search = NearbySearch::new(api_key, config.pagination());
            let report = crawl::run(
                &conn,
                &search,
                &CrawlConfig {
                    grid: config.grid()?,
                    radius: config.radius,
                    limit,
                },
            )?;
            info!(
                pending = report.pending,
                searched = report.searched,
                completed = report.completed,
                failed = report.failed,
                new_places = report.new_places,
                "run finished"
            );
        }
        Command::Status => {
            println!("{}", serde_json::to_string_pretty(&db::summary(&conn)?)?);
        }
        Command::Pending => {
            for x in GridPlanner::new(&conn).pending()? {
                println!("{x}");
            }
        }
        Command::Complete { location } => {
            if GridPlanner::new(&conn).mark_completed(&location)? {
                info!(%location, "marked completed");
            } else {
                warn!(%location, "not in the search grid, nothing changed");
            }
        }
    }

    Ok(())
}
