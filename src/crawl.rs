use anyhow::{Context, Result};
use itertools::Itertools;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::{
    grid::{GridPlanner, GridSpec},
    nearby::PlaceSearch,
    places::PlaceStore,
    utils::progress_bar,
};

#[derive(Debug, Clone, Copy)]
pub struct CrawlConfig {
    pub grid: GridSpec,
    /// metres
    pub radius: u32,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// pending locations found before applying `limit`
    pub pending: usize,
    pub searched: usize,
    pub completed: usize,
    pub failed: usize,
    pub new_places: usize,
}

/// Searches every pending grid point once. A failed search leaves its point
/// pending for the next run; storage errors abort.
pub fn run(conn: &Connection, search: &impl PlaceSearch, config: &CrawlConfig) -> Result<CrawlReport> {
    let planner = GridPlanner::new(conn);
    let store = PlaceStore::new(conn);

    let half_diagonal = config.grid.half_diagonal_metres();
    if half_diagonal > f64::from(config.radius) {
        warn!(
            radius = config.radius,
            half_diagonal = format_args!("{half_diagonal:.0}"),
            "search radius doesn't reach the corners of each grid cell"
        );
    }

    let generated = planner
        .generate(&config.grid)
        .context("Failed to generate search grid")?;
    info!(
        count = config.grid.count(),
        spacing = config.grid.spacing(),
        inserted = generated.inserted,
        total = generated.total,
        "search grid ready"
    );

    let mut pending = planner.pending().context("Failed to list pending locations")?;
    if pending.is_empty() {
        info!("all search locations have already been completed");
        return Ok(CrawlReport::default());
    }
    let mut report = CrawlReport {
        pending: pending.len(),
        ..Default::default()
    };
    if let Some(limit) = config.limit {
        pending.truncate(limit);
    }
    info!(
        pending = report.pending,
        visiting = pending.len(),
        "found pending locations"
    );

    let mut failed = Vec::new();
    let pb = progress_bar(pending.len() as u64);
    for location in &pending {
        pb.set_message(location.to_string());
        report.searched += 1;

        match search.search(location, config.radius) {
            Ok(records) => {
                let outcome = store
                    .upsert_batch(&records)
                    .with_context(|| format!("Failed to store places for {location}"))?;
                planner
                    .mark_completed(location)
                    .with_context(|| format!("Failed to mark {location} completed"))?;
                info!(
                    %location,
                    fetched = records.len(),
                    new_places = outcome.new_places,
                    skipped = outcome.rejected,
                    "location completed"
                );
                report.completed += 1;
                report.new_places += outcome.new_places;
            }
            Err(err) => {
                warn!(%location, error = %err, "search failed, will retry next run");
                report.failed += 1;
                failed.push(location);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if !failed.is_empty() {
        warn!(locations = %failed.iter().join(" "), "left pending");
    }
    Ok(report)
}
