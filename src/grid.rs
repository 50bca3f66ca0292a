use _model::{GridKey, Location, ParseKeyError, SearchStatus};
use geo::HaversineDistance;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;
use typed_floats::tf64::StrictlyPositiveFinite;

use crate::db::{self, Result};

/// A square lattice of `count` by `count` points, `spacing` degrees apart,
/// centred on `center`. Every point is a valid coordinate.
#[derive(Copy, Clone, Debug)]
pub struct GridSpec {
    center: Location,
    count: u32,
    spacing: StrictlyPositiveFinite,
}

#[derive(Debug, Error)]
#[error("grid point {location} is not a valid coordinate")]
pub struct OutOfRange {
    pub location: String,
    pub source: ParseKeyError,
}

impl GridSpec {
    /// Fails when any point of the lattice falls outside [-90, 90] latitude
    /// or [-180, 180] longitude.
    pub fn new(
        center: Location,
        count: u32,
        spacing: StrictlyPositiveFinite,
    ) -> std::result::Result<Self, OutOfRange> {
        let spec = Self {
            center,
            count,
            spacing,
        };
        for location in spec.locations() {
            let key = location.key();
            if let Err(source) = key.as_str().parse::<GridKey>() {
                return Err(OutOfRange {
                    location: key.to_string(),
                    source,
                });
            }
        }
        Ok(spec)
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn spacing(&self) -> f64 {
        self.spacing.get()
    }

    /// Row-major: latitude offsets outer, longitude offsets inner.
    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        let offset = (f64::from(self.count) - 1.0) / 2.0;
        let spacing = self.spacing.get();
        (0..self.count).flat_map(move |i| {
            (0..self.count).map(move |j| {
                Location::new(
                    self.center.lat + (f64::from(i) - offset) * spacing,
                    self.center.lng + (f64::from(j) - offset) * spacing,
                )
            })
        })
    }

    /// Distance from a grid point to the far corner of its cell, in metres.
    pub fn half_diagonal_metres(&self) -> f64 {
        let half = self.spacing.get() / 2.0;
        let corner = Location::new(self.center.lat + half, self.center.lng + half);
        self.center.point().haversine_distance(&corner.point())
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct GenerateOutcome {
    pub inserted: usize,
    pub total: u64,
}

pub struct GridPlanner<'a> {
    conn: &'a Connection,
}

impl<'a> GridPlanner<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Inserts every lattice point not already present. Existing points keep
    /// their status, so running this again after a partial crawl is safe.
    pub fn generate(&self, spec: &GridSpec) -> Result<GenerateOutcome> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO search_grid (location) VALUES (?1)")?;
            for location in spec.locations() {
                inserted += stmt.execute([location.key().as_str()])?;
            }
        }
        let total = tx.query_row("SELECT COUNT(*) FROM search_grid", [], |row| row.get(0))?;
        tx.commit()?;

        debug!(inserted, total, "grid generated");
        Ok(GenerateOutcome { inserted, total })
    }

    pub fn pending(&self) -> Result<Vec<GridKey>> {
        let mut stmt = self
            .conn
            .prepare("SELECT location FROM search_grid WHERE status = 'pending' ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut output = Vec::new();
        for row in rows {
            let location = row?;
            match location.parse() {
                Ok(key) => output.push(key),
                Err(source) => return Err(db::StoreError::InvalidLocation { location, source }),
            }
        }
        Ok(output)
    }

    pub fn status(&self, key: &GridKey) -> Result<Option<SearchStatus>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM search_grid WHERE location = ?1",
                [key.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        value.map(|x| db::parse_status(key.as_str(), x)).transpose()
    }

    /// Returns false when the key was never generated; no row is created.
    pub fn mark_completed(&self, key: &GridKey) -> Result<bool> {
        let Some(status) = self.status(key)? else {
            return Ok(false);
        };
        if status.is_pending() {
            self.conn.execute(
                "UPDATE search_grid SET status = ?1 WHERE location = ?2",
                params![status.complete().as_str(), key.as_str()],
            )?;
        }
        Ok(true)
    }
}
