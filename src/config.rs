use std::{fs::read_to_string, path::Path, path::PathBuf, time::Duration};

use _model::Location;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use typed_floats::tf64::StrictlyPositiveFinite;

use crate::{grid::GridSpec, nearby::Pagination};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database: PathBuf,
    pub center: Center,
    pub grid_count: u32,
    /// degrees between neighbouring grid points
    pub spacing: f64,
    /// metres
    pub radius: u32,
    pub max_extra_pages: u32,
    pub page_delay_secs: u64,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Center {
    pub lat: f64,
    pub lng: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("places_data.db"),
            center: Center {
                lat: 17.5154,
                lng: 78.3034,
            },
            grid_count: 5,
            spacing: 0.0009,
            radius: 1500,
            max_extra_pages: 3,
            page_delay_secs: 2,
            api_key: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn grid(&self) -> Result<GridSpec> {
        let Center { lat, lng } = self.center;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            bail!("center {lat},{lng} is not a valid coordinate");
        }
        let spacing = StrictlyPositiveFinite::new(self.spacing)
            .ok()
            .with_context(|| format!("spacing must be a positive number, got {}", self.spacing))?;

        Ok(GridSpec::new(Location::new(lat, lng), self.grid_count, spacing)?)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            max_extra_pages: self.max_extra_pages,
            page_delay: Duration::from_secs(self.page_delay_secs),
        }
    }
}
