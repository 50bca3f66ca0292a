use std::{fmt, str::FromStr};

use geo::Point;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Rounds both axes to six decimal places. Any two locations that round
    /// to the same digits share a key.
    pub fn key(&self) -> GridKey {
        GridKey(format!("{},{}", fixed(self.lat), fixed(self.lng)))
    }

    pub fn point(&self) -> Point {
        Point::new(self.lng, self.lat)
    }
}

fn fixed(x: f64) -> String {
    let s = format!("{x:.6}");
    match s.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => s,
    }
}

/// Natural key of a grid point, `"lat,lng"` with six decimals on each side.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct GridKey(String);

impl GridKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GridKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseKeyError {
    #[error("expected \"lat,lng\", got {0:?}")]
    Shape(String),
    #[error("invalid coordinate {0:?}")]
    Number(String),
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

impl FromStr for GridKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| ParseKeyError::Shape(s.to_string()))?;
        let coord = |x: &str| -> Result<f64, ParseKeyError> {
            let x = x.trim();
            match x.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                _ => Err(ParseKeyError::Number(x.to_string())),
            }
        };
        let (lat, lng) = (coord(lat)?, coord(lng)?);

        if !(-90.0..=90.0).contains(&lat) {
            return Err(ParseKeyError::Latitude(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ParseKeyError::Longitude(lng));
        }

        Ok(Location::new(lat, lng).key())
    }
}
