pub mod config;
pub mod crawl;
pub mod db;
pub mod grid;
pub mod nearby;
pub mod places;
mod utils;

pub use _model::{GridKey, Location, PlaceRecord, SearchStatus};
