mod location;
mod place;
mod status;

pub use location::{GridKey, Location, ParseKeyError};
pub use place::{PlaceRecord, Rejection, ValidPlace, Validated};
pub use status::{SearchStatus, UnknownStatus};
