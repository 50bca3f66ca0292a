use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Search state of a grid point. The only transition is `Pending` to
/// `Completed`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchStatus {
    #[default]
    Pending,
    Completed,
}

impl SearchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    pub fn complete(self) -> Self {
        Self::Completed
    }

    pub fn is_pending(&self) -> bool {
        *self == Self::Pending
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown search status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for SearchStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pending" => Self::Pending,
            "completed" => Self::Completed,
            _ => return Err(UnknownStatus(s.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_is_one_way() {
        let status = SearchStatus::default();
        assert!(status.is_pending());
        assert_eq!(status.complete(), SearchStatus::Completed);
        assert_eq!(status.complete().complete(), SearchStatus::Completed);
    }

    #[test]
    fn text_form() {
        for status in [SearchStatus::Pending, SearchStatus::Completed] {
            assert_eq!(status.as_str().parse::<SearchStatus>().unwrap(), status);
        }
        assert!("failed".parse::<SearchStatus>().is_err());
    }
}
