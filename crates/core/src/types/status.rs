//! Cart store lifecycle status.

use serde::{Deserialize, Serialize};

/// Where a cart store is in its lifecycle.
///
/// `Loading -> Ready -> Closed`. Cart operations are only accepted while
/// `Ready`; consumers can use `Loading` to tell a cart that has not been
/// hydrated yet from one that is genuinely empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    /// Created, persisted items not yet loaded.
    #[default]
    Loading,
    /// Hydrated and accepting operations.
    Ready,
    /// Shut down; no further operations are accepted.
    Closed,
}

impl CartStatus {
    /// Whether cart operations are accepted in this status.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for CartStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loading" => Ok(Self::Loading),
            "ready" => Ok(Self::Ready),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("invalid cart status: {s}")),
        }
    }
}
