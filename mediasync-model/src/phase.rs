use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ModelError;

/// Content phase a sync run batches and persists independently.
///
/// Declaration order is the preferred scan order: live tiles render
/// fastest, episodes are lazy and usually opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SyncPhase {
    Live,
    Movies,
    Series,
    Episodes,
}

impl SyncPhase {
    pub const ALL: [SyncPhase; 4] = [
        SyncPhase::Live,
        SyncPhase::Movies,
        SyncPhase::Series,
        SyncPhase::Episodes,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            SyncPhase::Live => "live",
            SyncPhase::Movies => "movies",
            SyncPhase::Series => "series",
            SyncPhase::Episodes => "episodes",
        }
    }
}

impl Display for SyncPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncPhase {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        SyncPhase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == normalized)
            .ok_or_else(|| ModelError::UnknownSyncPhase(raw.to_string()))
    }
}
