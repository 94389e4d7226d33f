use chrono::{DateTime, Utc};
use poon_types::ObjectHash;
use serde::{Deserialize, Serialize};

/// Metadata for one allocated version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Version number, starting at 1.
    pub version: i64,
    /// The commit this version names.
    pub commit_hash: ObjectHash,
    /// When the version was allocated.
    pub timestamp: DateTime<Utc>,
    /// Commit message, copied for cheap listing.
    pub message: String,
}
