//! Records synthesized by extraction. Each call builds them fresh; none of
//! them has an identity that survives the call.

use serde::{Deserialize, Serialize};

use crate::element::Role;

/// One row of the host's track list.
///
/// `index` is the position in this result only. `track_number` is the host's
/// own ordinal as printed in the label, or `-1` when it could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub index: usize,
    pub track_number: i32,
    pub name: String,
    pub muted: bool,
    pub solo: bool,
    pub record_enabled: bool,
    pub volume: i64,
    pub plugins: Vec<String>,
}

/// A control found in the currently open plugin window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginParameter {
    pub name: String,
    pub value: String,
    pub role: Role,
}
