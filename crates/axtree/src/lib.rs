//! axtree - accessibility-tree traversal and extraction
//!
//! This library provides:
//! - `element`: the Element Model trait, roles, and values
//! - `patterns`: label heuristics for track rows and controls
//! - `search`: depth-bounded find, collect, and find-and-mutate walks
//! - `extract`: track listing, parameter reading, and parameter writing
//! - `snapshot` / `memory`: serializable tree copies and an in-memory element
//! - `protocol`: the privileged walker's command-line contract
//!
//! The scripting fallback in `stagehand` reimplements these rules in
//! JavaScript; `tests/conformance.rs` pins the shared behavior and
//! `stagehand/tests/script_parity.rs` runs the script against the same trees.

pub mod element;
pub mod error;
pub mod extract;
pub mod memory;
pub mod model;
pub mod patterns;
pub mod protocol;
pub mod search;
pub mod snapshot;

pub use element::{Element, ElementValue, Role, WriteValue};
pub use error::AxError;
pub use extract::{Extractor, SearchLimits};
pub use memory::MemoryElement;
pub use model::{PluginParameter, TrackInfo};
pub use patterns::{
    is_parameter_control, is_toggle_control, matches_control_name, parse_track_name,
    parse_track_number, Toggle, TrackPatterns,
};
pub use search::{collect_matching, find_and_mutate, find_by_label, find_by_name, MutatedControl};
pub use snapshot::ElementSnapshot;
