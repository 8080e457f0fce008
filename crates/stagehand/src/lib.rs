//! stagehand - MCP server for a desktop DAW
//!
//! This library provides:
//! - `backend`: the privileged walker and the scripting fallback
//! - `coordinator`: privileged-first extraction with fallback
//! - `actuator`: key commands and menu clicks
//! - `midi`: the virtual MIDI output port
//! - `catalog`: installed plugin listing
//! - `server`: the MCP tool surface
//! - `stdio`: serving the tools over stdin/stdout

pub mod actuator;
pub mod backend;
pub mod catalog;
pub mod coordinator;
pub mod midi;
pub mod process;
pub mod server;
pub mod stdio;
pub mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;

use stageconf::StageConfig;

pub use backend::{BackendError, BackendKind, ScriptBackend, TrackBackend, WalkerBackend};
pub use coordinator::{Answer, Coordinator, Provenance};
pub use server::StagehandServer;

/// Wire the walker and the scripting fallback into a coordinator.
///
/// `config_path` is forwarded to the walker so both read the same file.
pub fn coordinator(config: &StageConfig, config_path: Option<PathBuf>) -> Coordinator {
    Coordinator::new(
        Arc::new(WalkerBackend::from_config(config, config_path)),
        Arc::new(ScriptBackend::from_config(config)),
    )
}
