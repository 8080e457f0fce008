//! Track extraction backends.
//!
//! Two implementations answer the same three questions. [`WalkerBackend`]
//! spawns the privileged `axwalker` binary; [`ScriptBackend`] submits an
//! embedded script to the scripting engine under this process's own
//! permissions. The [`crate::coordinator`] decides which one answers.

use std::fmt;

use async_trait::async_trait;
use axtree::{PluginParameter, TrackInfo};
use serde::Serialize;
use thiserror::Error;

use crate::process::ProcessError;

mod script;
mod walker;

pub use script::ScriptBackend;
pub use walker::WalkerBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Privileged,
    Fallback,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Privileged => f.write_str("privileged walker"),
            BackendKind::Fallback => f.write_str("scripting fallback"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{backend}: accessibility permission missing ({message})")]
    PermissionDenied { backend: BackendKind, message: String },

    #[error("{backend} unavailable: {message}")]
    Unavailable { backend: BackendKind, message: String },

    #[error("{backend} timed out after {after_ms}ms")]
    Timeout { backend: BackendKind, after_ms: u64 },

    #[error("{0}")]
    NotFound(String),

    /// The control exists but refused the value. Never retried.
    #[error("{0}")]
    Control(String),

    #[error("{backend} failed: {message}")]
    Failed { backend: BackendKind, message: String },

    #[error("{backend} produced unreadable output: {message}")]
    InvalidOutput { backend: BackendKind, message: String },

    #[error(
        "Neither backend could read the host. {privileged_reason}; {fallback}. \
         Grant Accessibility access to the axwalker binary (System Settings > Privacy & Security > Accessibility) \
         and check that backend.walker_path points at an installed axwalker and that the scripting engine is available"
    )]
    Exhausted {
        privileged_reason: String,
        fallback: Box<BackendError>,
    },
}

impl BackendError {
    pub(crate) fn from_process(backend: BackendKind, err: ProcessError) -> Self {
        match err {
            ProcessError::Spawn { .. } => BackendError::Unavailable {
                backend,
                message: err.to_string(),
            },
            ProcessError::Timeout { after, .. } => BackendError::Timeout {
                backend,
                after_ms: after.as_millis() as u64,
            },
            ProcessError::Io { .. } => BackendError::Failed {
                backend,
                message: err.to_string(),
            },
        }
    }

    /// Whether the coordinator may try the other backend after this error.
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, BackendError::Control(_))
    }
}

/// One extraction pipeline, reachable from async code.
///
/// Every call starts from a fresh tree; nothing is cached between calls.
#[async_trait]
pub trait TrackBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn list_tracks(&self) -> Result<Vec<TrackInfo>, BackendError>;

    /// Controls of whatever plugin window is open. `track` and `slot` are
    /// forwarded for logging; neither backend can scope the search by them.
    async fn read_parameters(&self, track: usize, slot: usize) -> Result<Vec<PluginParameter>, BackendError>;

    /// Assign `value` to the control labelled `name`; returns the
    /// confirmation line.
    async fn write_parameter(
        &self,
        track: usize,
        slot: usize,
        name: &str,
        value: &str,
    ) -> Result<String, BackendError>;
}
