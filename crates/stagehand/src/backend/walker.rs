use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use axtree::protocol::{self, command, exit};
use axtree::{PluginParameter, TrackInfo};
use serde::de::DeserializeOwned;
use stageconf::StageConfig;
use tracing::{debug, instrument};

use super::{BackendError, BackendKind, TrackBackend};
use crate::process::{self, ProcessOutput};

const KIND: BackendKind = BackendKind::Privileged;

/// Spawns `axwalker` once per call and reads its reply.
#[derive(Debug, Clone)]
pub struct WalkerBackend {
    program: String,
    config_path: Option<PathBuf>,
    timeout: Duration,
}

impl WalkerBackend {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            config_path: None,
            timeout,
        }
    }

    pub fn from_config(config: &StageConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            program: config.backend.walker_path.display().to_string(),
            config_path,
            timeout: Duration::from_millis(config.backend.timeout_ms),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn call(&self, args: Vec<String>) -> Result<String, BackendError> {
        let mut full = Vec::with_capacity(args.len() + 2);
        if let Some(path) = &self.config_path {
            full.push("--config".to_string());
            full.push(path.display().to_string());
        }
        full.extend(args);

        let output = process::run(&self.program, &full, self.timeout)
            .await
            .map_err(|e| BackendError::from_process(KIND, e))?;
        classify(output)
    }

    async fn call_json<T: DeserializeOwned>(&self, args: Vec<String>) -> Result<T, BackendError> {
        let stdout = self.call(args).await?;
        serde_json::from_str(stdout.trim()).map_err(|e| BackendError::InvalidOutput {
            backend: KIND,
            message: e.to_string(),
        })
    }

    /// Whether the walker binary holds the accessibility grant.
    #[instrument(skip(self))]
    pub async fn check_access(&self) -> Result<bool, BackendError> {
        match self.call(vec![command::CHECK_ACCESS.to_string()]).await {
            Ok(line) => Ok(line.trim() == protocol::ACCESS_GRANTED),
            Err(BackendError::PermissionDenied { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// A raw snapshot of the host's tree, `depth` levels deep.
    #[instrument(skip(self))]
    pub async fn query(&self, depth: Option<usize>) -> Result<serde_json::Value, BackendError> {
        let mut args = vec![command::QUERY.to_string()];
        if let Some(depth) = depth {
            args.push(depth.to_string());
        }
        self.call_json(args).await
    }
}

/// Map the walker's exit code back onto the error taxonomy.
fn classify(output: ProcessOutput) -> Result<String, BackendError> {
    match output.code {
        Some(exit::OK) => Ok(output.stdout),
        Some(exit::PERMISSION_DENIED) => Err(BackendError::PermissionDenied {
            backend: KIND,
            message: output.error_line(),
        }),
        Some(exit::NOT_FOUND) => Err(BackendError::NotFound(output.error_line())),
        Some(exit::REJECTED) => Err(BackendError::Control(output.error_line())),
        Some(exit::HOST_NOT_RUNNING) => Err(BackendError::Unavailable {
            backend: KIND,
            message: output.error_line(),
        }),
        code => {
            debug!(?code, "walker failed");
            Err(BackendError::Failed {
                backend: KIND,
                message: output.error_line(),
            })
        }
    }
}

#[async_trait]
impl TrackBackend for WalkerBackend {
    fn kind(&self) -> BackendKind {
        KIND
    }

    #[instrument(skip(self))]
    async fn list_tracks(&self) -> Result<Vec<TrackInfo>, BackendError> {
        self.call_json(vec![command::LIST_TRACKS.to_string()]).await
    }

    #[instrument(skip(self))]
    async fn read_parameters(&self, track: usize, slot: usize) -> Result<Vec<PluginParameter>, BackendError> {
        self.call_json(vec![
            command::GET_PARAMS.to_string(),
            track.to_string(),
            slot.to_string(),
        ])
        .await
    }

    #[instrument(skip(self))]
    async fn write_parameter(
        &self,
        track: usize,
        slot: usize,
        name: &str,
        value: &str,
    ) -> Result<String, BackendError> {
        let line = self
            .call(vec![
                command::SET_PARAM.to_string(),
                track.to_string(),
                slot.to_string(),
                name.to_string(),
                value.to_string(),
            ])
            .await?;
        Ok(line.trim().to_string())
    }
}
