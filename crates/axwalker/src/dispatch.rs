//! Command dispatch shared by the live and replay hosts.
//!
//! Every command resolves to a [`Reply`]: the text for stdout, a one-line
//! error for stderr, and the exit code from [`axtree::protocol::exit`].

use axtree::protocol::{self, exit};
use axtree::{AxError, Element, ElementSnapshot, Extractor};
use serde::Serialize;
use tracing::debug;

use crate::host::Host;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CheckAccess,
    ListTracks,
    /// Track and slot are accepted for the caller's bookkeeping; the search
    /// covers whatever plugin window is open.
    GetParams { track: usize, slot: usize },
    SetParam {
        track: usize,
        slot: usize,
        name: String,
        value: String,
    },
    Query { depth: Option<usize> },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CheckAccess => protocol::command::CHECK_ACCESS,
            Command::ListTracks => protocol::command::LIST_TRACKS,
            Command::GetParams { .. } => protocol::command::GET_PARAMS,
            Command::SetParam { .. } => protocol::command::SET_PARAM,
            Command::Query { .. } => protocol::command::QUERY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub code: i32,
}

impl Reply {
    fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: Some(stdout.into()),
            stderr: None,
            code: exit::OK,
        }
    }

    fn failed(error: &AxError) -> Self {
        Self {
            stdout: None,
            stderr: Some(error.to_string()),
            code: error.exit_code(),
        }
    }
}

/// Run one command against `host`.
pub fn run<H: Host>(host: &H, command: &Command, extractor: &Extractor, query_depth: usize) -> Reply {
    debug!(command = command.name(), "dispatching");

    if *command == Command::CheckAccess {
        return match host.check_access() {
            Ok(true) => Reply::ok(protocol::ACCESS_GRANTED),
            Ok(false) => Reply {
                stdout: Some(protocol::ACCESS_DENIED.to_string()),
                stderr: None,
                code: exit::PERMISSION_DENIED,
            },
            Err(e) => Reply::failed(&e),
        };
    }

    match execute(host, command, extractor, query_depth) {
        Ok(stdout) => Reply::ok(stdout),
        Err(e) => {
            debug!(command = command.name(), code = e.exit_code(), "command failed");
            Reply::failed(&e)
        }
    }
}

fn execute<H: Host>(
    host: &H,
    command: &Command,
    extractor: &Extractor,
    query_depth: usize,
) -> Result<String, AxError> {
    if !host.check_access()? {
        return Err(AxError::PermissionDenied);
    }
    let app = host.application()?;

    match command {
        Command::CheckAccess => Ok(protocol::ACCESS_GRANTED.to_string()),
        Command::ListTracks => to_json(&extractor.extract_tracks(&app)),
        Command::GetParams { track, slot } => {
            debug!(track, slot, "reading parameters of the open plugin window");
            to_json(&extractor.read_parameters(&app.windows()))
        }
        Command::SetParam {
            track,
            slot,
            name,
            value,
        } => {
            debug!(track, slot, "writing parameter");
            let control = extractor.write_parameter(&app.windows(), name, value)?;
            Ok(protocol::confirmation(&control))
        }
        Command::Query { depth } => {
            to_json(&ElementSnapshot::capture(&app, depth.unwrap_or(query_depth)))
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, AxError> {
    serde_json::to_string(value).map_err(|e| AxError::Api {
        code: 0,
        message: e.to_string(),
    })
}
