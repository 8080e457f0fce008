//! Keystroke and menu automation through System Events.
//!
//! Actions are rendered to AppleScript, the host is brought to the front,
//! and the script runs through the scripting engine with the same timeout
//! as every other subprocess. Fire and forget: success means the events
//! were posted, not that the host acted on them.

use std::fmt::Write as _;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use stageconf::StageConfig;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::process::{self, ProcessError};

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("Menu path must name a menu and an item separated by '>': {0}")]
    InvalidMenuPath(String),

    #[error("Key must be a single character, got {0:?}")]
    InvalidKey(String),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Automation failed: {0}")]
    Script(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Command,
    Shift,
    Option,
    Control,
}

impl Modifier {
    fn as_applescript(self) -> &'static str {
        match self {
            Modifier::Command => "command down",
            Modifier::Shift => "shift down",
            Modifier::Option => "option down",
            Modifier::Control => "control down",
        }
    }
}

/// A symbolic action against the foreground application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A literal character.
    Keystroke { key: String, modifiers: Vec<Modifier> },
    /// A virtual key code, for keys without a character (space, return, arrows).
    KeyCode { code: u16, modifiers: Vec<Modifier> },
    /// A menu item given as `Menu > Submenu > Item`.
    Menu { path: String },
}

impl Action {
    pub fn key(key: &str, modifiers: &[Modifier]) -> Self {
        Action::Keystroke {
            key: key.to_string(),
            modifiers: modifiers.to_vec(),
        }
    }

    pub fn code(code: u16, modifiers: &[Modifier]) -> Self {
        Action::KeyCode {
            code,
            modifiers: modifiers.to_vec(),
        }
    }
}

mod key_code {
    pub const RETURN: u16 = 36;
    pub const SPACE: u16 = 49;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransportCommand {
    Play,
    Stop,
    Record,
    Rewind,
    Forward,
    GoToStart,
    Cycle,
    Metronome,
}

impl TransportCommand {
    /// Default key command for this transport function.
    pub fn action(self) -> Action {
        match self {
            // Space toggles playback either way.
            TransportCommand::Play | TransportCommand::Stop => Action::code(key_code::SPACE, &[]),
            TransportCommand::Record => Action::key("r", &[]),
            TransportCommand::Rewind => Action::key(",", &[]),
            TransportCommand::Forward => Action::key(".", &[]),
            TransportCommand::GoToStart => Action::code(key_code::RETURN, &[]),
            TransportCommand::Cycle => Action::key("c", &[]),
            TransportCommand::Metronome => Action::key("k", &[]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProjectCommand {
    New,
    Open,
    Save,
    SaveAs,
    Undo,
    Redo,
    Close,
}

impl ProjectCommand {
    pub fn action(self) -> Action {
        match self {
            ProjectCommand::New => Action::key("n", &[Modifier::Command, Modifier::Shift]),
            ProjectCommand::Open => Action::key("o", &[Modifier::Command]),
            ProjectCommand::Save => Action::key("s", &[Modifier::Command]),
            ProjectCommand::SaveAs => Action::key("s", &[Modifier::Command, Modifier::Shift]),
            ProjectCommand::Undo => Action::key("z", &[Modifier::Command]),
            ProjectCommand::Redo => Action::key("z", &[Modifier::Command, Modifier::Shift]),
            ProjectCommand::Close => Action::key("w", &[Modifier::Command, Modifier::Option]),
        }
    }
}

/// Quote `text` as an AppleScript string literal.
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn using_clause(modifiers: &[Modifier]) -> String {
    if modifiers.is_empty() {
        return String::new();
    }
    let list: Vec<&str> = modifiers.iter().map(|m| m.as_applescript()).collect();
    format!(" using {{{}}}", list.join(", "))
}

/// Split `File > Export > Selection` into its non-empty parts.
fn menu_parts(path: &str) -> Result<Vec<&str>, ActuatorError> {
    let parts: Vec<&str> = path.split('>').map(str::trim).collect();
    if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
        return Err(ActuatorError::InvalidMenuPath(path.to_string()));
    }
    Ok(parts)
}

/// The System Events command for one action.
fn render_action(action: &Action, process_name: &str) -> Result<String, ActuatorError> {
    match action {
        Action::Keystroke { key, modifiers } => {
            if key.chars().count() != 1 {
                return Err(ActuatorError::InvalidKey(key.clone()));
            }
            Ok(format!("keystroke {}{}", quote(key), using_clause(modifiers)))
        }
        Action::KeyCode { code, modifiers } => {
            Ok(format!("key code {}{}", code, using_clause(modifiers)))
        }
        Action::Menu { path } => {
            let parts = menu_parts(path)?;
            let (item, menus) = parts.split_last().ok_or_else(|| ActuatorError::InvalidMenuPath(path.clone()))?;
            let mut target = format!("menu item {}", quote(item));
            for submenu in menus[1..].iter().rev() {
                let _ = write!(target, " of menu 1 of menu item {}", quote(submenu));
            }
            let _ = write!(target, " of menu 1 of menu bar item {} of menu bar 1", quote(menus[0]));
            Ok(format!(
                "tell process {} to click {}",
                quote(process_name),
                target
            ))
        }
    }
}

/// Full script: activate the host, then post the action.
pub fn render(action: &Action, app_name: &str, process_name: &str) -> Result<String, ActuatorError> {
    let command = render_action(action, process_name)?;
    Ok(format!(
        "tell application {} to activate\ndelay 0.1\ntell application \"System Events\"\n    {}\nend tell\n",
        quote(app_name),
        command
    ))
}

#[derive(Debug, Clone)]
pub struct Actuator {
    engine: String,
    app_name: String,
    process_name: String,
    timeout: Duration,
}

impl Actuator {
    pub fn new(
        engine: impl Into<String>,
        app_name: impl Into<String>,
        process_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            engine: engine.into(),
            app_name: app_name.into(),
            process_name: process_name.into(),
            timeout,
        }
    }

    pub fn from_config(config: &StageConfig) -> Self {
        Self::new(
            config.backend.scripting_engine.clone(),
            config.host.app_name.clone(),
            config.host.process_name.clone(),
            Duration::from_millis(config.backend.timeout_ms),
        )
    }

    #[instrument(skip(self))]
    pub async fn perform(&self, action: &Action) -> Result<(), ActuatorError> {
        let script = render(action, &self.app_name, &self.process_name)?;
        debug!(%script, "posting action");
        let output = process::run(&self.engine, &["-e".to_string(), script], self.timeout).await?;
        if output.success() {
            Ok(())
        } else {
            Err(ActuatorError::Script(output.error_line()))
        }
    }
}
