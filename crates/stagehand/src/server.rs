//! MCP tool surface.
//!
//! Host-state failures (permission missing, host not running, control not
//! found) come back as error results the model can read. Malformed
//! arguments come back as `invalid_params`.
//!
//! Tool calls are not serialized. Two calls that both drive the host UI can
//! interleave their keystrokes or walks.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::{Deserialize, Serialize};
use stageconf::{MidiConfig, StageConfig};

use crate::actuator::{Action, Actuator, ActuatorError, Modifier, ProjectCommand, TransportCommand};
use crate::backend::{BackendError, WalkerBackend};
use crate::catalog::Catalog;
use crate::coordinator::Coordinator;
use crate::midi::{ChannelMessage, MidiError, MidiSink};

const MIN_TEMPO: f64 = 5.0;
const MAX_TEMPO: f64 = 990.0;
const DEFAULT_NOTE_MS: u64 = 500;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TransportRequest {
    #[schemars(description = "play, stop, record, rewind, forward, go_to_start, cycle, or metronome")]
    pub command: TransportCommand,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProjectRequest {
    #[schemars(description = "new, open, save, save_as, undo, redo, or close")]
    pub command: ProjectCommand,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct KeyCommandRequest {
    #[schemars(description = "A single character to type. Give this or key_code.")]
    pub key: Option<String>,
    #[schemars(description = "Virtual key code for keys without a character (49 = space, 36 = return)")]
    pub key_code: Option<u16>,
    #[serde(default)]
    #[schemars(description = "Modifiers held during the key: command, shift, option, control")]
    pub modifiers: Vec<Modifier>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MenuClickRequest {
    #[schemars(description = "Menu path separated by '>', e.g. \"File > Export > Selection as MIDI File…\"")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TempoRequest {
    #[schemars(description = "Tempo in beats per minute (5-990)")]
    pub bpm: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PluginSlotRequest {
    #[schemars(description = "Track index (0-based, as in list_tracks)")]
    pub track: usize,
    #[schemars(description = "Plugin slot index on that track")]
    pub slot: usize,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetPluginParamRequest {
    pub track: usize,
    pub slot: usize,
    #[schemars(description = "Exact control label, case-insensitive")]
    pub name: String,
    #[schemars(description = "New value; numeric for sliders, any text for text fields")]
    pub value: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct QueryRequest {
    #[schemars(description = "Levels below the application root (default from [search] query_depth)")]
    pub depth: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NoteRequest {
    #[schemars(description = "MIDI note number 0-127 (60 = middle C)")]
    pub pitch: u8,
    #[schemars(description = "Velocity 1-127")]
    pub velocity: Option<u8>,
    #[schemars(description = "Channel 0-15")]
    pub channel: Option<u8>,
    #[schemars(description = "How long the note sounds, in milliseconds (default 500)")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ChordRequest {
    #[schemars(description = "MIDI note numbers sounded together")]
    pub pitches: Vec<u8>,
    pub velocity: Option<u8>,
    pub channel: Option<u8>,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ControlChangeRequest {
    #[schemars(description = "Controller number 0-127 (7 = volume, 10 = pan, 64 = sustain)")]
    pub controller: u8,
    #[schemars(description = "Controller value 0-127")]
    pub value: u8,
    pub channel: Option<u8>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProgramChangeRequest {
    #[schemars(description = "Program number 0-127")]
    pub program: u8,
    pub channel: Option<u8>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PitchBendRequest {
    #[schemars(description = "Bend amount, -8192 (down) to 8191 (up); 0 is centered")]
    pub value: i16,
    pub channel: Option<u8>,
}

fn text(message: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(message.into())])
}

fn tool_error(err: impl Display) -> CallToolResult {
    CallToolResult::error(vec![Content::text(err.to_string())])
}

fn json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let body = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(text(body))
}

fn actuator_result(result: Result<(), ActuatorError>, done: String) -> Result<CallToolResult, McpError> {
    match result {
        Ok(()) => Ok(text(done)),
        Err(e @ (ActuatorError::InvalidMenuPath(_) | ActuatorError::InvalidKey(_))) => {
            Err(McpError::invalid_params(e.to_string(), None))
        }
        Err(e) => Ok(tool_error(e)),
    }
}

fn midi_result(result: Result<(), MidiError>, done: String) -> Result<CallToolResult, McpError> {
    match result {
        Ok(()) => Ok(text(done)),
        Err(e @ MidiError::InvalidMessage(_)) => Err(McpError::invalid_params(e.to_string(), None)),
        Err(e) => Ok(tool_error(e)),
    }
}

/// Render a tempo the way the tempo field displays it.
fn format_tempo(bpm: f64) -> String {
    format!("{:.2}", bpm)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

#[derive(Clone)]
pub struct StagehandServer {
    coordinator: Coordinator,
    walker: Arc<WalkerBackend>,
    actuator: Actuator,
    midi: Arc<MidiSink>,
    catalog: Catalog,
    tempo_labels: Vec<String>,
    midi_defaults: MidiConfig,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl StagehandServer {
    pub fn new(
        config: &StageConfig,
        coordinator: Coordinator,
        walker: Arc<WalkerBackend>,
        actuator: Actuator,
        midi: Arc<MidiSink>,
    ) -> Self {
        Self {
            coordinator,
            walker,
            actuator,
            midi,
            catalog: Catalog::new(&config.catalog, Duration::from_millis(config.backend.timeout_ms)),
            tempo_labels: config.locale.tempo_labels.clone(),
            midi_defaults: config.midi.clone(),
            tool_router: Self::tool_router(),
        }
    }

    fn channel(&self, channel: Option<u8>) -> u8 {
        channel.unwrap_or(self.midi_defaults.default_channel)
    }

    fn velocity(&self, velocity: Option<u8>) -> u8 {
        velocity.unwrap_or(self.midi_defaults.default_velocity)
    }

    fn require_midi(&self) -> Option<CallToolResult> {
        if self.midi.is_open() {
            None
        } else {
            Some(tool_error(format!(
                "Virtual MIDI port {} is not open; restart the server on a system with CoreMIDI or ALSA",
                self.midi.port_name()
            )))
        }
    }

    #[tool(description = "Control the transport: play, stop, record, rewind, forward, go_to_start, cycle, metronome")]
    async fn transport(
        &self,
        Parameters(request): Parameters<TransportRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.actuator.perform(&request.command.action()).await;
        actuator_result(result, format!("Sent {:?}", request.command))
    }

    #[tool(description = "Project commands: new, open, save, save_as, undo, redo, close")]
    async fn project(
        &self,
        Parameters(request): Parameters<ProjectRequest>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.actuator.perform(&request.command.action()).await;
        actuator_result(result, format!("Sent {:?}", request.command))
    }

    #[tool(description = "Press a key command in the host, by character or virtual key code, with optional modifiers")]
    async fn key_command(
        &self,
        Parameters(request): Parameters<KeyCommandRequest>,
    ) -> Result<CallToolResult, McpError> {
        let action = match (request.key, request.key_code) {
            (Some(key), None) => Action::Keystroke {
                key,
                modifiers: request.modifiers,
            },
            (None, Some(code)) => Action::KeyCode {
                code,
                modifiers: request.modifiers,
            },
            _ => {
                return Err(McpError::invalid_params(
                    "give exactly one of key or key_code",
                    None,
                ))
            }
        };
        let result = self.actuator.perform(&action).await;
        actuator_result(result, "Key command sent".to_string())
    }

    #[tool(description = "Click a menu item by path, e.g. \"Track > New Software Instrument Track\"")]
    async fn menu_click(
        &self,
        Parameters(request): Parameters<MenuClickRequest>,
    ) -> Result<CallToolResult, McpError> {
        let done = format!("Clicked {}", request.path);
        let result = self.actuator.perform(&Action::Menu { path: request.path }).await;
        actuator_result(result, done)
    }

    #[tool(description = "Set the project tempo by writing the tempo field in the control bar")]
    async fn set_tempo(
        &self,
        Parameters(request): Parameters<TempoRequest>,
    ) -> Result<CallToolResult, McpError> {
        if !(MIN_TEMPO..=MAX_TEMPO).contains(&request.bpm) {
            return Err(McpError::invalid_params(
                format!("tempo {} outside {}-{} bpm", request.bpm, MIN_TEMPO, MAX_TEMPO),
                None,
            ));
        }
        let value = format_tempo(request.bpm);
        let mut last = None;
        for label in &self.tempo_labels {
            match self.coordinator.write_parameter(0, 0, label, &value).await {
                Ok(answer) => return json(&answer),
                Err(e @ BackendError::NotFound(_)) => last = Some(e),
                Err(e) => return Ok(tool_error(e)),
            }
        }
        Ok(match last {
            Some(e) => tool_error(e),
            None => tool_error("No tempo labels configured under [locale] tempo_labels"),
        })
    }

    #[tool(description = "List the project's tracks with mute, solo, record state, volume, and plugin names")]
    async fn list_tracks(&self) -> Result<CallToolResult, McpError> {
        match self.coordinator.list_tracks().await {
            Ok(answer) => json(&answer),
            Err(e) => Ok(tool_error(e)),
        }
    }

    #[tool(description = "Read the controls of the open plugin window. Open the plugin first.")]
    async fn get_plugin_params(
        &self,
        Parameters(request): Parameters<PluginSlotRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.coordinator.read_parameters(request.track, request.slot).await {
            Ok(answer) => json(&answer),
            Err(e) => Ok(tool_error(e)),
        }
    }

    #[tool(description = "Set a plugin control by its exact label. Sliders take numbers; text fields take any text.")]
    async fn set_plugin_param(
        &self,
        Parameters(request): Parameters<SetPluginParamRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .coordinator
            .write_parameter(request.track, request.slot, &request.name, &request.value)
            .await
        {
            Ok(answer) => json(&answer),
            Err(e) => Ok(tool_error(e)),
        }
    }

    #[tool(description = "List installed Audio Unit plugins as {type, subtype, manufacturer, name}")]
    async fn list_plugins(&self) -> Result<CallToolResult, McpError> {
        match self.catalog.list().await {
            Ok(records) => json(&records),
            Err(e) => Ok(tool_error(e)),
        }
    }

    #[tool(description = "Check whether the accessibility walker holds the Accessibility permission")]
    async fn check_access(&self) -> Result<CallToolResult, McpError> {
        match self.walker.check_access().await {
            Ok(true) => Ok(text("granted")),
            Ok(false) => Ok(text(format!(
                "denied: add {} under System Settings > Privacy & Security > Accessibility",
                self.walker.program()
            ))),
            Err(e) => Ok(tool_error(e)),
        }
    }

    #[tool(description = "Dump the host's accessibility tree to a bounded depth, for finding labels")]
    async fn query_ui(
        &self,
        Parameters(request): Parameters<QueryRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.walker.query(request.depth).await {
            Ok(tree) => json(&tree),
            Err(e) => Ok(tool_error(e)),
        }
    }

    #[tool(description = "Play one note on the virtual MIDI port")]
    async fn midi_note(
        &self,
        Parameters(request): Parameters<NoteRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Some(closed) = self.require_midi() {
            return Ok(closed);
        }
        let duration = Duration::from_millis(request.duration_ms.unwrap_or(DEFAULT_NOTE_MS));
        let result = self
            .midi
            .note(
                self.channel(request.channel),
                request.pitch,
                self.velocity(request.velocity),
                duration,
            )
            .await;
        midi_result(result, format!("Played note {}", request.pitch))
    }

    #[tool(description = "Play several notes together on the virtual MIDI port")]
    async fn midi_chord(
        &self,
        Parameters(request): Parameters<ChordRequest>,
    ) -> Result<CallToolResult, McpError> {
        if request.pitches.is_empty() {
            return Err(McpError::invalid_params("pitches must not be empty", None));
        }
        if let Some(closed) = self.require_midi() {
            return Ok(closed);
        }
        let duration = Duration::from_millis(request.duration_ms.unwrap_or(DEFAULT_NOTE_MS));
        let result = self
            .midi
            .chord(
                self.channel(request.channel),
                &request.pitches,
                self.velocity(request.velocity),
                duration,
            )
            .await;
        midi_result(result, format!("Played chord {:?}", request.pitches))
    }

    #[tool(description = "Send a control change on the virtual MIDI port")]
    async fn midi_cc(
        &self,
        Parameters(request): Parameters<ControlChangeRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Some(closed) = self.require_midi() {
            return Ok(closed);
        }
        let result = self.midi.send(ChannelMessage::ControlChange {
            channel: self.channel(request.channel),
            controller: request.controller,
            value: request.value,
        });
        midi_result(result, format!("CC {} = {}", request.controller, request.value))
    }

    #[tool(description = "Send a program change on the virtual MIDI port")]
    async fn midi_program_change(
        &self,
        Parameters(request): Parameters<ProgramChangeRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Some(closed) = self.require_midi() {
            return Ok(closed);
        }
        let result = self.midi.send(ChannelMessage::ProgramChange {
            channel: self.channel(request.channel),
            program: request.program,
        });
        midi_result(result, format!("Program {}", request.program))
    }

    #[tool(description = "Send a pitch bend on the virtual MIDI port")]
    async fn midi_pitch_bend(
        &self,
        Parameters(request): Parameters<PitchBendRequest>,
    ) -> Result<CallToolResult, McpError> {
        if let Some(closed) = self.require_midi() {
            return Ok(closed);
        }
        let result = self.midi.send(ChannelMessage::PitchBend {
            channel: self.channel(request.channel),
            value: request.value,
        });
        midi_result(result, format!("Pitch bend {}", request.value))
    }
}

#[tool_handler]
impl ServerHandler for StagehandServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Stagehand - drive a running DAW from MCP\n\n\
                Reading the session:\n\
                - list_tracks: names, numbers, mute/solo/record, volume, plugins\n\
                - get_plugin_params / set_plugin_param: controls of the open plugin window\n\
                - query_ui: raw accessibility tree, for finding labels\n\n\
                Driving the host:\n\
                - transport, project, key_command, menu_click, set_tempo\n\n\
                Playing notes:\n\
                - midi_note, midi_chord, midi_cc, midi_program_change, midi_pitch_bend \
                send to a virtual MIDI port; arm a track listening to it first\n\n\
                Every extraction result carries a provenance block naming the backend that \
                answered. If check_access reports denied, results come from the slower \
                scripting fallback."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
