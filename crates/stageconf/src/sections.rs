//! Configuration sections.
//!
//! Every field has a compiled default so a missing file, a missing section, or
//! a missing key all resolve to the same behavior.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The host application being driven.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Application name used for activation before keystrokes.
    /// Default: "Logic Pro"
    #[serde(default = "HostConfig::default_app_name")]
    pub app_name: String,

    /// Process name as reported by the accessibility subsystem.
    /// Default: "Logic Pro"
    #[serde(default = "HostConfig::default_process_name")]
    pub process_name: String,
}

impl HostConfig {
    fn default_app_name() -> String {
        "Logic Pro".to_string()
    }

    fn default_process_name() -> String {
        "Logic Pro".to_string()
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            app_name: Self::default_app_name(),
            process_name: Self::default_process_name(),
        }
    }
}

/// Extraction backends and their subprocess limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Path to the privileged accessibility walker binary.
    /// Default: `axwalker` next to the running executable.
    #[serde(default = "BackendConfig::default_walker_path")]
    pub walker_path: PathBuf,

    /// Interpreter for the unprivileged fallback walker and the actuator.
    /// Default: "osascript"
    #[serde(default = "BackendConfig::default_scripting_engine")]
    pub scripting_engine: String,

    /// Timeout applied to every subprocess invocation, in milliseconds.
    /// Default: 15000
    #[serde(default = "BackendConfig::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl BackendConfig {
    fn default_walker_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("axwalker")))
            .unwrap_or_else(|| PathBuf::from("axwalker"))
    }

    fn default_scripting_engine() -> String {
        "osascript".to_string()
    }

    fn default_timeout_ms() -> u64 {
        15_000
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            walker_path: Self::default_walker_path(),
            scripting_engine: Self::default_scripting_engine(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

/// Localized label vocabulary used by the pattern matchers.
///
/// The host localizes its accessibility labels, so every string the
/// extraction heuristics look for lives here instead of in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleConfig {
    /// Prefixes that start a track row label, e.g. `Track 3 "Bass"`.
    #[serde(default = "LocaleConfig::default_track_prefixes")]
    pub track_prefixes: Vec<String>,

    /// Labels of the group that holds the track rows.
    #[serde(default = "LocaleConfig::default_container_labels")]
    pub container_labels: Vec<String>,

    /// Short button captions on a track row that are not plugins.
    #[serde(default = "LocaleConfig::default_transport_labels")]
    pub transport_labels: Vec<String>,

    #[serde(default = "LocaleConfig::default_mute_labels")]
    pub mute_labels: Vec<String>,

    #[serde(default = "LocaleConfig::default_solo_labels")]
    pub solo_labels: Vec<String>,

    #[serde(default = "LocaleConfig::default_record_labels")]
    pub record_labels: Vec<String>,

    #[serde(default = "LocaleConfig::default_volume_labels")]
    pub volume_labels: Vec<String>,

    /// Labels of the tempo control in the control bar.
    #[serde(default = "LocaleConfig::default_tempo_labels")]
    pub tempo_labels: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl LocaleConfig {
    fn default_track_prefixes() -> Vec<String> {
        strings(&["Track ", "Spur "])
    }

    fn default_container_labels() -> Vec<String> {
        strings(&["Tracks", "Spuren"])
    }

    fn default_transport_labels() -> Vec<String> {
        strings(&["M", "S", "R", "I"])
    }

    fn default_mute_labels() -> Vec<String> {
        strings(&["Mute", "Stumm"])
    }

    fn default_solo_labels() -> Vec<String> {
        strings(&["Solo"])
    }

    fn default_record_labels() -> Vec<String> {
        strings(&["Record", "Record Enable", "Aufnahme"])
    }

    fn default_volume_labels() -> Vec<String> {
        strings(&["Volume", "Lautstärke"])
    }

    fn default_tempo_labels() -> Vec<String> {
        strings(&["Tempo"])
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            track_prefixes: Self::default_track_prefixes(),
            container_labels: Self::default_container_labels(),
            transport_labels: Self::default_transport_labels(),
            mute_labels: Self::default_mute_labels(),
            solo_labels: Self::default_solo_labels(),
            record_labels: Self::default_record_labels(),
            volume_labels: Self::default_volume_labels(),
            tempo_labels: Self::default_tempo_labels(),
        }
    }
}

/// Depth bounds for every tree walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Bound when locating the track container from the application root.
    #[serde(default = "SearchConfig::default_container_depth")]
    pub container_depth: usize,

    /// Bound when collecting track rows inside the container.
    #[serde(default = "SearchConfig::default_track_depth")]
    pub track_depth: usize,

    /// Bound when scanning one track row for plugin slots.
    #[serde(default = "SearchConfig::default_plugin_depth")]
    pub plugin_depth: usize,

    /// Bound when reading or writing controls across top-level windows.
    #[serde(default = "SearchConfig::default_param_depth")]
    pub param_depth: usize,

    /// Default depth of a raw tree dump.
    #[serde(default = "SearchConfig::default_query_depth")]
    pub query_depth: usize,
}

impl SearchConfig {
    fn default_container_depth() -> usize {
        10
    }

    fn default_track_depth() -> usize {
        12
    }

    fn default_plugin_depth() -> usize {
        6
    }

    fn default_param_depth() -> usize {
        8
    }

    fn default_query_depth() -> usize {
        3
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            container_depth: Self::default_container_depth(),
            track_depth: Self::default_track_depth(),
            plugin_depth: Self::default_plugin_depth(),
            param_depth: Self::default_param_depth(),
            query_depth: Self::default_query_depth(),
        }
    }
}

/// Virtual MIDI output port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiConfig {
    /// Name the virtual port is published under.
    /// Default: "Stagehand"
    #[serde(default = "MidiConfig::default_port_name")]
    pub port_name: String,

    /// Channel (0-15) used when a tool call omits one.
    #[serde(default)]
    pub default_channel: u8,

    /// Velocity used when a tool call omits one.
    #[serde(default = "MidiConfig::default_velocity")]
    pub default_velocity: u8,
}

impl MidiConfig {
    fn default_port_name() -> String {
        "Stagehand".to_string()
    }

    fn default_velocity() -> u8 {
        100
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            port_name: Self::default_port_name(),
            default_channel: 0,
            default_velocity: Self::default_velocity(),
        }
    }
}

/// Installed plugin enumeration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Validation utility to run.
    /// Default: "auval"
    #[serde(default = "CatalogConfig::default_command")]
    pub command: String,

    /// Arguments selecting its listing mode.
    /// Default: ["-a"]
    #[serde(default = "CatalogConfig::default_args")]
    pub args: Vec<String>,
}

impl CatalogConfig {
    fn default_command() -> String {
        "auval".to_string()
    }

    fn default_args() -> Vec<String> {
        vec!["-a".to_string()]
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            command: Self::default_command(),
            args: Self::default_args(),
        }
    }
}

/// Telemetry and observability configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// OTLP gRPC endpoint for OpenTelemetry. Unset means stderr logging only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp_endpoint: Option<String>,

    /// Log level or full `EnvFilter` directive.
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            otlp_endpoint: None,
            log_level: Self::default_log_level(),
        }
    }
}
