//! Config file discovery, loading, merging, and environment variable overlay.

use crate::{ConfigError, StageConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
pub fn discover_config_files() -> Vec<PathBuf> {
    discover_config_files_with_override(None)
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/stagehand/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("stagehand/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("stagehand.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Read a config file as a raw TOML table.
pub fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load a single config file, filling gaps with defaults.
pub fn load_from_file(path: &Path) -> Result<StageConfig, ConfigError> {
    let table = load_table(path)?;
    from_table(table, path)
}

/// Deserialize a merged table into a typed config.
pub fn from_table(table: toml::Table, origin: &Path) -> Result<StageConfig, ConfigError> {
    let mut config: StageConfig = toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

    config.backend.walker_path = expand_path(&config.backend.walker_path.to_string_lossy());
    Ok(config)
}

/// Merge `overlay` into `base`. Nested tables merge key by key; any other
/// value (including arrays) in the overlay replaces the base value.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut StageConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("STAGEHAND_APP_NAME") {
        config.host.app_name = v;
        sources.env_overrides.push("STAGEHAND_APP_NAME".to_string());
    }
    if let Ok(v) = env::var("STAGEHAND_PROCESS_NAME") {
        config.host.process_name = v;
        sources.env_overrides.push("STAGEHAND_PROCESS_NAME".to_string());
    }

    if let Ok(v) = env::var("STAGEHAND_WALKER_PATH") {
        config.backend.walker_path = expand_path(&v);
        sources.env_overrides.push("STAGEHAND_WALKER_PATH".to_string());
    }
    if let Ok(v) = env::var("STAGEHAND_TIMEOUT_MS") {
        if let Ok(ms) = v.parse() {
            config.backend.timeout_ms = ms;
            sources.env_overrides.push("STAGEHAND_TIMEOUT_MS".to_string());
        }
    }

    if let Ok(v) = env::var("STAGEHAND_MIDI_PORT") {
        config.midi.port_name = v;
        sources.env_overrides.push("STAGEHAND_MIDI_PORT".to_string());
    }

    if let Ok(v) = env::var("STAGEHAND_OTLP_ENDPOINT") {
        config.telemetry.otlp_endpoint = Some(v);
        sources.env_overrides.push("STAGEHAND_OTLP_ENDPOINT".to_string());
    }
    // Also support standard OTEL env var
    if let Ok(v) = env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        config.telemetry.otlp_endpoint = Some(v);
        sources.env_overrides.push("OTEL_EXPORTER_OTLP_ENDPOINT".to_string());
    }
    if let Ok(v) = env::var("STAGEHAND_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("STAGEHAND_LOG_LEVEL".to_string());
    }
    if let Ok(v) = env::var("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }
}

/// Expand ~ and environment variables in a path.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            home.join(stripped)
        } else {
            PathBuf::from(path)
        }
    } else if let Some(stripped) = path.strip_prefix('$') {
        // Handle $VAR/rest/of/path
        if let Some(slash_pos) = stripped.find('/') {
            let var_name = &stripped[..slash_pos];
            if let Ok(var_value) = env::var(var_name) {
                PathBuf::from(var_value).join(&stripped[slash_pos + 1..])
            } else {
                PathBuf::from(path)
            }
        } else {
            env::var(stripped)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(path))
        }
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> toml::Table {
        contents.parse().unwrap()
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/bin/axwalker");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().ends_with("bin/axwalker"));
    }

    #[test]
    fn test_expand_path_absolute() {
        let expanded = expand_path("/usr/local/bin/axwalker");
        assert_eq!(expanded, PathBuf::from("/usr/local/bin/axwalker"));
    }

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files();
    }

    #[test]
    fn test_merge_keeps_untouched_keys() {
        let mut base = parse(
            r#"
[host]
app_name = "Logic Pro"
process_name = "Logic Pro"

[search]
track_depth = 12
"#,
        );
        let overlay = parse(
            r#"
[host]
process_name = "Logic Pro X"
"#,
        );

        merge_tables(&mut base, overlay);
        let config = from_table(base, Path::new("test.toml")).unwrap();
        assert_eq!(config.host.app_name, "Logic Pro");
        assert_eq!(config.host.process_name, "Logic Pro X");
        assert_eq!(config.search.track_depth, 12);
    }

    #[test]
    fn test_overlay_arrays_replace() {
        let mut base = parse(
            r#"
[locale]
track_prefixes = ["Track ", "Spur "]
"#,
        );
        let overlay = parse(
            r#"
[locale]
track_prefixes = ["Piste "]
"#,
        );

        merge_tables(&mut base, overlay);
        let config = from_table(base, Path::new("test.toml")).unwrap();
        assert_eq!(config.locale.track_prefixes, vec!["Piste ".to_string()]);
        // Untouched locale lists keep their defaults
        assert!(config.locale.mute_labels.contains(&"Mute".to_string()));
    }

    #[test]
    fn test_parse_full_toml() {
        let table = parse(
            r#"
[host]
app_name = "Logic Pro"
process_name = "Logic Pro"

[backend]
walker_path = "/opt/stagehand/axwalker"
scripting_engine = "/usr/bin/osascript"
timeout_ms = 10000

[locale]
container_labels = ["Tracks"]
transport_labels = ["M", "S"]

[search]
container_depth = 6
track_depth = 9
plugin_depth = 4
param_depth = 5
query_depth = 2

[midi]
port_name = "Agent Keys"
default_channel = 9
default_velocity = 90

[catalog]
command = "auval"
args = ["-l"]

[telemetry]
otlp_endpoint = "127.0.0.1:4317"
log_level = "debug"
"#,
        );
        let config = from_table(table, Path::new("test.toml")).unwrap();

        assert_eq!(config.backend.walker_path, PathBuf::from("/opt/stagehand/axwalker"));
        assert_eq!(config.backend.scripting_engine, "/usr/bin/osascript");
        assert_eq!(config.backend.timeout_ms, 10_000);
        assert_eq!(config.locale.container_labels, vec!["Tracks".to_string()]);
        assert_eq!(config.locale.transport_labels.len(), 2);
        assert_eq!(config.search.container_depth, 6);
        assert_eq!(config.search.query_depth, 2);
        assert_eq!(config.midi.port_name, "Agent Keys");
        assert_eq!(config.midi.default_channel, 9);
        assert_eq!(config.catalog.args, vec!["-l".to_string()]);
        assert_eq!(config.telemetry.otlp_endpoint.as_deref(), Some("127.0.0.1:4317"));
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[host\napp_name = ").unwrap();

        let err = load_from_file(&path).unwrap_err();
        match err {
            ConfigError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_type_is_parse_error() {
        let table = parse(
            r#"
[backend]
timeout_ms = "soon"
"#,
        );
        assert!(matches!(
            from_table(table, Path::new("test.toml")),
            Err(ConfigError::Parse { .. })
        ));
    }
}
