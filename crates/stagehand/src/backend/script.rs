use std::time::Duration;

use async_trait::async_trait;
use axtree::protocol::{self, command};
use axtree::{AxError, MutatedControl, PluginParameter, SearchLimits, TrackInfo, TrackPatterns};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use stageconf::StageConfig;
use tracing::{debug, instrument, warn};

use super::{BackendError, BackendKind, TrackBackend};
use crate::process;

const KIND: BackendKind = BackendKind::Fallback;

const WALKER_JS: &str = include_str!("../../scripts/walker.js");

/// Label vocabulary as the script expects it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptLocale<'a> {
    track_prefixes: &'a [String],
    container_labels: &'a [String],
    transport_labels: &'a [String],
    mute_labels: &'a [String],
    solo_labels: &'a [String],
    record_labels: &'a [String],
    volume_labels: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptLimits {
    container_depth: usize,
    track_depth: usize,
    plugin_depth: usize,
    param_depth: usize,
}

#[derive(Debug, Serialize)]
struct ScriptArgs<'a> {
    operation: &'a str,
    process: &'a str,
    locale: ScriptLocale<'a>,
    limits: ScriptLimits,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
}

/// One entry of the `set-param` reply.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptMutation {
    Applied(MutatedControl),
    Rejected { rejected: String },
}

/// Runs the embedded JavaScript walker through the scripting engine.
#[derive(Debug, Clone)]
pub struct ScriptBackend {
    engine: String,
    process_name: String,
    patterns: TrackPatterns,
    limits: SearchLimits,
    timeout: Duration,
}

impl ScriptBackend {
    pub fn new(
        engine: impl Into<String>,
        process_name: impl Into<String>,
        patterns: TrackPatterns,
        limits: SearchLimits,
        timeout: Duration,
    ) -> Self {
        Self {
            engine: engine.into(),
            process_name: process_name.into(),
            patterns,
            limits,
            timeout,
        }
    }

    pub fn from_config(config: &StageConfig) -> Self {
        Self::new(
            config.backend.scripting_engine.clone(),
            config.host.process_name.clone(),
            TrackPatterns::from(&config.locale),
            SearchLimits::from(&config.search),
            Duration::from_millis(config.backend.timeout_ms),
        )
    }

    /// The program text submitted to the engine. Arguments travel as one
    /// JSON literal so no label can break out of the script.
    fn script(&self, operation: &str, name: Option<&str>, value: Option<&str>) -> Result<String, BackendError> {
        let p = &self.patterns;
        let args = ScriptArgs {
            operation,
            process: &self.process_name,
            locale: ScriptLocale {
                track_prefixes: &p.track_prefixes,
                container_labels: &p.container_labels,
                transport_labels: &p.transport_labels,
                mute_labels: &p.mute_labels,
                solo_labels: &p.solo_labels,
                record_labels: &p.record_labels,
                volume_labels: &p.volume_labels,
            },
            limits: ScriptLimits {
                container_depth: self.limits.container_depth,
                track_depth: self.limits.track_depth,
                plugin_depth: self.limits.plugin_depth,
                param_depth: self.limits.param_depth,
            },
            name,
            value,
        };
        let literal = serde_json::to_string(&args).map_err(|e| BackendError::Failed {
            backend: KIND,
            message: e.to_string(),
        })?;
        Ok(format!("const ARGS = {};\n{}", literal, WALKER_JS))
    }

    async fn evaluate<T: DeserializeOwned>(
        &self,
        operation: &str,
        name: Option<&str>,
        value: Option<&str>,
    ) -> Result<Vec<T>, BackendError> {
        let script = self.script(operation, name, value)?;
        let args = vec![
            "-l".to_string(),
            "JavaScript".to_string(),
            "-e".to_string(),
            script,
        ];
        let output = process::run(&self.engine, &args, self.timeout)
            .await
            .map_err(|e| BackendError::from_process(KIND, e))?;

        if !output.success() {
            let message = output.error_line();
            return Err(if is_permission_error(&message) {
                BackendError::PermissionDenied {
                    backend: KIND,
                    message,
                }
            } else {
                BackendError::Failed {
                    backend: KIND,
                    message,
                }
            });
        }
        Ok(parse_lenient(&output.stdout))
    }
}

/// System Events refuses UI scripting without assistive access (-1719, -25211).
fn is_permission_error(message: &str) -> bool {
    message.contains("-1719") || message.contains("-25211") || message.contains("assistive access")
}

/// Parse the script's JSON array; anything else counts as no results.
pub(crate) fn parse_lenient<T: DeserializeOwned>(stdout: &str) -> Vec<T> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    serde_json::from_str(trimmed).unwrap_or_else(|e| {
        warn!(error = %e, "discarding malformed fallback output");
        Vec::new()
    })
}

#[async_trait]
impl TrackBackend for ScriptBackend {
    fn kind(&self) -> BackendKind {
        KIND
    }

    #[instrument(skip(self))]
    async fn list_tracks(&self) -> Result<Vec<TrackInfo>, BackendError> {
        self.evaluate(command::LIST_TRACKS, None, None).await
    }

    #[instrument(skip(self))]
    async fn read_parameters(&self, track: usize, slot: usize) -> Result<Vec<PluginParameter>, BackendError> {
        self.evaluate(command::GET_PARAMS, None, None).await
    }

    #[instrument(skip(self))]
    async fn write_parameter(
        &self,
        track: usize,
        slot: usize,
        name: &str,
        value: &str,
    ) -> Result<String, BackendError> {
        let replies: Vec<ScriptMutation> = self
            .evaluate(command::SET_PARAM, Some(name), Some(value))
            .await?;
        match replies.into_iter().next() {
            Some(ScriptMutation::Applied(control)) => {
                debug!(role = %control.role, "fallback wrote parameter");
                Ok(protocol::confirmation(&control))
            }
            Some(ScriptMutation::Rejected { rejected }) => Err(BackendError::Control(rejected)),
            None => Err(BackendError::NotFound(
                AxError::ParameterNotFound(name.to_string()).to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axtree::Role;
    use pretty_assertions::assert_eq;

    fn backend() -> ScriptBackend {
        ScriptBackend::new(
            "osascript",
            "Logic Pro",
            TrackPatterns::default(),
            SearchLimits::default(),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn arguments_are_a_json_literal() {
        let script = backend()
            .script(command::SET_PARAM, Some("Cut\"off"), Some("0.5"))
            .unwrap();
        let first = script.lines().next().unwrap();
        let literal = first
            .strip_prefix("const ARGS = ")
            .and_then(|rest| rest.strip_suffix(';'))
            .unwrap();
        let args: serde_json::Value = serde_json::from_str(literal).unwrap();

        assert_eq!(args["operation"], "set-param");
        assert_eq!(args["process"], "Logic Pro");
        assert_eq!(args["name"], "Cut\"off");
        assert_eq!(args["limits"]["trackDepth"], 12);
        assert_eq!(args["locale"]["trackPrefixes"][1], "Spur ");
        assert!(script.contains("JSON.stringify(main());"));
    }

    #[test]
    fn read_operations_omit_name_and_value() {
        let script = backend().script(command::LIST_TRACKS, None, None).unwrap();
        let first = script.lines().next().unwrap();
        assert!(!first.contains("\"name\""));
        assert!(!first.contains("\"value\""));
    }

    #[test]
    fn malformed_output_is_empty() {
        assert!(parse_lenient::<TrackInfo>("").is_empty());
        assert!(parse_lenient::<TrackInfo>("execution error: oops").is_empty());
        assert!(parse_lenient::<TrackInfo>("{\"index\": 0}").is_empty());
    }

    #[test]
    fn well_formed_output_parses() {
        let params: Vec<PluginParameter> =
            parse_lenient(r#"[{"name":"Drive","value":"3","role":"AXSlider"}]"#);
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].role, Role::Slider);
    }

    #[test]
    fn mutation_replies() {
        let applied: Vec<ScriptMutation> =
            parse_lenient(r#"[{"name":"Drive","value":"3","role":"AXSlider"}]"#);
        assert!(matches!(&applied[0], ScriptMutation::Applied(c) if c.name == "Drive"));

        let rejected: Vec<ScriptMutation> = parse_lenient(r#"[{"rejected":"no"}]"#);
        assert!(matches!(&rejected[0], ScriptMutation::Rejected { rejected } if rejected == "no"));
    }

    #[test]
    fn permission_errors_are_recognized() {
        assert!(is_permission_error(
            "execution error: System Events got an error: osascript is not allowed assistive access. (-1719)"
        ));
        assert!(!is_permission_error("execution error: Can't get process \"Logic Pro\"."));
    }
}
