//! Installed plugin listing from the system's component validator.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use stageconf::CatalogConfig;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::process::{self, ProcessError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("{command} exited with {code:?}: {message}")]
    Failed {
        command: String,
        code: Option<i32>,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub subtype: String,
    pub manufacturer: String,
    pub name: String,
}

fn row_pattern() -> &'static Regex {
    static ROW: OnceLock<Regex> = OnceLock::new();
    ROW.get_or_init(|| {
        Regex::new(r"^\s*(\S{4})\s+(\S{4})\s+(\S{4})\s+-\s+(.+?)\s*$").expect("catalog row pattern is valid")
    })
}

/// Parse `TTTT SSSS MMMM  -  Name` rows; every other line is skipped.
pub fn parse(text: &str) -> Vec<PluginRecord> {
    text.lines()
        .filter_map(|line| {
            let caps = row_pattern().captures(line)?;
            Some(PluginRecord {
                kind: caps[1].to_string(),
                subtype: caps[2].to_string(),
                manufacturer: caps[3].to_string(),
                name: caps[4].to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Catalog {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Catalog {
    pub fn new(config: &CatalogConfig, timeout: Duration) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout,
        }
    }

    #[instrument(skip(self), fields(command = %self.command))]
    pub async fn list(&self) -> Result<Vec<PluginRecord>, CatalogError> {
        let output = process::run(&self.command, &self.args, self.timeout).await?;
        if !output.success() {
            return Err(CatalogError::Failed {
                command: self.command.clone(),
                code: output.code,
                message: output.error_line(),
            });
        }
        let records = parse(&output.stdout);
        debug!(count = records.len(), "parsed plugin catalog");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_row() {
        assert_eq!(
            parse("aufx    AUBa    appl    -  AUBandpass\n"),
            vec![PluginRecord {
                kind: "aufx".into(),
                subtype: "AUBa".into(),
                manufacturer: "appl".into(),
                name: "AUBandpass".into(),
            }]
        );
    }

    #[test]
    fn banner_and_malformed_rows_are_skipped() {
        let text = "\
    AU Validation Tool
    Version: 1.10.0
--------------------------------------------------
aufx bpas appl  -  Apple: AUBandpass
aumu dls  appl    Apple: DLSMusicDevice
aumu Alch LiON  -  Alchemy
aufx    TOOLONG appl  -  Broken
";
        let records = parse(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Apple: AUBandpass");
        assert_eq!(records[1].kind, "aumu");
        assert_eq!(records[1].manufacturer, "LiON");
    }

    #[test]
    fn record_wire_shape() {
        let json = serde_json::to_value(&parse("aufx AUBa appl - AUBandpass")[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "aufx",
                "subtype": "AUBa",
                "manufacturer": "appl",
                "name": "AUBandpass",
            })
        );
    }

    #[tokio::test]
    async fn runs_the_configured_command() {
        let config = CatalogConfig {
            command: "printf".into(),
            args: vec!["aufx AUBa appl - AUBandpass\\n".into()],
        };
        let records = Catalog::new(&config, Duration::from_secs(5)).list().await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
