//! Label heuristics.
//!
//! The host exposes no schema, only human-readable (and localized) labels.
//! Every string pattern the extraction relies on lives here so that a host
//! update or a new locale touches this module and the config, never the
//! traversal engine.

use stageconf::LocaleConfig;

use crate::element::Role;

/// Quote pairs recognized around a track name, tried by earliest opening mark.
const QUOTE_PAIRS: &[(char, char)] = &[
    ('\u{201C}', '\u{201D}'), // “ ”
    ('"', '"'),
    ('\u{00AB}', '\u{00BB}'), // « »
    ('\u{201E}', '\u{201C}'), // „ “
    ('\u{00BB}', '\u{00AB}'), // » «
];

/// Which toggle a checkbox on a track row controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Mute,
    Solo,
    Record,
}

/// Locale-dependent label vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPatterns {
    pub track_prefixes: Vec<String>,
    pub container_labels: Vec<String>,
    pub transport_labels: Vec<String>,
    pub mute_labels: Vec<String>,
    pub solo_labels: Vec<String>,
    pub record_labels: Vec<String>,
    pub volume_labels: Vec<String>,
}

impl From<&LocaleConfig> for TrackPatterns {
    fn from(locale: &LocaleConfig) -> Self {
        Self {
            track_prefixes: locale.track_prefixes.clone(),
            container_labels: locale.container_labels.clone(),
            transport_labels: locale.transport_labels.clone(),
            mute_labels: locale.mute_labels.clone(),
            solo_labels: locale.solo_labels.clone(),
            record_labels: locale.record_labels.clone(),
            volume_labels: locale.volume_labels.clone(),
        }
    }
}

impl Default for TrackPatterns {
    fn default() -> Self {
        Self::from(&LocaleConfig::default())
    }
}

impl TrackPatterns {
    /// True when `text` starts with one of the configured track prefixes.
    pub fn is_track_label(&self, text: &str) -> bool {
        self.track_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && text.starts_with(prefix.as_str()))
    }

    /// True for the label of the group holding the track rows.
    pub fn is_track_container(&self, label: &str) -> bool {
        self.container_labels
            .iter()
            .any(|prefix| !prefix.is_empty() && label.starts_with(prefix.as_str()))
    }

    /// True for the short mute/solo/record captions that are not plugins.
    pub fn is_transport_label(&self, label: &str) -> bool {
        any_named(&self.transport_labels, label)
    }

    pub fn toggle_kind(&self, label: &str) -> Option<Toggle> {
        if any_named(&self.mute_labels, label) {
            Some(Toggle::Mute)
        } else if any_named(&self.solo_labels, label) {
            Some(Toggle::Solo)
        } else if any_named(&self.record_labels, label) {
            Some(Toggle::Record)
        } else {
            None
        }
    }

    pub fn is_volume_label(&self, label: &str) -> bool {
        any_named(&self.volume_labels, label)
    }
}

fn any_named(names: &[String], label: &str) -> bool {
    names.iter().any(|name| matches_control_name(label, name))
}

/// Extract the track name from a row label such as `Track 2 “Lead Vox”`.
///
/// Looks for the earliest opening quote, pairs it with the first matching
/// closing quote after it, and returns the trimmed interior. Anything after
/// that closing quote is ignored. Without quotes, everything after the first
/// two whitespace-separated tokens is used. If that is empty too, the text
/// comes back unchanged.
pub fn parse_track_name(text: &str) -> String {
    let quoted = QUOTE_PAIRS
        .iter()
        .filter_map(|&(open, close)| {
            let start = text.find(open)?;
            let inner_start = start + open.len_utf8();
            let end = text[inner_start..].find(close)? + inner_start;
            Some((start, &text[inner_start..end]))
        })
        .min_by_key(|(start, _)| *start);

    if let Some((_, inner)) = quoted {
        return inner.trim().to_string();
    }

    let rest: Vec<&str> = text.split_whitespace().skip(2).collect();
    if rest.is_empty() {
        text.to_string()
    } else {
        rest.join(" ")
    }
}

/// The host's ordinal from the second whitespace-separated token; `-1` when
/// absent, not an integer, or outside `i32`.
pub fn parse_track_number(text: &str) -> i32 {
    text.split_whitespace()
        .nth(1)
        .and_then(|token| token.parse().ok())
        .unwrap_or(-1)
}

/// Slider, text field, and pop-up button controls are plugin parameters.
pub fn is_parameter_control(role: &Role) -> bool {
    matches!(role, Role::Slider | Role::TextField | Role::PopUpButton)
}

pub fn is_toggle_control(role: &Role) -> bool {
    matches!(role, Role::CheckBox)
}

/// Case-insensitive exact match. Substrings never match, so "Mute" does not
/// find "Mute Group".
pub fn matches_control_name(label: &str, target: &str) -> bool {
    label.trim().to_lowercase() == target.trim().to_lowercase()
}
