//! Extraction pipeline: the three public operations built from the search
//! engine and the label heuristics.

use stageconf::{LocaleConfig, SearchConfig};
use tracing::{debug, instrument};

use crate::element::{Element, ElementValue, Role};
use crate::error::AxError;
use crate::model::{PluginParameter, TrackInfo};
use crate::patterns::{
    is_parameter_control, is_toggle_control, parse_track_name, parse_track_number, Toggle,
    TrackPatterns,
};
use crate::search::{collect_matching, find_and_mutate, find_by_label, MutatedControl};

/// Depth bounds for each stage of extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub container_depth: usize,
    pub track_depth: usize,
    pub plugin_depth: usize,
    pub param_depth: usize,
}

impl From<&SearchConfig> for SearchLimits {
    fn from(search: &SearchConfig) -> Self {
        Self {
            container_depth: search.container_depth,
            track_depth: search.track_depth,
            plugin_depth: search.plugin_depth,
            param_depth: search.param_depth,
        }
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    patterns: TrackPatterns,
    limits: SearchLimits,
}

impl Extractor {
    pub fn new(patterns: TrackPatterns, limits: SearchLimits) -> Self {
        Self { patterns, limits }
    }

    pub fn from_config(locale: &LocaleConfig, search: &SearchConfig) -> Self {
        Self::new(TrackPatterns::from(locale), SearchLimits::from(search))
    }

    pub fn patterns(&self) -> &TrackPatterns {
        &self.patterns
    }

    pub fn limits(&self) -> SearchLimits {
        self.limits
    }

    /// Every track row under the application root, in host order.
    ///
    /// A missing track container yields an empty list: the host may simply
    /// have no project open.
    #[instrument(skip_all)]
    pub fn extract_tracks<E: Element>(&self, app: &E) -> Vec<TrackInfo> {
        let Some(container) = find_by_label(
            app,
            |label| self.patterns.is_track_container(label),
            self.limits.container_depth,
        ) else {
            debug!("no track container found");
            return Vec::new();
        };

        let mut rows = Vec::new();
        collect_matching(
            std::slice::from_ref(&container),
            self.limits.track_depth,
            |e: &E| e.label().is_some_and(|label| self.patterns.is_track_label(&label)),
            |e, _| rows.push(e.clone()),
        );
        debug!(rows = rows.len(), "collected track rows");

        rows.iter()
            .enumerate()
            .map(|(index, row)| self.describe_track(index, row))
            .collect()
    }

    fn describe_track<E: Element>(&self, index: usize, row: &E) -> TrackInfo {
        let label = row.label().unwrap_or_default();
        let mut track = TrackInfo {
            index,
            track_number: parse_track_number(&label),
            name: parse_track_name(&label),
            muted: false,
            solo: false,
            record_enabled: false,
            volume: 0,
            plugins: Vec::new(),
        };

        let children = row.children();
        let mut volume: Option<ElementValue> = None;
        let mut first_slider: Option<ElementValue> = None;

        for child in &children {
            let Some(role) = child.role() else { continue };
            let child_label = child.label().unwrap_or_default();

            if is_toggle_control(&role) {
                let on = child.value().is_some_and(|v| v.is_truthy());
                match self.patterns.toggle_kind(&child_label) {
                    Some(Toggle::Mute) => track.muted = on,
                    Some(Toggle::Solo) => track.solo = on,
                    Some(Toggle::Record) => track.record_enabled = on,
                    None => {}
                }
            } else if role == Role::Slider {
                if volume.is_none() && self.patterns.is_volume_label(&child_label) {
                    volume = child.value();
                } else if first_slider.is_none() {
                    first_slider = child.value();
                }
            }
        }

        track.volume = volume
            .or(first_slider)
            .and_then(|v| v.as_integer())
            .unwrap_or(0);

        collect_matching(
            &children,
            self.limits.plugin_depth,
            |e: &E| self.is_plugin_slot(e),
            |e, _| {
                if let Some(name) = e.label() {
                    track.plugins.push(name);
                }
            },
        );

        track
    }

    /// A named button that is neither a transport caption nor a toggle.
    fn is_plugin_slot<E: Element>(&self, element: &E) -> bool {
        if !matches!(element.role(), Some(Role::Button | Role::MenuButton)) {
            return false;
        }
        element.label().is_some_and(|label| {
            !self.patterns.is_transport_label(&label) && self.patterns.toggle_kind(&label).is_none()
        })
    }

    /// Every parameter control in the given windows.
    ///
    /// The accessibility tree does not link a track's plugin slot to its
    /// window, so this reads whatever plugin window is open. Navigating to
    /// the right track and slot first is the caller's job.
    #[instrument(skip_all)]
    pub fn read_parameters<E: Element>(&self, windows: &[E]) -> Vec<PluginParameter> {
        let mut params = Vec::new();
        collect_matching(
            windows,
            self.limits.param_depth,
            |e: &E| e.role().is_some_and(|role| is_parameter_control(&role)),
            |e, _| {
                if let Some(role) = e.role() {
                    params.push(PluginParameter {
                        name: e.label().unwrap_or_default(),
                        value: e.value().map(|v| v.as_text()).unwrap_or_default(),
                        role,
                    });
                }
            },
        );
        debug!(count = params.len(), "read parameters");
        params
    }

    /// Assign `value` to the first writable control named `name`.
    #[instrument(skip(self, windows))]
    pub fn write_parameter<E: Element>(
        &self,
        windows: &[E],
        name: &str,
        value: &str,
    ) -> Result<MutatedControl, AxError> {
        find_and_mutate(windows, name, value, self.limits.param_depth)?
            .ok_or_else(|| AxError::ParameterNotFound(name.to_string()))
    }
}
