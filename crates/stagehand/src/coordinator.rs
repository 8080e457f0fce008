//! Privileged-first extraction with a scripted fallback.
//!
//! Each call runs a two-state machine. `TryPrivileged` asks the walker; a
//! non-empty answer ends the call. A failure or an empty answer moves to
//! `TryFallback`, whose outcome is final either way. A rejected mutation
//! (the control refused the value) ends the call at once, since the other
//! backend would find the same control.
//!
//! An empty answer is ambiguous: the project may have no tracks, or the
//! walker may have looked in the wrong place. Every answer therefore carries
//! a [`Provenance`] saying which backend produced it and whether the
//! privileged walker came back empty, so a caller can tell the two apart.
//!
//! Concurrent calls are not serialized. Two walks may run against the same
//! host window at once; the host offers no isolation and none is attempted.

use std::sync::Arc;

use axtree::{PluginParameter, TrackInfo};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::backend::{BackendError, BackendKind, TrackBackend};

/// Who answered a call, and what happened before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub backend: BackendKind,
    /// The privileged walker succeeded but found nothing.
    pub privileged_empty: bool,
    /// Why the privileged walker failed, when it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privileged_error: Option<String>,
}

impl Provenance {
    fn privileged() -> Self {
        Self {
            backend: BackendKind::Privileged,
            privileged_empty: false,
            privileged_error: None,
        }
    }

    fn fallback(outcome: &PrivilegedOutcome) -> Self {
        match outcome {
            PrivilegedOutcome::Empty => Self {
                backend: BackendKind::Fallback,
                privileged_empty: true,
                privileged_error: None,
            },
            PrivilegedOutcome::Failed(e) => Self {
                backend: BackendKind::Fallback,
                privileged_empty: false,
                privileged_error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer<T> {
    pub value: T,
    pub provenance: Provenance,
}

#[derive(Debug, Clone)]
enum Operation {
    ListTracks,
    ReadParameters { track: usize, slot: usize },
    WriteParameter {
        track: usize,
        slot: usize,
        name: String,
        value: String,
    },
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::ListTracks => "list_tracks",
            Operation::ReadParameters { .. } => "read_parameters",
            Operation::WriteParameter { .. } => "write_parameter",
        }
    }
}

#[derive(Debug)]
enum Reply {
    Tracks(Vec<TrackInfo>),
    Parameters(Vec<PluginParameter>),
    Confirmation(String),
}

impl Reply {
    fn is_empty(&self) -> bool {
        match self {
            Reply::Tracks(tracks) => tracks.is_empty(),
            Reply::Parameters(params) => params.is_empty(),
            Reply::Confirmation(_) => false,
        }
    }
}

#[derive(Debug)]
enum PrivilegedOutcome {
    Empty,
    Failed(BackendError),
}

enum Step {
    TryPrivileged,
    TryFallback(PrivilegedOutcome),
}

/// Holds both backends; cheap to clone.
#[derive(Clone)]
pub struct Coordinator {
    privileged: Arc<dyn TrackBackend>,
    fallback: Arc<dyn TrackBackend>,
}

impl Coordinator {
    pub fn new(privileged: Arc<dyn TrackBackend>, fallback: Arc<dyn TrackBackend>) -> Self {
        Self {
            privileged,
            fallback,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_tracks(&self) -> Result<Answer<Vec<TrackInfo>>, BackendError> {
        let (reply, provenance) = self.run(Operation::ListTracks).await?;
        match reply {
            Reply::Tracks(tracks) => Ok(Answer {
                value: tracks,
                provenance,
            }),
            other => Err(mismatch(provenance.backend, &other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn read_parameters(
        &self,
        track: usize,
        slot: usize,
    ) -> Result<Answer<Vec<PluginParameter>>, BackendError> {
        let (reply, provenance) = self.run(Operation::ReadParameters { track, slot }).await?;
        match reply {
            Reply::Parameters(params) => Ok(Answer {
                value: params,
                provenance,
            }),
            other => Err(mismatch(provenance.backend, &other)),
        }
    }

    #[instrument(skip(self))]
    pub async fn write_parameter(
        &self,
        track: usize,
        slot: usize,
        name: &str,
        value: &str,
    ) -> Result<Answer<String>, BackendError> {
        let op = Operation::WriteParameter {
            track,
            slot,
            name: name.to_string(),
            value: value.to_string(),
        };
        let (reply, provenance) = self.run(op).await?;
        match reply {
            Reply::Confirmation(line) => Ok(Answer {
                value: line,
                provenance,
            }),
            other => Err(mismatch(provenance.backend, &other)),
        }
    }

    async fn run(&self, op: Operation) -> Result<(Reply, Provenance), BackendError> {
        let mut step = Step::TryPrivileged;
        loop {
            match step {
                Step::TryPrivileged => match invoke(self.privileged.as_ref(), &op).await {
                    Ok(reply) if !reply.is_empty() => return Ok((reply, Provenance::privileged())),
                    Ok(_) => {
                        info!(operation = op.name(), "privileged walker found nothing, trying fallback");
                        step = Step::TryFallback(PrivilegedOutcome::Empty);
                    }
                    Err(e) if !e.allows_fallback() => return Err(e),
                    Err(e) => {
                        warn!(operation = op.name(), error = %e, "privileged walker failed, trying fallback");
                        step = Step::TryFallback(PrivilegedOutcome::Failed(e));
                    }
                },
                Step::TryFallback(outcome) => {
                    return match invoke(self.fallback.as_ref(), &op).await {
                        Ok(reply) => Ok((reply, Provenance::fallback(&outcome))),
                        Err(e) => Err(exhausted(outcome, e)),
                    };
                }
            }
        }
    }
}

async fn invoke(backend: &dyn TrackBackend, op: &Operation) -> Result<Reply, BackendError> {
    match op {
        Operation::ListTracks => backend.list_tracks().await.map(Reply::Tracks),
        Operation::ReadParameters { track, slot } => backend
            .read_parameters(*track, *slot)
            .await
            .map(Reply::Parameters),
        Operation::WriteParameter {
            track,
            slot,
            name,
            value,
        } => backend
            .write_parameter(*track, *slot, name, value)
            .await
            .map(Reply::Confirmation),
    }
}

/// Terminal error after both backends were tried.
///
/// "Not found" and a rejected value are answers about the host, not about
/// the backends, so they pass through unchanged.
fn exhausted(privileged: PrivilegedOutcome, fallback: BackendError) -> BackendError {
    if matches!(fallback, BackendError::NotFound(_) | BackendError::Control(_)) {
        return fallback;
    }
    let privileged_reason = match privileged {
        PrivilegedOutcome::Empty => "the privileged walker returned no results".to_string(),
        PrivilegedOutcome::Failed(e) => e.to_string(),
    };
    BackendError::Exhausted {
        privileged_reason,
        fallback: Box::new(fallback),
    }
}

fn mismatch(backend: BackendKind, reply: &Reply) -> BackendError {
    BackendError::InvalidOutput {
        backend,
        message: format!("unexpected reply {:?}", reply),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A backend with canned answers that counts how often it is asked.
    struct Canned {
        kind: BackendKind,
        tracks: Result<Vec<TrackInfo>, fn() -> BackendError>,
        write: Result<String, fn() -> BackendError>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(kind: BackendKind) -> Self {
            Self {
                kind,
                tracks: Ok(Vec::new()),
                write: Ok(String::new()),
                calls: AtomicUsize::new(0),
            }
        }

        fn tracks(mut self, tracks: Vec<TrackInfo>) -> Self {
            self.tracks = Ok(tracks);
            self
        }

        fn tracks_fail(mut self, err: fn() -> BackendError) -> Self {
            self.tracks = Err(err);
            self
        }

        fn write(mut self, line: &str) -> Self {
            self.write = Ok(line.to_string());
            self
        }

        fn write_fail(mut self, err: fn() -> BackendError) -> Self {
            self.write = Err(err);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TrackBackend for Canned {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        async fn list_tracks(&self) -> Result<Vec<TrackInfo>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tracks.clone().map_err(|make| make())
        }

        async fn read_parameters(&self, _track: usize, _slot: usize) -> Result<Vec<PluginParameter>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn write_parameter(
            &self,
            _track: usize,
            _slot: usize,
            _name: &str,
            _value: &str,
        ) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.write.clone().map_err(|make| make())
        }
    }

    fn track(index: usize, name: &str) -> TrackInfo {
        TrackInfo {
            index,
            track_number: index as i32 + 1,
            name: name.to_string(),
            muted: false,
            solo: false,
            record_enabled: false,
            volume: 0,
            plugins: Vec::new(),
        }
    }

    fn denied() -> BackendError {
        BackendError::PermissionDenied {
            backend: BackendKind::Privileged,
            message: "denied".into(),
        }
    }

    fn spawn_failed() -> BackendError {
        BackendError::Unavailable {
            backend: BackendKind::Fallback,
            message: "osascript is not installed".into(),
        }
    }

    fn rejected() -> BackendError {
        BackendError::Control("Value 'loud' cannot be applied to a AXSlider control".into())
    }

    fn not_found() -> BackendError {
        BackendError::NotFound("Parameter 'Q' not found".into())
    }

    fn pair(privileged: Canned, fallback: Canned) -> (Coordinator, Arc<Canned>, Arc<Canned>) {
        let p = Arc::new(privileged);
        let f = Arc::new(fallback);
        (Coordinator::new(p.clone(), f.clone()), p, f)
    }

    #[tokio::test]
    async fn privileged_answer_wins() {
        let (c, _, f) = pair(
            Canned::new(BackendKind::Privileged).tracks(vec![track(0, "Drums")]),
            Canned::new(BackendKind::Fallback).tracks(vec![track(0, "Other")]),
        );
        let answer = c.list_tracks().await.unwrap();
        assert_eq!(answer.value[0].name, "Drums");
        assert_eq!(answer.provenance, Provenance::privileged());
        assert_eq!(f.calls(), 0);
    }

    #[tokio::test]
    async fn failing_privileged_returns_fallback_unchanged() {
        let fallback_tracks = vec![track(0, "Bass"), track(1, "Keys")];
        let (c, _, f) = pair(
            Canned::new(BackendKind::Privileged).tracks_fail(denied),
            Canned::new(BackendKind::Fallback).tracks(fallback_tracks.clone()),
        );
        let answer = c.list_tracks().await.unwrap();
        assert_eq!(answer.value, fallback_tracks);
        assert_eq!(answer.provenance.backend, BackendKind::Fallback);
        assert!(!answer.provenance.privileged_empty);
        assert!(answer.provenance.privileged_error.unwrap().contains("permission"));
        assert_eq!(f.calls(), 1);
    }

    #[tokio::test]
    async fn empty_privileged_still_falls_back() {
        let (c, p, f) = pair(
            Canned::new(BackendKind::Privileged).tracks(Vec::new()),
            Canned::new(BackendKind::Fallback).tracks(vec![track(0, "Vox")]),
        );
        let answer = c.list_tracks().await.unwrap();
        assert_eq!(answer.value.len(), 1);
        assert!(answer.provenance.privileged_empty);
        assert_eq!((p.calls(), f.calls()), (1, 1));
    }

    #[tokio::test]
    async fn both_empty_is_an_empty_answer() {
        let (c, _, _) = pair(
            Canned::new(BackendKind::Privileged),
            Canned::new(BackendKind::Fallback),
        );
        let answer = c.list_tracks().await.unwrap();
        assert!(answer.value.is_empty());
        assert_eq!(answer.provenance.backend, BackendKind::Fallback);
        assert!(answer.provenance.privileged_empty);
    }

    #[tokio::test]
    async fn both_failing_names_both_prerequisites() {
        let (c, _, _) = pair(
            Canned::new(BackendKind::Privileged).tracks_fail(denied),
            Canned::new(BackendKind::Fallback).tracks_fail(spawn_failed),
        );
        let err = c.list_tracks().await.unwrap_err();
        assert!(matches!(err, BackendError::Exhausted { .. }));
        let message = err.to_string();
        assert!(message.contains("Accessibility"));
        assert!(message.contains("walker_path"));
        assert!(message.contains("osascript is not installed"));
    }

    #[tokio::test]
    async fn rejected_mutation_is_not_retried() {
        let (c, _, f) = pair(
            Canned::new(BackendKind::Privileged).write_fail(rejected),
            Canned::new(BackendKind::Fallback).write("Set Gain = 1"),
        );
        let err = c.write_parameter(0, 0, "Gain", "loud").await.unwrap_err();
        assert!(matches!(err, BackendError::Control(_)));
        assert_eq!(f.calls(), 0);
    }

    #[tokio::test]
    async fn unknown_parameter_falls_back_then_surfaces() {
        let (c, _, f) = pair(
            Canned::new(BackendKind::Privileged).write_fail(not_found),
            Canned::new(BackendKind::Fallback).write_fail(not_found),
        );
        let err = c.write_parameter(0, 0, "Q", "1").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
        assert_eq!(f.calls(), 1);
    }

    #[tokio::test]
    async fn mutation_through_fallback() {
        let (c, _, _) = pair(
            Canned::new(BackendKind::Privileged).write_fail(denied),
            Canned::new(BackendKind::Fallback).write("Set Drive = 3"),
        );
        let answer = c.write_parameter(0, 0, "Drive", "3").await.unwrap();
        assert_eq!(answer.value, "Set Drive = 3");
        assert_eq!(answer.provenance.backend, BackendKind::Fallback);
    }
}
