//! Callbacks from the playback controller to whatever renders it.

use crate::chunker::TextUnit;
use crate::controller::PlaybackState;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// User-visible failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum FailureKind {
    MissingCredential,
    RequestFailed,
    NetworkError,
    PlaybackFailed,
}

impl FailureKind {
    pub fn severity(self) -> Severity {
        match self {
            FailureKind::MissingCredential => Severity::Warning,
            FailureKind::RequestFailed | FailureKind::NetworkError => Severity::Error,
            FailureKind::PlaybackFailed => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }
}

/// Rendering side of the controller. Implementations must not block.
pub trait PresentationAdapter: Send {
    fn on_chunk_start(&mut self, unit: &TextUnit);

    fn on_chunk_end(&mut self, unit: &TextUnit);

    fn on_state_change(&mut self, state: PlaybackState);

    fn on_failure(&mut self, kind: FailureKind, message: &str);

    fn notify(&mut self, _notification: &Notification) {}
}

/// Every adapter callback as data, for front-ends living outside the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "event", rename_all = "snake_case")]
#[ts(export)]
pub enum PresentationEvent {
    ChunkStart { unit: TextUnit },
    ChunkEnd { unit: TextUnit },
    StateChange { state: PlaybackState },
    Failure { kind: FailureKind, message: String },
    Notify { notification: Notification },
}

/// Forwards adapter callbacks as [`PresentationEvent`]s.
pub struct ChannelPresenter {
    tx: mpsc::UnboundedSender<PresentationEvent>,
}

impl ChannelPresenter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PresentationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: PresentationEvent) {
        // A closed receiver just means nobody is watching anymore.
        let _ = self.tx.send(event);
    }
}

impl PresentationAdapter for ChannelPresenter {
    fn on_chunk_start(&mut self, unit: &TextUnit) {
        self.send(PresentationEvent::ChunkStart { unit: unit.clone() });
    }

    fn on_chunk_end(&mut self, unit: &TextUnit) {
        self.send(PresentationEvent::ChunkEnd { unit: unit.clone() });
    }

    fn on_state_change(&mut self, state: PlaybackState) {
        self.send(PresentationEvent::StateChange { state });
    }

    fn on_failure(&mut self, kind: FailureKind, message: &str) {
        self.send(PresentationEvent::Failure {
            kind,
            message: message.to_string(),
        });
    }

    fn notify(&mut self, notification: &Notification) {
        self.send(PresentationEvent::Notify {
            notification: notification.clone(),
        });
    }
}
