//! Playback state machine.
//!
//! The controller is an actor: commands from the UI, prefetch completions and
//! audio end notifications all arrive on one channel and are handled one at a
//! time by [`PlaybackController::run`]. Handling an event is split in two
//! steps, `reduce` mutates the session and returns [`Effect`]s, and
//! `run_effect` performs them (spawning requests, driving the audio output,
//! calling the presentation adapter).

mod effects;
mod reducer;
mod session;
#[cfg(test)]
mod tests;

use crate::audio::AudioOutput;
use crate::chunker::DEFAULT_MAX_UNIT_WORDS;
use crate::document::PageSource;
use crate::engines::VoiceSelection;
use crate::presentation::PresentationAdapter;
use crate::queue::Generation;
use crate::synthesis::{SpeechSynthesizer, SynthesisError, SynthesisResult};
use anyhow::{Result, anyhow};
use effects::Effect;
use serde::{Deserialize, Serialize};
use session::PlaybackSession;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PlaybackState {
    Idle,
    Buffering,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
        };
        f.write_str(label)
    }
}

/// User intents accepted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    /// Start when idle, otherwise flip between playing and paused.
    TogglePlayPause,
    Pause,
    Resume,
    Stop,
    /// End the current unit early and move to the next one.
    Skip,
    /// The visible text changed underneath the controller.
    SourceChanged,
    SetAutoContinue(bool),
    SetAutoDelete(bool),
    SetRate(f32),
    SetVolume(f32),
    Shutdown,
}

#[derive(Debug)]
pub enum ControllerEvent {
    Command(Command),
    PrefetchResolved {
        generation: Generation,
        index: usize,
        outcome: Result<SynthesisResult, SynthesisError>,
    },
    PlaybackFinished {
        generation: Generation,
        index: usize,
    },
    PlaybackFailed {
        generation: Generation,
        index: usize,
        message: String,
    },
    RetryPlayback {
        generation: Generation,
        index: usize,
    },
    PageAdvanced {
        generation: Generation,
        text: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    pub window_size: usize,
    pub max_unit_words: usize,
    pub auto_continue: bool,
    pub auto_delete_consumed: bool,
    pub max_prefetch_attempts: u32,
    pub max_play_retries: u32,
    pub play_retry_delay: Duration,
    pub playback_rate: f32,
    pub volume: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            window_size: 3,
            max_unit_words: DEFAULT_MAX_UNIT_WORDS,
            auto_continue: false,
            auto_delete_consumed: false,
            max_prefetch_attempts: 3,
            max_play_retries: 3,
            play_retry_delay: Duration::from_secs(2),
            playback_rate: 1.0,
            volume: 1.0,
        }
    }
}

pub const MIN_PLAYBACK_RATE: f32 = 0.25;
pub const MAX_PLAYBACK_RATE: f32 = 4.0;
pub const MAX_VOLUME: f32 = 2.0;

pub fn clamp_rate(rate: f32) -> f32 {
    if rate.is_finite() {
        rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
    } else {
        1.0
    }
}

pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, MAX_VOLUME)
    } else {
        1.0
    }
}

/// Observable progress, published after every handled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    #[ts(type = "number")]
    pub current_index: usize,
    #[ts(type = "number")]
    pub unit_count: usize,
    #[ts(type = "number")]
    pub page: usize,
}

/// Cloneable sender side of a running controller.
#[derive(Clone)]
pub struct ControllerHandle {
    events: mpsc::UnboundedSender<ControllerEvent>,
    snapshot: watch::Receiver<PlaybackSnapshot>,
}

impl ControllerHandle {
    pub fn send(&self, command: Command) -> Result<()> {
        self.events
            .send(ControllerEvent::Command(command))
            .map_err(|_| anyhow!("playback controller has shut down"))
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        *self.snapshot.borrow()
    }
}

pub struct PlaybackController {
    settings: PlaybackSettings,
    selection: VoiceSelection,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    output: Box<dyn AudioOutput>,
    presenter: Box<dyn PresentationAdapter>,
    source: Box<dyn PageSource>,
    session: PlaybackSession,
    state: PlaybackState,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    shutdown: bool,
}

impl PlaybackController {
    pub fn new(
        settings: PlaybackSettings,
        selection: VoiceSelection,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        mut output: Box<dyn AudioOutput>,
        presenter: Box<dyn PresentationAdapter>,
        source: Box<dyn PageSource>,
    ) -> (Self, ControllerHandle) {
        let settings = PlaybackSettings {
            window_size: settings.window_size.max(1),
            max_unit_words: settings.max_unit_words.max(1),
            playback_rate: clamp_rate(settings.playback_rate),
            volume: clamp_volume(settings.volume),
            ..settings
        };
        output.set_rate(settings.playback_rate);
        output.set_volume(settings.volume);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let initial = PlaybackSnapshot {
            state: PlaybackState::Idle,
            current_index: 0,
            unit_count: 0,
            page: source.page_index(),
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);
        let handle = ControllerHandle {
            events: events_tx.clone(),
            snapshot: snapshot_rx,
        };

        let controller = Self {
            settings,
            selection,
            synthesizer,
            output,
            presenter,
            source,
            session: PlaybackSession::default(),
            state: PlaybackState::Idle,
            events_tx,
            events_rx,
            snapshot_tx,
            shutdown: false,
        };
        (controller, handle)
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            current_index: self.session.current,
            unit_count: self.session.units.len(),
            page: self.source.page_index(),
        }
    }

    /// Handle events until a [`Command::Shutdown`] arrives.
    pub async fn run(mut self) {
        info!(
            engine = %self.selection.engine,
            voice = %self.selection.voice,
            window_size = self.settings.window_size,
            "Playback controller running"
        );
        while let Some(event) = self.events_rx.recv().await {
            self.dispatch(event);
            if self.shutdown {
                break;
            }
        }
        info!("Playback controller stopped");
    }

    fn dispatch(&mut self, event: ControllerEvent) {
        for effect in self.reduce(event) {
            self.run_effect(effect);
        }
        let snapshot = self.snapshot();
        self.snapshot_tx.send_if_modified(|published| {
            if *published == snapshot {
                false
            } else {
                debug!(?snapshot, "Publishing playback snapshot");
                *published = snapshot;
                true
            }
        });
    }
}
