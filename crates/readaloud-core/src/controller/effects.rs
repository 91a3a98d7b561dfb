use super::{ControllerEvent, PlaybackController, PlaybackState};
use crate::audio::EndSignal;
use crate::chunker::TextUnit;
use crate::presentation::{FailureKind, Notification};
use crate::queue::Generation;
use crate::synthesis::{AudioHandle, SynthesisError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub(super) enum Effect {
    Prefetch {
        generation: Generation,
        index: usize,
        unit: TextUnit,
        cancel: CancellationToken,
    },
    CancelPrefetch(Vec<CancellationToken>),
    Attach {
        generation: Generation,
        index: usize,
        audio: AudioHandle,
    },
    PauseAudio,
    ResumeAudio,
    DetachAudio,
    SetRate(f32),
    SetVolume(f32),
    Highlight(TextUnit),
    Unhighlight(TextUnit),
    StateChanged(PlaybackState),
    Failure {
        kind: FailureKind,
        message: String,
    },
    Notify(Notification),
    ScheduleRetry {
        generation: Generation,
        index: usize,
        delay: Duration,
    },
    AdvancePage {
        generation: Generation,
    },
    DiscardConsumed {
        page_offset: usize,
    },
}

impl PlaybackController {
    pub(super) fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Prefetch {
                generation,
                index,
                unit,
                cancel,
            } => {
                let synthesizer = self.synthesizer.clone();
                let selection = self.selection.clone();
                let events = self.events_tx.clone();
                debug!(index, unit = %unit.id, %generation, "Prefetching unit");
                tokio::spawn(async move {
                    let outcome = synthesizer.synthesize(&unit, &selection, &cancel).await;
                    if cancel.is_cancelled() || matches!(outcome, Err(SynthesisError::Cancelled)) {
                        debug!(index, unit = %unit.id, "Prefetch abandoned after cancellation");
                        return;
                    }
                    let _ = events.send(ControllerEvent::PrefetchResolved {
                        generation,
                        index,
                        outcome,
                    });
                });
            }
            Effect::CancelPrefetch(tokens) => {
                if !tokens.is_empty() {
                    debug!(count = tokens.len(), "Cancelling in-flight prefetches");
                }
                for token in tokens {
                    token.cancel();
                }
            }
            Effect::Attach {
                generation,
                index,
                audio,
            } => {
                let end = EndSignal::new(generation, index, self.events_tx.clone());
                debug!(index, url = %audio, "Attaching audio");
                if let Err(err) = self.output.attach(&audio, end) {
                    warn!(index, url = %audio, "Audio output refused source: {err:#}");
                    let _ = self.events_tx.send(ControllerEvent::PlaybackFailed {
                        generation,
                        index,
                        message: format!("{err:#}"),
                    });
                }
            }
            Effect::PauseAudio => self.output.pause(),
            Effect::ResumeAudio => self.output.play(),
            Effect::DetachAudio => self.output.detach(),
            Effect::SetRate(rate) => self.output.set_rate(rate),
            Effect::SetVolume(volume) => self.output.set_volume(volume),
            Effect::Highlight(unit) => self.presenter.on_chunk_start(&unit),
            Effect::Unhighlight(unit) => self.presenter.on_chunk_end(&unit),
            Effect::StateChanged(state) => {
                info!(%state, "Playback state changed");
                self.presenter.on_state_change(state);
            }
            Effect::Failure { kind, message } => {
                warn!(?kind, "{message}");
                self.presenter.on_failure(kind, &message);
            }
            Effect::Notify(notification) => self.presenter.notify(&notification),
            Effect::ScheduleRetry {
                generation,
                index,
                delay,
            } => {
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = events.send(ControllerEvent::RetryPlayback { generation, index });
                });
            }
            Effect::AdvancePage { generation } => {
                let text = self.source.advance_page();
                info!(
                    page = self.source.page_index() + 1,
                    total = self.source.page_count(),
                    advanced = text.is_some(),
                    "Auto-continuing to next page"
                );
                let _ = self
                    .events_tx
                    .send(ControllerEvent::PageAdvanced { generation, text });
            }
            Effect::DiscardConsumed { page_offset } => {
                match self.source.discard_consumed(page_offset) {
                    Ok(()) => {
                        info!(page_offset, "Discarded consumed text");
                        self.presenter
                            .notify(&Notification::info("Removed the text that was already read."));
                    }
                    Err(err) => {
                        warn!(page_offset, "Failed to discard consumed text: {err:#}");
                        self.presenter.notify(&Notification::error(format!(
                            "Could not remove the text that was already read: {err:#}"
                        )));
                    }
                }
            }
        }
    }
}
