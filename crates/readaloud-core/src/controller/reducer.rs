use super::effects::Effect;
use super::{Command, ControllerEvent, PlaybackController, PlaybackState, clamp_rate, clamp_volume};
use crate::chunker::{TextUnit, chunk};
use crate::presentation::{FailureKind, Notification};
use crate::queue::Generation;
use crate::synthesis::{SynthesisError, SynthesisResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

impl PlaybackController {
    pub(super) fn reduce(&mut self, event: ControllerEvent) -> Vec<Effect> {
        let mut effects = Vec::new();

        match event {
            ControllerEvent::Command(command) => self.handle_command(command, &mut effects),
            ControllerEvent::PrefetchResolved {
                generation,
                index,
                outcome,
            } => self.handle_prefetch_resolved(generation, index, outcome, &mut effects),
            ControllerEvent::PlaybackFinished { generation, index } => {
                self.handle_playback_finished(generation, index, &mut effects)
            }
            ControllerEvent::PlaybackFailed {
                generation,
                index,
                message,
            } => self.handle_playback_failed(generation, index, message, &mut effects),
            ControllerEvent::RetryPlayback { generation, index } => {
                self.handle_retry_playback(generation, index, &mut effects)
            }
            ControllerEvent::PageAdvanced { generation, text } => {
                self.handle_page_advanced(generation, text, &mut effects)
            }
        }

        effects
    }

    fn handle_command(&mut self, command: Command, effects: &mut Vec<Effect>) {
        debug!(?command, state = %self.state, "Handling command");
        match command {
            Command::Start => self.handle_start(effects),
            Command::TogglePlayPause => match self.state {
                PlaybackState::Idle => self.handle_start(effects),
                PlaybackState::Playing => self.handle_pause(effects),
                PlaybackState::Paused => self.handle_resume(effects),
                PlaybackState::Buffering => {
                    debug!("Ignoring play/pause while buffering");
                }
            },
            Command::Pause => self.handle_pause(effects),
            Command::Resume => self.handle_resume(effects),
            Command::Stop => self.stop(true, effects),
            Command::Skip => self.handle_skip(effects),
            Command::SourceChanged => {
                info!("Source text changed; abandoning current session");
                self.stop(false, effects);
            }
            Command::SetAutoContinue(enabled) => {
                info!(enabled, "Auto-continue toggled");
                self.settings.auto_continue = enabled;
            }
            Command::SetAutoDelete(enabled) => {
                info!(enabled, "Auto-delete of consumed text toggled");
                self.settings.auto_delete_consumed = enabled;
            }
            Command::SetRate(rate) => {
                let rate = clamp_rate(rate);
                self.settings.playback_rate = rate;
                effects.push(Effect::SetRate(rate));
            }
            Command::SetVolume(volume) => {
                let volume = clamp_volume(volume);
                self.settings.volume = volume;
                effects.push(Effect::SetVolume(volume));
            }
            Command::Shutdown => {
                self.stop(false, effects);
                self.shutdown = true;
            }
        }
    }

    fn handle_start(&mut self, effects: &mut Vec<Effect>) {
        if self.state != PlaybackState::Idle {
            debug!(state = %self.state, "Start ignored; session already active");
            return;
        }
        if let Err(err) = self.synthesizer.preflight(&self.selection) {
            self.surface_failure(&err, effects);
            return;
        }

        let units = chunk(self.source.current_text(), self.settings.max_unit_words);
        if units.is_empty() {
            effects.push(Effect::Notify(Notification::info(
                "There is no text on this page to read.",
            )));
            return;
        }

        self.begin_page(units, effects);
    }

    fn begin_page(&mut self, units: Vec<TextUnit>, effects: &mut Vec<Effect>) {
        info!(
            page = self.source.page_index() + 1,
            units = units.len(),
            window_size = self.settings.window_size,
            "Starting playback session"
        );
        let stale = self.session.load(units);
        effects.push(Effect::CancelPrefetch(stale));
        self.set_state(PlaybackState::Buffering, effects);
        self.fill_window(effects);
    }

    fn handle_pause(&mut self, effects: &mut Vec<Effect>) {
        if self.state != PlaybackState::Playing {
            return;
        }
        effects.push(Effect::PauseAudio);
        self.set_state(PlaybackState::Paused, effects);
    }

    fn handle_resume(&mut self, effects: &mut Vec<Effect>) {
        if self.state != PlaybackState::Paused {
            return;
        }
        self.set_state(PlaybackState::Playing, effects);
        if self.session.finished_while_paused {
            self.complete_current(effects);
        } else {
            effects.push(Effect::ResumeAudio);
        }
    }

    fn handle_skip(&mut self, effects: &mut Vec<Effect>) {
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            return;
        }
        info!(index = self.session.current, "Skipping unit");
        self.set_state(PlaybackState::Playing, effects);
        self.complete_current(effects);
    }

    fn handle_prefetch_resolved(
        &mut self,
        generation: Generation,
        index: usize,
        outcome: Result<SynthesisResult, SynthesisError>,
        effects: &mut Vec<Effect>,
    ) {
        if !self.session.is_current(generation) {
            trace!(index, %generation, "Discarding result from an abandoned session");
            return;
        }
        self.session.in_flight.remove(&index);
        if index < self.session.current {
            trace!(index, current = self.session.current, "Discarding result behind the cursor");
            return;
        }

        match outcome {
            Ok(result) => {
                debug!(index, unit = %result.unit_id, url = %result.audio, "Unit buffered");
                self.session.queue.set(generation, index, result.audio);
                if index == self.session.current && self.state == PlaybackState::Buffering {
                    self.play_current(effects);
                }
            }
            Err(SynthesisError::Cancelled) => {}
            Err(err) => {
                let attempts = self.session.attempts.get(&index).copied().unwrap_or(0);
                if err.is_retryable() && attempts < self.settings.max_prefetch_attempts {
                    warn!(
                        index,
                        attempts,
                        max = self.settings.max_prefetch_attempts,
                        "Prefetch failed, retrying: {err}"
                    );
                    self.request_prefetch(index, effects);
                    return;
                }
                warn!(index, attempts, "Giving up on unit: {err}");
                self.session.failed.insert(index, err);
                if index == self.session.current && self.state == PlaybackState::Buffering {
                    self.fail_current(effects);
                }
            }
        }
    }

    fn handle_playback_finished(
        &mut self,
        generation: Generation,
        index: usize,
        effects: &mut Vec<Effect>,
    ) {
        if !self.session.is_current(generation) || self.session.attached != Some(index) {
            trace!(index, %generation, "Ignoring end of a detached unit");
            return;
        }
        if self.state == PlaybackState::Paused {
            debug!(index, "Unit ended while paused; advancing on resume");
            self.session.finished_while_paused = true;
            return;
        }
        self.complete_current(effects);
    }

    fn handle_playback_failed(
        &mut self,
        generation: Generation,
        index: usize,
        message: String,
        effects: &mut Vec<Effect>,
    ) {
        if !self.session.is_current(generation) || self.session.attached != Some(index) {
            return;
        }
        effects.push(Effect::DetachAudio);
        self.session.attached = None;

        if self.session.play_retries < self.settings.max_play_retries {
            self.session.play_retries += 1;
            warn!(
                index,
                retry = self.session.play_retries,
                delay_ms = self.settings.play_retry_delay.as_millis() as u64,
                "Audio playback failed, retrying: {message}"
            );
            effects.push(Effect::ScheduleRetry {
                generation,
                index,
                delay: self.settings.play_retry_delay,
            });
            return;
        }

        effects.push(Effect::Failure {
            kind: FailureKind::PlaybackFailed,
            message: format!("Failed to play audio for chunk {index}. Skipping."),
        });
        if self.state == PlaybackState::Paused {
            self.set_state(PlaybackState::Playing, effects);
        }
        self.complete_current(effects);
    }

    fn handle_retry_playback(
        &mut self,
        generation: Generation,
        index: usize,
        effects: &mut Vec<Effect>,
    ) {
        if !self.session.is_current(generation)
            || index != self.session.current
            || self.session.attached.is_some()
        {
            return;
        }
        let Some(audio) = self.session.queue.get(index).cloned() else {
            return;
        };
        debug!(index, retry = self.session.play_retries, "Retrying audio playback");
        self.session.attached = Some(index);
        effects.push(Effect::Attach {
            generation,
            index,
            audio,
        });
        if self.state == PlaybackState::Paused {
            effects.push(Effect::PauseAudio);
        }
    }

    fn handle_page_advanced(
        &mut self,
        generation: Generation,
        text: Option<String>,
        effects: &mut Vec<Effect>,
    ) {
        if !self.session.is_current(generation) || self.state != PlaybackState::Buffering {
            return;
        }
        let Some(text) = text else {
            self.set_state(PlaybackState::Idle, effects);
            return;
        };
        let units = chunk(&text, self.settings.max_unit_words);
        if !units.is_empty() {
            self.begin_page(units, effects);
        } else if self.source.has_next_page() {
            debug!(page = self.source.page_index() + 1, "Page has no text; moving on");
            effects.push(Effect::AdvancePage { generation });
        } else {
            self.set_state(PlaybackState::Idle, effects);
        }
    }

    /// Issue requests for every slot of the window that is still empty.
    fn fill_window(&mut self, effects: &mut Vec<Effect>) {
        for index in self.session.missing_in_window(self.settings.window_size) {
            self.request_prefetch(index, effects);
        }
    }

    fn request_prefetch(&mut self, index: usize, effects: &mut Vec<Effect>) {
        let Some(unit) = self.session.units.get(index).cloned() else {
            return;
        };
        let cancel = CancellationToken::new();
        *self.session.attempts.entry(index).or_insert(0) += 1;
        self.session.in_flight.insert(index, cancel.clone());
        effects.push(Effect::Prefetch {
            generation: self.session.generation(),
            index,
            unit,
            cancel,
        });
    }

    fn play_current(&mut self, effects: &mut Vec<Effect>) {
        if self.session.failed.contains_key(&self.session.current) {
            self.fail_current(effects);
            return;
        }
        let index = self.session.current;
        let (Some(unit), Some(audio)) = (
            self.session.current_unit().cloned(),
            self.session.queue.get(index).cloned(),
        ) else {
            self.set_state(PlaybackState::Buffering, effects);
            return;
        };

        self.session.highlighted = Some(index);
        self.session.attached = Some(index);
        effects.push(Effect::Highlight(unit));
        effects.push(Effect::Attach {
            generation: self.session.generation(),
            index,
            audio,
        });
        self.set_state(PlaybackState::Playing, effects);
    }

    /// The current unit is done, one way or another; move on.
    fn complete_current(&mut self, effects: &mut Vec<Effect>) {
        if self.session.attached.take().is_some() {
            effects.push(Effect::DetachAudio);
        }
        self.clear_highlight(effects);

        let behind = self.session.advance();
        effects.push(Effect::CancelPrefetch(behind));

        if self.session.is_past_end() {
            self.finish_page(effects);
            return;
        }
        self.fill_window(effects);
        if self.session.failed.contains_key(&self.session.current) {
            self.fail_current(effects);
        } else if self.session.queue.contains(self.session.current) {
            self.play_current(effects);
        } else {
            debug!(index = self.session.current, "Next unit not ready; buffering");
            self.set_state(PlaybackState::Buffering, effects);
        }
    }

    fn finish_page(&mut self, effects: &mut Vec<Effect>) {
        if self.settings.auto_continue && self.source.has_next_page() {
            let stale = self.session.reset();
            effects.push(Effect::CancelPrefetch(stale));
            self.set_state(PlaybackState::Buffering, effects);
            effects.push(Effect::AdvancePage {
                generation: self.session.generation(),
            });
            return;
        }
        info!(
            page = self.source.page_index() + 1,
            units = self.session.units.len(),
            "Reached end of page"
        );
        self.set_state(PlaybackState::Idle, effects);
    }

    fn fail_current(&mut self, effects: &mut Vec<Effect>) {
        let Some(err) = self.session.failed.get(&self.session.current).cloned() else {
            return;
        };
        self.surface_failure(&err, effects);
        self.stop(false, effects);
    }

    fn surface_failure(&mut self, err: &SynthesisError, effects: &mut Vec<Effect>) {
        if let Some(kind) = err.failure_kind() {
            effects.push(Effect::Failure {
                kind,
                message: err.to_string(),
            });
        }
    }

    /// Tear the session down. Safe to call in any state.
    fn stop(&mut self, allow_discard: bool, effects: &mut Vec<Effect>) {
        let discard_at = if allow_discard {
            self.consumed_offset()
        } else {
            None
        };

        if self.session.attached.take().is_some() {
            effects.push(Effect::DetachAudio);
        }
        self.clear_highlight(effects);
        let stale = self.session.reset();
        effects.push(Effect::CancelPrefetch(stale));
        self.set_state(PlaybackState::Idle, effects);

        if let Some(page_offset) = discard_at {
            effects.push(Effect::DiscardConsumed { page_offset });
        }
    }

    /// Page offset up to which text has been fully played, when the
    /// consumed-text policy applies.
    fn consumed_offset(&self) -> Option<usize> {
        if !self.settings.auto_delete_consumed
            || !self.source.supports_discard()
            || self.session.current == 0
            || self.session.units.is_empty()
        {
            return None;
        }
        Some(match self.session.current_unit() {
            Some(unit) => unit.start_offset,
            None => self.source.current_text().chars().count(),
        })
    }

    fn clear_highlight(&mut self, effects: &mut Vec<Effect>) {
        if let Some(index) = self.session.highlighted.take() {
            if let Some(unit) = self.session.units.get(index).cloned() {
                effects.push(Effect::Unhighlight(unit));
            }
        }
    }

    fn set_state(&mut self, state: PlaybackState, effects: &mut Vec<Effect>) {
        if self.state == state {
            return;
        }
        self.state = state;
        effects.push(Effect::StateChanged(state));
    }
}
