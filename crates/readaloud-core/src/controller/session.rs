use crate::chunker::TextUnit;
use crate::queue::{Generation, PlaybackQueue};
use crate::synthesis::SynthesisError;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Everything that belongs to one playback attempt over one page.
///
/// Replaced wholesale on start, stop and page change; the queue generation
/// identifies the attempt in every asynchronous event.
#[derive(Debug, Default)]
pub(super) struct PlaybackSession {
    pub units: Vec<TextUnit>,
    pub queue: PlaybackQueue,
    pub current: usize,
    pub in_flight: BTreeMap<usize, CancellationToken>,
    pub attempts: BTreeMap<usize, u32>,
    pub failed: BTreeMap<usize, SynthesisError>,
    pub attached: Option<usize>,
    pub highlighted: Option<usize>,
    pub play_retries: u32,
    pub finished_while_paused: bool,
}

impl PlaybackSession {
    pub fn generation(&self) -> Generation {
        self.queue.generation()
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.queue.generation()
    }

    pub fn current_unit(&self) -> Option<&TextUnit> {
        self.units.get(self.current)
    }

    pub fn is_past_end(&self) -> bool {
        self.current >= self.units.len()
    }

    /// Drop all per-attempt state and start a new generation.
    ///
    /// Returns the tokens of requests that were still running so the caller
    /// can cancel them.
    pub fn reset(&mut self) -> Vec<CancellationToken> {
        let in_flight = std::mem::take(&mut self.in_flight);
        self.units.clear();
        self.queue.reset();
        self.current = 0;
        self.attempts.clear();
        self.failed.clear();
        self.attached = None;
        self.highlighted = None;
        self.play_retries = 0;
        self.finished_while_paused = false;
        in_flight.into_values().collect()
    }

    pub fn load(&mut self, units: Vec<TextUnit>) -> Vec<CancellationToken> {
        let stale = self.reset();
        self.units = units;
        stale
    }

    /// Move the cursor one unit forward and forget everything behind it.
    pub fn advance(&mut self) -> Vec<CancellationToken> {
        self.current += 1;
        self.play_retries = 0;
        self.finished_while_paused = false;
        self.queue.evict_before(self.current);
        let keep = self.in_flight.split_off(&self.current);
        let behind = std::mem::replace(&mut self.in_flight, keep);
        self.attempts = self.attempts.split_off(&self.current);
        self.failed = self.failed.split_off(&self.current);
        behind.into_values().collect()
    }

    /// Indices inside the look-ahead window that still need a request.
    pub fn missing_in_window(&self, window_size: usize) -> Vec<usize> {
        let end = self
            .current
            .saturating_add(window_size.max(1))
            .min(self.units.len());
        (self.current..end)
            .filter(|idx| {
                !self.queue.contains(*idx)
                    && !self.in_flight.contains_key(idx)
                    && !self.failed.contains_key(idx)
            })
            .collect()
    }
}
