//! Sparse, index-addressed buffer of synthesized audio.
//!
//! Results arrive out of order, so slots are keyed by unit index rather than
//! appended. Every reset starts a new [`Generation`]; writes tagged with an
//! older generation are dropped so that late results from an abandoned
//! session never surface in the next one.

use crate::synthesis::AudioHandle;
use std::collections::BTreeMap;
use tracing::trace;

/// Session tag carried by every prefetch and playback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        // Zero is never handed out.
        match self.0.wrapping_add(1) {
            0 => Generation(1),
            next => Generation(next),
        }
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub struct PlaybackQueue {
    generation: Generation,
    slots: BTreeMap<usize, AudioHandle>,
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self {
            generation: Generation(1),
            slots: BTreeMap::new(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Store `audio` at `index` if `generation` is still current.
    ///
    /// Returns whether the write was accepted.
    pub fn set(&mut self, generation: Generation, index: usize, audio: AudioHandle) -> bool {
        if generation != self.generation {
            trace!(
                index,
                stale = generation.value(),
                current = self.generation.value(),
                "Dropping audio from a previous session"
            );
            return false;
        }
        self.slots.insert(index, audio);
        true
    }

    pub fn get(&self, index: usize) -> Option<&AudioHandle> {
        self.slots.get(&index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.slots.contains_key(&index)
    }

    /// Clear every slot and start a new generation.
    pub fn reset(&mut self) -> Generation {
        self.slots.clear();
        self.generation = self.generation.next();
        self.generation
    }

    /// Forget slots that playback has already moved past.
    pub fn evict_before(&mut self, index: usize) {
        self.slots = self.slots.split_off(&index);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
