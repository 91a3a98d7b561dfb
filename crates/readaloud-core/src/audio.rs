//! The single audio output owned by the playback controller.

use crate::controller::ControllerEvent;
use crate::queue::Generation;
use crate::synthesis::AudioHandle;
use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;

/// Reports how one attached unit ended.
///
/// Consumed on use so a unit can end at most once.
#[derive(Debug)]
pub struct EndSignal {
    generation: Generation,
    index: usize,
    events: UnboundedSender<ControllerEvent>,
}

impl EndSignal {
    pub(crate) fn new(
        generation: Generation,
        index: usize,
        events: UnboundedSender<ControllerEvent>,
    ) -> Self {
        Self {
            generation,
            index,
            events,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn finished(self) {
        let _ = self.events.send(ControllerEvent::PlaybackFinished {
            generation: self.generation,
            index: self.index,
        });
    }

    pub fn failed(self, message: impl Into<String>) {
        let _ = self.events.send(ControllerEvent::PlaybackFailed {
            generation: self.generation,
            index: self.index,
            message: message.into(),
        });
    }
}

/// Exclusive playback device.
///
/// At most one source is attached; `attach` replaces whatever was attached
/// before, and a detached source never reports through its [`EndSignal`].
pub trait AudioOutput: Send {
    /// Attach `audio` and start playing it.
    fn attach(&mut self, audio: &AudioHandle, end: EndSignal) -> Result<()>;

    fn play(&mut self);

    fn pause(&mut self);

    fn detach(&mut self);

    fn set_rate(&mut self, rate: f32);

    fn set_volume(&mut self, volume: f32);
}
