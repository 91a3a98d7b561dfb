//! Fakes shared by the unit tests.

use crate::audio::{AudioOutput, EndSignal};
use crate::chunker::TextUnit;
use crate::engines::{self, Voice, VoiceSelection};
use crate::synthesis::{
    AudioHandle, ProbeStatus, SpeechSynthesizer, SynthesisError, SynthesisReply,
    SynthesisRequest, SynthesisResult, SynthesisTransport,
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Transport answering from pre-loaded queues. Empty queues answer "ready"
/// and "complete".
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<SynthesisReply, SynthesisError>>>,
    probes: Mutex<VecDeque<Result<ProbeStatus, SynthesisError>>>,
    requests: Mutex<Vec<SynthesisRequest>>,
    pub submit_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
    pub voice_calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(status: &str, audio_url: &str) -> SynthesisReply {
        SynthesisReply {
            status: status.to_string(),
            audio_url: audio_url.to_string(),
        }
    }

    pub fn push_reply(&self, reply: Result<SynthesisReply, SynthesisError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn push_probe(&self, probe: Result<ProbeStatus, SynthesisError>) {
        self.probes.lock().unwrap().push_back(probe);
    }

    pub fn last_request(&self) -> Option<SynthesisRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn total_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
            + self.probe_calls.load(Ordering::SeqCst)
            + self.voice_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisTransport for ScriptedTransport {
    async fn submit(&self, request: &SynthesisRequest) -> Result<SynthesisReply, SynthesisError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Self::reply("ready", "/static/audio_cache/default.wav")))
    }

    async fn probe(&self, _audio: &AudioHandle) -> Result<ProbeStatus, SynthesisError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.probes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(ProbeStatus::Complete))
    }

    async fn list_voices(
        &self,
        engine: &str,
        _api_key: Option<&str>,
    ) -> Result<Vec<Voice>, SynthesisError> {
        self.voice_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Voice {
            id: format!("{engine}-default"),
            name: "Default".to_string(),
        }])
    }

    fn resolve(&self, audio_url: &str) -> AudioHandle {
        AudioHandle(audio_url.to_string())
    }
}

/// Synthesizer with per-unit latency and scripted failures.
#[derive(Default)]
pub struct FakeSynth {
    delays: Mutex<BTreeMap<String, Duration>>,
    failures: Mutex<BTreeMap<String, VecDeque<SynthesisError>>>,
    default_delay: Mutex<Duration>,
    ignore_cancel: bool,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl FakeSynth {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay: Mutex::new(default_delay),
            ..Self::default()
        }
    }

    /// Keep running after cancellation, like a reply already on the wire.
    pub fn ignoring_cancel(default_delay: Duration) -> Self {
        Self {
            ignore_cancel: true,
            ..Self::new(default_delay)
        }
    }

    pub fn delay(&self, unit_id: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(unit_id.to_string(), delay);
    }

    pub fn fail(&self, unit_id: &str, err: SynthesisError) {
        self.failures
            .lock()
            .unwrap()
            .entry(unit_id.to_string())
            .or_default()
            .push_back(err);
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn audio_for(unit_id: &str) -> AudioHandle {
        AudioHandle(format!("/static/audio_cache/{unit_id}.wav"))
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynth {
    fn preflight(&self, selection: &VoiceSelection) -> Result<(), SynthesisError> {
        if engines::requires_credential(&selection.engine) {
            return Err(SynthesisError::MissingCredential {
                engine: selection.engine.clone(),
            });
        }
        Ok(())
    }

    async fn synthesize(
        &self,
        unit: &TextUnit,
        _selection: &VoiceSelection,
        cancel: &CancellationToken,
    ) -> Result<SynthesisResult, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(unit.id.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .lock()
            .unwrap()
            .get(&unit.id)
            .copied()
            .unwrap_or(*self.default_delay.lock().unwrap());

        let cancelled = if self.ignore_cancel {
            tokio::time::sleep(delay).await;
            false
        } else {
            tokio::select! {
                _ = cancel.cancelled() => true,
                _ = tokio::time::sleep(delay) => false,
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if cancelled {
            return Err(SynthesisError::Cancelled);
        }
        if let Some(err) = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&unit.id)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        Ok(SynthesisResult {
            unit_id: unit.id.clone(),
            audio: Self::audio_for(&unit.id),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputCall {
    Attach(String),
    Play,
    Pause,
    Detach,
    SetRate(f32),
    SetVolume(f32),
}

#[derive(Default)]
pub struct OutputLog {
    pub calls: Vec<OutputCall>,
    pub attached: Option<EndSignal>,
    pub fail_attaches: usize,
}

/// Audio output that records calls; tests end units by hand.
#[derive(Clone, Default)]
pub struct RecordingOutput {
    log: Arc<Mutex<OutputLog>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<OutputCall> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn attached_urls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                OutputCall::Attach(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn attached_index(&self) -> Option<usize> {
        self.log.lock().unwrap().attached.as_ref().map(EndSignal::index)
    }

    /// Make the next `count` attaches report a playback failure.
    pub fn fail_next_attaches(&self, count: usize) {
        self.log.lock().unwrap().fail_attaches = count;
    }

    /// Take the end signal of the attached unit without ending it.
    pub fn take_signal(&self) -> Option<EndSignal> {
        self.log.lock().unwrap().attached.take()
    }

    /// Let the attached unit play to its natural end.
    pub fn finish_current(&self) -> bool {
        match self.take_signal() {
            Some(signal) => {
                signal.finished();
                true
            }
            None => false,
        }
    }
}

impl AudioOutput for RecordingOutput {
    fn attach(&mut self, audio: &AudioHandle, end: EndSignal) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(OutputCall::Attach(audio.url().to_string()));
        if log.fail_attaches > 0 {
            log.fail_attaches -= 1;
            drop(log);
            end.failed("playback was blocked");
            return Ok(());
        }
        log.attached = Some(end);
        Ok(())
    }

    fn play(&mut self) {
        self.log.lock().unwrap().calls.push(OutputCall::Play);
    }

    fn pause(&mut self) {
        self.log.lock().unwrap().calls.push(OutputCall::Pause);
    }

    fn detach(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.calls.push(OutputCall::Detach);
        log.attached = None;
    }

    fn set_rate(&mut self, rate: f32) {
        self.log.lock().unwrap().calls.push(OutputCall::SetRate(rate));
    }

    fn set_volume(&mut self, volume: f32) {
        self.log.lock().unwrap().calls.push(OutputCall::SetVolume(volume));
    }
}
