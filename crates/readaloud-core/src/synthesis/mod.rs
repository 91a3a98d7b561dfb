//! Speech synthesis requests for single text units.
//!
//! The service answers either with a ready audio reference or with a pending
//! one that must be polled until the audio is fully available. Polling is a
//! cancellable loop driven by the caller's [`CancellationToken`]; once the
//! token fires the request resolves to [`SynthesisError::Cancelled`] and never
//! to a result.

mod http;

pub use http::HttpTransport;

use crate::chunker::TextUnit;
use crate::engines::{self, Credentials, Voice, VoiceSelection};
use crate::presentation::FailureKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use ts_rs::TS;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Opaque, fetchable reference to playable audio.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AudioHandle(pub String);

impl AudioHandle {
    pub fn url(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AudioHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    pub unit_id: String,
    pub audio: AudioHandle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisRequest {
    pub engine: String,
    pub lang: String,
    pub voice: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SynthesisReply {
    pub status: String,
    pub audio_url: String,
}

impl SynthesisReply {
    /// Anything other than a pending status is played as-is.
    pub fn is_deferred(&self) -> bool {
        matches!(
            self.status.trim().to_ascii_lowercase().as_str(),
            "generating" | "pending"
        )
    }
}

/// Outcome of one availability check against a pending audio reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// Full-success response; the audio is complete.
    Complete,
    /// Any other status, including partial content.
    Incomplete(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("engine `{engine}` requires an API key but none is configured")]
    MissingCredential { engine: String },
    #[error("synthesis request rejected: {detail}")]
    RequestFailed { status: Option<u16>, detail: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("synthesis request cancelled")]
    Cancelled,
}

impl SynthesisError {
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::MissingCredential { .. } => Some(FailureKind::MissingCredential),
            Self::RequestFailed { .. } => Some(FailureKind::RequestFailed),
            Self::Network(_) => Some(FailureKind::NetworkError),
            Self::Cancelled => None,
        }
    }

    /// Whether re-issuing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::RequestFailed { status, .. } => {
                matches!(status, None | Some(408) | Some(429) | Some(500..=599))
            }
            Self::MissingCredential { .. } | Self::Cancelled => false,
        }
    }
}

/// Wire-level access to the synthesis service.
#[async_trait]
pub trait SynthesisTransport: Send + Sync {
    async fn submit(&self, request: &SynthesisRequest) -> Result<SynthesisReply, SynthesisError>;

    async fn probe(&self, audio: &AudioHandle) -> Result<ProbeStatus, SynthesisError>;

    async fn list_voices(
        &self,
        engine: &str,
        api_key: Option<&str>,
    ) -> Result<Vec<Voice>, SynthesisError>;

    /// Turn a reply's audio reference into something fetchable.
    fn resolve(&self, audio_url: &str) -> AudioHandle;
}

/// What the playback controller needs from a synthesizer.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Checks that can fail before any request is sent.
    fn preflight(&self, selection: &VoiceSelection) -> Result<(), SynthesisError>;

    async fn synthesize(
        &self,
        unit: &TextUnit,
        selection: &VoiceSelection,
        cancel: &CancellationToken,
    ) -> Result<SynthesisResult, SynthesisError>;
}

pub struct SynthesisClient {
    transport: Arc<dyn SynthesisTransport>,
    credentials: Credentials,
    poll_interval: Duration,
}

impl SynthesisClient {
    pub fn new(
        transport: Arc<dyn SynthesisTransport>,
        credentials: Credentials,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            credentials,
            poll_interval: poll_interval.max(Duration::from_millis(10)),
        }
    }

    pub async fn list_voices(&self, engine: &str) -> Result<Vec<Voice>, SynthesisError> {
        if engines::requires_credential(engine) && self.credentials.get(engine).is_none() {
            return Err(SynthesisError::MissingCredential {
                engine: engine.to_string(),
            });
        }
        let voices = self
            .transport
            .list_voices(engine, self.credentials.get(engine))
            .await?;
        info!(engine, count = voices.len(), "Fetched voice list");
        Ok(voices)
    }

    async fn wait_until_complete(
        &self,
        audio: &AudioHandle,
        cancel: &CancellationToken,
    ) -> Result<(), SynthesisError> {
        let mut checks = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SynthesisError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
            checks += 1;

            let probe = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(SynthesisError::Cancelled),
                probe = self.transport.probe(audio) => probe,
            };
            match probe {
                Ok(ProbeStatus::Complete) => {
                    debug!(url = %audio, checks, "Pending audio is now complete");
                    return Ok(());
                }
                Ok(ProbeStatus::Incomplete(status)) => {
                    debug!(url = %audio, checks, status, "Audio still pending");
                }
                Err(err) => {
                    warn!(url = %audio, checks, "Polling for audio failed, retrying: {err}");
                }
            }
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for SynthesisClient {
    fn preflight(&self, selection: &VoiceSelection) -> Result<(), SynthesisError> {
        if selection.voice.trim().is_empty() {
            return Err(SynthesisError::RequestFailed {
                status: None,
                detail: "no voice selected".to_string(),
            });
        }
        if engines::requires_credential(&selection.engine)
            && self.credentials.get(&selection.engine).is_none()
        {
            return Err(SynthesisError::MissingCredential {
                engine: selection.engine.clone(),
            });
        }
        Ok(())
    }

    async fn synthesize(
        &self,
        unit: &TextUnit,
        selection: &VoiceSelection,
        cancel: &CancellationToken,
    ) -> Result<SynthesisResult, SynthesisError> {
        self.preflight(selection)?;
        if unit.text.trim().is_empty() {
            return Err(SynthesisError::RequestFailed {
                status: Some(400),
                detail: "Text cannot be empty.".to_string(),
            });
        }
        if cancel.is_cancelled() {
            return Err(SynthesisError::Cancelled);
        }

        let request = SynthesisRequest {
            engine: selection.engine.clone(),
            lang: selection.lang.clone(),
            voice: selection.voice.clone(),
            text: unit.text.clone(),
            api_key: self.credentials.get(&selection.engine).map(str::to_string),
        };
        debug!(
            unit = %unit.id,
            engine = %request.engine,
            voice = %request.voice,
            chars = unit.char_len(),
            "Requesting synthesis"
        );

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SynthesisError::Cancelled),
            reply = self.transport.submit(&request) => reply?,
        };
        let audio = self.transport.resolve(&reply.audio_url);

        if reply.is_deferred() {
            debug!(unit = %unit.id, url = %audio, "Synthesis deferred; polling");
            self.wait_until_complete(&audio, cancel).await?;
        }

        Ok(SynthesisResult {
            unit_id: unit.id.clone(),
            audio,
        })
    }
}
