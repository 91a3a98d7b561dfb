//! Audio output backed by `rodio`.
//!
//! The output stream is not `Send`, so a dedicated thread owns it together
//! with one `Sink` per attached unit. Audio is downloaded on the tokio runtime
//! and handed to that thread as bytes; the thread reports the natural end of
//! a unit by polling `Sink::empty`.

use anyhow::{Context, Result, anyhow};
use readaloud_core::audio::{AudioOutput, EndSignal};
use readaloud_core::synthesis::AudioHandle;
use rodio::{Decoder, OutputStream, Sink};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const END_POLL_INTERVAL: Duration = Duration::from_millis(50);

enum PlayerCommand {
    Load {
        seq: u64,
        bytes: Vec<u8>,
        end: EndSignal,
    },
    Play,
    Pause,
    Clear,
    SetVolume(f32),
    SetSpeed(f32),
}

pub struct RodioPlayer {
    commands: mpsc::Sender<PlayerCommand>,
    http: reqwest::Client,
    runtime: tokio::runtime::Handle,
    seq: Arc<AtomicU64>,
    fetch: Option<CancellationToken>,
}

impl RodioPlayer {
    /// Open the default output device. Must be called from within a tokio
    /// runtime, which is used for downloads.
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let (commands, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let seq = Arc::new(AtomicU64::new(0));
        let thread_seq = seq.clone();

        thread::Builder::new()
            .name("readaloud-audio".to_string())
            .spawn(move || audio_thread(rx, ready_tx, thread_seq))
            .context("failed to spawn audio thread")?;

        ready_rx
            .recv()
            .map_err(|_| anyhow!("audio thread exited during startup"))??;

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build HTTP client for audio")?;

        Ok(Self {
            commands,
            http,
            runtime: tokio::runtime::Handle::try_current()
                .context("audio player needs a tokio runtime")?,
            seq,
            fetch: None,
        })
    }

    fn send(&self, command: PlayerCommand) {
        if self.commands.send(command).is_err() {
            warn!("Audio thread is gone; dropping command");
        }
    }

    fn invalidate(&mut self) -> u64 {
        if let Some(token) = self.fetch.take() {
            token.cancel();
        }
        self.seq.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl AudioOutput for RodioPlayer {
    fn attach(&mut self, audio: &AudioHandle, end: EndSignal) -> Result<()> {
        let seq = self.invalidate();
        self.send(PlayerCommand::Clear);
        self.send(PlayerCommand::Play);

        let token = CancellationToken::new();
        self.fetch = Some(token.clone());
        let http = self.http.clone();
        let commands = self.commands.clone();
        let url = audio.url().to_string();

        self.runtime.spawn(async move {
            let fetched = tokio::select! {
                _ = token.cancelled() => return,
                fetched = fetch_audio(&http, &url) => fetched,
            };
            if token.is_cancelled() {
                return;
            }
            match fetched {
                Ok(bytes) => {
                    debug!(url = %url, bytes = bytes.len(), "Fetched unit audio");
                    let _ = commands.send(PlayerCommand::Load { seq, bytes, end });
                }
                Err(err) => {
                    warn!(url = %url, "Failed to fetch audio: {err:#}");
                    end.failed(format!("{err:#}"));
                }
            }
        });
        Ok(())
    }

    fn play(&mut self) {
        self.send(PlayerCommand::Play);
    }

    fn pause(&mut self) {
        self.send(PlayerCommand::Pause);
    }

    fn detach(&mut self) {
        self.invalidate();
        self.send(PlayerCommand::Clear);
    }

    fn set_rate(&mut self, rate: f32) {
        self.send(PlayerCommand::SetSpeed(rate));
    }

    fn set_volume(&mut self, volume: f32) {
        self.send(PlayerCommand::SetVolume(volume));
    }
}

async fn fetch_audio(http: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = http
        .get(url)
        .send()
        .await
        .with_context(|| format!("requesting {url}"))?
        .error_for_status()
        .with_context(|| format!("fetching {url}"))?;
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("reading body of {url}"))?;
    Ok(bytes.to_vec())
}

struct Attached {
    sink: Sink,
    end: EndSignal,
}

fn audio_thread(
    rx: mpsc::Receiver<PlayerCommand>,
    ready: mpsc::SyncSender<Result<()>>,
    seq: Arc<AtomicU64>,
) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => {
            let _ = ready.send(Ok(()));
            pair
        }
        Err(err) => {
            error!("Opening audio output failed: {err}");
            let _ = ready.send(Err(anyhow!("opening audio output: {err}")));
            return;
        }
    };
    info!("Audio output ready");

    let mut attached: Option<Attached> = None;
    let mut paused = false;
    let mut volume = 1.0f32;
    let mut speed = 1.0f32;

    loop {
        match rx.recv_timeout(END_POLL_INTERVAL) {
            Ok(PlayerCommand::Load {
                seq: load_seq,
                bytes,
                end,
            }) => {
                if load_seq != seq.load(Ordering::Acquire) {
                    debug!(load_seq, "Dropping audio for a detached unit");
                    continue;
                }
                let sink = match Sink::try_new(&handle) {
                    Ok(sink) => sink,
                    Err(err) => {
                        end.failed(format!("creating sink: {err}"));
                        continue;
                    }
                };
                match Decoder::new(Cursor::new(bytes)) {
                    Ok(source) => {
                        sink.set_volume(volume);
                        sink.set_speed(speed);
                        sink.append(source);
                        if paused {
                            sink.pause();
                        } else {
                            sink.play();
                        }
                        debug!(index = end.index(), paused, "Unit attached to sink");
                        attached = Some(Attached { sink, end });
                    }
                    Err(err) => end.failed(format!("decoding audio: {err}")),
                }
            }
            Ok(PlayerCommand::Play) => {
                paused = false;
                if let Some(current) = &attached {
                    current.sink.play();
                }
            }
            Ok(PlayerCommand::Pause) => {
                paused = true;
                if let Some(current) = &attached {
                    current.sink.pause();
                }
            }
            Ok(PlayerCommand::Clear) => {
                if let Some(current) = attached.take() {
                    current.sink.stop();
                }
            }
            Ok(PlayerCommand::SetVolume(value)) => {
                volume = value;
                if let Some(current) = &attached {
                    current.sink.set_volume(value);
                }
            }
            Ok(PlayerCommand::SetSpeed(value)) => {
                speed = value;
                if let Some(current) = &attached {
                    current.sink.set_speed(value);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Audio thread shutting down");
                break;
            }
        }

        let finished = attached
            .as_ref()
            .is_some_and(|current| !paused && current.sink.empty());
        if finished {
            if let Some(current) = attached.take() {
                current.end.finished();
            }
        }
    }
}
