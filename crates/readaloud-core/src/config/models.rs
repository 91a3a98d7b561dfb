use super::defaults;
use crate::controller::{PlaybackSettings, clamp_rate, clamp_volume};
use crate::engines::{Credentials, VoiceSelection};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Flattened view of every setting; see `tables` for the on-disk layout.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub base_url: String,
    pub engine: String,
    pub voice: String,
    pub lang: String,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub window_size: usize,
    pub max_unit_words: usize,
    pub auto_continue: bool,
    pub auto_delete_consumed: bool,
    pub max_prefetch_attempts: u32,
    pub max_play_retries: u32,
    pub play_retry_delay_ms: u64,
    pub playback_rate: f32,
    pub volume: f32,
    pub chars_per_page: usize,
    pub cache_dir: String,
    pub log_level: LogLevel,
    pub key_toggle_play_pause: String,
    pub key_stop: String,
    pub key_skip: String,
    pub key_safe_quit: String,
    pub credentials: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            base_url: defaults::default_base_url(),
            engine: defaults::default_engine(),
            voice: String::new(),
            lang: defaults::default_lang(),
            poll_interval_ms: defaults::default_poll_interval_ms(),
            request_timeout_secs: defaults::default_request_timeout_secs(),
            window_size: defaults::default_window_size(),
            max_unit_words: defaults::default_max_unit_words(),
            auto_continue: false,
            auto_delete_consumed: false,
            max_prefetch_attempts: defaults::default_max_prefetch_attempts(),
            max_play_retries: defaults::default_max_play_retries(),
            play_retry_delay_ms: defaults::default_play_retry_delay_ms(),
            playback_rate: defaults::default_playback_rate(),
            volume: defaults::default_volume(),
            chars_per_page: defaults::default_chars_per_page(),
            cache_dir: defaults::default_cache_dir(),
            log_level: defaults::default_log_level(),
            key_toggle_play_pause: defaults::default_key_toggle_play_pause(),
            key_stop: defaults::default_key_stop(),
            key_skip: defaults::default_key_skip(),
            key_safe_quit: defaults::default_key_safe_quit(),
            credentials: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            window_size: self.window_size.max(1),
            max_unit_words: self.max_unit_words.max(1),
            auto_continue: self.auto_continue,
            auto_delete_consumed: self.auto_delete_consumed,
            max_prefetch_attempts: self.max_prefetch_attempts.max(1),
            max_play_retries: self.max_play_retries,
            play_retry_delay: Duration::from_millis(self.play_retry_delay_ms),
            playback_rate: clamp_rate(self.playback_rate),
            volume: clamp_volume(self.volume),
        }
    }

    pub fn voice_selection(&self) -> VoiceSelection {
        VoiceSelection::new(self.engine.trim(), self.voice.trim()).with_lang(self.lang.trim())
    }

    /// Configured keys with `READALOUD_<ENGINE>_API_KEY` applied on top.
    pub fn credentials(&self) -> Credentials {
        Credentials::from_map(self.credentials.clone()).with_env_overrides()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn cache_root(&self) -> PathBuf {
        PathBuf::from(&self.cache_dir)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
