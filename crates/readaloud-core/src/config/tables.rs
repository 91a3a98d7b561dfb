use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    synthesis: SynthesisConfig,
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    reading: ReadingConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    keys: KeysConfig,
    #[serde(default)]
    credentials: BTreeMap<String, String>,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            base_url: tables.synthesis.base_url,
            engine: tables.synthesis.engine,
            voice: tables.synthesis.voice,
            lang: tables.synthesis.lang,
            poll_interval_ms: tables.synthesis.poll_interval_ms,
            request_timeout_secs: tables.synthesis.request_timeout_secs,
            window_size: tables.playback.window_size,
            max_unit_words: tables.playback.max_unit_words,
            auto_continue: tables.playback.auto_continue,
            auto_delete_consumed: tables.playback.auto_delete_consumed,
            max_prefetch_attempts: tables.playback.max_prefetch_attempts,
            max_play_retries: tables.playback.max_play_retries,
            play_retry_delay_ms: tables.playback.play_retry_delay_ms,
            playback_rate: tables.playback.playback_rate,
            volume: tables.playback.volume,
            chars_per_page: tables.reading.chars_per_page,
            cache_dir: tables.reading.cache_dir,
            log_level: tables.logging.log_level,
            key_toggle_play_pause: tables.keys.key_toggle_play_pause,
            key_stop: tables.keys.key_stop,
            key_skip: tables.keys.key_skip,
            key_safe_quit: tables.keys.key_safe_quit,
            credentials: tables.credentials,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            synthesis: SynthesisConfig {
                base_url: config.base_url.clone(),
                engine: config.engine.clone(),
                voice: config.voice.clone(),
                lang: config.lang.clone(),
                poll_interval_ms: config.poll_interval_ms,
                request_timeout_secs: config.request_timeout_secs,
            },
            playback: PlaybackConfig {
                window_size: config.window_size,
                max_unit_words: config.max_unit_words,
                auto_continue: config.auto_continue,
                auto_delete_consumed: config.auto_delete_consumed,
                max_prefetch_attempts: config.max_prefetch_attempts,
                max_play_retries: config.max_play_retries,
                play_retry_delay_ms: config.play_retry_delay_ms,
                playback_rate: config.playback_rate,
                volume: config.volume,
            },
            reading: ReadingConfig {
                chars_per_page: config.chars_per_page,
                cache_dir: config.cache_dir.clone(),
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            keys: KeysConfig {
                key_toggle_play_pause: config.key_toggle_play_pause.clone(),
                key_stop: config.key_stop.clone(),
                key_skip: config.key_skip.clone(),
                key_safe_quit: config.key_safe_quit.clone(),
            },
            credentials: config.credentials.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct SynthesisConfig {
    #[serde(default = "defaults::default_base_url")]
    base_url: String,
    #[serde(default = "defaults::default_engine")]
    engine: String,
    #[serde(default)]
    voice: String,
    #[serde(default = "defaults::default_lang")]
    lang: String,
    #[serde(default = "defaults::default_poll_interval_ms")]
    poll_interval_ms: u64,
    #[serde(default = "defaults::default_request_timeout_secs")]
    request_timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        SynthesisConfig {
            base_url: defaults::default_base_url(),
            engine: defaults::default_engine(),
            voice: String::new(),
            lang: defaults::default_lang(),
            poll_interval_ms: defaults::default_poll_interval_ms(),
            request_timeout_secs: defaults::default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PlaybackConfig {
    #[serde(default = "defaults::default_window_size")]
    window_size: usize,
    #[serde(default = "defaults::default_max_unit_words")]
    max_unit_words: usize,
    #[serde(default)]
    auto_continue: bool,
    #[serde(default)]
    auto_delete_consumed: bool,
    #[serde(default = "defaults::default_max_prefetch_attempts")]
    max_prefetch_attempts: u32,
    #[serde(default = "defaults::default_max_play_retries")]
    max_play_retries: u32,
    #[serde(default = "defaults::default_play_retry_delay_ms")]
    play_retry_delay_ms: u64,
    #[serde(default = "defaults::default_playback_rate")]
    playback_rate: f32,
    #[serde(default = "defaults::default_volume")]
    volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            window_size: defaults::default_window_size(),
            max_unit_words: defaults::default_max_unit_words(),
            auto_continue: false,
            auto_delete_consumed: false,
            max_prefetch_attempts: defaults::default_max_prefetch_attempts(),
            max_play_retries: defaults::default_max_play_retries(),
            play_retry_delay_ms: defaults::default_play_retry_delay_ms(),
            playback_rate: defaults::default_playback_rate(),
            volume: defaults::default_volume(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ReadingConfig {
    #[serde(default = "defaults::default_chars_per_page")]
    chars_per_page: usize,
    #[serde(default = "defaults::default_cache_dir")]
    cache_dir: String,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        ReadingConfig {
            chars_per_page: defaults::default_chars_per_page(),
            cache_dir: defaults::default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct KeysConfig {
    #[serde(default = "defaults::default_key_toggle_play_pause")]
    key_toggle_play_pause: String,
    #[serde(default = "defaults::default_key_stop")]
    key_stop: String,
    #[serde(default = "defaults::default_key_skip")]
    key_skip: String,
    #[serde(default = "defaults::default_key_safe_quit")]
    key_safe_quit: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        KeysConfig {
            key_toggle_play_pause: defaults::default_key_toggle_play_pause(),
            key_stop: defaults::default_key_stop(),
            key_skip: defaults::default_key_skip(),
            key_safe_quit: defaults::default_key_safe_quit(),
        }
    }
}
