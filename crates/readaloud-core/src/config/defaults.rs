use super::models::LogLevel;

pub(crate) fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

pub(crate) fn default_engine() -> String {
    "piper".to_string()
}

pub(crate) fn default_lang() -> String {
    "en".to_string()
}

pub(crate) fn default_poll_interval_ms() -> u64 {
    500
}

pub(crate) fn default_request_timeout_secs() -> u64 {
    60
}

pub(crate) fn default_window_size() -> usize {
    3
}

pub(crate) fn default_max_unit_words() -> usize {
    crate::chunker::DEFAULT_MAX_UNIT_WORDS
}

pub(crate) fn default_max_prefetch_attempts() -> u32 {
    3
}

pub(crate) fn default_max_play_retries() -> u32 {
    3
}

pub(crate) fn default_play_retry_delay_ms() -> u64 {
    2000
}

pub(crate) fn default_playback_rate() -> f32 {
    1.0
}

pub(crate) fn default_volume() -> f32 {
    1.0
}

pub(crate) fn default_chars_per_page() -> usize {
    crate::document::DEFAULT_CHARS_PER_PAGE
}

pub(crate) fn default_cache_dir() -> String {
    crate::cache::CACHE_DIR.to_string()
}

pub(crate) fn default_log_level() -> LogLevel {
    LogLevel::Debug
}

pub(crate) fn default_key_toggle_play_pause() -> String {
    "p".to_string()
}

pub(crate) fn default_key_stop() -> String {
    "s".to_string()
}

pub(crate) fn default_key_skip() -> String {
    "f".to_string()
}

pub(crate) fn default_key_safe_quit() -> String {
    "q".to_string()
}
