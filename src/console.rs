//! Terminal front-end: renders controller callbacks and maps typed keys to
//! playback commands.

use readaloud_core::chunker::TextUnit;
use readaloud_core::config::AppConfig;
use readaloud_core::controller::{Command, PlaybackState};
use readaloud_core::presentation::{FailureKind, Notification, PresentationAdapter};
use std::io::Write;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleAction {
    Command(Command),
    Quit,
}

/// Resolve one line of input against the configured keys.
pub fn action_for_input(config: &AppConfig, input: &str) -> Option<ConsoleAction> {
    let pressed = normalize_shortcut_token(input, "");
    if pressed.is_empty() {
        return None;
    }

    if shortcut_matches(&config.key_toggle_play_pause, "p", &pressed) {
        Some(ConsoleAction::Command(Command::TogglePlayPause))
    } else if shortcut_matches(&config.key_stop, "s", &pressed) {
        Some(ConsoleAction::Command(Command::Stop))
    } else if shortcut_matches(&config.key_skip, "f", &pressed) {
        Some(ConsoleAction::Command(Command::Skip))
    } else if shortcut_matches(&config.key_safe_quit, "q", &pressed) {
        Some(ConsoleAction::Quit)
    } else {
        debug!(input = %pressed, "Unbound key");
        None
    }
}

fn shortcut_matches(raw: &str, fallback: &str, pressed: &str) -> bool {
    normalize_shortcut_token(raw, fallback) == pressed
}

fn normalize_shortcut_token(raw: &str, fallback: &str) -> String {
    let normalized = raw.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        fallback.to_string()
    } else {
        normalized.replace("spacebar", "space")
    }
}

pub fn key_help(config: &AppConfig) -> String {
    format!(
        "keys: [{}] play/pause  [{}] stop  [{}] skip  [{}] quit  (then Enter)",
        normalize_shortcut_token(&config.key_toggle_play_pause, "p"),
        normalize_shortcut_token(&config.key_stop, "s"),
        normalize_shortcut_token(&config.key_skip, "f"),
        normalize_shortcut_token(&config.key_safe_quit, "q"),
    )
}

/// Prints the spoken text and state changes to stdout, problems to stderr.
pub struct ConsolePresenter<W: Write + Send> {
    out: W,
}

impl ConsolePresenter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write + Send> ConsolePresenter<W> {
    #[cfg(test)]
    fn new(out: W) -> Self {
        Self { out }
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }
}

impl<W: Write + Send> PresentationAdapter for ConsolePresenter<W> {
    fn on_chunk_start(&mut self, unit: &TextUnit) {
        self.line(&format!("> {}", unit.text));
    }

    fn on_chunk_end(&mut self, unit: &TextUnit) {
        debug!(unit = %unit.id, "Finished unit");
    }

    fn on_state_change(&mut self, state: PlaybackState) {
        self.line(&format!("[{state}]"));
    }

    fn on_failure(&mut self, kind: FailureKind, message: &str) {
        self.line(&format!("[{}] {message}", kind.severity()));
    }

    fn notify(&mut self, notification: &Notification) {
        self.line(&format!("[{}] {}", notification.severity, notification.message));
    }
}
