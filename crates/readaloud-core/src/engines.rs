//! Known synthesis engines, voice selection and per-engine credentials.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub requires_api_key: bool,
}

static ENGINE_CATALOG: Lazy<BTreeMap<&'static str, EngineInfo>> = Lazy::new(|| {
    [
        EngineInfo {
            name: "piper",
            display_name: "Piper",
            description: "Local TTS with memory efficient voices",
            requires_api_key: false,
        },
        EngineInfo {
            name: "kokoro",
            display_name: "Kokoro",
            description: "Local TTS with expressive voices",
            requires_api_key: false,
        },
        EngineInfo {
            name: "coqui",
            display_name: "Coqui",
            description: "Local TTS voice cloning",
            requires_api_key: false,
        },
        EngineInfo {
            name: "kitten",
            display_name: "Kitten",
            description: "Local TTS with compact models",
            requires_api_key: false,
        },
        EngineInfo {
            name: "gemini",
            display_name: "Google Cloud TTS",
            description: "Cloud-based TTS with high quality voices",
            requires_api_key: true,
        },
    ]
    .into_iter()
    .map(|engine| (engine.name, engine))
    .collect()
});

pub fn catalog() -> impl Iterator<Item = &'static EngineInfo> {
    ENGINE_CATALOG.values()
}

pub fn find_engine(name: &str) -> Option<&'static EngineInfo> {
    ENGINE_CATALOG.get(name.trim().to_ascii_lowercase().as_str())
}

/// Unknown engines are assumed not to need a key; the server has the final say.
pub fn requires_credential(engine: &str) -> bool {
    find_engine(engine)
        .map(|info| info.requires_api_key)
        .unwrap_or(false)
}

/// Engine, voice and language used for every request of a playback session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceSelection {
    pub engine: String,
    pub voice: String,
    pub lang: String,
}

impl VoiceSelection {
    pub fn new(engine: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            voice: voice.into(),
            lang: "en".to_string(),
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }
}

/// A selectable voice as reported by the synthesis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Voice {
    pub id: String,
    pub name: String,
}

/// Caller-supplied API keys keyed by engine name.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    keys: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(keys: BTreeMap<String, String>) -> Self {
        let mut credentials = Self::new();
        for (engine, key) in keys {
            credentials.insert(&engine, key);
        }
        credentials
    }

    pub fn insert(&mut self, engine: &str, key: impl Into<String>) {
        self.keys
            .insert(engine.trim().to_ascii_lowercase(), key.into());
    }

    /// Apply `READALOUD_<ENGINE>_API_KEY` for every engine that needs a key.
    pub fn with_env_overrides(mut self) -> Self {
        for engine in catalog().filter(|engine| engine.requires_api_key) {
            let var = env_var_name(engine.name);
            if let Ok(value) = env::var(&var) {
                if !value.trim().is_empty() {
                    tracing::debug!(engine = engine.name, var = %var, "Using API key from environment");
                    self.insert(engine.name, value);
                }
            }
        }
        self
    }

    /// Blank keys count as absent.
    pub fn get(&self, engine: &str) -> Option<&str> {
        self.keys
            .get(engine.trim().to_ascii_lowercase().as_str())
            .map(String::as_str)
            .filter(|key| !key.trim().is_empty())
    }
}

fn env_var_name(engine: &str) -> String {
    format!("READALOUD_{}_API_KEY", engine.to_ascii_uppercase())
}
