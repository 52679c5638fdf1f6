//! Configuration types for the conversation turn pipeline.

use crate::error::{Result, TurnError};
use crate::personality::PersonalityProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for a conversation session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmpathConfig {
    /// Emotion smoothing / aggregation settings.
    pub emotion: EmotionConfig,
    /// Speech-to-text settings.
    pub asr: AsrConfig,
    /// Dialogue policy (chat completion) settings.
    pub llm: LlmConfig,
    /// Text-to-speech settings.
    pub tts: TtsConfig,
    /// Reply playback / cleanup settings.
    pub playback: PlaybackConfig,
    /// Turn state machine timing.
    pub turn: TurnConfig,
    /// Big Five personality profile embedded in the system prompt.
    pub personality: PersonalityProfile,
}

/// Emotion smoothing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Sliding window size (frames) for real-time smoothing.
    pub window_size: usize,
    /// Frame confidence below this forces the smoothed result to neutral.
    pub low_confidence_threshold: f32,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            low_confidence_threshold: 0.4,
        }
    }
}

/// Speech-to-text provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrConfig {
    /// Provider base URL (OpenAI-compatible `/v1/audio/transcriptions`).
    pub api_url: String,
    /// API key; falls back to `EMPATH_ASR_API_KEY` when empty.
    pub api_key: String,
    /// Transcription model name.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Recordings smaller than this are treated as failed without an
    /// upload (a released key with no speech produces a near-empty WAV).
    pub min_audio_bytes: usize,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com".to_owned(),
            api_key: String::new(),
            model: "whisper-1".to_owned(),
            timeout_secs: 10,
            min_audio_bytes: 1000,
        }
    }
}

impl AsrConfig {
    /// API key from config, or the `EMPATH_ASR_API_KEY` env var.
    #[must_use]
    pub fn resolved_api_key(&self) -> String {
        resolve_key(&self.api_key, "EMPATH_ASR_API_KEY")
    }
}

/// Dialogue policy (chat completion) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider base URL (OpenAI-compatible `/v1/chat/completions`).
    pub api_url: String,
    /// API key; falls back to `EMPATH_LLM_API_KEY` when empty.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Output token budget. Small on purpose: the policy asks for exactly
    /// three lines.
    pub max_tokens: u32,
    /// Sampling temperature. Low to prioritize determinism over creativity.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com".to_owned(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_owned(),
            max_tokens: 100,
            temperature: 0.3,
            timeout_secs: 15,
        }
    }
}

impl LlmConfig {
    /// API key from config, or the `EMPATH_LLM_API_KEY` env var.
    #[must_use]
    pub fn resolved_api_key(&self) -> String {
        resolve_key(&self.api_key, "EMPATH_LLM_API_KEY")
    }
}

/// Text-to-speech provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Provider base URL (OpenAI-compatible `/v1/audio/speech`).
    pub api_url: String,
    /// API key; falls back to `EMPATH_TTS_API_KEY` when empty.
    pub api_key: String,
    /// Synthesis model name.
    pub model: String,
    /// Voice name.
    pub voice: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com".to_owned(),
            api_key: String::new(),
            model: "tts-1".to_owned(),
            voice: "alloy".to_owned(),
            timeout_secs: 10,
        }
    }
}

impl TtsConfig {
    /// API key from config, or the `EMPATH_TTS_API_KEY` env var.
    #[must_use]
    pub fn resolved_api_key(&self) -> String {
        resolve_key(&self.api_key, "EMPATH_TTS_API_KEY")
    }
}

/// Reply playback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Delay before a played reply's temp audio file is deleted.
    ///
    /// Long enough to cover worst-case playback duration; shutdown cancels
    /// the wait and deletes immediately.
    pub cleanup_delay_secs: u64,
    /// Player command override (None = platform default player).
    pub player_command: Option<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            cleanup_delay_secs: 35,
            player_command: None,
        }
    }
}

/// Turn state machine timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Settle delay after key release, letting the last audio chunk flush
    /// before capture stops.
    pub settle_delay_ms: u64,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 300,
        }
    }
}

impl EmpathConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TurnError::Config(format!("failed to read config {}: {e}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|e| TurnError::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Load `~/.empath/config.toml` if present, else defaults.
    #[must_use]
    pub fn load_default() -> Self {
        let path = default_config_path();
        if path.exists() {
            match Self::load(&path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("falling back to default config: {e}"),
            }
        }
        Self::default()
    }
}

/// Default config file location (`~/.empath/config.toml`).
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".empath")
        .join("config.toml")
}

fn resolve_key(configured: &str, env_var: &str) -> String {
    if configured.is_empty() {
        std::env::var(env_var).unwrap_or_default()
    } else {
        configured.to_owned()
    }
}
