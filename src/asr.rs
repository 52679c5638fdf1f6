//! Speech-to-text over an OpenAI-compatible transcription endpoint.
//!
//! Recognition failure is a normal outcome of a turn, not a pipeline
//! error: the caller gets a [`TurnTranscript`] either way and decides how
//! to degrade (the turn controller substitutes a sentinel utterance and
//! forces the emotion neutral).

use crate::config::AsrConfig;
use crate::error::{Result, TurnError};
use std::time::Duration;

/// Sentinel utterance handed to the dialogue policy when nothing usable
/// was recognized.
pub const NO_SPEECH_SENTINEL: &str = "no speech recognized";

/// Response from an OpenAI-compatible transcription API.
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Outcome of recognizing one turn's recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnTranscript {
    pub text: String,
    pub succeeded: bool,
}

impl TurnTranscript {
    /// The degraded transcript used when recognition fails.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            text: NO_SPEECH_SENTINEL.to_string(),
            succeeded: false,
        }
    }

    fn recognized(text: String) -> Self {
        Self {
            text,
            succeeded: true,
        }
    }
}

/// Transcribes turn recordings.
pub struct SpeechToText {
    client: reqwest::Client,
    config: AsrConfig,
}

impl SpeechToText {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: AsrConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TurnError::Transport(format!("failed to build ASR client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Transcribe one turn's WAV recording.
    ///
    /// Never returns an error: undersized audio, transport failures, and
    /// empty transcripts all collapse into [`TurnTranscript::failed`].
    pub async fn transcribe(&self, audio: &[u8]) -> TurnTranscript {
        if audio.len() < self.config.min_audio_bytes {
            tracing::warn!(
                audio_bytes = audio.len(),
                min_bytes = self.config.min_audio_bytes,
                "recording too small, skipping transcription"
            );
            return TurnTranscript::failed();
        }

        match self.request_transcription(audio).await {
            Ok(text) if !text.trim().is_empty() => {
                tracing::info!(transcript = %text, "transcription complete");
                TurnTranscript::recognized(text.trim().to_string())
            }
            Ok(_) => {
                tracing::warn!("transcription returned empty text");
                TurnTranscript::failed()
            }
            Err(e) => {
                tracing::warn!(error = %e, "transcription failed");
                TurnTranscript::failed()
            }
        }
    }

    async fn request_transcription(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("turn.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| TurnError::Format(e.to_string()))?,
            )
            .text("model", self.config.model.clone());

        let url = format!(
            "{}/v1/audio/transcriptions",
            self.config.api_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.resolved_api_key()),
            )
            .multipart(form)
            .send()
            .await
            .map_err(|e| TurnError::Transport(format!("transcription request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TurnError::Transport(format!(
                "transcription API error {status}: {body}"
            )));
        }

        let result: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TurnError::Format(format!("bad transcription response: {e}")))?;
        Ok(result.text)
    }
}
