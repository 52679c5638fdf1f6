//! Text-to-speech over an OpenAI-compatible `/v1/audio/speech` endpoint.

use crate::config::TtsConfig;
use crate::error::{Result, TurnError};
use std::time::Duration;

/// Synthesizes reply text into playable audio bytes (MP3).
pub struct TextToSpeech {
    client: reqwest::Client,
    config: TtsConfig,
}

impl TextToSpeech {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: TtsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TurnError::Transport(format!("failed to build TTS client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Synthesize `text` into audio bytes.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status. The
    /// playback scheduler absorbs this into a silent (text-only) turn.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tracing::debug!(chars = text.chars().count(), "starting synthesis");

        let url = format!(
            "{}/v1/audio/speech",
            self.config.api_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.resolved_api_key()),
            )
            .json(&serde_json::json!({
                "model": self.config.model,
                "input": text,
                "voice": self.config.voice,
            }))
            .send()
            .await
            .map_err(|e| TurnError::Transport(format!("synthesis request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TurnError::Transport(format!(
                "synthesis API error {status}: {body}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| TurnError::Transport(format!("failed to read audio body: {e}")))?;
        tracing::debug!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn synthesizes_reply_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .and(body_partial_json(
                serde_json::json!({"input": "Hello!", "voice": "alloy"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let tts = TextToSpeech::new(TtsConfig {
            api_url: server.uri(),
            api_key: "test-key".to_string(),
            ..TtsConfig::default()
        })
        .unwrap();
        let audio = tts.synthesize("Hello!").await.unwrap();
        assert_eq!(audio, vec![1u8, 2, 3]);
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tts = TextToSpeech::new(TtsConfig {
            api_url: server.uri(),
            ..TtsConfig::default()
        })
        .unwrap();
        assert!(tts.synthesize("Hello!").await.is_err());
    }
}
