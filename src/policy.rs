//! Dialogue policy: personality-conditioned chat completion.
//!
//! One call per turn. The system message carries the Big Five profile and
//! the appraisal procedure; the user message carries the memory context
//! plus the fused transcript and facial emotion. Every failure mode, from
//! transport errors to unusable output, degrades to
//! [`RobotOutput::fallback`] so a turn always completes.

use crate::config::LlmConfig;
use crate::emotion::{Emotion, EmotionSample};
use crate::error::{Result, TurnError};
use crate::extract::{self, RobotOutput};
use crate::memory::ConversationMemory;
use crate::personality::PersonalityProfile;
use std::time::Duration;

/// User emotion confidence at or above this is trusted enough to expect
/// the policy to mirror it.
const MIRROR_CONFIDENCE: f32 = 0.6;

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(serde::Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(serde::Deserialize, Default)]
#[serde(default)]
struct ChoiceMessage {
    content: Option<String>,
    /// Reasoning-tuned models sometimes put the whole answer here and
    /// leave `content` empty.
    reasoning_content: Option<String>,
}

/// Generates the robot's triad for one turn.
pub struct DialoguePolicyClient {
    client: reqwest::Client,
    config: LlmConfig,
    personality: PersonalityProfile,
}

impl DialoguePolicyClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: LlmConfig, personality: PersonalityProfile) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TurnError::Transport(format!("failed to build LLM client: {e}")))?;
        Ok(Self {
            client,
            config,
            personality,
        })
    }

    /// The label the mirroring rule expects: the user's emotion when its
    /// confidence is trustworthy, else neutral.
    fn rule_emotion(user_emotion: EmotionSample) -> Emotion {
        if user_emotion.confidence >= MIRROR_CONFIDENCE {
            user_emotion.emotion
        } else {
            Emotion::Neutral
        }
    }

    /// Produce the robot's output for one turn. Total: any failure yields
    /// the fallback triad.
    pub async fn respond(
        &self,
        voice_text: &str,
        user_emotion: EmotionSample,
        memory: &ConversationMemory,
    ) -> RobotOutput {
        let expected = Self::rule_emotion(user_emotion);
        match self.try_respond(voice_text, user_emotion, memory, expected).await {
            Ok(output) => {
                if output.emotion != expected {
                    // The model's appraisal wins; the rule only flags drift.
                    tracing::debug!(
                        model_emotion = %output.emotion,
                        rule_emotion = %expected,
                        "policy output diverges from mirroring rule"
                    );
                }
                output
            }
            Err(e) => {
                tracing::warn!(error = %e, "policy call failed, using fallback reply");
                RobotOutput::fallback()
            }
        }
    }

    async fn try_respond(
        &self,
        voice_text: &str,
        user_emotion: EmotionSample,
        memory: &ConversationMemory,
        rule_emotion: Emotion,
    ) -> Result<RobotOutput> {
        let user_message = format!(
            "{}The user said: \"{}\"\nFacial emotion: {} (confidence {:.2})",
            memory.context_text(),
            voice_text,
            user_emotion.emotion,
            user_emotion.confidence,
        );

        let url = format!(
            "{}/v1/chat/completions",
            self.config.api_url.trim_end_matches('/')
        );
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": self.personality.system_prompt()},
                {"role": "user", "content": user_message},
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.resolved_api_key()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| TurnError::Transport(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TurnError::Transport(format!(
                "chat API error {status}: {text}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| TurnError::Format(format!("bad chat response: {e}")))?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| TurnError::Format("chat response had no choices".to_string()))?;

        if let Some(content) = message.content.as_deref().map(str::trim).filter(|c| !c.is_empty())
        {
            return Ok(extract::extract(content));
        }
        if let Some(reasoning) = message
            .reasoning_content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            tracing::debug!("content empty, recovering triad from reasoning stream");
            return Ok(extract::extract_from_reasoning(reasoning, rule_emotion));
        }
        Err(TurnError::Format("chat response message was empty".to_string()))
    }
}
