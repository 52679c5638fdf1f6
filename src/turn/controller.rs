//! The turn state machine.
//!
//! States: `Idle` → (press) → `Recording` → (release) → `Processing` →
//! `Idle`. Frames only matter while `Recording`; key events queued while
//! `Processing` are discarded, so a press during processing is a no-op
//! rather than a queued turn.

use crate::asr::SpeechToText;
use crate::config::EmpathConfig;
use crate::emotion::{EmotionAggregator, EmotionSample};
use crate::error::Result;
use crate::memory::{ConversationMemory, ShortTermMemory};
use crate::playback::PlaybackScheduler;
use crate::policy::DialoguePolicyClient;
use crate::tts::TextToSpeech;
use crate::turn::messages::{AudioRecorder, EmotionClassifier, InputEvent, UserSyncData, VideoFrame};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Current phase of the push-to-talk loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    Recording,
    Processing,
}

/// Owns one conversation session end to end.
pub struct TurnController<C, R> {
    classifier: C,
    recorder: R,
    aggregator: EmotionAggregator,
    memory: ConversationMemory,
    asr: SpeechToText,
    policy: DialoguePolicyClient,
    playback: PlaybackScheduler,
    settle_delay: Duration,
    state: TurnState,
    cancel: CancellationToken,
}

impl<C, R> TurnController<C, R>
where
    C: EmotionClassifier,
    R: AudioRecorder,
{
    /// Build a controller and its service clients from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any HTTP client or the playback temp directory
    /// cannot be created.
    pub fn new(config: &EmpathConfig, classifier: C, recorder: R) -> Result<Self> {
        let tts = TextToSpeech::new(config.tts.clone())?;
        Ok(Self {
            classifier,
            recorder,
            aggregator: EmotionAggregator::new(
                config.emotion.window_size,
                config.emotion.low_confidence_threshold,
            ),
            memory: ConversationMemory::new(),
            asr: SpeechToText::new(config.asr.clone())?,
            policy: DialoguePolicyClient::new(config.llm.clone(), config.personality)?,
            playback: PlaybackScheduler::new(tts, &config.playback)?,
            settle_delay: Duration::from_millis(config.turn.settle_delay_ms),
            state: TurnState::default(),
            cancel: CancellationToken::new(),
        })
    }

    #[must_use]
    pub fn state(&self) -> TurnState {
        self.state
    }

    #[must_use]
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Token that stops [`TurnController::run`] when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drive the session until the cancel token fires or the input channel
    /// closes. Returns the controller so callers can inspect memory and
    /// shut playback down.
    pub async fn run(
        mut self,
        mut input_rx: mpsc::UnboundedReceiver<InputEvent>,
        mut frame_rx: mpsc::Receiver<VideoFrame>,
    ) -> Self {
        let cancel = self.cancel.clone();
        let mut frames_open = true;
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                event = input_rx.recv() => {
                    let Some(event) = event else { break };
                    match event {
                        InputEvent::Press => self.on_press(),
                        InputEvent::Release => {
                            if self.on_release() {
                                // Let the last audio chunk flush before stopping capture.
                                tokio::time::sleep(self.settle_delay).await;
                                self.process_turn().await;
                                // Key events that arrived mid-processing are stale.
                                while input_rx.try_recv().is_ok() {}
                                self.state = TurnState::Idle;
                            }
                        }
                    }
                }
                frame = frame_rx.recv(), if frames_open => {
                    match frame {
                        Some(frame) => self.on_frame(&frame),
                        None => frames_open = false,
                    }
                }
            }
        }
        self
    }

    /// Release playback resources, deleting any reply audio still on disk.
    pub async fn shutdown(self) {
        self.playback.shutdown().await;
    }

    fn on_press(&mut self) {
        if self.state != TurnState::Idle {
            tracing::debug!(state = ?self.state, "press ignored");
            return;
        }
        self.aggregator.begin_turn();
        match self.recorder.start() {
            Ok(()) => {
                self.state = TurnState::Recording;
                tracing::info!("recording started");
            }
            Err(e) => tracing::warn!(error = %e, "failed to start recording"),
        }
    }

    fn on_frame(&mut self, frame: &VideoFrame) {
        if self.state != TurnState::Recording {
            return;
        }
        let sample = self.classifier.classify(frame);
        self.aggregator.observe(sample);
        let smoothed = self.aggregator.smoothed();
        tracing::debug!(
            emotion = %smoothed.emotion,
            confidence = smoothed.confidence,
            "frame classified"
        );
    }

    /// Returns true when a turn should now be processed.
    fn on_release(&mut self) -> bool {
        if self.state != TurnState::Recording {
            tracing::debug!(state = ?self.state, "release ignored");
            return false;
        }
        self.state = TurnState::Processing;
        true
    }

    async fn process_turn(&mut self) {
        let audio = match self.recorder.stop() {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(error = %e, "failed to stop recording");
                Vec::new()
            }
        };
        let turn_emotion = self.aggregator.aggregate_turn();

        let transcript = self.asr.transcribe(&audio).await;
        // When nothing was recognized the facial read is left unused too:
        // an unheard turn must not trigger an emotional reaction.
        let emotion_sample = if transcript.succeeded {
            turn_emotion
        } else {
            EmotionSample::neutral()
        };
        let user = UserSyncData {
            voice_text: transcript.text,
            emotion: emotion_sample.emotion,
            confidence: emotion_sample.confidence,
        };
        tracing::info!(
            voice = %user.voice_text,
            emotion = %user.emotion,
            confidence = user.confidence,
            face = user.emotion.emoticon(),
            "turn fused"
        );

        let output = self
            .policy
            .respond(&user.voice_text, emotion_sample, &self.memory)
            .await;
        tracing::info!(
            reply = %output.text,
            emotion = %output.emotion,
            level = output.level,
            face = output.emotion.emoticon(),
            "robot replies"
        );

        self.memory.update(ShortTermMemory {
            user_voice: user.voice_text,
            user_emotion: user.emotion,
            robot_emotion: output.emotion,
            robot_level: output.level,
            robot_response: output.text.clone(),
        });
        self.playback.schedule(&output.text).await;
        self.aggregator.begin_turn();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::emotion::Emotion;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedClassifier(EmotionSample);

    impl EmotionClassifier for FixedClassifier {
        fn classify(&mut self, _frame: &VideoFrame) -> EmotionSample {
            self.0
        }
    }

    struct CountingRecorder {
        started: usize,
        stopped: usize,
        audio: Vec<u8>,
    }

    impl CountingRecorder {
        fn with_audio(audio: Vec<u8>) -> Self {
            Self {
                started: 0,
                stopped: 0,
                audio,
            }
        }
    }

    impl AudioRecorder for CountingRecorder {
        fn start(&mut self) -> Result<()> {
            self.started += 1;
            Ok(())
        }

        fn stop(&mut self) -> Result<Vec<u8>> {
            self.stopped += 1;
            Ok(self.audio.clone())
        }
    }

    fn frame() -> VideoFrame {
        VideoFrame {
            pixels: vec![0u8; 16],
            width: 4,
            height: 4,
        }
    }

    fn config_for(server: &MockServer) -> EmpathConfig {
        let mut config = EmpathConfig::default();
        config.asr.api_url = server.uri();
        config.llm.api_url = server.uri();
        config.tts.api_url = server.uri();
        config.turn.settle_delay_ms = 0;
        config.playback.player_command = Some("true".to_string());
        config
    }

    async fn controller_for(
        server: &MockServer,
        classifier: FixedClassifier,
        recorder: CountingRecorder,
    ) -> TurnController<FixedClassifier, CountingRecorder> {
        TurnController::new(&config_for(server), classifier, recorder).unwrap()
    }

    fn happy(confidence: f32) -> EmotionSample {
        EmotionSample {
            emotion: Emotion::Happy,
            confidence,
        }
    }

    #[tokio::test]
    async fn press_starts_recording_once() {
        let server = MockServer::start().await;
        let mut controller = controller_for(
            &server,
            FixedClassifier(happy(0.9)),
            CountingRecorder::with_audio(Vec::new()),
        )
        .await;

        controller.on_press();
        assert_eq!(controller.state(), TurnState::Recording);
        assert_eq!(controller.recorder.started, 1);

        // Repeat press while recording changes nothing.
        controller.on_press();
        assert_eq!(controller.recorder.started, 1);
    }

    #[tokio::test]
    async fn press_while_processing_is_ignored() {
        let server = MockServer::start().await;
        let mut controller = controller_for(
            &server,
            FixedClassifier(happy(0.9)),
            CountingRecorder::with_audio(Vec::new()),
        )
        .await;

        controller.on_press();
        assert!(controller.on_release());
        assert_eq!(controller.state(), TurnState::Processing);

        controller.on_press();
        assert_eq!(controller.state(), TurnState::Processing);
        assert_eq!(controller.recorder.started, 1);
    }

    #[tokio::test]
    async fn release_when_idle_is_noop() {
        let server = MockServer::start().await;
        let mut controller = controller_for(
            &server,
            FixedClassifier(happy(0.9)),
            CountingRecorder::with_audio(Vec::new()),
        )
        .await;
        assert!(!controller.on_release());
        assert_eq!(controller.state(), TurnState::Idle);
        assert_eq!(controller.recorder.stopped, 0);
    }

    #[tokio::test]
    async fn frames_only_count_while_recording() {
        let server = MockServer::start().await;
        let mut controller = controller_for(
            &server,
            FixedClassifier(happy(0.9)),
            CountingRecorder::with_audio(Vec::new()),
        )
        .await;

        controller.on_frame(&frame());
        assert_eq!(controller.aggregator.turn_len(), 0);

        controller.on_press();
        controller.on_frame(&frame());
        controller.on_frame(&frame());
        assert_eq!(controller.aggregator.turn_len(), 2);
    }

    #[tokio::test]
    async fn faceless_frames_count_as_neutral() {
        let server = MockServer::start().await;
        let mut controller = controller_for(
            &server,
            FixedClassifier(EmotionSample::neutral()),
            CountingRecorder::with_audio(Vec::new()),
        )
        .await;
        controller.on_press();
        controller.on_frame(&frame());
        assert_eq!(controller.aggregator.turn_len(), 1);
        assert_eq!(controller.aggregator.aggregate_turn(), EmotionSample::neutral());
    }

    #[tokio::test]
    async fn failed_recognition_forces_neutral_turn() {
        let server = MockServer::start().await;
        // ASR 500s; LLM echoes back a sad triad it should never be asked
        // to mirror; TTS 500s so playback degrades to text-only.
        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "neutral\n0.7\nCould you say that again?"}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut controller = controller_for(
            &server,
            FixedClassifier(happy(0.95)),
            CountingRecorder::with_audio(vec![0u8; 4096]),
        )
        .await;

        controller.on_press();
        controller.on_frame(&frame());
        assert!(controller.on_release());
        controller.process_turn().await;

        let turn = controller.memory().last_turn().unwrap();
        assert_eq!(turn.user_voice, crate::asr::NO_SPEECH_SENTINEL);
        // The confident happy frames are discarded with the failed audio.
        assert_eq!(turn.user_emotion, Emotion::Neutral);
    }
}
