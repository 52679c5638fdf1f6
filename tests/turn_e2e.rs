//! End-to-end turn loop tests against mocked speech and chat services.
//!
//! A full push-to-talk cycle is driven through the controller's channels:
//! press, frames, release. TTS is made to fail so the turn degrades to
//! text-only and no audio player is ever needed.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use empath::config::EmpathConfig;
use empath::emotion::{Emotion, EmotionSample};
use empath::turn::{
    AudioRecorder, EmotionClassifier, InputEvent, TurnController, VideoFrame, encode_wav_pcm16,
};
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct HappyClassifier;

impl EmotionClassifier for HappyClassifier {
    fn classify(&mut self, _frame: &VideoFrame) -> EmotionSample {
        EmotionSample {
            emotion: Emotion::Happy,
            confidence: 0.9,
        }
    }
}

struct SilentRecorder;

impl AudioRecorder for SilentRecorder {
    fn start(&mut self) -> empath::Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> empath::Result<Vec<u8>> {
        encode_wav_pcm16(&vec![0i16; 2048], 16_000)
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
    config
}

async fn mount_asr(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": text})))
        .mount(server)
        .await;
}

async fn mount_failing_tts(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

fn chat_response(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "choices": [{"message": {"content": content}}]
    }))
}

#[tokio::test]
async fn full_turn_updates_memory_and_preferences() {
    let server = MockServer::start().await;
    mount_asr(&server, "thank you").await;
    mount_failing_tts(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_response("happy\n0.8\nGreat to hear!"))
        .mount(&server)
        .await;

    let controller =
        TurnController::new(&config_for(&server), HappyClassifier, SilentRecorder).unwrap();
    let cancel = controller.cancel_token();
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (frame_tx, frame_rx) = mpsc::channel(16);
    let handle = tokio::spawn(controller.run(input_rx, frame_rx));

    input_tx.send(InputEvent::Press).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    for _ in 0..3 {
        frame_tx.send(frame()).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    input_tx.send(InputEvent::Release).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    cancel.cancel();
    let controller = handle.await.unwrap();

    let turn = controller.memory().last_turn().unwrap();
    assert_eq!(turn.user_voice, "thank you");
    assert_eq!(turn.user_emotion, Emotion::Happy);
    assert_eq!(turn.robot_emotion, Emotion::Happy);
    assert!((turn.robot_level - 0.8).abs() < f32::EPSILON);
    assert_eq!(turn.robot_response, "Great to hear!");
    assert_eq!(
        controller
            .memory()
            .semantic()
            .user_preferences
            .get("appreciates_gratitude"),
        Some(&true)
    );

    controller.shutdown().await;
}

#[tokio::test]
async fn press_during_processing_does_not_queue_a_turn() {
    let server = MockServer::start().await;
    mount_asr(&server, "hello there").await;
    mount_failing_tts(&server).await;
    // Slow policy call keeps the controller in its processing phase long
    // enough for a second press/release pair to arrive and be discarded.
    // The expectation proves only one turn reached the chat endpoint.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            chat_response("neutral\n0.7\nHello!").set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let controller =
        TurnController::new(&config_for(&server), HappyClassifier, SilentRecorder).unwrap();
    let cancel = controller.cancel_token();
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (_frame_tx, frame_rx) = mpsc::channel(16);
    let handle = tokio::spawn(controller.run(input_rx, frame_rx));

    input_tx.send(InputEvent::Press).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    input_tx.send(InputEvent::Release).unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    // Arrives mid-processing; must be dropped, not queued.
    input_tx.send(InputEvent::Press).unwrap();
    input_tx.send(InputEvent::Release).unwrap();
    tokio::time::sleep(Duration::from_millis(700)).await;

    cancel.cancel();
    let controller = handle.await.unwrap();

    let turn = controller.memory().last_turn().unwrap();
    assert_eq!(turn.robot_response, "Hello!");
    controller.shutdown().await;
    server.verify().await;
}

#[tokio::test]
async fn reasoning_only_model_still_completes_the_turn() {
    let server = MockServer::start().await;
    mount_asr(&server, "I got the job today").await;
    mount_failing_tts(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {
                "content": "",
                "reasoning_content": "They sound thrilled. The emotion label is happy, \
level 0.9. I could reply \"Congratulations, that's wonderful news!\" warmly.",
            }}]
        })))
        .mount(&server)
        .await;

    let controller =
        TurnController::new(&config_for(&server), HappyClassifier, SilentRecorder).unwrap();
    let cancel = controller.cancel_token();
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (frame_tx, frame_rx) = mpsc::channel(16);
    let handle = tokio::spawn(controller.run(input_rx, frame_rx));

    input_tx.send(InputEvent::Press).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    frame_tx.send(frame()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    input_tx.send(InputEvent::Release).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    cancel.cancel();
    let controller = handle.await.unwrap();

    let turn = controller.memory().last_turn().unwrap();
    assert_eq!(turn.robot_emotion, Emotion::Happy);
    assert_eq!(turn.robot_response, "Congratulations, that's wonderful news!");
    controller.shutdown().await;
}
