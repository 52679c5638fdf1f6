//! Interactive console demo for the push-to-talk turn loop.
//!
//! Real camera and microphone capture are out of scope here: a scripted
//! classifier and a silence recorder stand in for the devices so the full
//! pipeline (emotion fusion, recognition, policy, playback) can be
//! exercised from a terminal. Press Enter to toggle the push-to-talk key,
//! `q` to quit.

use empath::config::EmpathConfig;
use empath::emotion::{Emotion, EmotionSample};
use empath::turn::{
    AudioRecorder, EmotionClassifier, InputEvent, TurnController, VideoFrame, encode_wav_pcm16,
};
use std::time::Duration;
use tokio::sync::mpsc;

/// Cycles through a fixed emotion script, one sample per frame.
struct ScriptedClassifier {
    script: Vec<EmotionSample>,
    cursor: usize,
}

impl Default for ScriptedClassifier {
    fn default() -> Self {
        let script = vec![
            EmotionSample {
                emotion: Emotion::Happy,
                confidence: 0.9,
            },
            EmotionSample {
                emotion: Emotion::Happy,
                confidence: 0.85,
            },
            EmotionSample {
                emotion: Emotion::Neutral,
                confidence: 0.7,
            },
            EmotionSample {
                emotion: Emotion::Happy,
                confidence: 0.9,
            },
            // One noisy low-confidence frame the smoothing must absorb.
            EmotionSample {
                emotion: Emotion::Sad,
                confidence: 0.3,
            },
        ];
        Self { script, cursor: 0 }
    }
}

impl EmotionClassifier for ScriptedClassifier {
    fn classify(&mut self, _frame: &VideoFrame) -> EmotionSample {
        let sample = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        sample
    }
}

/// Records one second of silence per turn.
struct SilenceRecorder {
    recording: bool,
}

impl SilenceRecorder {
    fn new() -> Self {
        Self { recording: false }
    }
}

impl AudioRecorder for SilenceRecorder {
    fn start(&mut self) -> empath::Result<()> {
        self.recording = true;
        Ok(())
    }

    fn stop(&mut self) -> empath::Result<Vec<u8>> {
        if !self.recording {
            return Err(empath::TurnError::Audio("capture was not running".to_string()));
        }
        self.recording = false;
        encode_wav_pcm16(&vec![0i16; 16_000], 16_000)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => EmpathConfig::load(std::path::Path::new(&path))?,
        None => EmpathConfig::load_default(),
    };

    let controller =
        TurnController::new(&config, ScriptedClassifier::default(), SilenceRecorder::new())?;
    let cancel = controller.cancel_token();

    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (frame_tx, frame_rx) = mpsc::channel(16);

    // Terminal stand-in for a push-to-talk key: Enter toggles, `q` quits.
    let stdin_cancel = cancel.clone();
    std::thread::spawn(move || {
        let mut held = false;
        let mut line = String::new();
        loop {
            line.clear();
            if std::io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
                stdin_cancel.cancel();
                break;
            }
            if line.trim().eq_ignore_ascii_case("q") {
                stdin_cancel.cancel();
                break;
            }
            let event = if held {
                InputEvent::Release
            } else {
                InputEvent::Press
            };
            held = !held;
            if input_tx.send(event).is_err() {
                break;
            }
        }
    });

    // Synthetic 10 Hz camera feed.
    let frame_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = frame_cancel.cancelled() => break,
                () = tokio::time::sleep(Duration::from_millis(100)) => {}
            }
            let frame = VideoFrame {
                pixels: vec![0u8; 64],
                width: 8,
                height: 8,
            };
            if frame_tx.send(frame).await.is_err() {
                break;
            }
        }
    });

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    println!("empath demo: Enter toggles the talk key, q quits.");
    let controller = controller.run(input_rx, frame_rx).await;
    controller.shutdown().await;
    tracing::info!("session ended, temp audio cleaned");
    Ok(())
}
