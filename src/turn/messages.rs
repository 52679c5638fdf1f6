//! Events and collaborator traits at the edges of the turn loop.
//!
//! The binary decides where frames and key events come from; the loop
//! only sees channels and these traits.

use crate::emotion::EmotionSample;
use crate::error::{Result, TurnError};

/// Push-to-talk key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Press,
    Release,
}

/// One camera frame, in whatever pixel layout the classifier expects.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Fused single-turn user state handed to the dialogue policy.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSyncData {
    pub voice_text: String,
    pub emotion: crate::emotion::Emotion,
    pub confidence: f32,
}

/// Per-frame facial emotion classification.
///
/// A frame with no detectable face yields [`EmotionSample::neutral`].
pub trait EmotionClassifier: Send {
    fn classify(&mut self, frame: &VideoFrame) -> EmotionSample;
}

/// Gated microphone capture. `stop` yields the whole turn's recording as
/// WAV bytes (16 kHz mono PCM).
pub trait AudioRecorder: Send {
    /// # Errors
    ///
    /// Returns an error if the capture device cannot start.
    fn start(&mut self) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if capture was not running or encoding fails.
    fn stop(&mut self) -> Result<Vec<u8>>;
}

/// Encode raw PCM samples as an in-memory mono WAV file.
///
/// # Errors
///
/// Returns an error if WAV encoding fails.
pub fn encode_wav_pcm16(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| TurnError::Audio(format!("failed to start WAV encoder: {e}")))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| TurnError::Audio(format!("failed to encode sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| TurnError::Audio(format!("failed to finalize WAV: {e}")))?;
    }
    Ok(cursor.into_inner())
}
