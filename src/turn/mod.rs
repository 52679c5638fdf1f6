//! Push-to-talk turn loop: state machine, events, and collaborator traits.

mod controller;
mod messages;

pub use controller::{TurnController, TurnState};
pub use messages::{
    AudioRecorder, EmotionClassifier, InputEvent, UserSyncData, VideoFrame, encode_wav_pcm16,
};
