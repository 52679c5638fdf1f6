//! Empath: push-to-talk multimodal conversation turns.
//!
//! While a push-to-talk key is held, facial emotion samples and
//! microphone audio accumulate in parallel. Releasing the key closes the
//! turn: the recording is transcribed, the emotion samples are fused into
//! a single label, and a personality-conditioned dialogue policy produces
//! a spoken reply.
//!
//! # Architecture
//!
//! One turn flows through independent pieces owned by the
//! [`turn::TurnController`]:
//! - **Emotion aggregation**: per-frame classifications smoothed and
//!   fused per turn ([`emotion`])
//! - **Speech recognition**: turn audio to text, degrading gracefully
//!   ([`asr`])
//! - **Dialogue policy**: Big Five personality prompt plus triad
//!   extraction from possibly reasoning-polluted model output
//!   ([`policy`], [`extract`])
//! - **Memory**: the previous turn plus accumulated user preferences
//!   ([`memory`])
//! - **Playback**: fire-and-forget synthesis with cancellable cleanup
//!   ([`playback`])

pub mod asr;
pub mod config;
pub mod emotion;
pub mod error;
pub mod extract;
pub mod memory;
pub mod personality;
pub mod playback;
pub mod policy;
pub mod tts;
pub mod turn;

pub use error::{Result, TurnError};
