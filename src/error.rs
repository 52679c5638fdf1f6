//! Error types for the empath turn pipeline.

/// Top-level error type for the conversation turn system.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// Network or timeout failure on an external call (ASR / LLM / TTS).
    #[error("transport error: {0}")]
    Transport(String),

    /// Unexpected response shape from an external service.
    #[error("format error: {0}")]
    Format(String),

    /// Audio capture or encoding error.
    #[error("audio error: {0}")]
    Audio(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TurnError>;
