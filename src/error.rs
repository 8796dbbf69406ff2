//! Error types for SecondEye

use thiserror::Error;

/// Result type alias for SecondEye operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the perception pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Language or vision model error
    #[error("model error: {0}")]
    Model(String),

    /// Localization backend error
    #[error("localization error: {0}")]
    Localization(String),

    /// Caller supplied input the pipeline cannot work with
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
