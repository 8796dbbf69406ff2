//! Speech processing
//!
//! Transcription of the user's question and synthesis of the spoken answer.
//! Both sit behind traits so the orchestrator can run against any backend.

mod stt;
mod tts;

pub use stt::SpeechToText;
pub use tts::{TextToSpeech, validate_speech_text};

use async_trait::async_trait;

use crate::Result;
use crate::frame::AudioClip;

/// Turns recorded speech into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a clip
    ///
    /// # Errors
    ///
    /// Returns error if the audio cannot be read or the backend fails
    async fn transcribe(&self, audio: &AudioClip) -> Result<String>;
}

/// Turns response text into spoken audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize text to encoded audio
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] for empty or all-whitespace text,
    /// or an error if the backend fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}
