//! Text-to-speech (TTS) processing

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::SpeechSynthesizer;
use crate::{Error, Result};

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Synthesizes speech from text with `OpenAI` TTS
///
/// Output is MP3.
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: SecretString,
    voice: String,
    speed: f32,
    model: String,
}

impl TextToSpeech {
    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing or speed is outside 0.25..=4.0
    pub fn new_openai(
        api_key: SecretString,
        voice: String,
        speed: f32,
        model: String,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }
        if !(0.25..=4.0).contains(&speed) {
            return Err(Error::Config(format!(
                "TTS speed must be between 0.25 and 4.0, got {speed}"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            voice,
            speed,
            model,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let input = validate_speech_text(text)?;

        let request = TtsRequest {
            model: &self.model,
            input,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(SPEECH_URL)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(audio_bytes = audio.len(), "speech synthesized");
        Ok(audio.to_vec())
    }
}

/// Trim speech input, rejecting text with nothing to say
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when the text is empty or all whitespace
pub fn validate_speech_text(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(
            "text cannot be empty for speech synthesis".to_string(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SecretString {
        SecretString::from("sk-test".to_string())
    }

    #[test]
    fn test_validate_speech_text() {
        assert_eq!(validate_speech_text("  hello \n").unwrap(), "hello");
        assert!(matches!(validate_speech_text(""), Err(Error::InvalidInput(_))));
        assert!(matches!(validate_speech_text(" \t\n "), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_speed_range_is_enforced() {
        assert!(TextToSpeech::new_openai(key(), "nova".into(), 0.9, "tts-1".into()).is_ok());
        assert!(TextToSpeech::new_openai(key(), "nova".into(), 5.0, "tts-1".into()).is_err());
    }

    #[tokio::test]
    async fn test_blank_text_never_reaches_backend() {
        let tts = TextToSpeech::new_openai(key(), "nova".into(), 0.9, "tts-1".into()).unwrap();
        let result = tts.synthesize("   ").await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
