//! Configuration management for SecondEye
//!
//! Built once at startup and shared read-only by every request.

pub mod file;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

pub use file::SecondEyeConfigFile;

/// Tone guideline shared by every model prompt
pub const DEFAULT_VOICE_STYLE: &str = "You are a voice assistant specifically designed to help \
visually impaired and mobility-impaired users. Your tone should be gentle, patient, and your \
speech pace should be slightly slower. Keep sentences short and explain things step by step.";

/// SecondEye configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API keys
    pub api_keys: ApiKeys,

    /// Model identifiers
    pub models: ModelConfig,

    /// Voice processing configuration
    pub voice: VoiceConfig,

    /// 3D localization backend
    pub localization: LocalizationConfig,

    /// Object search tuning
    pub search: SearchConfig,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,

    /// Tone guideline prepended to model prompts
    pub voice_style: String,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper, TTS, chat models)
    pub openai: Option<SecretString>,
}

/// Model identifiers
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Text model for intent extraction and navigation wording
    pub llm_model: String,

    /// Vision model for scene, search and general questions
    pub vlm_model: String,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,
}

/// 3D localization backend configuration
#[derive(Debug, Clone)]
pub struct LocalizationConfig {
    /// Base URL of the reconstruction service; `None` means mock positions
    pub backend_url: Option<String>,

    /// Hard timeout for the single localization call
    pub timeout: Duration,
}

/// Object search configuration
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Frame judgments in flight at once (1 = sequential)
    pub concurrency: usize,

    /// Search duration quoted to the user when the request gives none
    pub default_max_duration: u32,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_keys: ApiKeys::default(),
            models: ModelConfig {
                llm_model: "gpt-4o-mini".to_string(),
                vlm_model: "gpt-4o-mini".to_string(),
            },
            voice: VoiceConfig {
                stt_model: "whisper-1".to_string(),
                tts_model: "tts-1".to_string(),
                tts_voice: "nova".to_string(),
                tts_speed: 0.9,
            },
            localization: LocalizationConfig {
                backend_url: None,
                timeout: Duration::from_secs(10),
            },
            search: SearchConfig {
                concurrency: 1,
                default_max_duration: 5,
            },
            api_server: ApiServerConfig { port: 8000 },
            voice_style: DEFAULT_VOICE_STYLE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the config file and process environment
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but malformed
    pub fn load() -> Result<Self> {
        let file = file::load_config_file();
        Self::from_sources(&file, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// Precedence: environment, then file, then defaults.
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but malformed
    pub fn from_sources(
        file: &SecondEyeConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let defaults = Self::default();

        let openai = env("OPENAI_API_KEY")
            .or_else(|| file.api_keys.openai.clone())
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        let models = ModelConfig {
            llm_model: env("SECONDEYE_LLM_MODEL")
                .or_else(|| file.models.llm.clone())
                .unwrap_or(defaults.models.llm_model),
            vlm_model: env("SECONDEYE_VLM_MODEL")
                .or_else(|| file.models.vlm.clone())
                .unwrap_or(defaults.models.vlm_model),
        };

        let tts_speed = match env("SECONDEYE_TTS_SPEED") {
            Some(raw) => parse_value::<f32>("SECONDEYE_TTS_SPEED", &raw)?,
            None => file.voice.tts_speed.unwrap_or(defaults.voice.tts_speed),
        };
        let voice = VoiceConfig {
            stt_model: env("SECONDEYE_STT_MODEL")
                .or_else(|| file.voice.stt_model.clone())
                .unwrap_or(defaults.voice.stt_model),
            tts_model: env("SECONDEYE_TTS_MODEL")
                .or_else(|| file.voice.tts_model.clone())
                .unwrap_or(defaults.voice.tts_model),
            tts_voice: env("SECONDEYE_TTS_VOICE")
                .or_else(|| file.voice.tts_voice.clone())
                .unwrap_or(defaults.voice.tts_voice),
            tts_speed,
        };

        let backend_url = env("VISION_BACKEND_URL")
            .or_else(|| file.localization.backend_url.clone())
            .map(|raw| normalize_backend_url(&raw))
            .transpose()?
            .flatten();
        let timeout_secs = match env("SECONDEYE_LOCATE_TIMEOUT_SECS") {
            Some(raw) => parse_value::<u64>("SECONDEYE_LOCATE_TIMEOUT_SECS", &raw)?,
            None => file
                .localization
                .timeout_secs
                .unwrap_or(defaults.localization.timeout.as_secs()),
        };
        if timeout_secs == 0 {
            return Err(Error::Config(
                "localization timeout must be at least 1 second".to_string(),
            ));
        }
        let localization = LocalizationConfig {
            backend_url,
            timeout: Duration::from_secs(timeout_secs),
        };

        let concurrency = match env("SECONDEYE_SEARCH_CONCURRENCY") {
            Some(raw) => parse_value::<usize>("SECONDEYE_SEARCH_CONCURRENCY", &raw)?,
            None => file
                .search
                .concurrency
                .unwrap_or(defaults.search.concurrency),
        };
        let search = SearchConfig {
            concurrency: concurrency.max(1),
            default_max_duration: file
                .search
                .max_duration_secs
                .unwrap_or(defaults.search.default_max_duration),
        };

        let port = match env("SECONDEYE_API_PORT").or_else(|| env("PORT")) {
            Some(raw) => parse_value::<u16>("SECONDEYE_API_PORT", &raw)?,
            None => file.server.port.unwrap_or(defaults.api_server.port),
        };

        Ok(Self {
            api_keys: ApiKeys { openai },
            models,
            voice,
            localization,
            search,
            api_server: ApiServerConfig { port },
            voice_style: file
                .voice_style
                .clone()
                .unwrap_or(defaults.voice_style),
        })
    }

    /// The `OpenAI` key, required by every hosted collaborator
    ///
    /// # Errors
    ///
    /// Returns error if no key is configured
    pub fn openai_key(&self) -> Result<SecretString> {
        self.api_keys
            .openai
            .clone()
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".to_string()))
    }
}

/// Validate a backend URL; blank means "not configured"
fn normalize_backend_url(raw: &str) -> Result<Option<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|e| Error::Config(format!("invalid VISION_BACKEND_URL '{trimmed}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "VISION_BACKEND_URL must be http or https, got '{}'",
            parsed.scheme()
        )));
    }

    Ok(Some(trimmed.trim_end_matches('/').to_string()))
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("invalid {key} '{raw}': {e}")))
}
