//! TOML configuration file loading
//!
//! Supports `~/.config/secondeye/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults
//! and environment variables win over it.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct SecondEyeConfigFile {
    /// Model configuration
    #[serde(default)]
    pub models: ModelsFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// 3D localization backend
    #[serde(default)]
    pub localization: LocalizationFileConfig,

    /// Object search tuning
    #[serde(default)]
    pub search: SearchFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Tone guideline prepended to model prompts
    pub voice_style: Option<String>,
}

/// Model identifiers
#[derive(Debug, Default, Deserialize)]
pub struct ModelsFileConfig {
    /// Text model for intent and navigation wording (e.g. "gpt-4o-mini")
    pub llm: Option<String>,

    /// Vision model for frame questions (e.g. "gpt-4o-mini")
    pub vlm: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "nova")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f32>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
}

/// Localization backend configuration
#[derive(Debug, Default, Deserialize)]
pub struct LocalizationFileConfig {
    /// Base URL of the 3D reconstruction service; empty means mock positions
    pub backend_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Object search configuration
#[derive(Debug, Default, Deserialize)]
pub struct SearchFileConfig {
    /// Frame judgments in flight at once
    pub concurrency: Option<usize>,

    /// Default search duration quoted to the user, in seconds
    pub max_duration_secs: Option<u32>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,
}

/// Load the TOML config file from the standard path
///
/// Returns `SecondEyeConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> SecondEyeConfigFile {
    let Some(path) = config_file_path() else {
        return SecondEyeConfigFile::default();
    };

    load_config_file_from(&path)
}

/// Load a TOML config file from an explicit path
///
/// Missing or malformed files fall back to defaults with a warning.
pub fn load_config_file_from(path: &Path) -> SecondEyeConfigFile {
    if !path.exists() {
        return SecondEyeConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                SecondEyeConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            SecondEyeConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/secondeye/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("secondeye").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_parses() {
        let file: SecondEyeConfigFile = toml::from_str(
            r#"
            [models]
            vlm = "gpt-4o"

            [localization]
            backend_url = "http://localhost:9000"
            "#,
        )
        .unwrap();

        assert_eq!(file.models.vlm.as_deref(), Some("gpt-4o"));
        assert!(file.models.llm.is_none());
        assert_eq!(
            file.localization.backend_url.as_deref(),
            Some("http://localhost:9000")
        );
        assert!(file.voice.tts_voice.is_none());
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[models\nllm = ").unwrap();

        let file = load_config_file_from(&path);
        assert!(file.models.llm.is_none());
    }

    #[test]
    fn test_missing_file_is_default() {
        let file = load_config_file_from(Path::new("/nonexistent/secondeye/config.toml"));
        assert!(file.api_keys.openai.is_none());
    }
}
