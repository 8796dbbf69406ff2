//! Camera frames and captured audio passed through the pipeline

use std::path::Path;

use crate::{Error, Result};

/// A single camera frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Encoded image bytes
    pub data: Vec<u8>,
    /// MIME type of `data`
    pub mime_type: String,
    /// Original file name, if known
    pub filename: Option<String>,
}

impl Frame {
    /// Create a frame from raw bytes
    #[must_use]
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            filename: None,
        }
    }

    /// Attach a file name
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Read a frame from disk, guessing the MIME type from the extension
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read
    pub async fn from_path(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        let filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
        let mime_type = image_mime_for_path(path);

        Ok(Self {
            data,
            mime_type: mime_type.to_string(),
            filename,
        })
    }

    /// File name to use when uploading this frame
    #[must_use]
    pub fn upload_name(&self) -> String {
        self.filename.clone().unwrap_or_else(|| {
            format!("frame.{}", extension_for_image_mime(&self.mime_type))
        })
    }
}

/// Recorded user speech
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Encoded audio bytes
    pub data: Vec<u8>,
    /// File name hint for the transcription API (extension matters)
    pub filename: String,
}

impl AudioClip {
    /// Create a clip from raw bytes
    #[must_use]
    pub fn new(data: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            data,
            filename: filename.into(),
        }
    }

    /// Read a clip from disk
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or empty
    pub async fn from_path(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        if data.is_empty() {
            return Err(Error::InvalidInput(format!(
                "audio file is empty: {}",
                path.display()
            )));
        }

        let filename = path
            .file_name()
            .map_or_else(|| "audio.wav".to_string(), |n| n.to_string_lossy().into_owned());

        Ok(Self { data, filename })
    }

    /// MIME type derived from the file name
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        let ext = self
            .filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "mp3" | "mpeg" | "mpga" => "audio/mpeg",
            "mp4" | "m4a" => "audio/mp4",
            "webm" => "audio/webm",
            "ogg" => "audio/ogg",
            "flac" => "audio/flac",
            _ => "audio/wav",
        }
    }
}

fn image_mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

fn extension_for_image_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}
