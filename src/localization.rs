//! 3D localization backend client
//!
//! Asks an external reconstruction service where a target sits relative to
//! the camera that captured a frame. Without a configured backend a fixed mock
//! answer is returned; a configured backend that fails for any reason yields
//! [`LocalizationOutcome::Unavailable`] instead of an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LocalizationConfig;
use crate::frame::Frame;
use crate::geometry::{Orientation, Position3D};
use crate::{Error, Result};

/// Positions reported for one located target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalizationResult {
    /// Where the target is
    pub target_position: Position3D,
    /// Where the camera was when the frame was taken
    pub camera_position: Position3D,
    /// Which way the camera was facing
    pub camera_orientation: Orientation,
}

/// What a localization attempt produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalizationOutcome {
    /// No backend configured; fixed positions
    Mock(LocalizationResult),
    /// The backend answered with a complete payload
    Located(LocalizationResult),
    /// The backend is configured but gave no usable answer
    Unavailable,
}

impl LocalizationOutcome {
    /// Positions, when any are available
    #[must_use]
    pub const fn result(&self) -> Option<&LocalizationResult> {
        match self {
            Self::Mock(result) | Self::Located(result) => Some(result),
            Self::Unavailable => None,
        }
    }

    /// Where the positions came from: "service" or "mock"
    #[must_use]
    pub const fn source(&self) -> Option<&'static str> {
        match self {
            Self::Mock(_) => Some("mock"),
            Self::Located(_) => Some("service"),
            Self::Unavailable => None,
        }
    }
}

/// Resolves a target's 3D position from a frame
#[async_trait]
pub trait Localizer: Send + Sync {
    /// Locate `target` in `frame`; never fails
    async fn locate(&self, target: &str, frame: &Frame) -> LocalizationOutcome;
}

/// Positions used when no backend is configured
#[must_use]
pub const fn mock_result() -> LocalizationResult {
    LocalizationResult {
        target_position: Position3D::new(2.0, 0.0, 3.0),
        camera_position: Position3D::new(0.0, 0.0, 0.0),
        camera_orientation: Orientation::new(0.0, 0.0),
    }
}

/// HTTP client for the reconstruction service's `/locate` endpoint
#[derive(Debug, Clone)]
pub struct LocalizationGateway {
    client: Client,
    base_url: Option<String>,
}

impl LocalizationGateway {
    /// Create a gateway
    ///
    /// `base_url` of `None` selects the mock path.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
        })
    }

    /// Create a gateway from the localization section of [`crate::Config`]
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &LocalizationConfig) -> Result<Self> {
        Self::new(config.backend_url.clone(), config.timeout)
    }

    /// Whether a real backend is configured
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    async fn request(&self, base_url: &str, target: &str, frame: &Frame) -> Result<LocalizationResult> {
        #[derive(Deserialize)]
        struct LocateResponse {
            target_position: Option<Position3D>,
            camera_position: Option<Position3D>,
            camera_orientation: Option<Orientation>,
        }

        let url = format!("{base_url}/locate");

        let image = reqwest::multipart::Part::bytes(frame.data.clone())
            .file_name(frame.upload_name())
            .mime_str(&frame.mime_type)
            .map_err(|e| Error::Localization(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("image", image)
            .text("target_object", target.to_string());

        let response = self.client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Localization(format!(
                "backend returned {status}: {body}"
            )));
        }

        let body: LocateResponse = response.json().await?;
        match (
            body.target_position,
            body.camera_position,
            body.camera_orientation,
        ) {
            (Some(target_position), Some(camera_position), Some(camera_orientation)) => {
                Ok(LocalizationResult {
                    target_position,
                    camera_position,
                    camera_orientation,
                })
            }
            _ => Err(Error::Localization(
                "response is missing target_position, camera_position or camera_orientation"
                    .to_string(),
            )),
        }
    }
}

#[async_trait]
impl Localizer for LocalizationGateway {
    async fn locate(&self, target: &str, frame: &Frame) -> LocalizationOutcome {
        let Some(base_url) = self.base_url.as_deref() else {
            tracing::debug!(object = target, "no localization backend configured, using mock positions");
            return LocalizationOutcome::Mock(mock_result());
        };

        match self.request(base_url, target, frame).await {
            Ok(result) => {
                tracing::info!(
                    object = target,
                    target_position = %result.target_position,
                    camera_position = %result.camera_position,
                    "target localized"
                );
                LocalizationOutcome::Located(result)
            }
            Err(e) => {
                tracing::warn!(
                    object = target,
                    backend = base_url,
                    error = %e,
                    "localization unavailable"
                );
                LocalizationOutcome::Unavailable
            }
        }
    }
}
