//! Language and vision model access
//!
//! Every model call in the pipeline goes through [`ChatModel`]: a prompt, an
//! optional camera frame, and plain text back. Callers that expect JSON parse
//! the text with [`ModelReply`] and decide their own fallback.

mod openai;
mod reply;

pub use openai::OpenAIChatModel;
pub use reply::ModelReply;

use async_trait::async_trait;

use crate::Result;
use crate::frame::Frame;

/// A single prompt sent to a model
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    /// System instructions
    pub system: Option<String>,
    /// User turn text
    pub user: String,
    /// Frame attached to the user turn
    pub image: Option<&'a Frame>,
    /// Response length cap
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: f32,
}

impl<'a> ChatRequest<'a> {
    /// Create a text-only request
    #[must_use]
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
            image: None,
            max_tokens: None,
            temperature: 0.2,
        }
    }

    /// Set system instructions
    #[must_use]
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Attach a frame
    #[must_use]
    pub const fn image(mut self, frame: &'a Frame) -> Self {
        self.image = Some(frame);
        self
    }

    /// Cap the response length
    #[must_use]
    pub const fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Trait for text and vision model backends
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion and return the reply text
    ///
    /// # Errors
    ///
    /// Returns error if the backend call fails
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
