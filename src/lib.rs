//! SecondEye - spoken visual assistance for blind and low-vision users
//!
//! This library turns a spoken question plus camera frames into a spoken
//! answer:
//! - Speech processing (Whisper STT, `OpenAI` TTS)
//! - Intent classification (describe, find, general)
//! - Object search across frames with early exit
//! - 3D localization and step-based navigation guidance
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                        │
//! │        HTTP API (/process)   │   CLI (process)       │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Orchestrator                        │
//! │   STT  │  Intent  │  Search → Locate → Navigate │ TTS │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              External services                       │
//! │   Chat/vision models  │  Whisper/TTS  │  /locate     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod intent;
pub mod llm;
pub mod localization;
pub mod navigation;
pub mod orchestrator;
pub mod search;
pub mod voice;

pub use config::Config;
pub use error::{Error, Result};
pub use frame::{AudioClip, Frame};
pub use geometry::{Orientation, Position3D};
pub use intent::{Intent, IntentResult, IntentRouter};
pub use localization::{LocalizationGateway, LocalizationOutcome, LocalizationResult, Localizer};
pub use navigation::{Direction, NavigationMetrics, NavigationPlanner};
pub use orchestrator::{
    ActionTaken, Collaborators, Orchestrator, PipelineSettings, ProcessRequest, RequestResult,
};
pub use search::{ObjectSearch, SearchOutcome};
