//! Intent classification for transcribed user speech
//!
//! One model call per request turns the transcript into an [`IntentResult`].
//! Anything the model gets wrong degrades silently to a general question.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::{ChatModel, ChatRequest, ModelReply};

/// What the user wants done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Describe the scene
    Describe,
    /// Locate an object and guide the user to it
    Find,
    /// Any other question about what the camera sees
    #[default]
    General,
}

impl Intent {
    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Describe => "describe",
            Self::Find => "find",
            Self::General => "general",
        }
    }

    /// Parse a model-supplied label; unknown labels are general questions
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "describe" => Self::Describe,
            "find" => Self::Find,
            _ => Self::General,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified user request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentResult {
    /// A few words capturing the request
    pub keywords: Vec<String>,
    /// Classified intent
    pub intent: Intent,
    /// Object to locate; empty unless the model named one
    pub target_object: String,
    /// Query for the vision model, in the transcript's language
    pub enhanced_query: String,
}

impl IntentResult {
    /// The result used whenever classification cannot be trusted
    #[must_use]
    pub fn fallback(transcript: &str) -> Self {
        Self {
            keywords: Vec::new(),
            intent: Intent::General,
            target_object: String::new(),
            enhanced_query: transcript.to_string(),
        }
    }

    /// Build a result from a model reply, filling gaps with fallback values
    #[must_use]
    pub fn from_reply(reply: &ModelReply, transcript: &str) -> Self {
        #[derive(Deserialize)]
        struct RawIntent {
            #[serde(default)]
            keywords: Value,
            #[serde(default)]
            intent: Value,
            #[serde(default)]
            target_object: Value,
            #[serde(default)]
            enhanced_query: Value,
        }

        let Some(raw) = reply.decode::<RawIntent>() else {
            return Self::fallback(transcript);
        };

        // Each field is taken on its own; an ill-typed one gets its default
        let keywords = match raw.keywords {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string)
                .collect(),
            _ => Vec::new(),
        };

        let enhanced_query = raw
            .enhanced_query
            .as_str()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map_or_else(|| transcript.to_string(), ToString::to_string);

        Self {
            keywords,
            intent: raw.intent.as_str().map_or(Intent::General, Intent::from_label),
            target_object: raw.target_object.as_str().unwrap_or_default().trim().to_string(),
            enhanced_query,
        }
    }
}

/// Classifies transcripts into intents
pub struct IntentRouter {
    model: Arc<dyn ChatModel>,
    voice_style: String,
}

impl IntentRouter {
    /// Create a router backed by a text model
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>, voice_style: impl Into<String>) -> Self {
        Self {
            model,
            voice_style: voice_style.into(),
        }
    }

    /// Classify a transcript
    ///
    /// Never fails: model errors and unparsable replies yield
    /// [`IntentResult::fallback`].
    pub async fn classify(&self, transcript: &str) -> IntentResult {
        let request = ChatRequest::new(format!("User speech: {transcript}"))
            .system(self.system_prompt())
            .temperature(0.2);

        let raw = match self.model.complete(request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    model = self.model.name(),
                    error = %e,
                    "intent classification failed, treating as general query"
                );
                return IntentResult::fallback(transcript);
            }
        };

        let reply = ModelReply::parse(&raw);
        if !reply.is_structured() {
            tracing::warn!(reply = %raw, "intent reply was not JSON, treating as general query");
        }

        let result = IntentResult::from_reply(&reply, transcript);
        tracing::debug!(
            intent = %result.intent,
            object = %result.target_object,
            keywords = ?result.keywords,
            "intent classified"
        );
        result
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are an assistant specialized in understanding user requests for visual \
             assistance. Analyze the user's speech and extract:\n\
             1. Key keywords (1-5 important words)\n\
             2. User intent: 'describe' (scene description), 'find' (locate object), or 'general'\n\
             3. Target object (if user wants to find something)\n\
             4. An enhanced query that can be sent to a vision model\n\n\
             LANGUAGE RULE: every output field MUST be in the same language as the input. \
             Never translate.\n\n\
             Output MUST be valid JSON with these fields:\n\
             {{\"keywords\": [...], \"intent\": \"...\", \"target_object\": \"...\", \
             \"enhanced_query\": \"...\"}}\n\n\
             Context: {}",
            self.voice_style
        )
    }
}
