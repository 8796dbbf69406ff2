//! Object search across camera frames
//!
//! Frames are judged in input order and the scan stops at the first positive
//! judgment. With `concurrency > 1` a few judgments run ahead of the scan
//! cursor, but results are still consumed in order so the lowest-index match
//! always wins.

use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize, Serializer};

use crate::frame::Frame;
use crate::llm::{ChatModel, ChatRequest, ModelReply};

/// Phrases that mark an unstructured reply as a negative
const NEGATION_PHRASES: &[&str] = &[
    "don't see",
    "do not see",
    "not see",
    "cannot see",
    "can't see",
    "not visible",
];

/// Result of scanning frames for a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    /// Whether any frame showed the target
    pub found: bool,
    /// First matching frame, serialized as -1 when absent
    #[serde(serialize_with = "serialize_frame_index")]
    pub frame_index: Option<usize>,
    /// Where the target is, or the not-found message
    pub description: String,
}

impl SearchOutcome {
    /// A match in frame `index`
    #[must_use]
    pub fn found(index: usize, description: impl Into<String>) -> Self {
        Self {
            found: true,
            frame_index: Some(index),
            description: description.into(),
        }
    }

    /// No frame matched
    #[must_use]
    pub fn not_found(target: &str, context_duration: u32) -> Self {
        Self {
            found: false,
            frame_index: None,
            description: not_found_message(target, context_duration),
        }
    }

    /// Frame index in the -1-for-none convention
    #[must_use]
    pub fn frame_index_or_negative(&self) -> i64 {
        self.frame_index
            .and_then(|i| i64::try_from(i).ok())
            .unwrap_or(-1)
    }
}

#[allow(clippy::ref_option, clippy::trivially_copy_pass_by_ref)]
fn serialize_frame_index<S: Serializer>(
    index: &Option<usize>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match index {
        Some(i) => serializer.serialize_u64(*i as u64),
        None => serializer.serialize_i64(-1),
    }
}

/// Message spoken when the target never showed up
#[must_use]
pub fn not_found_message(target: &str, context_duration: u32) -> String {
    format!(
        "I've been looking for the {target} for {context_duration} seconds, but I haven't \
         found it yet. Please move your camera around slowly so I can see more of the area."
    )
}

/// Verdict on a single frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameJudgment {
    /// Target visible; carries the location description
    Match(String),
    /// Target not visible, or the reply could not be trusted
    NoMatch,
}

/// Interpret a model reply about one frame
///
/// JSON replies are authoritative. Anything else goes through a text
/// heuristic: a negation phrase (or "no <target>") means no match, otherwise
/// the literal target name means a match.
#[must_use]
pub fn judge_reply(raw: &str, target: &str) -> FrameJudgment {
    #[derive(Deserialize)]
    struct RawJudgment {
        #[serde(default)]
        found: bool,
        #[serde(default)]
        description: Option<String>,
    }

    let reply = ModelReply::parse(raw);
    match &reply {
        ModelReply::Structured(_) => match reply.decode::<RawJudgment>() {
            Some(judgment) if judgment.found => FrameJudgment::Match(
                judgment
                    .description
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| "Object found.".to_string()),
            ),
            _ => FrameJudgment::NoMatch,
        },
        ModelReply::Unstructured(text) => {
            let lower = text.to_lowercase();
            let target_lower = target.to_lowercase();
            let negated = NEGATION_PHRASES.iter().any(|p| lower.contains(p))
                || lower.contains(&format!("no {target_lower}"));

            if !negated && lower.contains(&target_lower) {
                FrameJudgment::Match(text.clone())
            } else {
                FrameJudgment::NoMatch
            }
        }
    }
}

/// Scans frames for a target object with early exit
pub struct ObjectSearch {
    model: Arc<dyn ChatModel>,
    concurrency: usize,
}

impl ObjectSearch {
    /// Create a sequential search backed by a vision model
    #[must_use]
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            concurrency: 1,
        }
    }

    /// Allow up to `concurrency` frame judgments in flight
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Search `frames` in order for `target`
    ///
    /// `context_duration` only shapes the not-found wording.
    pub async fn search(
        &self,
        frames: &[Frame],
        target: &str,
        context_duration: u32,
    ) -> SearchOutcome {
        let target = target.trim();
        if target.is_empty() {
            return SearchOutcome::not_found(target, context_duration);
        }

        let system = search_system_prompt(target);

        // Futures are lazy, so frames past an early match are never judged
        let pending: Vec<_> = frames
            .iter()
            .enumerate()
            .map(|(index, frame)| self.judge_frame(index, frame, target, &system))
            .collect();
        let mut judgments = futures::stream::iter(pending).buffered(self.concurrency);

        while let Some((index, judgment)) = judgments.next().await {
            if let FrameJudgment::Match(description) = judgment {
                tracing::info!(object = target, frame_index = index, "target found");
                return SearchOutcome::found(index, description);
            }
        }

        tracing::info!(object = target, frames = frames.len(), "target not found in any frame");
        SearchOutcome::not_found(target, context_duration)
    }

    async fn judge_frame(
        &self,
        index: usize,
        frame: &Frame,
        target: &str,
        system: &str,
    ) -> (usize, FrameJudgment) {
        let request = ChatRequest::new(format!(
            "Can you see a {target} in this image? If yes, where is it located?"
        ))
        .system(system)
        .image(frame)
        .temperature(0.2);

        match self.model.complete(request).await {
            Ok(raw) => {
                let judgment = judge_reply(&raw, target);
                tracing::debug!(frame_index = index, ?judgment, "frame judged");
                (index, judgment)
            }
            Err(e) => {
                tracing::warn!(
                    frame_index = index,
                    error = %e,
                    "frame judgment failed, treating as no match"
                );
                (index, FrameJudgment::NoMatch)
            }
        }
    }
}

fn search_system_prompt(target: &str) -> String {
    format!(
        "You are a vision assistant helping to find a '{target}' in the scene. \
         Carefully examine the image and determine if the object is present.\n\n\
         IMPORTANT: Respond with valid JSON only:\n\
         {{\"found\": true/false, \"description\": \"your description here\"}}\n\n\
         If found=true: describe the location RELATIVE TO THE CAMERA, from the viewer's \
         perspective ('to your left', 'to your right', 'in front of you', 'above you', \
         'below you'), adding distance if clear ('close by', 'within reach'). Do not \
         reference other objects.\n\
         If found=false: explain you don't see it and suggest moving the camera.\n\n\
         The 'description' field MUST be in the same language as the question."
    )
}
