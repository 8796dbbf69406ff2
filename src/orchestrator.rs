//! Request orchestration
//!
//! One request runs transcription, intent classification, one action and
//! speech synthesis in sequence:
//!
//! ```text
//! Init -> Transcribed -> IntentClassified -> ActionDispatched -> ResponseSynthesized -> Done
//! ```
//!
//! Model and localization failures degrade the response text. Transcription
//! and synthesis failures abort the request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::config::{Config, DEFAULT_VOICE_STYLE};
use crate::frame::{AudioClip, Frame};
use crate::intent::{Intent, IntentResult, IntentRouter};
use crate::llm::{ChatModel, ChatRequest, OpenAIChatModel};
use crate::localization::{LocalizationGateway, Localizer};
use crate::navigation::{NavigationPlanner, plan};
use crate::search::ObjectSearch;
use crate::voice::{
    SpeechSynthesizer, SpeechToText, TextToSpeech, Transcriber, validate_speech_text,
};
use crate::Result;

const NO_FRAME_DESCRIBE: &str = "I need a video frame to describe the scene.";
const NO_FRAME_QUESTION: &str = "I need a video frame to answer your question.";
const VISION_APOLOGY: &str = "I'm sorry, I couldn't look at the picture just now. Please try again.";

const DESCRIBE_SYSTEM_PROMPT: &str = "Describe the scene in 1-2 SHORT sentences only. Focus on \
the main objects and their general locations. Be direct and concise. No detailed descriptions.\n\n\
CRITICAL: Respond in the EXACT SAME language as the user's input. DO NOT translate or change the \
language.\n\nExample: 'I see a desk with a laptop and a coffee cup. There is a window on the left.'";

const GENERAL_SYSTEM_PROMPT: &str = "Answer the user's question about the image in 1-2 SHORT \
sentences. Be direct and concise. No explanations or lists.\n\nCRITICAL: You MUST respond in the \
EXACT SAME language as the user's question. DO NOT translate or change the language.";

/// Pipeline stages, logged as each one completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Transcribed,
    IntentClassified,
    ActionDispatched,
    ResponseSynthesized,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Init => "init",
            Self::Transcribed => "transcribed",
            Self::IntentClassified => "intent_classified",
            Self::ActionDispatched => "action_dispatched",
            Self::ResponseSynthesized => "response_synthesized",
            Self::Done => "done",
        })
    }
}

/// What the pipeline ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTaken {
    SceneDescription,
    /// Target found; carries `navigation_metrics` only when positions were available
    ObjectFoundNavigation,
    ObjectNotFound,
    GeneralQuery,
}

impl ActionTaken {
    /// Wire name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SceneDescription => "scene_description",
            Self::ObjectFoundNavigation => "object_found_navigation",
            Self::ObjectNotFound => "object_not_found",
            Self::GeneralQuery => "general_query",
        }
    }
}

impl std::fmt::Display for ActionTaken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs for one request
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    /// Recorded user speech
    pub audio: AudioClip,
    /// Camera frames, oldest first
    pub frames: Vec<Frame>,
    /// Where the spoken response is written
    pub output: PathBuf,
    /// Seconds quoted in the not-found message
    pub max_search_duration: Option<u32>,
}

/// Outcome of one request
#[derive(Debug, Clone, Serialize)]
pub struct RequestResult {
    pub intent: Intent,
    pub transcript: String,
    pub keywords: Vec<String>,
    pub target_object: String,
    pub action_taken: ActionTaken,
    pub response_text: String,
    /// Path of the synthesized audio
    pub audio_output: String,
    pub additional_data: Map<String, Value>,
}

/// External services the pipeline depends on
#[derive(Clone)]
pub struct Collaborators {
    pub transcriber: Arc<dyn Transcriber>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    /// Text model for intent and navigation wording
    pub language_model: Arc<dyn ChatModel>,
    /// Vision model for frame questions
    pub vision_model: Arc<dyn ChatModel>,
    pub localizer: Arc<dyn Localizer>,
}

/// Tunables that are not collaborators
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Tone guideline passed to the intent prompt
    pub voice_style: String,
    /// Frame judgments in flight at once
    pub search_concurrency: usize,
    /// Used when a request does not give `max_search_duration`
    pub default_max_search_duration: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            voice_style: DEFAULT_VOICE_STYLE.to_string(),
            search_concurrency: 1,
            default_max_search_duration: 5,
        }
    }
}

impl PipelineSettings {
    /// Settings taken from [`Config`]
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            voice_style: config.voice_style.clone(),
            search_concurrency: config.search.concurrency,
            default_max_search_duration: config.search.default_max_duration,
        }
    }
}

/// Response text and metadata produced by the dispatched action
struct ActionOutput {
    taken: ActionTaken,
    response: String,
    data: Map<String, Value>,
}

impl ActionOutput {
    fn new(taken: ActionTaken, response: impl Into<String>) -> Self {
        Self {
            taken,
            response: response.into(),
            data: Map::new(),
        }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }
}

/// Logs each stage with the time since the request started
struct StageClock {
    started: Instant,
}

impl StageClock {
    fn start() -> Self {
        tracing::info!(stage = %Stage::Init, "request started");
        Self {
            started: Instant::now(),
        }
    }

    fn mark(&self, stage: Stage) {
        let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(stage = %stage, elapsed_ms, "stage complete");
    }
}

/// Runs the perception pipeline for one request at a time
///
/// Holds only shared, read-only state; one instance serves concurrent
/// requests.
pub struct Orchestrator {
    transcriber: Arc<dyn Transcriber>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    vision: Arc<dyn ChatModel>,
    localizer: Arc<dyn Localizer>,
    router: IntentRouter,
    search: ObjectSearch,
    planner: NavigationPlanner,
    default_max_search_duration: u32,
}

impl Orchestrator {
    /// Wire the pipeline from explicit collaborators
    #[must_use]
    pub fn new(collaborators: Collaborators, settings: PipelineSettings) -> Self {
        let Collaborators {
            transcriber,
            synthesizer,
            language_model,
            vision_model,
            localizer,
        } = collaborators;

        Self {
            transcriber,
            synthesizer,
            router: IntentRouter::new(language_model.clone(), settings.voice_style),
            search: ObjectSearch::new(vision_model.clone())
                .with_concurrency(settings.search_concurrency),
            planner: NavigationPlanner::new(language_model),
            vision: vision_model,
            localizer,
            default_max_search_duration: settings.default_max_search_duration,
        }
    }

    /// Wire the pipeline against `OpenAI` and the configured localization backend
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing or a client cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let key = config.openai_key()?;

        let collaborators = Collaborators {
            transcriber: Arc::new(SpeechToText::new_whisper(
                key.clone(),
                config.voice.stt_model.clone(),
            )?),
            synthesizer: Arc::new(TextToSpeech::new_openai(
                key.clone(),
                config.voice.tts_voice.clone(),
                config.voice.tts_speed,
                config.voice.tts_model.clone(),
            )?),
            language_model: Arc::new(OpenAIChatModel::new(
                key.clone(),
                config.models.llm_model.clone(),
            )?),
            vision_model: Arc::new(OpenAIChatModel::new(key, config.models.vlm_model.clone())?),
            localizer: Arc::new(LocalizationGateway::from_config(&config.localization)?),
        };

        tracing::info!(
            llm = %config.models.llm_model,
            vlm = %config.models.vlm_model,
            localization = config.localization.backend_url.as_deref().unwrap_or("mock"),
            "pipeline configured"
        );

        Ok(Self::new(collaborators, PipelineSettings::from_config(config)))
    }

    /// Process one request end to end
    ///
    /// # Errors
    ///
    /// Returns error if transcription or synthesis fails, if the response
    /// text is empty, or if the audio cannot be written to `request.output`
    pub async fn process(&self, request: ProcessRequest) -> Result<RequestResult> {
        let span = tracing::info_span!("request", request_id = %uuid::Uuid::new_v4());
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: ProcessRequest) -> Result<RequestResult> {
        let clock = StageClock::start();
        let ProcessRequest {
            audio,
            frames,
            output,
            max_search_duration,
        } = request;

        let transcript = self.transcriber.transcribe(&audio).await?;
        clock.mark(Stage::Transcribed);

        let intent = self.router.classify(&transcript).await;
        tracing::info!(
            intent = %intent.intent,
            object = %intent.target_object,
            query = %intent.enhanced_query,
            "intent classified"
        );
        clock.mark(Stage::IntentClassified);

        let context_duration = max_search_duration.unwrap_or(self.default_max_search_duration);
        let action = self.dispatch(&intent, &frames, context_duration).await?;
        tracing::info!(action = %action.taken, frames = frames.len(), "action complete");
        clock.mark(Stage::ActionDispatched);

        let text = validate_speech_text(&action.response)?;
        let speech = self.synthesizer.synthesize(text).await?;
        tokio::fs::write(&output, &speech).await?;
        tracing::debug!(
            path = %output.display(),
            audio_bytes = speech.len(),
            "response audio written"
        );
        clock.mark(Stage::ResponseSynthesized);

        let IntentResult {
            keywords,
            intent,
            target_object,
            ..
        } = intent;

        clock.mark(Stage::Done);
        Ok(RequestResult {
            intent,
            transcript,
            keywords,
            target_object,
            action_taken: action.taken,
            response_text: action.response,
            audio_output: output.display().to_string(),
            additional_data: action.data,
        })
    }

    async fn dispatch(
        &self,
        intent: &IntentResult,
        frames: &[Frame],
        context_duration: u32,
    ) -> Result<ActionOutput> {
        match intent.intent {
            Intent::Describe => {
                let response = self
                    .ask_vision(
                        frames.first(),
                        &intent.enhanced_query,
                        DESCRIBE_SYSTEM_PROMPT,
                        60,
                        NO_FRAME_DESCRIBE,
                    )
                    .await;
                Ok(ActionOutput::new(ActionTaken::SceneDescription, response))
            }
            Intent::Find if !intent.target_object.is_empty() => {
                self.find(&intent.target_object, frames, context_duration).await
            }
            Intent::Find | Intent::General => {
                let response = self
                    .ask_vision(
                        frames.first(),
                        &intent.enhanced_query,
                        GENERAL_SYSTEM_PROMPT,
                        50,
                        NO_FRAME_QUESTION,
                    )
                    .await;
                Ok(ActionOutput::new(ActionTaken::GeneralQuery, response))
            }
        }
    }

    async fn find(
        &self,
        target: &str,
        frames: &[Frame],
        context_duration: u32,
    ) -> Result<ActionOutput> {
        let outcome = self.search.search(frames, target, context_duration).await;

        let Some(frame) = outcome.frame_index.and_then(|i| frames.get(i)) else {
            return Ok(
                ActionOutput::new(ActionTaken::ObjectNotFound, outcome.description)
                    .with("object_found", Value::Bool(false)),
            );
        };

        let located = self.localizer.locate(target, frame).await;
        let (Some(result), Some(source)) = (located.result(), located.source()) else {
            tracing::info!(object = target, "positions unavailable, confirming the find only");
            return Ok(
                ActionOutput::new(ActionTaken::ObjectFoundNavigation, outcome.description)
                    .with("object_found", Value::Bool(true)),
            );
        };

        let metrics = plan(
            &result.camera_position,
            &result.camera_orientation,
            &result.target_position,
        );
        tracing::info!(
            object = target,
            source,
            distance = metrics.distance,
            relative_angle = metrics.relative_angle,
            direction = %metrics.direction,
            "navigation planned"
        );
        let instructions = self.planner.instructions(target, &metrics).await;

        Ok(ActionOutput::new(ActionTaken::ObjectFoundNavigation, instructions)
            .with("object_found", Value::Bool(true))
            .with("navigation_metrics", serde_json::to_value(metrics)?)
            .with("raw_position_data", serde_json::to_value(result)?)
            .with("position_source", Value::String(source.to_string())))
    }

    async fn ask_vision(
        &self,
        frame: Option<&Frame>,
        query: &str,
        system: &str,
        max_tokens: u32,
        no_frame_text: &str,
    ) -> String {
        let Some(frame) = frame else {
            return no_frame_text.to_string();
        };

        let request = ChatRequest::new(query)
            .system(system)
            .image(frame)
            .max_tokens(max_tokens)
            .temperature(0.3);

        match self.vision.complete(request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!(model = self.vision.name(), "vision model returned no text");
                VISION_APOLOGY.to_string()
            }
            Err(e) => {
                tracing::warn!(model = self.vision.name(), error = %e, "vision request failed");
                VISION_APOLOGY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_match_wire_format() {
        for action in [
            ActionTaken::SceneDescription,
            ActionTaken::ObjectFoundNavigation,
            ActionTaken::ObjectNotFound,
            ActionTaken::GeneralQuery,
        ] {
            assert_eq!(
                serde_json::to_value(action).unwrap(),
                Value::String(action.as_str().to_string())
            );
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.search_concurrency, 1);
        assert_eq!(settings.default_max_search_duration, 5);
        assert_eq!(settings.voice_style, DEFAULT_VOICE_STYLE);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::IntentClassified.to_string(), "intent_classified");
        assert_eq!(Stage::Done.to_string(), "done");
    }
}
