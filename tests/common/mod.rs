//! Shared test utilities
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secondeye::llm::{ChatModel, ChatRequest};
use secondeye::voice::{SpeechSynthesizer, Transcriber};
use secondeye::{
    AudioClip, Collaborators, Error, Frame, LocalizationGateway, LocalizationOutcome, Localizer,
    Orchestrator, PipelineSettings, Result,
};

/// Bytes every mock synthesis returns
pub const FAKE_MP3: &[u8] = b"ID3-fake-mp3";

/// Text model that answers from a queue, recording each user prompt
///
/// `None` entries (and an exhausted queue) produce a model error.
#[derive(Default)]
pub struct QueueModel {
    replies: Mutex<VecDeque<Option<String>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl QueueModel {
    pub fn new(replies: impl IntoIterator<Item = Option<&'static str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(String::from)).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for QueueModel {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
        self.prompts.lock().unwrap().push(request.user);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .flatten()
            .ok_or_else(|| Error::Model("scripted failure".to_string()))
    }

    fn name(&self) -> &'static str {
        "queue"
    }
}

/// Vision model that answers per frame file name, recording the frames it saw
pub struct FrameModel {
    replies: HashMap<String, Option<String>>,
    default_reply: Option<String>,
    pub seen: Mutex<Vec<String>>,
}

impl FrameModel {
    /// `replies` maps frame file names to replies; `None` is a model error
    pub fn new(
        replies: impl IntoIterator<Item = (&'static str, Option<&'static str>)>,
        default_reply: Option<&'static str>,
    ) -> Arc<Self> {
        Arc::new(Self {
            replies: replies
                .into_iter()
                .map(|(name, reply)| (name.to_string(), reply.map(String::from)))
                .collect(),
            default_reply: default_reply.map(String::from),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for FrameModel {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
        let name = request
            .image
            .map(Frame::upload_name)
            .unwrap_or_default();
        self.seen.lock().unwrap().push(name.clone());

        self.replies
            .get(&name)
            .cloned()
            .unwrap_or_else(|| self.default_reply.clone())
            .ok_or_else(|| Error::Model(format!("scripted failure for {name}")))
    }

    fn name(&self) -> &'static str {
        "frames"
    }
}

/// Transcriber returning a fixed transcript, or failing when `None`
pub struct FixedTranscriber(pub Option<&'static str>);

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio: &AudioClip) -> Result<String> {
        self.0
            .map(String::from)
            .ok_or_else(|| Error::Stt("scripted transcription failure".to_string()))
    }
}

/// Synthesizer recording every text it is asked to speak
#[derive(Default)]
pub struct RecordingSynthesizer {
    pub fail: bool,
    pub texts: Mutex<Vec<String>>,
}

impl RecordingSynthesizer {
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Tts("scripted synthesis failure".to_string()));
        }
        Ok(FAKE_MP3.to_vec())
    }
}

/// Localizer returning a fixed outcome, recording (target, frame name) pairs
pub struct StubLocalizer {
    outcome: LocalizationOutcome,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl StubLocalizer {
    pub fn new(outcome: LocalizationOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Localizer for StubLocalizer {
    async fn locate(&self, target: &str, frame: &Frame) -> LocalizationOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((target.to_string(), frame.upload_name()));
        self.outcome
    }
}

/// Frames named `frame_0.jpg` .. `frame_{n-1}.jpg`
pub fn frames(n: usize) -> Vec<Frame> {
    (0..n)
        .map(|i| {
            Frame::new(format!("frame-{i}").into_bytes(), "image/jpeg")
                .with_filename(format!("frame_{i}.jpg"))
        })
        .collect()
}

/// A short fake recording
pub fn audio() -> AudioClip {
    AudioClip::new(b"RIFF-fake-wav".to_vec(), "question.wav")
}

/// Localizer with no backend configured (mock positions)
pub fn mock_localizer() -> Arc<dyn Localizer> {
    Arc::new(LocalizationGateway::new(None, std::time::Duration::from_secs(1)).unwrap())
}

/// Everything a test needs to drive and inspect one orchestrator
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub language: Arc<QueueModel>,
    pub vision: Arc<FrameModel>,
    pub synthesizer: Arc<RecordingSynthesizer>,
}

/// Wire an orchestrator from mocks
pub fn harness(
    transcript: Option<&'static str>,
    language: Arc<QueueModel>,
    vision: Arc<FrameModel>,
    localizer: Arc<dyn Localizer>,
    synthesizer: RecordingSynthesizer,
) -> Harness {
    let synthesizer = Arc::new(synthesizer);
    let orchestrator = Orchestrator::new(
        Collaborators {
            transcriber: Arc::new(FixedTranscriber(transcript)),
            synthesizer: synthesizer.clone(),
            language_model: language.clone(),
            vision_model: vision.clone(),
            localizer,
        },
        PipelineSettings::default(),
    );

    Harness {
        orchestrator,
        language,
        vision,
        synthesizer,
    }
}
