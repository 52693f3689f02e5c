//! Request and response models for the Zaban API
//!
//! Request types validate their parameters at construction time, so an
//! invalid request can never reach the dispatcher or the network.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::core::errors::{Result, ZabanError};

/// Reject empty or whitespace-only required fields
fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ZabanError::Validation {
            message: format!("{} must not be empty", field),
        });
    }
    Ok(())
}

/// Translation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    pub source_lang: Option<String>,
    pub target_lang: String,
    pub auto_detect: bool,
}

impl TranslationRequest {
    /// Create a translation request, validating required fields
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let target_lang = target_lang.into();
        require_non_empty("text", &text)?;
        require_non_empty("target_lang", &target_lang)?;

        Ok(Self {
            text,
            source_lang: None,
            target_lang,
            auto_detect: false,
        })
    }

    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = Some(source_lang.into());
        self
    }

    pub fn with_auto_detect(mut self) -> Self {
        self.auto_detect = true;
        self
    }
}

/// Transliteration request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransliterationRequest {
    pub text: String,
    pub source_script: String,
    pub target_script: String,
    pub lang: String,
    pub topk: Option<usize>,
}

impl TransliterationRequest {
    /// Create a transliteration request, validating required fields
    pub fn new(
        text: impl Into<String>,
        source_script: impl Into<String>,
        target_script: impl Into<String>,
        lang: impl Into<String>,
    ) -> Result<Self> {
        let text = text.into();
        let source_script = source_script.into();
        let target_script = target_script.into();
        let lang = lang.into();
        require_non_empty("text", &text)?;
        require_non_empty("source_script", &source_script)?;
        require_non_empty("target_script", &target_script)?;
        require_non_empty("lang", &lang)?;

        Ok(Self {
            text,
            source_script,
            target_script,
            lang,
            topk: None,
        })
    }

    pub fn with_topk(mut self, topk: usize) -> Self {
        self.topk = Some(topk);
        self
    }
}

/// Text-to-speech request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    pub lang: String,
    pub speaker: String,
    pub format: String,
}

impl SpeechRequest {
    /// Create a speech synthesis request, validating required fields
    pub fn new(
        text: impl Into<String>,
        lang: impl Into<String>,
        speaker: impl Into<String>,
    ) -> Result<Self> {
        let text = text.into();
        let lang = lang.into();
        let speaker = speaker.into();
        require_non_empty("text", &text)?;
        require_non_empty("lang", &lang)?;
        require_non_empty("speaker", &speaker)?;

        Ok(Self {
            text,
            lang,
            speaker,
            format: "wav".to_string(),
        })
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

/// Speech-to-text request carrying raw audio bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionRequest {
    pub audio: Vec<u8>,
    pub lang: String,
    pub file_name: String,
}

impl TranscriptionRequest {
    /// Create a transcription request, validating required fields
    pub fn new(audio: Vec<u8>, lang: impl Into<String>) -> Result<Self> {
        let lang = lang.into();
        if audio.is_empty() {
            return Err(ZabanError::Validation {
                message: "audio must not be empty".to_string(),
            });
        }
        require_non_empty("lang", &lang)?;

        Ok(Self {
            audio,
            lang,
            file_name: "audio.wav".to_string(),
        })
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }
}

/// One operation against the remote service
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Translate(TranslationRequest),
    Transliterate(TransliterationRequest),
    SynthesizeSpeech(SpeechRequest),
    TranscribeSpeech(TranscriptionRequest),
}

impl Operation {
    /// Short name of the operation, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Translate(_) => "translate",
            Operation::Transliterate(_) => "transliterate",
            Operation::SynthesizeSpeech(_) => "synthesize_speech",
            Operation::TranscribeSpeech(_) => "transcribe_speech",
        }
    }
}

static NEXT_DESCRIPTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Immutable unit of work: one validated operation plus a correlation id
///
/// Descriptors are created by the caller, consumed by the dispatcher and
/// never mutated. The id is process-unique unless supplied explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    id: u64,
    operation: Operation,
    timeout: Option<Duration>,
}

impl RequestDescriptor {
    /// Create a descriptor with an auto-assigned correlation id
    pub fn new(operation: Operation) -> Self {
        Self {
            id: NEXT_DESCRIPTOR_ID.fetch_add(1, Ordering::Relaxed),
            operation,
            timeout: None,
        }
    }

    /// Create a descriptor with a caller-supplied correlation id
    pub fn with_id(id: u64, operation: Operation) -> Self {
        Self {
            id,
            operation,
            timeout: None,
        }
    }

    /// Attach a per-call timeout; on expiry the item resolves to a
    /// transport failure without affecting sibling invocations
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Translation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub translated_text: String,
    pub source_lang: Option<String>,
    pub model: Option<String>,
}

/// Transliteration result: candidate strings ranked by confidence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transliteration {
    pub results: Vec<String>,
}

impl Transliteration {
    /// Highest-confidence candidate
    pub fn top(&self) -> Option<&str> {
        self.results.first().map(|s| s.as_str())
    }
}

/// Synthesized audio payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    pub content: Vec<u8>,
    pub mime_type: String,
}

impl SpeechAudio {
    /// Write the audio bytes to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, &self.content)?;
        Ok(())
    }
}

/// Transcription result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    pub language: Option<String>,
}

/// Typed result payload matching the originating operation
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    Translation(Translation),
    Transliteration(Transliteration),
    Audio(SpeechAudio),
    Transcription(Transcription),
}

impl ResponsePayload {
    pub fn as_translation(&self) -> Option<&Translation> {
        match self {
            ResponsePayload::Translation(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_transliteration(&self) -> Option<&Transliteration> {
        match self {
            ResponsePayload::Transliteration(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<&SpeechAudio> {
        match self {
            ResponsePayload::Audio(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_transcription(&self) -> Option<&Transcription> {
        match self {
            ResponsePayload::Transcription(t) => Some(t),
            _ => None,
        }
    }
}
