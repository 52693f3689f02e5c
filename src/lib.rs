//! Zaban - Rust client for the Zaban translation and speech API
//!
//! Provides typed single-call operations (translation, transliteration,
//! text-to-speech, speech-to-text) and a concurrent batch dispatcher with
//! bounded concurrency, fail-isolated outcomes and submission-order results.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;

// Re-export key types for convenience
pub use crate::core::{
    aggregate::{BatchItem, BatchReport, BatchResult, Outcome},
    client::Zaban,
    config::{ClientConfig, DEFAULT_MAX_CONCURRENT},
    dispatch::{BatchDispatcher, CancelHandle, CancelPolicy, Invoker},
    errors::{Result, ZabanError},
    models::{
        Operation, RequestDescriptor, ResponsePayload, SpeechAudio, SpeechRequest,
        Transcription, TranscriptionRequest, Translation, TranslationRequest, Transliteration,
        TransliterationRequest,
    },
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
