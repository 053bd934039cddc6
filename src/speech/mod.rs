//! Speech Module
//!
//! cantonese.ai text-to-speech and speech-to-text adapters. Each adapter
//! call issues at most one HTTP request and always returns a result value,
//! never an error.

pub mod client;
pub mod output;
pub mod synthesis;
pub mod transcription;
pub mod types;

pub use client::CantoneseClient;
pub use synthesis::TextToSpeech;
pub use transcription::SpeechToText;
pub use types::{
    AudioFormat, MAX_TEXT_CHARS, SynthesisRequest, SynthesisResult, TranscriptionRequest,
    TranscriptionResult,
};
