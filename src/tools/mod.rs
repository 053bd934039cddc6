//! Tool Execution Framework
//!
//! The tools this server exposes to an MCP host, plus the trait and
//! registry they plug into.

pub mod error;
pub mod registry;
mod r#trait;

pub mod speech_to_text;
pub mod text_to_speech;

pub use error::{Result, ToolError};
pub use r#trait::{Tool, ToolCapability, ToolExecutionContext, ToolResult};
pub use registry::{ToolAnnotations, ToolDefinition, ToolRegistry};
pub use speech_to_text::SpeechToTextTool;
pub use text_to_speech::TextToSpeechTool;

use std::sync::Arc;

use crate::config::Config;
use crate::error::SpeechError;
use crate::speech::{CantoneseClient, SpeechToText, TextToSpeech};

/// Build the registry with both speech tools sharing one HTTP client.
///
/// The credential is resolved once here; a missing key still registers the
/// tools so calls fail with a clear configuration message.
pub fn build_registry(config: &Config) -> std::result::Result<ToolRegistry, SpeechError> {
    let client = Arc::new(CantoneseClient::from_config(&config.api)?);
    let api_key = config.api.resolve_api_key();

    if api_key.is_none() {
        tracing::warn!(
            "{} is not set; text_to_speech and speech_to_text will fail until it is configured",
            crate::config::API_KEY_ENV
        );
    }

    let tts = TextToSpeech::new(client.clone(), api_key.clone()).with_output(&config.output);
    let stt = SpeechToText::new(client, api_key);

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(TextToSpeechTool::new(tts)));
    registry.register(Arc::new(SpeechToTextTool::new(stt)));
    Ok(registry)
}
