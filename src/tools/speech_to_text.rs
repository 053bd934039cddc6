//! Speech-to-Text Tool
//!
//! Transcribes a local audio file with cantonese.ai. The transcription
//! response is returned as-is.

use super::error::{Result, ToolError};
use super::r#trait::{Tool, ToolCapability, ToolExecutionContext, ToolResult};
use crate::speech::{SpeechToText, TranscriptionRequest, TranscriptionResult};
use async_trait::async_trait;
use serde_json::Value;

pub struct SpeechToTextTool {
    stt: SpeechToText,
}

impl SpeechToTextTool {
    pub fn new(stt: SpeechToText) -> Self {
        Self { stt }
    }

    fn parse(input: Value) -> Result<TranscriptionRequest> {
        serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(format!("Invalid input: {}", e)))
    }
}

#[async_trait]
impl Tool for SpeechToTextTool {
    fn name(&self) -> &str {
        "speech_to_text"
    }

    fn description(&self) -> &str {
        "Transcribe a local audio file into text using the cantonese.ai API. \
         Returns the raw transcription response (JSON)."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the local audio file to transcribe (e.g. 'audio.wav')"
                },
                "with_timestamps": {
                    "type": "boolean",
                    "description": "Include segment timestamps in the transcription",
                    "default": false
                },
                "with_diarization": {
                    "type": "boolean",
                    "description": "Label segments by speaker",
                    "default": false
                }
            },
            "required": ["path"]
        })
    }

    fn capabilities(&self) -> Vec<ToolCapability> {
        vec![ToolCapability::Network, ToolCapability::ReadFiles]
    }

    fn validate_input(&self, input: &Value) -> Result<()> {
        let request = Self::parse(input.clone())?;
        // A missing key outranks bad values; the adapter reports it
        if !self.stt.has_credential() {
            return Ok(());
        }
        if request.path.as_os_str().is_empty() {
            return Err(ToolError::InvalidInput("path cannot be empty".to_string()));
        }
        Ok(())
    }

    async fn execute(&self, input: Value, context: &ToolExecutionContext) -> Result<ToolResult> {
        let request = Self::parse(input)?;

        let result = self
            .stt
            .transcribe_in(&request, &context.working_directory)
            .await;
        let payload = serde_json::to_value(&result)?;

        Ok(match &result {
            TranscriptionResult::Success { payload: raw } => {
                ToolResult::success(raw.clone()).with_payload(payload)
            }
            TranscriptionResult::Failure(err) => ToolResult::error(err.to_string())
                .with_metadata("code", err.code().as_str())
                .with_payload(payload),
        })
    }
}
