//! Text-to-Speech Tool
//!
//! Synthesizes Cantonese (or English) speech with cantonese.ai and saves the
//! audio to a file.

use super::error::{Result, ToolError};
use super::r#trait::{Tool, ToolCapability, ToolExecutionContext, ToolResult};
use crate::speech::{MAX_TEXT_CHARS, SynthesisRequest, SynthesisResult, TextToSpeech};
use async_trait::async_trait;
use serde_json::Value;

pub struct TextToSpeechTool {
    tts: TextToSpeech,
}

impl TextToSpeechTool {
    pub fn new(tts: TextToSpeech) -> Self {
        Self { tts }
    }

    fn parse(input: Value) -> Result<SynthesisRequest> {
        serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(format!("Invalid input: {}", e)))
    }
}

#[async_trait]
impl Tool for TextToSpeechTool {
    fn name(&self) -> &str {
        "text_to_speech"
    }

    fn description(&self) -> &str {
        "Convert text to speech using the cantonese.ai API and save the audio to a file. \
         Returns the absolute path of the saved audio file."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to be converted to speech",
                    "minLength": 1,
                    "maxLength": MAX_TEXT_CHARS
                },
                "voice": {
                    "type": "string",
                    "description": "Voice ID to synthesize with (default: the API's default voice)"
                },
                "speed": {
                    "type": "number",
                    "description": "Speaking rate multiplier",
                    "minimum": 0.5,
                    "maximum": 3.0
                },
                "pitch": {
                    "type": "integer",
                    "description": "Pitch shift in semitones",
                    "minimum": -12,
                    "maximum": 12
                },
                "format": {
                    "type": "string",
                    "enum": ["mp3", "wav", "ogg", "flac"],
                    "description": "Audio format of the output file (default: wav)",
                    "default": "wav"
                },
                "normalize_script": {
                    "type": "boolean",
                    "description": "Convert simplified Chinese text to traditional before synthesis",
                    "default": false
                },
                "output_path": {
                    "type": "string",
                    "description": "Where to save the audio. Relative paths are resolved against the server's working directory. Default: a file in the temp directory named after the format"
                }
            },
            "required": ["text"]
        })
    }

    fn capabilities(&self) -> Vec<ToolCapability> {
        vec![ToolCapability::Network, ToolCapability::WriteFiles]
    }

    fn validate_input(&self, input: &Value) -> Result<()> {
        let request = Self::parse(input.clone())?;
        // A missing key outranks bad values; the adapter reports it
        if !self.tts.has_credential() {
            return Ok(());
        }
        request
            .validate()
            .map_err(|e| ToolError::InvalidInput(e.to_string()))
    }

    async fn execute(&self, input: Value, context: &ToolExecutionContext) -> Result<ToolResult> {
        let request = Self::parse(input)?;

        let result = self
            .tts
            .synthesize_in(&request, &context.working_directory)
            .await;
        let payload = serde_json::to_value(&result)?;

        Ok(match &result {
            SynthesisResult::Success {
                output_path,
                bytes_written,
                format,
            } => ToolResult::success(format!(
                "Audio file saved to {} ({} bytes, {})",
                output_path.display(),
                bytes_written,
                format
            ))
            .with_metadata("output_path", output_path.display().to_string())
            .with_payload(payload),
            SynthesisResult::Failure(err) => ToolResult::error(err.to_string())
                .with_metadata("code", err.code().as_str())
                .with_payload(payload),
        })
    }
}
