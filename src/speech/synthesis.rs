//! Text-to-speech adapter.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{API_KEY_ENV, ApiKey, OutputConfig};
use crate::error::SpeechError;
use crate::speech::client::CantoneseClient;
use crate::speech::output::{resolve_output_path, write_audio};
use crate::speech::types::{AudioFormat, SynthesisRequest, SynthesisResult};

/// Turns a [`SynthesisRequest`] into an audio file on disk.
pub struct TextToSpeech {
    client: Arc<CantoneseClient>,
    api_key: Option<ApiKey>,
    output_dir: PathBuf,
    default_format: AudioFormat,
}

impl TextToSpeech {
    pub fn new(client: Arc<CantoneseClient>, api_key: Option<ApiKey>) -> Self {
        Self {
            client,
            api_key,
            output_dir: std::env::temp_dir(),
            default_format: AudioFormat::default(),
        }
    }

    pub fn with_output(mut self, output: &OutputConfig) -> Self {
        self.output_dir = output.resolved_directory();
        self.default_format = output.default_format;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Synthesize, resolving relative output paths against the process cwd.
    pub async fn synthesize(&self, request: &SynthesisRequest) -> SynthesisResult {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        self.synthesize_in(request, &cwd).await
    }

    /// Synthesize with relative paths anchored at `working_dir`. Never errors;
    /// every failure comes back as [`SynthesisResult::Failure`].
    pub async fn synthesize_in(&self, request: &SynthesisRequest, working_dir: &Path) -> SynthesisResult {
        match self.try_synthesize(request, working_dir).await {
            Ok((output_path, bytes_written, format)) => {
                tracing::info!(
                    path = %output_path.display(),
                    bytes = bytes_written,
                    "Synthesis complete"
                );
                SynthesisResult::Success {
                    output_path,
                    bytes_written,
                    format,
                }
            }
            Err(err) => {
                tracing::warn!(code = %err.code(), "Synthesis failed: {}", err);
                SynthesisResult::Failure(err)
            }
        }
    }

    async fn try_synthesize(
        &self,
        request: &SynthesisRequest,
        working_dir: &Path,
    ) -> Result<(PathBuf, u64, AudioFormat), SpeechError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| SpeechError::Configuration(API_KEY_ENV.to_string()))?;

        request.validate()?;

        let format = request.format.unwrap_or(self.default_format);
        let audio = self.client.synthesize(api_key, request, format).await?;

        let output_path = resolve_output_path(
            request.output_path.as_deref(),
            working_dir,
            &self.output_dir,
            format,
        );
        let bytes_written = write_audio(&output_path, &audio).await?;

        Ok((output_path, bytes_written, format))
    }
}
