//! cantonese.ai HTTP client
//!
//! The only code that talks to the remote API. One request per call, each
//! bounded by its own timeout; no retries.

use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::time::Duration;
use tokio_util::io::ReaderStream;

use crate::config::{ApiConfig, ApiKey};
use crate::error::SpeechError;
use crate::speech::types::{AudioFormat, SynthesisRequest, TranscriptionRequest};
use crate::utils::truncate_str;

const SYNTHESIS_PATH: &str = "/text-to-speech";
const TRANSCRIPTION_PATH: &str = "/stt";

/// Multipart field the transcription endpoint reads the audio from
pub const AUDIO_FIELD: &str = "data";

/// JSON body of a synthesis call. Optional fields the caller did not supply
/// are left out entirely so the remote applies its own defaults.
#[derive(Debug, Serialize)]
pub(crate) struct SynthesisPayload<'a> {
    api_key: &'a str,
    text: &'a str,
    output_extension: &'a str,
    should_convert_from_simplified_chinese: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pitch: Option<i32>,
}

impl<'a> SynthesisPayload<'a> {
    pub(crate) fn new(api_key: &'a ApiKey, request: &'a SynthesisRequest, format: AudioFormat) -> Self {
        Self {
            api_key: api_key.expose(),
            text: &request.text,
            output_extension: format.extension(),
            should_convert_from_simplified_chinese: request.normalize_script,
            voice_id: request.voice.as_deref(),
            speed: request.speed,
            pitch: request.pitch,
        }
    }
}

/// An opened audio file ready to be streamed
pub struct AudioUpload {
    pub file: tokio::fs::File,
    pub len: u64,
    pub file_name: String,
    pub mime_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct CantoneseClient {
    http: Client,
    base_url: String,
    synthesis_timeout: Duration,
    transcription_timeout: Duration,
}

impl CantoneseClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SpeechError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("cantonese-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SpeechError::from_transport(&e))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            synthesis_timeout: Duration::from_secs(60),
            transcription_timeout: Duration::from_secs(120),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, SpeechError> {
        Ok(Self::new(&config.base_url)?
            .with_synthesis_timeout(config.synthesis_timeout())
            .with_transcription_timeout(config.transcription_timeout()))
    }

    pub fn with_synthesis_timeout(mut self, timeout: Duration) -> Self {
        self.synthesis_timeout = timeout;
        self
    }

    pub fn with_transcription_timeout(mut self, timeout: Duration) -> Self {
        self.transcription_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn synthesis_timeout(&self) -> Duration {
        self.synthesis_timeout
    }

    pub fn transcription_timeout(&self) -> Duration {
        self.transcription_timeout
    }

    /// POST the synthesis payload and return the raw audio bytes.
    pub async fn synthesize(
        &self,
        api_key: &ApiKey,
        request: &SynthesisRequest,
        format: AudioFormat,
    ) -> Result<Vec<u8>, SpeechError> {
        let url = format!("{}{}", self.base_url, SYNTHESIS_PATH);
        let payload = SynthesisPayload::new(api_key, request, format);

        tracing::debug!(
            url = %url,
            chars = request.text.chars().count(),
            format = %format,
            voice = ?request.voice,
            "Sending synthesis request"
        );

        let response = self
            .http
            .post(&url)
            .timeout(self.synthesis_timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SpeechError::from_transport(&e))?;

        let response = check_status(response).await?;

        let audio = response
            .bytes()
            .await
            .map_err(|e| SpeechError::from_transport(&e))?
            .to_vec();

        tracing::info!("cantonese.ai TTS: received {} bytes of {} audio", audio.len(), format);

        Ok(audio)
    }

    /// Stream the audio file as multipart and return the body verbatim.
    pub async fn transcribe(
        &self,
        api_key: &ApiKey,
        request: &TranscriptionRequest,
        upload: AudioUpload,
    ) -> Result<String, SpeechError> {
        let url = format!("{}{}", self.base_url, TRANSCRIPTION_PATH);

        tracing::debug!(
            url = %url,
            file = %upload.file_name,
            bytes = upload.len,
            timestamps = request.with_timestamps,
            diarization = request.with_diarization,
            "Sending transcription request"
        );

        let body = reqwest::Body::wrap_stream(ReaderStream::new(upload.file));
        let audio_part = Part::stream_with_length(body, upload.len)
            .file_name(upload.file_name)
            .mime_str(upload.mime_type)
            .map_err(|e| SpeechError::from_transport(&e))?;

        let form = Form::new()
            .text("api_key", api_key.expose().to_string())
            .text("with_timestamp", request.with_timestamps.to_string())
            .text("with_diarization", request.with_diarization.to_string())
            .part(AUDIO_FIELD, audio_part);

        let response = self
            .http
            .post(&url)
            .timeout(self.transcription_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SpeechError::from_transport(&e))?;

        let response = check_status(response).await?;

        let payload = response
            .text()
            .await
            .map_err(|e| SpeechError::from_transport(&e))?;

        tracing::info!("cantonese.ai STT: received {} byte response", payload.len());

        Ok(payload)
    }
}

/// Non-2xx responses become `Remote` with the body kept verbatim.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SpeechError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = remote_body(response.text().await);
    tracing::warn!(
        status = status.as_u16(),
        body = truncate_str(&body, 512),
        "cantonese.ai returned an error"
    );

    Err(SpeechError::Remote {
        status: status.as_u16(),
        body,
    })
}

/// An unreadable error body is reported in its place, not dropped.
fn remote_body(read: reqwest::Result<String>) -> String {
    match read {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Failed to read cantonese.ai error body: {}", e);
            format!("<unreadable response body: {}>", e)
        }
    }
}
