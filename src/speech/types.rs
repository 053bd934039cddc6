//! Request and result types for the speech adapters.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::SpeechError;

/// Maximum characters accepted for a single synthesis call
pub const MAX_TEXT_CHARS: usize = 5000;

/// Audio container requested from the synthesis endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    #[default]
    Wav,
    Ogg,
    Flac,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 4] = [
        AudioFormat::Mp3,
        AudioFormat::Wav,
        AudioFormat::Ogg,
        AudioFormat::Flac,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Flac => "audio/flac",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().trim_start_matches('.').to_ascii_lowercase();
        AudioFormat::ALL
            .into_iter()
            .find(|f| f.extension() == lower)
            .ok_or_else(|| format!("Unsupported audio format '{}'. Use one of: mp3, wav, ogg, flac", s))
    }
}

/// Text-to-speech call arguments.
///
/// `speed` (0.5–3.0) and `pitch` (-12–12) are documented ranges only; they
/// are forwarded as given and the remote side decides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<i32>,

    /// Falls back to the configured default format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<AudioFormat>,

    /// Convert simplified Chinese input to traditional before synthesis
    #[serde(default)]
    pub normalize_script: bool,

    #[serde(default, alias = "output_filename", skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            speed: None,
            pitch: None,
            format: None,
            normalize_script: false,
            output_path: None,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_pitch(mut self, pitch: i32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Boundary checks that do not depend on the remote side.
    pub fn validate(&self) -> Result<(), SpeechError> {
        if self.text.trim().is_empty() {
            return Err(SpeechError::InvalidInput("text cannot be empty".to_string()));
        }
        let chars = self.text.chars().count();
        if chars > MAX_TEXT_CHARS {
            return Err(SpeechError::InvalidInput(format!(
                "text is {} characters; the limit is {}",
                chars, MAX_TEXT_CHARS
            )));
        }
        if let Some(voice) = &self.voice
            && voice.trim().is_empty()
        {
            return Err(SpeechError::InvalidInput("voice cannot be blank".to_string()));
        }
        Ok(())
    }
}

/// Speech-to-text call arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionRequest {
    #[serde(alias = "input_filename")]
    pub path: PathBuf,

    #[serde(default, alias = "with_timestamp")]
    pub with_timestamps: bool,

    #[serde(default)]
    pub with_diarization: bool,
}

impl TranscriptionRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            with_timestamps: false,
            with_diarization: false,
        }
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.with_timestamps = enabled;
        self
    }

    pub fn with_diarization(mut self, enabled: bool) -> Self {
        self.with_diarization = enabled;
        self
    }
}

#[derive(Debug)]
pub enum SynthesisResult {
    Success {
        /// Always absolute; the file exists
        output_path: PathBuf,
        bytes_written: u64,
        format: AudioFormat,
    },
    Failure(SpeechError),
}

impl SynthesisResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SynthesisResult::Success { .. })
    }

    pub fn output_path(&self) -> Option<&Path> {
        match self {
            SynthesisResult::Success { output_path, .. } => Some(output_path),
            SynthesisResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SpeechError> {
        match self {
            SynthesisResult::Failure(err) => Some(err),
            SynthesisResult::Success { .. } => None,
        }
    }
}

impl Serialize for SynthesisResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SynthesisResult::Success {
                output_path,
                bytes_written,
                format,
            } => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("output_path", output_path)?;
                map.serialize_entry("bytes_written", bytes_written)?;
                map.serialize_entry("format", format)?;
                map.end()
            }
            SynthesisResult::Failure(err) => serialize_failure(err, serializer),
        }
    }
}

#[derive(Debug)]
pub enum TranscriptionResult {
    /// Raw response body, passed through untouched
    Success { payload: String },
    Failure(SpeechError),
}

impl TranscriptionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TranscriptionResult::Success { .. })
    }

    pub fn payload(&self) -> Option<&str> {
        match self {
            TranscriptionResult::Success { payload } => Some(payload),
            TranscriptionResult::Failure(_) => None,
        }
    }

    /// The payload as JSON, when the remote returned JSON
    pub fn payload_json(&self) -> Option<serde_json::Value> {
        self.payload().and_then(|p| serde_json::from_str(p).ok())
    }

    pub fn error(&self) -> Option<&SpeechError> {
        match self {
            TranscriptionResult::Failure(err) => Some(err),
            TranscriptionResult::Success { .. } => None,
        }
    }
}

impl Serialize for TranscriptionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TranscriptionResult::Success { payload } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &true)?;
                match serde_json::from_str::<serde_json::Value>(payload) {
                    Ok(json) => map.serialize_entry("result", &json)?,
                    Err(_) => map.serialize_entry("result", payload)?,
                }
                map.end()
            }
            TranscriptionResult::Failure(err) => serialize_failure(err, serializer),
        }
    }
}

fn serialize_failure<S: Serializer>(err: &SpeechError, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(None)?;
    map.serialize_entry("success", &false)?;
    map.serialize_entry("error", &err.to_string())?;
    map.serialize_entry("code", &err.code())?;
    if let SpeechError::Remote { status, body } = err {
        map.serialize_entry("status", status)?;
        map.serialize_entry("body", body)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("mp3", AudioFormat::Mp3)]
    #[case("WAV", AudioFormat::Wav)]
    #[case(".ogg", AudioFormat::Ogg)]
    #[case(" flac ", AudioFormat::Flac)]
    fn test_audio_format_parse(#[case] raw: &str, #[case] expected: AudioFormat) {
        assert_eq!(raw.parse::<AudioFormat>().unwrap(), expected);
    }

    #[test]
    fn test_audio_format_rejects_unknown() {
        let err = "aac".parse::<AudioFormat>().unwrap_err();
        assert!(err.contains("aac"));
    }

    #[test]
    fn test_synthesis_request_defaults() {
        let request: SynthesisRequest = serde_json::from_value(json!({ "text": "你好" })).unwrap();
        assert_eq!(request.text, "你好");
        assert!(request.voice.is_none());
        assert!(request.speed.is_none());
        assert!(request.pitch.is_none());
        assert!(request.format.is_none());
        assert!(!request.normalize_script);
        assert!(request.output_path.is_none());
    }

    #[test]
    fn test_synthesis_request_accepts_output_filename_alias() {
        let request: SynthesisRequest = serde_json::from_value(json!({
            "text": "hello",
            "output_filename": "out.mp3",
            "format": "mp3"
        }))
        .unwrap();
        assert_eq!(request.output_path, Some(PathBuf::from("out.mp3")));
        assert_eq!(request.format, Some(AudioFormat::Mp3));
    }

    #[test]
    fn test_synthesis_request_validation() {
        assert!(SynthesisRequest::new("早晨").validate().is_ok());
        assert!(SynthesisRequest::new("   ").validate().is_err());
        assert!(SynthesisRequest::new("a".repeat(MAX_TEXT_CHARS)).validate().is_ok());
        assert!(SynthesisRequest::new("a".repeat(MAX_TEXT_CHARS + 1)).validate().is_err());
        assert!(SynthesisRequest::new("hi").with_voice(" ").validate().is_err());
    }

    #[test]
    fn test_text_limit_counts_chars_not_bytes() {
        // each char is 3 bytes in UTF-8
        let text = "粵".repeat(MAX_TEXT_CHARS);
        assert!(SynthesisRequest::new(text).validate().is_ok());
    }

    #[test]
    fn test_transcription_request_aliases() {
        let request: TranscriptionRequest = serde_json::from_value(json!({
            "input_filename": "/tmp/a.wav",
            "with_timestamp": true
        }))
        .unwrap();
        assert_eq!(request.path, PathBuf::from("/tmp/a.wav"));
        assert!(request.with_timestamps);
        assert!(!request.with_diarization);
    }

    #[test]
    fn test_synthesis_success_serialization() {
        let result = SynthesisResult::Success {
            output_path: PathBuf::from("/tmp/out.wav"),
            bytes_written: 42,
            format: AudioFormat::Wav,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "output_path": "/tmp/out.wav",
                "bytes_written": 42,
                "format": "wav"
            })
        );
    }

    #[test]
    fn test_remote_failure_serialization_keeps_status_and_body() {
        let result = SynthesisResult::Failure(SpeechError::Remote {
            status: 401,
            body: r#"{"error":"bad key"}"#.to_string(),
        });
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], json!(false));
        assert_eq!(value["status"], json!(401));
        assert_eq!(value["body"], json!(r#"{"error":"bad key"}"#));
        assert_eq!(value["code"], json!("REMOTE_ERROR"));
    }

    #[test]
    fn test_transcription_success_embeds_json() {
        let result = TranscriptionResult::Success {
            payload: r#"{"text":"你好","duration":1.5}"#.to_string(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["result"], json!({"text": "你好", "duration": 1.5}));
    }

    #[test]
    fn test_transcription_success_non_json_payload_is_string() {
        let result = TranscriptionResult::Success {
            payload: "plain transcript".to_string(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["result"], json!("plain transcript"));
        assert!(result.payload_json().is_none());
    }
}
