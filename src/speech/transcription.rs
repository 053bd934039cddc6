//! Speech-to-text adapter.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{API_KEY_ENV, ApiKey};
use crate::error::SpeechError;
use crate::speech::client::{AudioUpload, CantoneseClient};
use crate::speech::output::absolutize;
use crate::speech::types::{AudioFormat, TranscriptionRequest, TranscriptionResult};

/// Uploads a local audio file and hands back the remote transcript untouched.
pub struct SpeechToText {
    client: Arc<CantoneseClient>,
    api_key: Option<ApiKey>,
}

impl SpeechToText {
    pub fn new(client: Arc<CantoneseClient>, api_key: Option<ApiKey>) -> Self {
        Self { client, api_key }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn transcribe(&self, request: &TranscriptionRequest) -> TranscriptionResult {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        self.transcribe_in(request, &cwd).await
    }

    /// Transcribe with a relative `request.path` anchored at `working_dir`.
    pub async fn transcribe_in(&self, request: &TranscriptionRequest, working_dir: &Path) -> TranscriptionResult {
        match self.try_transcribe(request, working_dir).await {
            Ok(payload) => TranscriptionResult::Success { payload },
            Err(err) => {
                tracing::warn!(code = %err.code(), "Transcription failed: {}", err);
                TranscriptionResult::Failure(err)
            }
        }
    }

    async fn try_transcribe(
        &self,
        request: &TranscriptionRequest,
        working_dir: &Path,
    ) -> Result<String, SpeechError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| SpeechError::Configuration(API_KEY_ENV.to_string()))?;

        let path = absolutize(&request.path, working_dir);
        let upload = open_audio(&path).await?;

        tracing::info!(file = %path.display(), bytes = upload.len, "Transcribing audio file");

        self.client.transcribe(api_key, request, upload).await
    }
}

/// Local precondition: the file exists, is a regular file and opens for reading.
async fn open_audio(path: &Path) -> Result<AudioUpload, SpeechError> {
    let unreadable = |message: String| SpeechError::FileUnreadable {
        path: path.to_path_buf(),
        message,
    };

    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SpeechError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(unreadable(e.to_string())),
    };

    if !metadata.is_file() {
        return Err(unreadable("not a regular file".to_string()));
    }

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| unreadable(e.to_string()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());

    Ok(AudioUpload {
        file,
        len: metadata.len(),
        mime_type: mime_for_path(path),
        file_name,
    })
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if let Ok(format) = ext.parse::<AudioFormat>() {
        return format.mime_type();
    }
    match ext.as_str() {
        "oga" | "opus" => "audio/ogg",
        "m4a" | "mp4" => "audio/mp4",
        "webm" => "audio/webm",
        "aac" => "audio/aac",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use mockito::Matcher;
    use std::time::{Duration, Instant};

    fn adapter(url: &str, key: Option<&str>) -> SpeechToText {
        let client = Arc::new(CantoneseClient::new(url).unwrap());
        SpeechToText::new(client, key.and_then(ApiKey::parse))
    }

    fn audio_fixture(dir: &Path) -> PathBuf {
        let path = dir.join("sample.wav");
        std::fs::write(&path, b"RIFF....WAVEfmt fake").unwrap();
        path
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a.WAV")), "audio/wav");
        assert_eq!(mime_for_path(Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(mime_for_path(Path::new("a.flac")), "audio/flac");
        assert_eq!(mime_for_path(Path::new("a.Ogg")), "audio/ogg");
        assert_eq!(mime_for_path(Path::new("voice.opus")), "audio/ogg");
        assert_eq!(mime_for_path(Path::new("clip.m4a")), "audio/mp4");
        assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_network_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_fixture(dir.path());
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let stt = adapter(&server.url(), Some("<your-api-key>"));
        let result = stt.transcribe_in(&TranscriptionRequest::new(&path), dir.path()).await;

        mock.assert_async().await;
        assert_eq!(result.error().unwrap().code(), ErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn test_missing_file_makes_no_network_call() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let stt = adapter(&server.url(), Some("test-key"));
        for missing in ["nope.wav", "/definitely/not/here.mp3"] {
            let result = stt
                .transcribe_in(&TranscriptionRequest::new(missing), dir.path())
                .await;
            let err = result.error().unwrap();
            assert_eq!(err.code(), ErrorCode::FileNotFound);
            assert!(err.to_string().contains("File not found at path"));
        }

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_directory_is_not_an_audio_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let stt = adapter(&server.url(), Some("test-key"));
        let result = stt
            .transcribe_in(&TranscriptionRequest::new(dir.path()), dir.path())
            .await;

        mock.assert_async().await;
        assert_eq!(result.error().unwrap().code(), ErrorCode::FileUnreadable);
    }

    #[tokio::test]
    async fn test_success_passes_payload_through_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        audio_fixture(dir.path());
        let body = r#"{"text":"你好，今日天氣好好","segments":[{"start":0.0,"end":1.2,"speaker":"A"}],"extra":null}"#;

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/stt")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="with_timestamp"\r\n\r\ntrue"#.to_string()),
                Matcher::Regex(r#"name="with_diarization"\r\n\r\ntrue"#.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let stt = adapter(&server.url(), Some("test-key"));
        let request = TranscriptionRequest::new("sample.wav")
            .with_timestamps(true)
            .with_diarization(true);
        let result = stt.transcribe_in(&request, dir.path()).await;

        mock.assert_async().await;
        assert_eq!(result.payload(), Some(body));
        assert_eq!(
            result.payload_json().unwrap(),
            serde_json::from_str::<serde_json::Value>(body).unwrap()
        );
    }

    #[tokio::test]
    async fn test_remote_error_keeps_status_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_fixture(dir.path());

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/stt")
            .with_status(401)
            .with_body(r#"{"error":"bad key"}"#)
            .create_async()
            .await;

        let stt = adapter(&server.url(), Some("wrong"));
        let result = stt.transcribe_in(&TranscriptionRequest::new(&path), dir.path()).await;

        mock.assert_async().await;
        let err = result.error().unwrap();
        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains(r#"{"error":"bad key"}"#));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_fixture(dir.path());

        // bind then drop to get a port nobody listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let stt = adapter(&format!("http://127.0.0.1:{}", port), Some("test-key"));
        let result = stt.transcribe_in(&TranscriptionRequest::new(&path), dir.path()).await;

        let err = result.error().unwrap();
        assert_eq!(err.code(), ErrorCode::TransportError);
        assert!(err.to_string().starts_with("Request failed"));
    }

    #[tokio::test]
    async fn test_timeout_returns_within_bound() {
        let dir = tempfile::tempdir().unwrap();
        let path = audio_fixture(dir.path());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = CantoneseClient::new(format!("http://{}", addr))
            .unwrap()
            .with_transcription_timeout(Duration::from_millis(300));
        let stt = SpeechToText::new(Arc::new(client), ApiKey::parse("test-key"));

        let started = Instant::now();
        let result = stt.transcribe_in(&TranscriptionRequest::new(&path), dir.path()).await;
        let elapsed = started.elapsed();

        hold.abort();
        assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
        assert_eq!(result.error().unwrap().code(), ErrorCode::Timeout);
    }
}
