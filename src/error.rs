//! Error Types
//!
//! Failure taxonomy shared by the speech adapters. Every variant is turned
//! into a failure result at the adapter boundary; nothing here is meant to
//! escape to the MCP host as a fault.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Stable, machine-readable error codes surfaced in tool results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ConfigurationError,
    FileNotFound,
    FileUnreadable,
    RemoteError,
    TransportError,
    Timeout,
    LocalIoError,
    InvalidInput,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::FileNotFound => "FILE_NOT_FOUND",
            ErrorCode::FileUnreadable => "FILE_UNREADABLE",
            ErrorCode::RemoteError => "REMOTE_ERROR",
            ErrorCode::TransportError => "TRANSPORT_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::LocalIoError => "LOCAL_IO_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum SpeechError {
    /// The API credential is unset or still a placeholder
    #[error("{0} is not configured. Set it in the environment or the config file.")]
    Configuration(String),

    #[error("File not found at path: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Audio file is not readable: {}: {message}", .path.display())]
    FileUnreadable { path: PathBuf, message: String },

    /// Non-2xx response; status and body are kept verbatim
    #[error("API error ({status}): {body}")]
    Remote { status: u16, body: String },

    #[error("Request failed: {message}")]
    Transport { message: String, timed_out: bool },

    #[error("Failed to write audio to {}: {message}", .path.display())]
    LocalIo { path: PathBuf, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SpeechError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SpeechError::Configuration(_) => ErrorCode::ConfigurationError,
            SpeechError::FileNotFound(_) => ErrorCode::FileNotFound,
            SpeechError::FileUnreadable { .. } => ErrorCode::FileUnreadable,
            SpeechError::Remote { .. } => ErrorCode::RemoteError,
            SpeechError::Transport { timed_out: true, .. } => ErrorCode::Timeout,
            SpeechError::Transport { .. } => ErrorCode::TransportError,
            SpeechError::LocalIo { .. } => ErrorCode::LocalIoError,
            SpeechError::InvalidInput(_) => ErrorCode::InvalidInput,
        }
    }

    /// HTTP status of a remote failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            SpeechError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a reqwest failure that happened before a status was received.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        let timed_out = err.is_timeout();
        let message = if timed_out {
            format!("timed out: {}", err)
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        };
        SpeechError::Transport { message, timed_out }
    }
}
