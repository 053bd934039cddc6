//! cantonese-mcp - Cantonese speech tools for MCP hosts
//!
//! Exposes two tools over the Model Context Protocol (stdio transport):
//!
//! - **text_to_speech:** synthesize text with cantonese.ai and save the audio to a file
//! - **speech_to_text:** transcribe a local audio file with cantonese.ai
//!
//! ## Quick Start
//!
//! ```bash
//! export CANTONESE_AI_API_KEY=...
//!
//! # Run as an MCP stdio server (default)
//! cantonese-mcp
//!
//! # One-shot calls
//! cantonese-mcp speak "早晨" --format mp3 -o morning.mp3
//! cantonese-mcp transcribe morning.mp3 --timestamps
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod speech;
pub mod tools;
pub mod utils;

// Re-export commonly used types
pub use error::{ErrorCode, SpeechError};

/// Version information
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
