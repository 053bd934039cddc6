//! CLI Module
//!
//! Command-line interface for cantonese-mcp using Clap v4. With no
//! subcommand the binary runs as an MCP stdio server.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::logging;
use crate::speech::{AudioFormat, SynthesisRequest, TranscriptionRequest};
use crate::tools::ToolExecutionContext;

/// cantonese-mcp - Cantonese text-to-speech and speech-to-text tools for MCP hosts
#[derive(Parser, Debug)]
#[command(name = "cantonese-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug mode (writes daily log files, see `logs status`)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the tools over MCP on stdin/stdout (default)
    Serve,

    /// Print the tool definitions advertised to MCP hosts
    Tools,

    /// Synthesize speech once and print the result
    Speak {
        /// Text to speak
        text: String,

        /// Voice ID
        #[arg(long)]
        voice: Option<String>,

        /// Speaking rate multiplier
        #[arg(long)]
        speed: Option<f32>,

        /// Pitch shift in semitones
        #[arg(long, allow_hyphen_values = true)]
        pitch: Option<i32>,

        /// Output audio format (mp3, wav, ogg, flac)
        #[arg(short, long)]
        format: Option<AudioFormat>,

        /// Convert simplified Chinese to traditional before synthesis
        #[arg(long)]
        normalize_script: bool,

        /// Where to save the audio
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Transcribe an audio file once and print the result
    Transcribe {
        /// Audio file to transcribe
        path: PathBuf,

        /// Include segment timestamps
        #[arg(long)]
        timestamps: bool,

        /// Label segments by speaker
        #[arg(long)]
        diarization: bool,
    },

    /// Show configuration
    Config {
        /// Show full configuration including secrets
        #[arg(short, long)]
        show_secrets: bool,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Log management operations
    Logs {
        #[command(subcommand)]
        operation: LogCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum LogCommands {
    /// Show log file location and status
    Status,
    /// View recent log entries (requires debug mode)
    View {
        /// Number of lines to show (default: 50)
        #[arg(short, long, default_value = "50")]
        lines: usize,
    },
    /// Clean up old log files
    Clean {
        /// Maximum age in days (default: 7)
        #[arg(short = 'a', long, default_value = "7")]
        days: u64,
    },
}

/// Main CLI entry point
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        None | Some(Commands::Serve) => cmd_serve(&config).await,
        Some(Commands::Tools) => cmd_tools(&config),
        Some(Commands::Speak {
            text,
            voice,
            speed,
            pitch,
            format,
            normalize_script,
            output,
        }) => {
            let mut request = SynthesisRequest::new(text);
            request.voice = voice;
            request.speed = speed;
            request.pitch = pitch;
            request.format = format;
            request.normalize_script = normalize_script;
            request.output_path = output;
            cmd_speak(&config, request).await
        }
        Some(Commands::Transcribe {
            path,
            timestamps,
            diarization,
        }) => {
            let request = TranscriptionRequest::new(path)
                .with_timestamps(timestamps)
                .with_diarization(diarization);
            cmd_transcribe(&config, request).await
        }
        Some(Commands::Config { show_secrets }) => cmd_config(&config, show_secrets),
        Some(Commands::Init { force }) => cmd_init(cli.config.as_deref(), force),
        Some(Commands::Logs { operation }) => cmd_logs(operation),
    }
}

/// Load configuration from `path` or the default locations, then validate
pub fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config = if let Some(path) = path {
        Config::load_from_path(path)?
    } else {
        Config::load()?
    };

    config.validate()?;

    Ok(config)
}

async fn cmd_serve(config: &Config) -> Result<()> {
    let registry = crate::tools::build_registry(config)?;
    crate::mcp::serve_stdio(registry)
        .await
        .context("MCP server stopped with an error")
}

fn cmd_tools(config: &Config) -> Result<()> {
    let registry = crate::tools::build_registry(config)?;
    let definitions = registry.get_tool_definitions();
    println!("{}", serde_json::to_string_pretty(&definitions)?);
    Ok(())
}

/// Run one tool call and print its structured result. A failed call exits
/// non-zero after printing.
async fn run_once(config: &Config, tool: &str, input: serde_json::Value) -> Result<()> {
    let registry = crate::tools::build_registry(config)?;
    let context = ToolExecutionContext::new("cli");
    let result = registry.execute(tool, input, &context).await?;

    match result.payload {
        Some(ref payload) => println!("{}", serde_json::to_string_pretty(payload)?),
        None => println!("{}", result.text()),
    }

    if !result.success {
        anyhow::bail!("{} failed", tool);
    }
    Ok(())
}

async fn cmd_speak(config: &Config, request: SynthesisRequest) -> Result<()> {
    run_once(config, "text_to_speech", serde_json::to_value(&request)?).await
}

async fn cmd_transcribe(config: &Config, request: TranscriptionRequest) -> Result<()> {
    run_once(config, "speech_to_text", serde_json::to_value(&request)?).await
}

fn cmd_config(config: &Config, show_secrets: bool) -> Result<()> {
    println!("cantonese-mcp configuration\n");

    if show_secrets {
        println!("{}", toml::to_string_pretty(config)?);
        return Ok(());
    }

    println!("API base URL: {}", config.api.base_url);
    println!(
        "API key: {}",
        if config.has_api_key() { "[SET]" } else { "[NOT SET]" }
    );
    println!(
        "Timeouts: synthesis {}s, transcription {}s",
        config.api.synthesis_timeout_secs, config.api.transcription_timeout_secs
    );
    println!(
        "Output directory: {}",
        config.output.resolved_directory().display()
    );
    println!("Default format: {}", config.output.default_format);
    println!("Log level: {}", config.logging.level);
    if let Some(ref file) = config.logging.file {
        println!("Log file: {}", file.display());
    }

    println!("\nUse --show-secrets to display the API key");
    Ok(())
}

fn cmd_init(path: Option<&std::path::Path>, force: bool) -> Result<()> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::system_config_path().context("Could not determine config directory")?,
    };

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            config_path.display()
        );
    }

    Config::default().save(&config_path)?;

    println!("Configuration initialized at: {}", config_path.display());
    println!("\nNext steps:");
    println!("   1. Set {} in the environment or [api] api_key in the file", crate::config::API_KEY_ENV);
    println!("   2. Register `cantonese-mcp serve` as a stdio server in your MCP host");

    Ok(())
}

fn cmd_logs(operation: LogCommands) -> Result<()> {
    let log_dir = logging::log_dir_from_env();

    match operation {
        LogCommands::Status => {
            println!("Log directory: {}", log_dir.display());
            match logging::get_log_path(&log_dir) {
                Some(latest) => println!("Latest log: {}", latest.display()),
                None => {
                    println!("No logs found");
                    println!("\nRun with -d to enable debug logging");
                }
            }
            Ok(())
        }

        LogCommands::View { lines } => {
            let Some(log_path) = logging::get_log_path(&log_dir) else {
                println!("No log files found. Run with -d to enable debug logging");
                return Ok(());
            };

            let contents = std::fs::read_to_string(&log_path)
                .with_context(|| format!("Failed to read {}", log_path.display()))?;
            let all_lines: Vec<&str> = contents.lines().collect();
            let start = all_lines.len().saturating_sub(lines);

            println!("Last {} lines of {}\n", lines, log_path.display());
            for line in &all_lines[start..] {
                println!("{}", line);
            }
            if all_lines.is_empty() {
                println!("(empty log file)");
            }
            Ok(())
        }

        LogCommands::Clean { days } => {
            let removed = logging::cleanup_old_logs(&log_dir, days)
                .with_context(|| format!("Failed to clean {}", log_dir.display()))?;
            if removed > 0 {
                println!("Removed {} old log file(s)", removed);
            } else {
                println!("No old log files to remove");
            }
            Ok(())
        }
    }
}
