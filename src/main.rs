use anyhow::Result;
use clap::Parser;
use cantonese_mcp::config::Config;
use cantonese_mcp::{cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file before anything else (silently ignore if missing)
    dotenvy::dotenv().ok();

    let cli_args = cli::Cli::parse();

    // Config comes first so its [logging] section shapes the subscriber.
    // `init` writes the file, so it must not require one.
    let config = match cli_args.command {
        Some(cli::Commands::Init { .. }) => Config::default(),
        _ => cli::load_config(cli_args.config.as_deref())?,
    };

    let log_config = logging::LogConfig::from_config(&config.logging)
        .with_debug_mode(cli_args.debug)
        .with_log_dir(logging::log_dir_from_env());

    let _guard = logging::init_logging(log_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    // Clean up old log files (keep last 7 days)
    if cli_args.debug
        && let Ok(removed) = logging::cleanup_old_logs(&logging::log_dir_from_env(), 7)
        && removed > 0
    {
        tracing::info!("Cleaned up {} old log file(s)", removed);
    }

    cli::run(cli_args, config).await
}
