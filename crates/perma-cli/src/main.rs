use anyhow::Result;
use clap::Parser;
use perma_acquire::client::{DEFAULT_API_ROOT, DEFAULT_MEDIA_ROOT, DEFAULT_PAGE_LIMIT};
use perma_acquire::progress::ProgressReporter;
use perma_acquire::{ApiClient, ApiConfig, ApiKey};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "perma-export")]
#[command(about = "Export your Perma archives, folders and capture files to local YAML fixtures")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Perma API key
    #[arg(short, long)]
    key: String,

    /// Directory to write fixtures and captures into (created if missing)
    #[arg(short, long)]
    output_dir: PathBuf,

    /// API root URL
    #[arg(long, default_value = DEFAULT_API_ROOT)]
    api_root: String,

    /// Media root URL capture files are served from
    #[arg(long, default_value = DEFAULT_MEDIA_ROOT)]
    media_root: String,

    /// Page size requested from list endpoints
    #[arg(
        long,
        default_value_t = DEFAULT_PAGE_LIMIT,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    page_limit: u32,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "info", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long)]
    utc: bool,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the HTTP stack quiet at debug/trace; our own request logging covers it
    let level = match cli.log_level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug,hyper=info,hyper_util=info,reqwest=info,rustls=info",
        LogLevel::Trace => "trace,hyper=info,hyper_util=info,reqwest=info,rustls=info",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Timestamp format: 2026-02-14 19:44:09.123 -08:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z";

    // Logs go to stderr so the progress line owns stdout
    if cli.utc {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::new(time_format.to_string()))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(time_format.to_string()))
            .init();
    }

    let config = ApiConfig {
        api_root: cli.api_root,
        media_root: cli.media_root,
        page_limit: cli.page_limit,
        ..ApiConfig::default()
    };
    tracing::info!(
        api_root = %config.api_root,
        media_root = %config.media_root,
        output_dir = %cli.output_dir.display(),
        "Starting export"
    );

    let client = ApiClient::new(config, ApiKey::new(cli.key))?;
    let progress = ProgressReporter::stdout();
    perma_acquire::export(&client, &cli.output_dir, &progress).await?;

    Ok(())
}
