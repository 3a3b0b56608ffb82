//! Angika guide: entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI flags, load config
//!   3. Resolve effective log level (CLI `-v` flags > RUST_LOG > config)
//!   4. Init logger once
//!   5. Build the LLM provider and the chat controller
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Run the selected channels until they exit or shutdown is signalled

use tokio_util::sync::CancellationToken;
use tracing::info;

use angika_guide::chat::ChatController;
use angika_guide::comms::{self, ChannelSelection};
use angika_guide::error::AppError;
use angika_guide::llm::providers;
use angika_guide::{config, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present (optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let config = config::load(args.config_path.as_deref())?;

    let rust_log = std::env::var("RUST_LOG").ok();
    let log_level = logger::resolve(args.verbosity, rust_log.as_deref(), &config.log_level)?;
    logger::init(&log_level)?;

    let mut selection = ChannelSelection::from_config(&config);
    // Without -i the console stays off so the binary is safe to daemonise.
    selection.pty = selection.pty && args.interactive;
    selection.http = selection.http || args.serve;

    info!(
        provider = %config.llm.provider,
        configured_log_level = %config.log_level,
        effective_log_level = %log_level.directive,
        log_level_source = ?log_level.source,
        console = selection.pty,
        http = selection.http,
        "config loaded"
    );

    if selection.is_empty() {
        return Err(AppError::Config(
            "no channel selected; pass -i for the console or --serve for the HTTP API".into(),
        ));
    }

    let provider = providers::build(&config.llm, config.llm_api_key.clone())?;
    let controller = comms::shared(ChatController::from_config(&config, provider));

    let shutdown = CancellationToken::new();

    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    let channels = comms::start(&config, selection, controller, shutdown);
    channels
        .await
        .map_err(|e| AppError::Comms(format!("channel manager panicked: {e}")))??;

    info!("shutdown complete");
    Ok(())
}

struct CliArgs {
    /// Number of `-v` flags.
    verbosity: u8,
    interactive: bool,
    serve: bool,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut interactive = false;
    let mut serve = false;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: angika-guide [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -i, --interactive          Chat with the guide in this terminal");
                println!("      --serve                Serve the chat API over HTTP");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                println!();
                println!("Environment:");
                println!("  LLM_API_KEY                API key for the selected provider (or GEMINI_API_KEY)");
                println!("  ANGIKA_LOG_LEVEL           Override the configured log level");
                println!("  ANGIKA_HTTP_BIND           Override the HTTP bind address");
                std::process::exit(0);
            }
            "-i" | "--interactive" => interactive = true,
            "--serve" => serve = true,
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            other => eprintln!("warning: ignoring unknown argument '{other}'"),
        }
    }

    CliArgs { verbosity, interactive, serve, config_path }
}
