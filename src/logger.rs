//! Logging setup.
//!
//! The effective level is picked once at startup, highest first:
//!
//! 1. `-v` flags on the command line,
//! 2. `RUST_LOG`, when it parses,
//! 3. `[guide] log_level` (already replaced by `ANGIKA_LOG_LEVEL` when set).
//!
//! Output goes to stderr; the console shell owns stdout.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

use crate::error::AppError;

/// HTTP stack crates that flood `debug` with connection chatter.
const HTTP_STACK: &[&str] = &["hyper", "hyper_util", "h2", "rustls", "reqwest"];

/// Where the effective level came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSource {
    Cli,
    RustLog,
    Config,
}

/// The resolved filter directive and its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLevel {
    pub directive: String,
    pub source: LevelSource,
}

/// Map the number of `-v` flags to a level. Zero means "not given".
///
/// `-v` warn, `-vv` info, `-vvv` debug, `-vvvv` and beyond trace (full
/// provider payloads).
pub fn verbosity_level(verbosity: u8) -> Option<&'static str> {
    match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    }
}

/// Pick the effective level. `configured` is validated even when a higher
/// source wins, so a bad config file fails at startup rather than later.
pub fn resolve(verbosity: u8, rust_log: Option<&str>, configured: &str) -> Result<LogLevel, AppError> {
    parse_level(configured)?;

    if let Some(level) = verbosity_level(verbosity) {
        return Ok(LogLevel { directive: level.to_string(), source: LevelSource::Cli });
    }

    if let Some(env) = rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        if EnvFilter::try_new(env).is_ok() {
            return Ok(LogLevel { directive: env.to_string(), source: LevelSource::RustLog });
        }
    }

    Ok(LogLevel { directive: configured.to_string(), source: LevelSource::Config })
}

/// Build the filter for `level`. Unless the user wrote the directive
/// themselves (`RUST_LOG`) or asked for trace, the HTTP stack is held at
/// `warn`.
pub fn filter_for(level: &LogLevel) -> Result<EnvFilter, AppError> {
    let mut filter = EnvFilter::try_new(&level.directive)
        .map_err(|e| AppError::Logger(format!("invalid log level '{}': {e}", level.directive)))?;

    if level.source != LevelSource::RustLog && level.directive != "trace" {
        for krate in HTTP_STACK {
            let directive: Directive = format!("{krate}=warn")
                .parse()
                .map_err(|e| AppError::Logger(format!("bad directive for {krate}: {e}")))?;
            filter = filter.add_directive(directive);
        }
    }

    Ok(filter)
}

/// Install the global subscriber. Call once.
pub fn init(level: &LogLevel) -> Result<(), AppError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level)?)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Parse a plain level name, rejecting unknown values.
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.trim().is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}
