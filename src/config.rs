//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory (or
//! an explicit `-f` path), then applies `ANGIKA_LOG_LEVEL` and
//! `ANGIKA_HTTP_BIND` env overrides. The LLM API key is only ever read from
//! the environment.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::chat::{DEFAULT_FALLBACK, DEFAULT_PLACEHOLDER, DEFAULT_WELCOME};
use crate::error::AppError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Chat widget texts and persona source.
#[derive(Debug, Clone)]
pub struct GuideConfig {
    /// Model turn seeded into every new message store.
    pub welcome: String,
    /// Substituted when the remote reply carries no text.
    pub placeholder: String,
    /// Shown (marked as error) when the remote call fails.
    pub fallback: String,
    /// Optional file replacing the built-in persona instruction.
    pub persona_file: Option<PathBuf>,
}

/// Gemini provider configuration (`[llm.gemini]`).
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub api_base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// OpenAI / OpenAI-compatible provider configuration (`[llm.openai]`).
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    pub timeout_seconds: u64,
}

/// LLM configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"gemini"`, `"openai"`, `"dummy"`).
    /// Maps to `default` in `[llm]` so several provider sections can coexist.
    pub provider: String,
    pub gemini: GeminiConfig,
    pub openai: OpenAiConfig,
}

/// Console channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    pub enabled: bool,
}

/// HTTP channel configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    /// Socket address the HTTP channel binds to.
    pub bind: String,
}

#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub http: HttpConfig,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub guide: GuideConfig,
    pub llm: LlmConfig,
    pub comms: CommsConfig,
    /// From `LLM_API_KEY` (or `GEMINI_API_KEY`); `None` for keyless providers.
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Built-in defaults, used when no config file exists at the default path.
    pub fn defaults() -> Self {
        resolve(RawConfig::default(), None, None)
    }
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    guide: RawGuide,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    comms: RawComms,
}

#[derive(Deserialize)]
struct RawGuide {
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_welcome")]
    welcome: String,
    #[serde(default = "default_placeholder")]
    placeholder: String,
    #[serde(default = "default_fallback")]
    fallback: String,
    #[serde(default)]
    persona_file: Option<String>,
}

impl Default for RawGuide {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            welcome: default_welcome(),
            placeholder: default_placeholder(),
            fallback: default_fallback(),
            persona_file: None,
        }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    gemini: RawGeminiConfig,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            gemini: RawGeminiConfig::default(),
            openai: RawOpenAiConfig::default(),
        }
    }
}

#[derive(Deserialize)]
struct RawGeminiConfig {
    #[serde(default = "default_gemini_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_gemini_model")]
    model: String,
    #[serde(default = "default_gemini_temperature")]
    temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawGeminiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_gemini_api_base_url(),
            model: default_gemini_model(),
            temperature: default_gemini_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default = "default_openai_temperature")]
    temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    pty: RawPty,
    #[serde(default)]
    http: RawHttp,
}

#[derive(Deserialize)]
struct RawPty {
    #[serde(default = "default_true")]
    enabled: bool,
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Deserialize)]
struct RawHttp {
    /// Defaults to `false`: HTTP must be explicitly enabled (or `--serve`).
    #[serde(default = "default_false")]
    enabled: bool,
    #[serde(default = "default_http_bind")]
    bind: String,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_http_bind(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_welcome() -> String { DEFAULT_WELCOME.to_string() }
fn default_placeholder() -> String { DEFAULT_PLACEHOLDER.to_string() }
fn default_fallback() -> String { DEFAULT_FALLBACK.to_string() }
fn default_llm_provider() -> String { "gemini".to_string() }
fn default_gemini_api_base_url() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_gemini_model() -> String { "gemini-3-flash-preview".to_string() }
fn default_gemini_temperature() -> f32 { 1.0 }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_openai_temperature() -> f32 { 0.7 }
fn default_timeout_seconds() -> u64 { 60 }
fn default_http_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_true() -> bool { true }
fn default_false() -> bool { false }

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load config from `config_path`, or `config/default.toml`, then apply env
/// overrides. A missing file at the default path yields [`Config::defaults`];
/// a missing explicit path is an error.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let log_level_override = env::var("ANGIKA_LOG_LEVEL").ok();
    let http_bind_override = env::var("ANGIKA_HTTP_BIND").ok();

    let path = match config_path {
        Some(p) => PathBuf::from(p),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                let mut cfg = resolve(
                    RawConfig::default(),
                    log_level_override.as_deref(),
                    http_bind_override.as_deref(),
                );
                cfg.llm_api_key = api_key_from_env();
                validate(&cfg).map_err(AppError::Config)?;
                return Ok(cfg);
            }
            default
        }
    };

    load_from(
        &path,
        log_level_override.as_deref(),
        http_bind_override.as_deref(),
    )
}

/// Internal loader: accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    http_bind_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    let mut cfg = resolve(parsed, log_level_override, http_bind_override);
    cfg.llm_api_key = api_key_from_env();
    validate(&cfg)
        .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))?;
    Ok(cfg)
}

/// Reject values the chat model cannot run with. Every guide text ends up as
/// a displayed turn, and turns must carry text.
fn validate(cfg: &Config) -> Result<(), String> {
    let guide = &cfg.guide;
    for (key, value) in [
        ("welcome", &guide.welcome),
        ("placeholder", &guide.placeholder),
        ("fallback", &guide.fallback),
    ] {
        if value.trim().is_empty() {
            return Err(format!("[guide] {key} must not be blank"));
        }
    }
    if cfg.comms.http.bind.trim().is_empty() {
        return Err("[comms.http] bind must not be blank".into());
    }
    Ok(())
}

fn resolve(
    parsed: RawConfig,
    log_level_override: Option<&str>,
    http_bind_override: Option<&str>,
) -> Config {
    let g = parsed.guide;
    Config {
        log_level: log_level_override.unwrap_or(&g.log_level).to_string(),
        guide: GuideConfig {
            welcome: g.welcome,
            placeholder: g.placeholder,
            fallback: g.fallback,
            persona_file: g.persona_file.as_deref().map(expand_home),
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            gemini: GeminiConfig {
                api_base_url: parsed.llm.gemini.api_base_url,
                model: parsed.llm.gemini.model,
                temperature: parsed.llm.gemini.temperature,
                timeout_seconds: parsed.llm.gemini.timeout_seconds,
            },
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        comms: CommsConfig {
            pty: PtyConfig {
                enabled: parsed.comms.pty.enabled,
            },
            http: HttpConfig {
                enabled: parsed.comms.http.enabled,
                bind: http_bind_override
                    .map(str::to_string)
                    .unwrap_or(parsed.comms.http.bind),
            },
        },
        llm_api_key: None,
    }
}

fn api_key_from_env() -> Option<String> {
    env::var("LLM_API_KEY")
        .or_else(|_| env::var("GEMINI_API_KEY"))
        .ok()
        .filter(|k| !k.trim().is_empty())
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

/// Safe `Config` for unit tests: scripted LLM, no API keys, no network.
#[cfg(test)]
impl Config {
    pub fn test_default() -> Self {
        let mut cfg = Self::defaults();
        cfg.llm.provider = "scripted".into();
        cfg.llm.gemini.api_base_url = "http://localhost:0/v1beta".into();
        cfg.llm.gemini.timeout_seconds = 1;
        cfg.llm.openai.api_base_url = "http://localhost:0/v1/chat/completions".into();
        cfg.llm.openai.timeout_seconds = 1;
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_TOML: &str = r#"
[guide]
log_level = "warn"
"#;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parse_minimal_config() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.log_level, "warn");
        assert_eq!(cfg.llm.provider, "gemini");
        assert_eq!(cfg.llm.gemini.model, "gemini-3-flash-preview");
        assert_eq!(cfg.guide.welcome, DEFAULT_WELCOME);
        assert_eq!(cfg.guide.placeholder, "Movement unclear.");
        assert_eq!(cfg.guide.fallback, "Silence in the signal. Please try again.");
        assert!(cfg.comms.pty.enabled);
        assert!(!cfg.comms.http.enabled);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let f = write_toml("");
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.comms.http.bind, "127.0.0.1:8080");
    }

    #[test]
    fn full_config_overrides_every_section() {
        let f = write_toml(
            r#"
[guide]
welcome = "Hello, mover."
placeholder = "..."
fallback = "Try again."
persona_file = "config/prompts/persona.md"

[llm]
default = "openai"

[llm.openai]
api_base_url = "http://127.0.0.1:11434/v1/chat/completions"
model = "qwen2.5"
temperature = 0.1
timeout_seconds = 5

[comms.pty]
enabled = false

[comms.http]
enabled = true
bind = "0.0.0.0:9000"
"#,
        );
        let cfg = load_from(f.path(), None, None).unwrap();
        assert_eq!(cfg.guide.welcome, "Hello, mover.");
        assert_eq!(cfg.guide.placeholder, "...");
        assert_eq!(cfg.guide.fallback, "Try again.");
        assert_eq!(
            cfg.guide.persona_file,
            Some(PathBuf::from("config/prompts/persona.md"))
        );
        assert_eq!(cfg.llm.provider, "openai");
        assert_eq!(cfg.llm.openai.model, "qwen2.5");
        assert_eq!(cfg.llm.openai.timeout_seconds, 5);
        assert!(!cfg.comms.pty.enabled);
        assert!(cfg.comms.http.enabled);
        assert_eq!(cfg.comms.http.bind, "0.0.0.0:9000");
    }

    #[test]
    fn overrides_win_over_file() {
        let f = write_toml(MINIMAL_TOML);
        let cfg = load_from(f.path(), Some("debug"), Some("127.0.0.1:0")).unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.comms.http.bind, "127.0.0.1:0");
    }

    #[test]
    fn missing_file_errors() {
        let result = load_from(Path::new("/nonexistent/config.toml"), None, None);
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("config error"));
        assert!(msg.contains("cannot read"));
    }

    #[test]
    fn malformed_toml_errors() {
        let f = write_toml("[guide\nwelcome = ");
        let msg = load_from(f.path(), None, None).unwrap_err().to_string();
        assert!(msg.contains("parse error"));
    }

    #[test]
    fn blank_guide_texts_are_rejected() {
        for (key, toml) in [
            ("welcome", "[guide]\nwelcome = \"\"\n"),
            ("placeholder", "[guide]\nplaceholder = \"\"\n"),
            ("fallback", "[guide]\nfallback = \"   \"\n"),
        ] {
            let f = write_toml(toml);
            let msg = load_from(f.path(), None, None).unwrap_err().to_string();
            assert!(msg.contains("config error"), "{key}: {msg}");
            assert!(msg.contains(&format!("[guide] {key} must not be blank")), "{key}: {msg}");
        }
    }

    #[test]
    fn blank_bind_override_is_rejected() {
        let f = write_toml(MINIMAL_TOML);
        let msg = load_from(f.path(), None, Some(" ")).unwrap_err().to_string();
        assert!(msg.contains("bind must not be blank"));
    }

    #[test]
    fn defaults_pass_validation() {
        assert!(validate(&Config::defaults()).is_ok());
    }

    #[test]
    fn explicit_missing_path_errors() {
        assert!(load(Some("/nonexistent/angika.toml")).is_err());
    }

    #[test]
    fn tilde_expands_to_home() {
        let home = dirs::home_dir().expect("home dir must exist in test env");
        let expanded = expand_home("~/persona.md");
        assert!(expanded.starts_with(&home));
        assert!(expanded.ends_with("persona.md"));
    }

    #[test]
    fn absolute_and_relative_paths_unchanged() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("rel/path"), PathBuf::from("rel/path"));
    }

    #[test]
    fn test_default_is_offline() {
        let cfg = Config::test_default();
        assert_eq!(cfg.llm.provider, "scripted");
        assert!(cfg.llm.gemini.api_base_url.starts_with("http://localhost"));
    }
}
