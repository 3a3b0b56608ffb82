//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory: called at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod gemini;
pub mod openai_compatible;
pub mod scripted;

use crate::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct a `LlmProvider` from config and an optional API key.
///
/// `api_key` is sourced from the environment (never TOML) and may be `None`
/// for keyless local models. The scripted provider is code-only and cannot
/// be selected here.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider)),
        "gemini" => {
            let g = &config.gemini;
            let p = gemini::GeminiProvider::new(
                g.api_base_url.clone(),
                g.model.clone(),
                g.temperature,
                g.timeout_seconds,
                api_key,
            )?;
            Ok(LlmProvider::Gemini(p))
        }
        "openai" | "openai-compatible" => {
            let oai = &config.openai;
            let p = openai_compatible::OpenAiCompatibleProvider::new(
                oai.api_base_url.clone(),
                oai.model.clone(),
                oai.temperature,
                oai.timeout_seconds,
                api_key,
            )?;
            Ok(LlmProvider::OpenAiCompatible(p))
        }
        _ => Err(ProviderError::UnknownProvider(config.provider.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn llm_config(provider: &str) -> LlmConfig {
        let mut cfg = Config::test_default().llm;
        cfg.provider = provider.to_string();
        cfg
    }

    #[test]
    fn builds_dummy_without_key() {
        let p = build(&llm_config("dummy"), None).unwrap();
        assert_eq!(p.name(), "dummy");
    }

    #[test]
    fn builds_gemini_with_key() {
        let p = build(&llm_config("gemini"), Some("k".into())).unwrap();
        assert_eq!(p.name(), "gemini");
        assert_eq!(p.model(), Some("gemini-3-flash-preview"));
    }

    #[test]
    fn gemini_without_key_is_rejected() {
        let err = build(&llm_config("gemini"), None).unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey(ref name) if name == "gemini"));
    }

    #[test]
    fn openai_alias_accepted_without_key() {
        let p = build(&llm_config("openai-compatible"), None).unwrap();
        assert_eq!(p.name(), "openai");
    }

    #[test]
    fn unknown_and_scripted_are_rejected() {
        for name in ["bard", "scripted"] {
            let err = build(&llm_config(name), None).unwrap_err();
            assert!(matches!(err, ProviderError::UnknownProvider(_)), "{name}");
        }
    }
}
