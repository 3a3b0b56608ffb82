//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Providers are stateless: every call carries the full conversation as a
//! slice of [`Turn`]s plus an optional system instruction. Conversation
//! state lives in [`crate::chat::session`].

pub mod providers;

use thiserror::Error;

use crate::chat::Role;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider '{0}' requires LLM_API_KEY")]
    MissingApiKey(String),
    #[error("provider request failed: {0}")]
    Request(String),
}

// ── Wire-neutral types ────────────────────────────────────────────────────────

/// One entry of the conversation context sent to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into() }
    }
}

/// Token counts reported by the provider, when available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A provider reply. `text` may be empty; callers decide how to present that.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Option<LlmUsage>,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new `complete` arm.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    Gemini(providers::gemini::GeminiProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    Scripted(providers::scripted::ScriptedProvider),
}

impl LlmProvider {
    /// Send the conversation in `turns` (last entry is the new user turn) and
    /// return the provider's reply.
    pub async fn complete(
        &self,
        turns: &[Turn],
        system: Option<&str>,
    ) -> Result<LlmResponse, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(turns, system).await,
            LlmProvider::Gemini(p) => p.complete(turns, system).await,
            LlmProvider::OpenAiCompatible(p) => p.complete(turns, system).await,
            LlmProvider::Scripted(p) => p.complete(turns, system).await,
        }
    }

    /// Short backend name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::Gemini(_) => "gemini",
            LlmProvider::OpenAiCompatible(_) => "openai",
            LlmProvider::Scripted(_) => "scripted",
        }
    }

    /// Model identifier sent to the backend, if the backend has one.
    pub fn model(&self) -> Option<&str> {
        match self {
            LlmProvider::Gemini(p) => Some(p.model()),
            LlmProvider::OpenAiCompatible(p) => Some(p.model()),
            LlmProvider::Dummy(_) | LlmProvider::Scripted(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::scripted::ScriptedProvider;

    #[tokio::test]
    async fn enum_dispatches_to_dummy() {
        let p = LlmProvider::Dummy(providers::dummy::DummyProvider);
        let r = p.complete(&[Turn::user("hi")], None).await.unwrap();
        assert_eq!(r.text, "[echo] hi");
        assert_eq!(p.name(), "dummy");
        assert!(p.model().is_none());
    }

    #[tokio::test]
    async fn enum_dispatches_to_scripted() {
        let p = LlmProvider::Scripted(ScriptedProvider::new().reply("Flow with it."));
        let r = p.complete(&[Turn::user("hello")], Some("sys")).await.unwrap();
        assert_eq!(r.text, "Flow with it.");
        assert_eq!(p.name(), "scripted");
    }

    #[test]
    fn turn_constructors_set_role() {
        assert_eq!(Turn::user("a").role, Role::User);
        assert_eq!(Turn::model("b").role, Role::Model);
    }
}
