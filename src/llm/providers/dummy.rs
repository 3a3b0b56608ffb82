//! Dummy LLM provider: echoes the latest user turn prefixed with `[echo]`.
//! Lets the shells run end to end without an API key.

use crate::llm::{LlmResponse, ProviderError, Turn};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, turns: &[Turn], _system: Option<&str>) -> Result<LlmResponse, ProviderError> {
        let last = turns.last().map(|t| t.text.as_str()).unwrap_or_default();
        Ok(LlmResponse {
            text: format!("[echo] {last}"),
            usage: None,
        })
    }
}
