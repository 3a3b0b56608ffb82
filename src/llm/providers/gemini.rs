//! Google Gemini provider (`models/{model}:generateContent`).
//!
//! The endpoint is stateless, so every call sends the whole conversation as
//! `contents` plus the persona as `systemInstruction`. Wire types are private
//! to this module.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::chat::Role;
use crate::llm::{LlmResponse, LlmUsage, ProviderError, Turn};

// ── Public provider ───────────────────────────────────────────────────────────

/// Constructed once at startup, then cheaply cloned because `reqwest::Client`
/// is an `Arc` internally.
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

// Keeps the API key out of debug output.
impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl GeminiProvider {
    /// Build a provider. Gemini always needs a key, so `None` is rejected.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.ok_or_else(|| ProviderError::MissingApiKey("gemini".into()))?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base_url, self.model)
    }

    pub async fn complete(&self, turns: &[Turn], system: Option<&str>) -> Result<LlmResponse, ProviderError> {
        let payload = build_request(turns, system, self.temperature);

        debug!(
            model = %self.model,
            turns = turns.len(),
            has_system = system.is_some(),
            "sending Gemini request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full Gemini request payload");
        }

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, error = %e, timeout = e.is_timeout(), "Gemini request failed (transport)");
                ProviderError::Request(e.to_string())
            })?;

        let response = check_status(response).await?;

        let parsed = response.json::<GenerateContentResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize Gemini response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&parsed)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(response = %json, "full Gemini response payload");
        }

        parse_response(parsed)
    }
}

// ── Request / response mapping ────────────────────────────────────────────────

fn build_request(turns: &[Turn], system: Option<&str>, temperature: f32) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: system.map(|text| Content {
            role: None,
            parts: vec![Part { text: text.to_string() }],
        }),
        contents: turns
            .iter()
            .map(|t| Content {
                role: Some(t.role.as_str().to_string()),
                parts: vec![Part { text: t.text.clone() }],
            })
            .collect(),
        generation_config: GenerationConfig { temperature },
    }
}

/// Extract the reply text from the first candidate.
///
/// Thought parts are skipped. Missing candidates or parts yield an empty
/// reply rather than an error; a candidate authored by anyone but the model
/// is a malformed response.
fn parse_response(parsed: GenerateContentResponse) -> Result<LlmResponse, ProviderError> {
    let usage = parsed.usage_metadata.as_ref().map(|u| LlmUsage {
        input_tokens: u.prompt_token_count,
        output_tokens: u.candidates_token_count,
    });

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        if let Some(feedback) = &parsed.prompt_feedback {
            debug!(feedback = %feedback, "Gemini returned no candidates");
        }
        return Ok(LlmResponse { text: String::new(), usage });
    };

    debug!(finish_reason = ?candidate.finish_reason, "received Gemini response");

    let Some(content) = candidate.content else {
        return Ok(LlmResponse { text: String::new(), usage });
    };

    if let Some(role) = content.role.as_deref() {
        let role = role
            .parse::<Role>()
            .map_err(|e| ProviderError::Request(format!("malformed candidate: {e}")))?;
        if role != Role::Model {
            return Err(ProviderError::Request(format!(
                "malformed candidate: unexpected role '{role}'"
            )));
        }
    }

    let text: String = content
        .parts
        .into_iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text)
        .collect();

    Ok(LlmResponse { text, usage })
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

// Google API error envelope.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u16>,
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Return the response if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = error_message(status.as_u16(), &body);
    error!(%status, %message, "Gemini request returned HTTP error");
    Err(ProviderError::Request(message))
}

fn error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => {
            let code = env.error.code.unwrap_or(status);
            let tag = env.error.status.map(|s| format!(" [{s}]")).unwrap_or_default();
            format!("HTTP {code}{tag}: {}", env.error.message)
        }
        Err(_) => format!("HTTP {status}: {body}"),
    }
}
