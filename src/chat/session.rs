//! Lazily created remote conversation.
//!
//! [`SessionClient`] is owned by the controller. The first call to
//! [`SessionClient::ensure_session`] builds the one [`SessionHandle`] for the
//! controller's lifetime; later calls hand out clones of it. The handle keeps
//! the conversation context (the turns exchanged so far) and only advances it
//! when a call succeeds.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::llm::{LlmProvider, ProviderError, Turn};

/// Any failure of the outbound call.
#[derive(Debug, Error)]
#[error("remote call failed: {0}")]
pub struct RemoteError(#[from] ProviderError);

/// Owns the session handle and the recipe for building it.
#[derive(Debug)]
pub struct SessionClient {
    provider: LlmProvider,
    system_instruction: String,
    placeholder: String,
    handle: Option<SessionHandle>,
    created: usize,
}

impl SessionClient {
    pub fn new(
        provider: LlmProvider,
        system_instruction: impl Into<String>,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            system_instruction: system_instruction.into(),
            placeholder: placeholder.into(),
            handle: None,
            created: 0,
        }
    }

    /// Return the session handle, creating it on first use.
    pub fn ensure_session(&mut self) -> SessionHandle {
        if let Some(handle) = &self.handle {
            return handle.clone();
        }

        let handle = SessionHandle {
            inner: Arc::new(Mutex::new(ChatSession {
                provider: self.provider.clone(),
                system_instruction: self.system_instruction.clone(),
                placeholder: self.placeholder.clone(),
                history: Vec::new(),
            })),
        };
        self.created += 1;
        info!(
            provider = self.provider.name(),
            model = self.provider.model().unwrap_or("-"),
            "chat session created"
        );
        self.handle = Some(handle.clone());
        handle
    }

    /// Send `text` on the (lazily created) session.
    pub async fn send(&mut self, text: &str) -> Result<String, RemoteError> {
        self.ensure_session().send(text).await
    }

    /// How many handles this client has ever built (at most one).
    pub fn sessions_created(&self) -> usize {
        self.created
    }
}

/// Shared reference to the live conversation. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<ChatSession>>,
}

#[derive(Debug)]
struct ChatSession {
    provider: LlmProvider,
    system_instruction: String,
    placeholder: String,
    history: Vec<Turn>,
}

impl SessionHandle {
    /// Submit `text` as the next turn of the conversation.
    ///
    /// An empty reply is a success carrying the placeholder text. Calls on
    /// the same session are serialised.
    pub async fn send(&self, text: &str) -> Result<String, RemoteError> {
        let mut session = self.inner.lock().await;

        let mut turns = Vec::with_capacity(session.history.len() + 1);
        turns.extend_from_slice(&session.history);
        turns.push(Turn::user(text));

        let response = match session
            .provider
            .complete(&turns, Some(session.system_instruction.as_str()))
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = session.provider.name(), error = %e, "chat session call failed");
                return Err(RemoteError::from(e));
            }
        };

        if let Some(usage) = response.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "chat session usage"
            );
        }

        let reply = if response.text.trim().is_empty() {
            debug!("empty reply, substituting placeholder");
            session.placeholder.clone()
        } else {
            response.text
        };

        session.history.push(Turn::user(text));
        session.history.push(Turn::model(reply.clone()));
        Ok(reply)
    }

    /// Number of turns held as conversation context.
    pub async fn context_len(&self) -> usize {
        self.inner.lock().await.history.len()
    }

    /// `true` when both handles refer to the same session.
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
