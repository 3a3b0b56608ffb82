//! Scripted provider: replays a fixed queue of outcomes in order.
//!
//! Drives the chat model through success, empty-reply and failure paths in
//! tests without a network. Clones share the same queue and call log; an
//! optional delay keeps a call in flight long enough to observe `busy`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::llm::{LlmResponse, ProviderError, Turn};

#[derive(Debug, Clone)]
enum Step {
    Reply(String),
    Fail(String),
}

#[derive(Debug, Default)]
struct Script {
    steps: VecDeque<Step>,
    /// Every `turns` slice received, oldest first.
    calls: Vec<Vec<Turn>>,
    /// Every system instruction received, oldest first.
    systems: Vec<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply (may be empty).
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.lock().steps.push_back(Step::Reply(text.into()));
        self
    }

    /// Queue a failed call.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.lock().steps.push_back(Step::Fail(message.into()));
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn complete(&self, turns: &[Turn], system: Option<&str>) -> Result<LlmResponse, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let step = {
            let mut script = self.lock();
            script.calls.push(turns.to_vec());
            script.systems.push(system.map(str::to_string));
            script.steps.pop_front()
        };

        match step {
            Some(Step::Reply(text)) => Ok(LlmResponse { text, usage: None }),
            Some(Step::Fail(message)) => Err(ProviderError::Request(message)),
            None => Err(ProviderError::Request("script exhausted".into())),
        }
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// The conversation passed on call `index`.
    pub fn call(&self, index: usize) -> Option<Vec<Turn>> {
        self.lock().calls.get(index).cloned()
    }

    /// The system instruction passed on call `index`.
    pub fn system(&self, index: usize) -> Option<String> {
        self.lock().systems.get(index).cloned().flatten()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        // A poisoned script only means a test panicked mid-call; the data is still usable.
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}
