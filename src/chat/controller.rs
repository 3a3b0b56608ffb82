//! Chat controller: the `Idle` / `AwaitingReply` state machine.
//!
//! A submit appends the user turn, clears the input buffer and raises the
//! busy flag, then hands back a [`PendingReply`]. Resolving the pending reply
//! performs the remote call without borrowing the controller; the outcome
//! re-enters through [`ChatController::settle`], which appends the model turn
//! (or the fallback turn) and returns to `Idle`.
//!
//! ```text
//!        submit(text) [text non-blank]
//!  Idle ───────────────────────────────▶ AwaitingReply
//!   ▲                                        │
//!   └──── settle(Ok | Err) ◀─────────────────┘
//! ```
//!
//! At most one request is outstanding: submits while `AwaitingReply` are
//! ignored, not queued.
//!
//! The controller also carries the widget's open/closed flag. It starts
//! closed and is independent of the request state: closing the window does
//! not cancel a pending reply.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::llm::LlmProvider;

use super::message::{ChatMessage, MessageStore};
use super::persona;
use super::session::{RemoteError, SessionClient, SessionHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    AwaitingReply,
}

/// The in-flight request produced by a successful submit.
#[derive(Debug)]
#[must_use = "a pending reply must be resolved and settled or the controller stays busy"]
pub struct PendingReply {
    session: SessionHandle,
    text: String,
}

impl PendingReply {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Perform the remote call.
    pub async fn resolve(self) -> Result<String, RemoteError> {
        self.session.send(&self.text).await
    }
}

/// Owned view of the controller for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatSnapshot {
    pub messages: Vec<ChatMessage>,
    pub busy: bool,
    pub input: String,
    pub open: bool,
}

#[derive(Debug)]
pub struct ChatController {
    store: MessageStore,
    session: SessionClient,
    input: String,
    state: ChatState,
    open: bool,
    fallback: String,
}

impl ChatController {
    pub fn new(session: SessionClient, welcome: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            store: MessageStore::new(welcome),
            session,
            input: String::new(),
            state: ChatState::Idle,
            open: false,
            fallback: fallback.into(),
        }
    }

    /// Build a controller from the guide config and an already-built provider.
    pub fn from_config(config: &Config, provider: LlmProvider) -> Self {
        let guide = &config.guide;
        let instruction = persona::load_instruction(guide.persona_file.as_deref());
        let session = SessionClient::new(provider, instruction, guide.placeholder.clone());
        Self::new(session, guide.welcome.clone(), guide.fallback.clone())
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.store.as_slice()
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == ChatState::AwaitingReply
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, value: impl Into<String>) {
        self.input = value.into();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Flip the window and return the new value.
    pub fn toggle_open(&mut self) -> bool {
        self.open = !self.open;
        self.open
    }

    pub fn sessions_created(&self) -> usize {
        self.session.sessions_created()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            messages: self.store.as_slice().to_vec(),
            busy: self.is_busy(),
            input: self.input.clone(),
            open: self.open,
        }
    }

    /// `Idle --submit(text)--> AwaitingReply`.
    ///
    /// Returns `None` without touching any state when `text` is blank or a
    /// reply is already pending.
    pub fn submit(&mut self, text: &str) -> Option<PendingReply> {
        if self.state == ChatState::AwaitingReply {
            debug!("submit ignored, reply pending");
            return None;
        }
        if text.trim().is_empty() {
            return None;
        }

        self.store.append(ChatMessage::user(text));
        self.input.clear();
        self.state = ChatState::AwaitingReply;
        info!(turns = self.store.len(), "user turn submitted");

        Some(PendingReply {
            session: self.session.ensure_session(),
            text: text.to_string(),
        })
    }

    /// Submit the current input buffer.
    pub fn submit_input(&mut self) -> Option<PendingReply> {
        let text = self.input.clone();
        self.submit(&text)
    }

    /// `AwaitingReply --resolved | failed--> Idle`.
    ///
    /// Every error becomes the fallback turn; nothing is propagated. An
    /// outcome arriving while `Idle` has no request to answer and is dropped.
    pub fn settle(&mut self, outcome: Result<String, RemoteError>) {
        if self.state != ChatState::AwaitingReply {
            warn!("settle ignored, no reply pending");
            return;
        }

        match outcome {
            Ok(text) => self.store.append(ChatMessage::model(text)),
            Err(e) => {
                warn!(error = %e, "remote call failed, showing fallback");
                self.store.append(ChatMessage::error(self.fallback.clone()));
            }
        }
        self.state = ChatState::Idle;
    }

    /// Submit, resolve and settle in one go. Returns the settled model turn,
    /// or `None` when the submit was rejected.
    pub async fn exchange(&mut self, text: &str) -> Option<&ChatMessage> {
        let pending = self.submit(text)?;
        let outcome = pending.resolve().await;
        self.settle(outcome);
        self.store.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{DEFAULT_FALLBACK, DEFAULT_PLACEHOLDER, DEFAULT_WELCOME, Role};
    use crate::llm::providers::scripted::ScriptedProvider;

    fn controller(script: &ScriptedProvider) -> ChatController {
        let session = SessionClient::new(
            LlmProvider::Scripted(script.clone()),
            "persona",
            DEFAULT_PLACEHOLDER,
        );
        ChatController::new(session, DEFAULT_WELCOME, DEFAULT_FALLBACK)
    }

    #[test]
    fn starts_idle_with_welcome() {
        let c = controller(&ScriptedProvider::new());
        assert_eq!(c.state(), ChatState::Idle);
        assert!(!c.is_busy());
        assert_eq!(c.messages(), [ChatMessage::model(DEFAULT_WELCOME)]);
        assert_eq!(c.sessions_created(), 0);
    }

    #[test]
    fn submit_appends_clears_input_and_goes_busy() {
        let mut c = controller(&ScriptedProvider::new());
        c.set_input("hello");
        let pending = c.submit_input().unwrap();

        assert_eq!(pending.text(), "hello");
        assert_eq!(c.messages().last(), Some(&ChatMessage::user("hello")));
        assert_eq!(c.input(), "");
        assert!(c.is_busy());
    }

    #[test]
    fn blank_submits_are_ignored() {
        let mut c = controller(&ScriptedProvider::new());
        c.set_input("   ");
        for text in ["", "   ", "\n\t"] {
            assert!(c.submit(text).is_none());
        }
        assert!(c.submit_input().is_none());
        assert_eq!(c.messages().len(), 1);
        assert_eq!(c.state(), ChatState::Idle);
        assert_eq!(c.input(), "   ");
        assert_eq!(c.sessions_created(), 0);
    }

    #[test]
    fn second_submit_while_pending_is_a_noop() {
        let mut c = controller(&ScriptedProvider::new());
        let _pending = c.submit("one").unwrap();
        c.set_input("two");

        assert!(c.submit("two").is_none());
        assert!(c.submit_input().is_none());
        assert_eq!(c.messages().len(), 2);
        assert!(c.is_busy());
        assert_eq!(c.input(), "two");
    }

    #[tokio::test]
    async fn success_appends_model_turn() {
        let script = ScriptedProvider::new().reply("Flow with it.");
        let mut c = controller(&script);

        let last = c.exchange("hello").await.cloned().unwrap();
        assert_eq!(last, ChatMessage::model("Flow with it."));
        assert!(!c.is_busy());
    }

    #[tokio::test]
    async fn empty_reply_shows_placeholder() {
        let mut c = controller(&ScriptedProvider::new().reply(""));
        let last = c.exchange("hello").await.cloned().unwrap();
        assert_eq!(last.text, "Movement unclear.");
        assert!(!last.is_error());
    }

    #[tokio::test]
    async fn failure_shows_fallback_and_keeps_user_turn() {
        let mut c = controller(&ScriptedProvider::new().fail("quota exceeded"));
        let last = c.exchange("hello").await.cloned().unwrap();

        assert_eq!(last, ChatMessage::error("Silence in the signal. Please try again."));
        assert!(!c.is_busy());
        assert_eq!(c.messages()[1], ChatMessage::user("hello"));
        assert_eq!(c.messages().len(), 3);
    }

    #[test]
    fn settle_while_idle_is_ignored() {
        let mut c = controller(&ScriptedProvider::new());
        c.settle(Ok("stray".into()));
        assert_eq!(c.messages().len(), 1);
        assert_eq!(c.state(), ChatState::Idle);
    }

    #[tokio::test]
    async fn split_lifecycle_alternates_roles() {
        let script = ScriptedProvider::new().reply("a").fail("x").reply("c");
        let mut c = controller(&script);

        for text in ["1", "2", "3"] {
            let pending = c.submit(text).unwrap();
            let outcome = pending.resolve().await;
            c.settle(outcome);
        }

        let roles: Vec<Role> = c.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::Model, Role::User, Role::Model, Role::User, Role::Model, Role::User, Role::Model]
        );
        assert_eq!(c.sessions_created(), 1);
        assert_eq!(script.call_count(), 3);
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut c = controller(&ScriptedProvider::new());
        c.set_input("draft");
        let snap = c.snapshot();
        assert_eq!(snap.messages.len(), 1);
        assert!(!snap.busy);
        assert_eq!(snap.input, "draft");

        let _pending = c.submit("go").unwrap();
        assert!(c.snapshot().busy);
    }

    #[test]
    fn submit_keeps_text_as_typed() {
        let mut c = controller(&ScriptedProvider::new());
        let pending = c.submit("  slow breath ").unwrap();
        assert_eq!(pending.text(), "  slow breath ");
        assert_eq!(c.messages()[1].text, "  slow breath ");
    }

    #[tokio::test]
    async fn window_flag_is_independent_of_requests() {
        let mut c = controller(&ScriptedProvider::new().reply("ok"));
        assert!(!c.is_open());
        assert!(!c.snapshot().open);
        assert!(c.toggle_open());

        let pending = c.submit("hi").unwrap();
        c.set_open(false);
        assert!(c.is_busy());

        let outcome = pending.resolve().await;
        c.settle(outcome);
        assert_eq!(c.messages().len(), 3);
        assert!(!c.snapshot().open);
    }

    #[test]
    fn from_config_uses_guide_texts() {
        let mut cfg = Config::test_default();
        cfg.guide.welcome = "Hello, mover.".into();
        let c = ChatController::from_config(&cfg, LlmProvider::Scripted(ScriptedProvider::new()));
        assert_eq!(c.messages()[0].text, "Hello, mover.");
    }
}
