//! Chat turns and the append-only message store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ChatError;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "model" => Ok(Role::Model),
            other => Err(ChatError::InvalidRole(other.to_string())),
        }
    }
}

/// One entry in the chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    /// Set on fallback turns. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into(), is_error: None }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into(), is_error: None }
    }

    /// A model turn carrying fallback text.
    pub fn error(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into(), is_error: Some(true) }
    }

    /// Build a turn from a textual role tag.
    pub fn parse(role: &str, text: impl Into<String>) -> Result<Self, ChatError> {
        let role = role.parse::<Role>()?;
        Ok(Self { role, text: text.into(), is_error: None })
    }

    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}

/// Ordered, append-only turn sequence.
///
/// The first entry is always the welcome turn. Turns are never removed,
/// edited or reordered; the role enum makes an unrecognised role
/// unrepresentable here, so [`ChatError::InvalidRole`] can only arise from
/// [`ChatMessage::parse`].
#[derive(Debug, Clone)]
pub struct MessageStore {
    turns: Vec<ChatMessage>,
}

impl MessageStore {
    pub fn new(welcome: impl Into<String>) -> Self {
        Self { turns: vec![ChatMessage::model(welcome)] }
    }

    pub fn append(&mut self, turn: ChatMessage) {
        debug_assert!(!turn.text.is_empty(), "chat turns must carry text");
        self.turns.push(turn);
    }

    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always `false`: the welcome turn is never removed.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.turns.last()
    }
}

impl<'a> IntoIterator for &'a MessageStore {
    type Item = &'a ChatMessage;
    type IntoIter = std::slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_known_tags() {
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert_eq!("model".parse::<Role>().unwrap(), Role::Model);
        assert_eq!(Role::Model.to_string(), "model");
    }

    #[test]
    fn unknown_role_is_invalid() {
        assert_eq!(
            "assistant".parse::<Role>(),
            Err(ChatError::InvalidRole("assistant".into()))
        );
        assert!(ChatMessage::parse("Model", "x").is_err());
        assert_eq!(ChatMessage::parse("user", "hi").unwrap(), ChatMessage::user("hi"));
    }

    #[test]
    fn store_starts_with_welcome() {
        let store = MessageStore::new("Welcome.");
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
        assert_eq!(store.as_slice()[0], ChatMessage::model("Welcome."));
    }

    #[test]
    fn append_preserves_insertion_order() {
        let mut store = MessageStore::new("w");
        store.append(ChatMessage::user("a"));
        store.append(ChatMessage::user("a"));
        store.append(ChatMessage::error("oops"));

        let texts: Vec<&str> = store.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["w", "a", "a", "oops"]);
        assert!(store.last().unwrap().is_error());
    }

    #[test]
    fn serializes_for_the_widget() {
        let json = serde_json::to_value(ChatMessage::error("Silence.")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "model", "text": "Silence.", "isError": true}));

        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert!(json.get("isError").is_none());
    }
}
