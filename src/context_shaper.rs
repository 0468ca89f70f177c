// Conversation turns and the context-window truncation applied before a chat
// prompt is rendered.

use std::collections::VecDeque;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed characters-per-token ratio used to turn a token window into a
/// character budget.
pub const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ConversationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(ConversationError::UnknownRole(other.to_string())),
        }
    }
}

/// Reasons an inbound message cannot be turned into a [`ConversationTurn`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversationError {
    #[error("Message is not a JSON object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field '{0}' must be a string")]
    NotAString(&'static str),

    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Length in characters, the unit of the truncation budget.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Convert one `{"role", "content"}` message.
    pub fn from_message(message: &Value) -> Result<Self, ConversationError> {
        let object = message.as_object().ok_or(ConversationError::NotAnObject)?;

        let role = object
            .get("role")
            .ok_or(ConversationError::MissingField("role"))?
            .as_str()
            .ok_or(ConversationError::NotAString("role"))?
            .parse::<Role>()?;
        let text = object
            .get("content")
            .ok_or(ConversationError::MissingField("content"))?
            .as_str()
            .ok_or(ConversationError::NotAString("content"))?;

        Ok(Self::new(role, text))
    }
}

/// Convert inbound messages, skipping the ones that cannot be rendered.
pub fn turns_from_messages(messages: &[Value]) -> Vec<ConversationTurn> {
    messages
        .iter()
        .enumerate()
        .filter_map(|(idx, message)| match ConversationTurn::from_message(message) {
            Ok(turn) => Some(turn),
            Err(e) => {
                warn!("Skipping message {}: {}", idx, e);
                None
            }
        })
        .collect()
}

/// Character budget for the prompt given the model window and the room
/// reserved for generation.
pub fn char_budget(context_window_tokens: usize, max_tokens: usize) -> i64 {
    let tokens = context_window_tokens.saturating_sub(max_tokens);
    i64::try_from(tokens.saturating_mul(CHARS_PER_TOKEN)).unwrap_or(i64::MAX)
}

/// Drop the oldest turns until the conversation fits in `budget` characters.
///
/// A leading System turn is always kept whole and its length is charged to
/// the budget first, which may leave the remainder negative. The most recent
/// non-System turn is never dropped, even when it alone exceeds the budget.
/// Surviving turns keep their relative order.
pub fn shape(turns: Vec<ConversationTurn>, budget: i64) -> Vec<ConversationTurn> {
    let mut rest: VecDeque<ConversationTurn> = turns.into();

    let system = match rest.front() {
        Some(turn) if turn.role == Role::System => rest.pop_front(),
        _ => None,
    };

    let remaining = budget - system.as_ref().map_or(0, char_len_i64);
    let mut total: i64 = rest.iter().map(char_len_i64).sum();
    let mut dropped = 0usize;

    while total > remaining && rest.len() > 1 {
        if let Some(turn) = rest.pop_front() {
            total -= char_len_i64(&turn);
            dropped += 1;
        }
    }

    if dropped > 0 {
        debug!(
            "Dropped {} oldest turn(s) to fit a budget of {} characters, {} kept",
            dropped,
            budget,
            total
        );
    }
    if total > remaining {
        debug!(
            "Conversation still exceeds budget after truncation: {} > {}",
            total,
            remaining
        );
    }

    system.into_iter().chain(rest).collect()
}

fn char_len_i64(turn: &ConversationTurn) -> i64 {
    i64::try_from(turn.char_len()).unwrap_or(i64::MAX)
}
