//! Chat data model
//!
//! Messages are owned by their chat and only ever change through `ChatStore`
//! operations, which keep the typing-placeholder invariants intact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Title given to chats created without a prompt
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// Number of characters kept when a title is derived from a prompt
pub const TITLE_MAX_CHARS: usize = 40;

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

/// One turn in a chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// True only while a bot placeholder is being animated
    #[serde(default)]
    pub is_typing: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            is_typing: false,
        }
    }

    /// Empty bot message that a generation mutates in place until settled
    pub fn placeholder() -> Self {
        Self {
            role: Role::Bot,
            content: String::new(),
            is_typing: true,
        }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            content: content.into(),
            is_typing: false,
        }
    }

    /// Settled means final content and no animation in progress
    pub fn is_settled(&self) -> bool {
        !self.is_typing
    }
}

/// Stable chat identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(pub u64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered, named conversation thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(id: ChatId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            messages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_CHAT_TITLE
    }

    /// The message currently being animated, if any
    pub fn typing_message(&self) -> Option<&Message> {
        self.messages.last().filter(|m| m.is_typing)
    }

    pub fn is_typing(&self) -> bool {
        self.messages.iter().any(|m| m.is_typing)
    }
}

/// Derive a chat title from the first prompt of a conversation.
///
/// Prompts longer than [`TITLE_MAX_CHARS`] are cut at that many characters
/// and suffixed with `...`; shorter ones are used trimmed.
pub fn title_from_prompt(prompt: &str) -> String {
    if prompt.chars().count() > TITLE_MAX_CHARS {
        let head: String = prompt.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", head)
    } else {
        prompt.trim().to_string()
    }
}
