//! Application Events
//!
//! Async events sent from the backend to the frontend so it can re-render
//! after every state change.

use crate::core::{ChatId, Message};

/// How a generation reached the settled state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Reply was revealed word by word
    Revealed,
    /// Reply was a single code block and shown at once
    CodeBlock,
    /// Backend returned no text
    Empty,
    /// Backend call failed; the error text was shown instead
    Failed(String),
}

/// Events emitted by the backend to the frontend
///
/// These are sent asynchronously via an mpsc channel.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    // ========== Chat Events ==========
    /// A chat was created and placed first in the list
    ChatCreated { chat_id: ChatId, title: String },

    /// The active chat changed
    ActiveChatChanged(ChatId),

    /// A chat title changed (rename, or derived from the first prompt)
    ChatRenamed { chat_id: ChatId, title: String },

    // ========== Message Events ==========
    /// A message was appended to a chat
    MessageAdded {
        chat_id: ChatId,
        index: usize,
        message: Message,
    },

    /// A message was changed in place (placeholder status, reveal, settle)
    MessageUpdated {
        chat_id: ChatId,
        index: usize,
        message: Message,
    },

    /// Messages after an edited turn were dropped; `len` is the new length
    MessagesTruncated { chat_id: ChatId, len: usize },

    // ========== Generation Events ==========
    /// A generation took the system-wide slot
    GenerationStarted { chat_id: ChatId },

    /// The generation finished and released the slot
    GenerationSettled {
        chat_id: ChatId,
        outcome: GenerationOutcome,
    },
}
