//! Domain error types
//!
//! These errors represent rejected chat operations, distinct from infrastructure errors.
//! All of them are raised before any state is mutated.

use thiserror::Error;

use super::types::ChatId;

/// Errors related to chat and message operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Prompt was empty or whitespace only
    #[error("Prompt is required")]
    EmptyPrompt,

    /// Replacement text (rename or edit) was empty or whitespace only
    #[error("Text must not be blank")]
    EmptyText,

    /// No chat with this id
    #[error("Chat not found: {0}")]
    ChatNotFound(ChatId),

    /// Message index out of range
    #[error("Message {index} not found in chat {chat_id}")]
    MessageNotFound { chat_id: ChatId, index: usize },

    /// Only user turns can be edited
    #[error("Message {index} in chat {chat_id} is not a user message")]
    NotAUserMessage { chat_id: ChatId, index: usize },

    /// A generation is already running somewhere in the store
    #[error("A reply is still being generated")]
    GenerationInFlight,

    /// Placeholder update attempted with no generation running for the chat
    #[error("No generation in progress for chat {0}")]
    NoActiveGeneration(ChatId),
}

/// Errors from a generation backend call
///
/// Every variant is absorbed by the generation controller and turned into a
/// user-visible bot message.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection refused, timeout, DNS and similar
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The body could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(String),
}
