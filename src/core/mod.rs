//! Core domain modules
//!
//! This module contains the chat data model and the store that owns it,
//! shared by the ui_backend layer and every front end.

pub mod chat_store;
pub mod errors;
pub mod traits;
pub mod types;

// Re-export main types for convenience
pub use chat_store::{ChatStore, EditSubmission, GenerationTicket, PromptSubmission};
pub use errors::{BackendError, ChatError};
pub use traits::GenerationBackend;
pub use types::{title_from_prompt, Chat, ChatId, Message, Role, DEFAULT_CHAT_TITLE};
