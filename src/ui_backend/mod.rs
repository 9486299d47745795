//! UI Backend - Backend-for-Frontend (BFF) Layer
//!
//! This module separates the chat state machine from rendering, so any
//! frontend (terminal, web, desktop) can drive the same backend.
//!
//! ## Architecture
//!
//! - **ChatService**: Entry point for create/select/rename/send/edit
//! - **GenerationController**: Placeholder, status cycle, reveal, failure fallback
//! - **EditBranchController**: Branch-and-replace editing of user turns
//! - **AppEvent**: Async event channel for re-rendering
//! - **SharedChatState**: Thread-safe handle to the chat store
//! - **Command**: Parsed user input for line-oriented front ends

pub mod commands;
pub mod edit_branch;
mod events;
pub mod generation;
pub mod reveal;
mod service;
mod state;

pub use commands::{parse_command, Command, CommandError};
pub use edit_branch::EditBranchController;
pub use events::{AppEvent, GenerationOutcome};
pub use generation::{GenerationController, GenerationTiming, PendingGeneration};
pub use reveal::{is_single_code_block, GENERATION_ERROR_MESSAGE, STATUS_MESSAGES};
pub use service::ChatService;
pub use state::SharedChatState;
