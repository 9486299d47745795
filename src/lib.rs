//! promptcode: a chat client for an LLM code assistant
//!
//! This library provides:
//! - The chat store and its single-generation state machine (`core`)
//! - Generation, reveal and edit-branch controllers with an event stream (`ui_backend`)
//! - A Gemini provider (`llm`) behind a small HTTP generation API (`transport::http`)
//! - An HTTP client backend and a terminal chat front end (`transport`)

pub mod config;
pub mod core;
pub mod llm;
pub mod transport;
pub mod ui_backend;

pub use config::{Config, ServerConfig};
pub use ui_backend::ChatService;
