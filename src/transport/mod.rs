//! Transport layer: HTTP server, HTTP client and the terminal chat

pub mod api;
pub mod cli;
pub mod client;
pub mod http;

pub use client::HttpBackend;
