//! Reply shaping for the generation lifecycle
//!
//! Status text shown while waiting, the fallback shown on failure, and the
//! rules that decide how a reply is revealed.

use once_cell::sync::Lazy;
use regex::Regex;

/// Status texts cycled through while waiting for the backend
pub const STATUS_MESSAGES: [&str; 4] = [
    "Generating solution...",
    "Finding the best solution...",
    "Generating solution...",
    "Finding the best solution...",
];

/// Content of the bot message when the backend call fails
pub const GENERATION_ERROR_MESSAGE: &str =
    "Sorry, I encountered an error while generating the response. Please try again.";

static CODE_BLOCK_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[\s\S]*```$").expect("valid regex"));

/// True when the whole reply is one fenced code block.
///
/// Such replies are shown at once instead of word by word.
pub fn is_single_code_block(text: &str) -> bool {
    CODE_BLOCK_ONLY.is_match(text)
}

/// Endless rotation over [`STATUS_MESSAGES`]
#[derive(Debug, Clone, Default)]
pub struct StatusRotation {
    phase: usize,
}

impl StatusRotation {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Iterator for StatusRotation {
    type Item = &'static str;

    fn next(&mut self) -> Option<Self::Item> {
        let status = STATUS_MESSAGES[self.phase % STATUS_MESSAGES.len()];
        self.phase += 1;
        Some(status)
    }
}

/// Successive contents of a message revealed one word at a time.
///
/// Words are split on single spaces so line breaks survive, and the last
/// frame is always equal to the input.
#[derive(Debug, Clone)]
pub struct RevealFrames<'a> {
    words: std::str::Split<'a, char>,
    shown: String,
    started: bool,
}

impl<'a> RevealFrames<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            words: text.split(' '),
            shown: String::with_capacity(text.len()),
            started: false,
        }
    }
}

impl Iterator for RevealFrames<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let word = self.words.next()?;
        if self.started {
            self.shown.push(' ');
        }
        self.started = true;
        self.shown.push_str(word);
        Some(self.shown.clone())
    }
}
