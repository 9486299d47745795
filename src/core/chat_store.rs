//! Chat Store - The set of chats and the active selection
//!
//! Handles:
//! - Chat creation (explicit, or implicit on first prompt)
//! - Selection and renaming
//! - User turns and title derivation
//! - The single system-wide generation slot and its placeholder message
//! - Branch-and-replace truncation for edited user turns
//!
//! Every operation validates first and mutates second, so a rejected call
//! leaves the store untouched.

use super::errors::ChatError;
use super::types::{title_from_prompt, Chat, ChatId, Message, Role, DEFAULT_CHAT_TITLE};

/// A generation that has been started: placeholder appended, slot taken
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    pub chat_id: ChatId,
    /// Trimmed prompt to send to the backend
    pub prompt: String,
    /// Index of the placeholder bot message
    pub placeholder_index: usize,
}

/// Result of submitting a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSubmission {
    pub ticket: GenerationTicket,
    /// Whether a chat had to be created for this prompt
    pub created_chat: bool,
    /// Index of the appended user message
    pub user_index: usize,
}

/// Result of editing a user message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSubmission {
    pub ticket: GenerationTicket,
    /// How many messages followed the edited one and were discarded
    pub removed: usize,
}

/// All chats plus the active selection
#[derive(Debug, Clone, Default)]
pub struct ChatStore {
    /// Display order, newest first
    chats: Vec<Chat>,
    active_chat_id: Option<ChatId>,
    /// Chat whose trailing placeholder is being animated, if any
    generating: Option<ChatId>,
    next_id: u64,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chats in display order
    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn chat(&self, id: ChatId) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == id)
    }

    pub fn active_chat_id(&self) -> Option<ChatId> {
        self.active_chat_id
    }

    /// The active chat; `None` when nothing is selected or the id is stale
    pub fn active_chat(&self) -> Option<&Chat> {
        self.active_chat_id.and_then(|id| self.chat(id))
    }

    /// Whether any chat has a generation pending or revealing
    pub fn is_generating(&self) -> bool {
        self.generating.is_some()
    }

    pub fn generating_chat(&self) -> Option<ChatId> {
        self.generating
    }

    /// Create an empty chat titled "New Chat" at the front and make it active
    pub fn create_chat(&mut self) -> &Chat {
        let id = self.insert_chat(DEFAULT_CHAT_TITLE.to_string());
        self.active_chat_id = Some(id);
        &self.chats[0]
    }

    /// Make `id` the active chat.
    ///
    /// Returns `Ok(false)` without changing anything while a generation is in
    /// flight anywhere in the store.
    pub fn select_chat(&mut self, id: ChatId) -> Result<bool, ChatError> {
        if self.is_generating() {
            return Ok(false);
        }
        if self.chat(id).is_none() {
            return Err(ChatError::ChatNotFound(id));
        }
        self.active_chat_id = Some(id);
        Ok(true)
    }

    /// Set a chat's title to the trimmed `new_title`
    pub fn rename_chat(&mut self, id: ChatId, new_title: &str) -> Result<&Chat, ChatError> {
        let title = new_title.trim();
        if title.is_empty() {
            return Err(ChatError::EmptyText);
        }
        let chat = self.chat_mut(id)?;
        chat.title = title.to_string();
        Ok(&*chat)
    }

    /// Append a user turn, deriving the title if the chat still has the default one.
    ///
    /// Returns the index of the new message.
    pub fn append_user_message(&mut self, chat_id: ChatId, text: &str) -> Result<usize, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyPrompt);
        }
        if self.is_generating() {
            return Err(ChatError::GenerationInFlight);
        }
        let chat = self.chat_mut(chat_id)?;
        if chat.has_default_title() {
            chat.title = title_from_prompt(text);
        }
        chat.messages.push(Message::user(text));
        Ok(chat.messages.len() - 1)
    }

    /// Send a prompt on the active chat, creating one titled from the prompt
    /// when nothing is active, and start its generation.
    pub fn submit_prompt(&mut self, text: &str) -> Result<PromptSubmission, ChatError> {
        let prompt = text.trim();
        if prompt.is_empty() {
            return Err(ChatError::EmptyPrompt);
        }
        if self.is_generating() {
            return Err(ChatError::GenerationInFlight);
        }

        let active = self.active_chat().map(|chat| chat.id);
        let (chat_id, created_chat) = match active {
            Some(id) => (id, false),
            None => {
                let id = self.insert_chat(title_from_prompt(prompt));
                self.active_chat_id = Some(id);
                (id, true)
            }
        };

        let user_index = self.append_user_message(chat_id, prompt)?;
        let ticket = self.begin_generation(chat_id, prompt)?;
        Ok(PromptSubmission {
            ticket,
            created_chat,
            user_index,
        })
    }

    /// Replace the user message at `index`, drop everything after it and
    /// start a fresh generation for the edited text.
    pub fn edit_message(
        &mut self,
        chat_id: ChatId,
        index: usize,
        new_text: &str,
    ) -> Result<EditSubmission, ChatError> {
        if self.is_generating() {
            return Err(ChatError::GenerationInFlight);
        }
        let text = new_text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyText);
        }

        let chat = self.chat_mut(chat_id)?;
        let message = chat
            .messages
            .get_mut(index)
            .ok_or(ChatError::MessageNotFound { chat_id, index })?;
        if message.role != Role::User {
            return Err(ChatError::NotAUserMessage { chat_id, index });
        }
        message.content = text.to_string();

        let removed = chat.messages.len() - (index + 1);
        chat.messages.truncate(index + 1);

        let ticket = self.begin_generation(chat_id, text)?;
        Ok(EditSubmission { ticket, removed })
    }

    /// Take the generation slot and append a placeholder to `chat_id`
    pub fn begin_generation(
        &mut self,
        chat_id: ChatId,
        prompt: &str,
    ) -> Result<GenerationTicket, ChatError> {
        if self.is_generating() {
            return Err(ChatError::GenerationInFlight);
        }
        let chat = self.chat_mut(chat_id)?;
        chat.messages.push(Message::placeholder());
        let placeholder_index = chat.messages.len() - 1;
        self.generating = Some(chat_id);
        Ok(GenerationTicket {
            chat_id,
            prompt: prompt.to_string(),
            placeholder_index,
        })
    }

    /// Overwrite the placeholder's content, keeping it typing
    pub fn update_placeholder(
        &mut self,
        chat_id: ChatId,
        content: &str,
    ) -> Result<&Message, ChatError> {
        let message = self.placeholder_mut(chat_id)?;
        message.content = content.to_string();
        Ok(&*message)
    }

    /// Write the final content, stop typing and release the generation slot
    pub fn settle_generation(
        &mut self,
        chat_id: ChatId,
        content: &str,
    ) -> Result<&Message, ChatError> {
        self.placeholder_mut(chat_id)?;
        self.generating = None;
        let message = self
            .chat_mut(chat_id)?
            .messages
            .last_mut()
            .ok_or(ChatError::NoActiveGeneration(chat_id))?;
        message.content = content.to_string();
        message.is_typing = false;
        Ok(&*message)
    }

    /// Check the typing invariants: at most one typing message per chat, it
    /// is the trailing bot message, and it belongs to the generating chat.
    pub fn typing_invariant_holds(&self) -> bool {
        self.chats.iter().all(|chat| {
            let typing: Vec<usize> = chat
                .messages
                .iter()
                .enumerate()
                .filter(|(_, m)| m.is_typing)
                .map(|(i, _)| i)
                .collect();
            match typing.as_slice() {
                [] => self.generating != Some(chat.id),
                [i] => {
                    *i == chat.messages.len() - 1
                        && chat.messages[*i].role == Role::Bot
                        && self.generating == Some(chat.id)
                }
                _ => false,
            }
        })
    }

    // Private helper methods

    fn insert_chat(&mut self, title: String) -> ChatId {
        self.next_id += 1;
        let id = ChatId(self.next_id);
        self.chats.insert(0, Chat::new(id, title));
        id
    }

    fn chat_mut(&mut self, id: ChatId) -> Result<&mut Chat, ChatError> {
        self.chats
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ChatError::ChatNotFound(id))
    }

    fn placeholder_mut(&mut self, chat_id: ChatId) -> Result<&mut Message, ChatError> {
        if self.generating != Some(chat_id) {
            return Err(ChatError::NoActiveGeneration(chat_id));
        }
        self.chat_mut(chat_id)?
            .messages
            .last_mut()
            .filter(|m| m.is_typing)
            .ok_or(ChatError::NoActiveGeneration(chat_id))
    }
}
