//! Edit Branch Controller - Revise a sent user turn and regenerate
//!
//! Editing is branch-and-replace: the edited turn keeps its position, every
//! later message is dropped for good, and a fresh reply is generated for the
//! new text.

use tokio::sync::mpsc;

use crate::core::{ChatError, ChatId};

use super::events::AppEvent;
use super::generation::{GenerationController, PendingGeneration};
use super::state::SharedChatState;

#[derive(Clone)]
pub struct EditBranchController {
    state: SharedChatState,
    generation: GenerationController,
    event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl EditBranchController {
    pub fn new(
        state: SharedChatState,
        generation: GenerationController,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            state,
            generation,
            event_tx,
        }
    }

    /// Replace the user message at `index` with `new_text`, truncate the chat
    /// after it and start a new generation.
    ///
    /// Rejected without any change while a generation is in flight anywhere,
    /// for blank text, for an unknown index and for bot messages.
    pub fn edit_message(
        &self,
        chat_id: ChatId,
        index: usize,
        new_text: &str,
    ) -> Result<PendingGeneration, ChatError> {
        let (edit, edited) = self.state.write(|store| {
            let edit = store.edit_message(chat_id, index, new_text)?;
            let edited = store
                .chat(chat_id)
                .and_then(|chat| chat.messages.get(index).cloned());
            Ok::<_, ChatError>((edit, edited))
        })?;

        tracing::debug!(
            chat_id = %chat_id,
            index,
            removed = edit.removed,
            "Edited message, regenerating"
        );

        if let Some(message) = edited {
            let _ = self.event_tx.send(AppEvent::MessageUpdated {
                chat_id,
                index,
                message,
            });
        }
        let _ = self.event_tx.send(AppEvent::MessagesTruncated {
            chat_id,
            len: index + 1,
        });

        Ok(self.generation.spawn(edit.ticket))
    }
}
