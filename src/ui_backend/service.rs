//! Chat Service - The front end's single entry point
//!
//! Wraps the shared `ChatStore` and both controllers. Structural operations
//! run under one write lock and publish an `AppEvent` for each visible change;
//! content changes are driven by the generation tasks.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::{Chat, ChatError, ChatId, GenerationBackend};

use super::edit_branch::EditBranchController;
use super::events::AppEvent;
use super::generation::{GenerationController, GenerationTiming, PendingGeneration};
use super::state::SharedChatState;

pub struct ChatService {
    state: SharedChatState,
    generation: GenerationController,
    edits: EditBranchController,
    event_tx: mpsc::UnboundedSender<AppEvent>,
}

impl ChatService {
    /// Create a service with an empty store
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self::with_options(backend, event_tx, GenerationTiming::default(), None)
    }

    pub fn with_options(
        backend: Arc<dyn GenerationBackend>,
        event_tx: mpsc::UnboundedSender<AppEvent>,
        timing: GenerationTiming,
        model: Option<String>,
    ) -> Self {
        let state = SharedChatState::new();
        let generation = GenerationController::new(state.clone(), backend, event_tx.clone())
            .with_timing(timing)
            .with_model(model);
        let edits = EditBranchController::new(state.clone(), generation.clone(), event_tx.clone());
        Self {
            state,
            generation,
            edits,
            event_tx,
        }
    }

    pub fn state(&self) -> &SharedChatState {
        &self.state
    }

    /// Whether sending (and editing, and switching chats) is currently blocked
    pub fn is_generating(&self) -> bool {
        self.state.is_generating()
    }

    /// Create an empty "New Chat" at the top and make it active
    pub fn create_chat(&self) -> Chat {
        let chat = self.state.write(|store| store.create_chat().clone());
        tracing::debug!(chat_id = %chat.id, "Created chat");
        self.emit(AppEvent::ChatCreated {
            chat_id: chat.id,
            title: chat.title.clone(),
        });
        self.emit(AppEvent::ActiveChatChanged(chat.id));
        chat
    }

    /// Switch the active chat; returns `Ok(false)` while a reply is generating
    pub fn select_chat(&self, id: ChatId) -> Result<bool, ChatError> {
        let switched = self.state.write(|store| store.select_chat(id))?;
        if switched {
            self.emit(AppEvent::ActiveChatChanged(id));
        } else {
            tracing::debug!(chat_id = %id, "Ignored chat switch during generation");
        }
        Ok(switched)
    }

    pub fn rename_chat(&self, id: ChatId, new_title: &str) -> Result<Chat, ChatError> {
        let chat = self
            .state
            .write(|store| store.rename_chat(id, new_title).cloned())?;
        self.emit(AppEvent::ChatRenamed {
            chat_id: id,
            title: chat.title.clone(),
        });
        Ok(chat)
    }

    /// Send a prompt on the active chat (creating one if needed) and start
    /// generating the reply in the background.
    pub fn send_prompt(&self, text: &str) -> Result<PendingGeneration, ChatError> {
        let (submission, previous_title, chat) = self.state.write(|store| {
            let previous_title = store.active_chat().map(|c| c.title.clone());
            let submission = store.submit_prompt(text)?;
            let chat = store
                .chat(submission.ticket.chat_id)
                .cloned()
                .ok_or(ChatError::ChatNotFound(submission.ticket.chat_id))?;
            Ok::<_, ChatError>((submission, previous_title, chat))
        })?;

        if submission.created_chat {
            self.emit(AppEvent::ChatCreated {
                chat_id: chat.id,
                title: chat.title.clone(),
            });
            self.emit(AppEvent::ActiveChatChanged(chat.id));
        } else if previous_title.as_deref() != Some(chat.title.as_str()) {
            self.emit(AppEvent::ChatRenamed {
                chat_id: chat.id,
                title: chat.title.clone(),
            });
        }
        self.emit(AppEvent::MessageAdded {
            chat_id: chat.id,
            index: submission.user_index,
            message: chat.messages[submission.user_index].clone(),
        });

        Ok(self.generation.spawn(submission.ticket))
    }

    /// Revise a sent user message; see [`EditBranchController::edit_message`]
    pub fn edit_message(
        &self,
        chat_id: ChatId,
        index: usize,
        new_text: &str,
    ) -> Result<PendingGeneration, ChatError> {
        self.edits.edit_message(chat_id, index, new_text)
    }

    fn emit(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BackendError;
    use async_trait::async_trait;

    struct StaticBackend;

    #[async_trait]
    impl GenerationBackend for StaticBackend {
        async fn generate(
            &self,
            _prompt: &str,
            _model: Option<&str>,
        ) -> Result<String, BackendError> {
            Ok("fine".to_string())
        }
    }

    fn service() -> (ChatService, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChatService::new(Arc::new(StaticBackend), tx), rx)
    }

    #[tokio::test]
    async fn create_chat_emits_events() {
        let (service, mut rx) = service();
        let chat = service.create_chat();

        assert_eq!(
            rx.try_recv().unwrap(),
            AppEvent::ChatCreated {
                chat_id: chat.id,
                title: "New Chat".to_string(),
            }
        );
        assert_eq!(rx.try_recv().unwrap(), AppEvent::ActiveChatChanged(chat.id));
    }

    #[tokio::test(start_paused = true)]
    async fn first_prompt_on_new_chat_renames_it() {
        let (service, mut rx) = service();
        let chat = service.create_chat();
        while rx.try_recv().is_ok() {}

        let pending = service.send_prompt("Sort a list").unwrap();
        assert_eq!(pending.chat_id(), chat.id);
        assert!(service.is_generating());
        pending.wait().await;

        assert_eq!(
            rx.try_recv().unwrap(),
            AppEvent::ChatRenamed {
                chat_id: chat.id,
                title: "Sort a list".to_string(),
            }
        );
        assert_eq!(service.state().chat(chat.id).unwrap().title, "Sort a list");
        assert!(!service.is_generating());
    }

    #[tokio::test(start_paused = true)]
    async fn send_without_chat_creates_one() {
        let (service, mut rx) = service();

        let pending = service.send_prompt("hello").unwrap();
        let chat_id = pending.chat_id();
        pending.wait().await;

        assert!(matches!(
            rx.try_recv().unwrap(),
            AppEvent::ChatCreated { chat_id: id, .. } if id == chat_id
        ));
        let chat = service.state().active_chat().unwrap();
        assert_eq!(chat.id, chat_id);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[1].content, "fine");
    }

    #[tokio::test(start_paused = true)]
    async fn switching_is_blocked_while_generating() {
        let (service, _rx) = service();
        let other = service.create_chat();
        let current = service.create_chat();

        let pending = service.send_prompt("question").unwrap();
        assert_eq!(service.select_chat(other.id), Ok(false));
        assert_eq!(service.state().active_chat().unwrap().id, current.id);
        assert_eq!(
            service.send_prompt("another").unwrap_err(),
            ChatError::GenerationInFlight
        );

        pending.wait().await;
        assert_eq!(service.select_chat(other.id), Ok(true));
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected() {
        let (service, mut rx) = service();
        assert_eq!(service.send_prompt("  ").unwrap_err(), ChatError::EmptyPrompt);
        assert!(rx.try_recv().is_err());
        assert!(service.state().snapshot().chats().is_empty());
    }

    #[tokio::test]
    async fn rename_emits_event() {
        let (service, mut rx) = service();
        let chat = service.create_chat();
        while rx.try_recv().is_ok() {}

        let renamed = service.rename_chat(chat.id, " Algorithms ").unwrap();

        assert_eq!(renamed.title, "Algorithms");
        assert_eq!(
            rx.try_recv().unwrap(),
            AppEvent::ChatRenamed {
                chat_id: chat.id,
                title: "Algorithms".to_string(),
            }
        );
        assert_eq!(
            service.rename_chat(chat.id, "").unwrap_err(),
            ChatError::EmptyText
        );
    }
}
