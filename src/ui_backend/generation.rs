//! Generation Controller - One backend round-trip per invocation
//!
//! Lifecycle of a generation on one chat:
//! - Pending: placeholder appended, status text cycled while the backend works
//! - Revealing: reply shown one word per tick (skipped for code-only replies)
//! - Settled: final text (or the error text) with typing cleared
//!
//! The status timer and the backend call race in one `select!`; leaving it
//! drops the timer, so no status text lands after the reply.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::core::{BackendError, ChatId, GenerationBackend, GenerationTicket};

use super::events::{AppEvent, GenerationOutcome};
use super::reveal::{
    is_single_code_block, RevealFrames, StatusRotation, GENERATION_ERROR_MESSAGE,
};
use super::state::SharedChatState;

/// Animation periods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTiming {
    /// Period of the waiting status rotation
    pub status_interval: Duration,
    /// Period between revealed words
    pub reveal_interval: Duration,
}

impl Default for GenerationTiming {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_millis(3000),
            reveal_interval: Duration::from_millis(50),
        }
    }
}

/// Handle to a generation running on a background task
#[derive(Debug)]
pub struct PendingGeneration {
    chat_id: ChatId,
    handle: JoinHandle<GenerationOutcome>,
}

impl PendingGeneration {
    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    /// Wait until the generation has settled
    pub async fn wait(self) -> GenerationOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(chat_id = %self.chat_id, "Generation task ended abnormally: {}", err);
                GenerationOutcome::Failed(err.to_string())
            }
        }
    }
}

/// Drives started generations to the settled state
#[derive(Clone)]
pub struct GenerationController {
    state: SharedChatState,
    backend: Arc<dyn GenerationBackend>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    timing: GenerationTiming,
    /// Passed through to the backend; `None` uses the backend default
    model: Option<String>,
}

impl GenerationController {
    pub fn new(
        state: SharedChatState,
        backend: Arc<dyn GenerationBackend>,
        event_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            state,
            backend,
            event_tx,
            timing: GenerationTiming::default(),
            model: None,
        }
    }

    pub fn with_timing(mut self, timing: GenerationTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn timing(&self) -> GenerationTiming {
        self.timing
    }

    /// Announce the placeholder and drive the generation on a background task
    pub fn spawn(&self, ticket: GenerationTicket) -> PendingGeneration {
        self.announce(&ticket);
        let chat_id = ticket.chat_id;
        let controller = self.clone();
        let handle = tokio::spawn(async move { controller.drive(ticket).await });
        PendingGeneration { chat_id, handle }
    }

    /// Announce the placeholder and drive the generation on the current task
    pub async fn run(&self, ticket: GenerationTicket) -> GenerationOutcome {
        self.announce(&ticket);
        self.drive(ticket).await
    }

    fn announce(&self, ticket: &GenerationTicket) {
        if let Some(message) = self.state.read(|store| {
            store
                .chat(ticket.chat_id)
                .and_then(|chat| chat.messages.get(ticket.placeholder_index).cloned())
        }) {
            self.emit(AppEvent::MessageAdded {
                chat_id: ticket.chat_id,
                index: ticket.placeholder_index,
                message,
            });
        }
        self.emit(AppEvent::GenerationStarted {
            chat_id: ticket.chat_id,
        });
    }

    async fn drive(&self, ticket: GenerationTicket) -> GenerationOutcome {
        tracing::debug!(chat_id = %ticket.chat_id, "Generation pending");
        let guard = SettleOnDrop {
            controller: self,
            ticket: &ticket,
            armed: true,
        };

        let outcome = match self.await_reply(&ticket).await {
            Ok(text) => self.reveal(&ticket, &text).await,
            Err(err) => {
                tracing::warn!(chat_id = %ticket.chat_id, error = %err, "Generation failed");
                self.settle(&ticket, GENERATION_ERROR_MESSAGE);
                GenerationOutcome::Failed(err.to_string())
            }
        };
        guard.disarm();

        tracing::debug!(chat_id = %ticket.chat_id, outcome = ?outcome, "Generation settled");
        self.emit(AppEvent::GenerationSettled {
            chat_id: ticket.chat_id,
            outcome: outcome.clone(),
        });
        outcome
    }

    /// Wait for the backend, cycling the status text every status interval
    async fn await_reply(&self, ticket: &GenerationTicket) -> Result<String, BackendError> {
        let request = self
            .backend
            .generate(&ticket.prompt, self.model.as_deref());
        tokio::pin!(request);

        let period = self.timing.status_interval;
        let mut status_timer = time::interval_at(Instant::now() + period, period);
        let mut statuses = StatusRotation::new();

        loop {
            tokio::select! {
                biased;
                result = &mut request => return result,
                _ = status_timer.tick() => {
                    if let Some(status) = statuses.next() {
                        self.update(ticket, status);
                    }
                }
            }
        }
    }

    async fn reveal(&self, ticket: &GenerationTicket, text: &str) -> GenerationOutcome {
        if text.is_empty() {
            self.settle(ticket, "");
            return GenerationOutcome::Empty;
        }
        if is_single_code_block(text) {
            self.settle(ticket, text);
            return GenerationOutcome::CodeBlock;
        }

        let period = self.timing.reveal_interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        let mut shown = String::new();
        for frame in RevealFrames::new(text) {
            ticker.tick().await;
            self.update(ticket, &frame);
            shown = frame;
        }
        ticker.tick().await;
        self.settle(ticket, &shown);
        GenerationOutcome::Revealed
    }

    fn update(&self, ticket: &GenerationTicket, content: &str) {
        let result = self.state.write(|store| {
            store
                .update_placeholder(ticket.chat_id, content)
                .cloned()
        });
        match result {
            Ok(message) => self.emit(AppEvent::MessageUpdated {
                chat_id: ticket.chat_id,
                index: ticket.placeholder_index,
                message,
            }),
            Err(err) => tracing::warn!("Dropped placeholder update: {}", err),
        }
    }

    fn settle(&self, ticket: &GenerationTicket, content: &str) {
        let result = self.state.write(|store| {
            store
                .settle_generation(ticket.chat_id, content)
                .cloned()
        });
        match result {
            Ok(message) => self.emit(AppEvent::MessageUpdated {
                chat_id: ticket.chat_id,
                index: ticket.placeholder_index,
                message,
            }),
            Err(err) => tracing::error!("Failed to settle generation: {}", err),
        }
    }

    fn emit(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Settles the placeholder with the error text if `drive` unwinds or is
/// dropped before reaching a settled state, so the generation slot is never
/// left taken.
struct SettleOnDrop<'a> {
    controller: &'a GenerationController,
    ticket: &'a GenerationTicket,
    armed: bool,
}

impl SettleOnDrop<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SettleOnDrop<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let chat_id = self.ticket.chat_id;
        tracing::error!(chat_id = %chat_id, "Generation aborted before settling");
        self.controller.settle(self.ticket, GENERATION_ERROR_MESSAGE);
        self.controller.emit(AppEvent::GenerationSettled {
            chat_id,
            outcome: GenerationOutcome::Failed("generation aborted".to_string()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Message, Role};
    use async_trait::async_trait;

    struct FixedBackend {
        reply: Result<&'static str, ()>,
        delay: Duration,
    }

    #[async_trait]
    impl GenerationBackend for FixedBackend {
        async fn generate(
            &self,
            _prompt: &str,
            _model: Option<&str>,
        ) -> Result<String, BackendError> {
            time::sleep(self.delay).await;
            self.reply
                .map(str::to_string)
                .map_err(|_| BackendError::Network("connection refused".to_string()))
        }
    }

    fn controller(
        reply: Result<&'static str, ()>,
        delay: Duration,
    ) -> (
        GenerationController,
        SharedChatState,
        mpsc::UnboundedReceiver<AppEvent>,
    ) {
        let state = SharedChatState::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let backend = Arc::new(FixedBackend { reply, delay });
        let controller = GenerationController::new(state.clone(), backend, tx);
        (controller, state, rx)
    }

    fn placeholder_updates(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<Message> {
        let mut updates = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::MessageUpdated { message, .. } = event {
                updates.push(message);
            }
        }
        updates
    }

    #[tokio::test(start_paused = true)]
    async fn plain_reply_is_revealed_word_by_word() {
        let (controller, state, mut rx) = controller(Ok("hello world"), Duration::ZERO);
        let ticket = state.write(|s| s.submit_prompt("greet me")).unwrap().ticket;

        let outcome = controller.run(ticket.clone()).await;

        assert_eq!(outcome, GenerationOutcome::Revealed);
        let updates = placeholder_updates(&mut rx);
        let steps: Vec<(&str, bool)> = updates
            .iter()
            .map(|m| (m.content.as_str(), m.is_typing))
            .collect();
        assert_eq!(
            steps,
            vec![("hello", true), ("hello world", true), ("hello world", false)]
        );
        let chat = state.chat(ticket.chat_id).unwrap();
        assert_eq!(chat.messages[1], Message::bot("hello world"));
        assert!(!state.is_generating());
    }

    #[tokio::test(start_paused = true)]
    async fn code_block_reply_settles_in_one_step() {
        let reply = "```rust\nfn main() {}\n```";
        let (controller, state, mut rx) = controller(Ok(reply), Duration::ZERO);
        let ticket = state.write(|s| s.submit_prompt("main fn")).unwrap().ticket;

        let outcome = controller.run(ticket).await;

        assert_eq!(outcome, GenerationOutcome::CodeBlock);
        let updates = placeholder_updates(&mut rx);
        assert_eq!(updates, vec![Message::bot(reply)]);
    }

    #[tokio::test(start_paused = true)]
    async fn status_text_cycles_while_waiting() {
        let (controller, state, mut rx) = controller(Ok("done"), Duration::from_millis(7000));
        let ticket = state.write(|s| s.submit_prompt("slow")).unwrap().ticket;

        controller.run(ticket).await;

        let updates = placeholder_updates(&mut rx);
        assert_eq!(updates[0].content, "Generating solution...");
        assert!(updates[0].is_typing);
        assert_eq!(updates[1].content, "Finding the best solution...");
        assert!(updates[1].is_typing);
        assert_eq!(updates[2].content, "done");
        assert!(updates[2].is_typing);
        assert_eq!(updates.last().unwrap(), &Message::bot("done"));
        assert_eq!(updates.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_settles_with_error_text() {
        let (controller, state, mut rx) = controller(Err(()), Duration::from_millis(4000));
        let ticket = state.write(|s| s.submit_prompt("fail")).unwrap().ticket;

        let outcome = controller.run(ticket.clone()).await;

        assert!(matches!(outcome, GenerationOutcome::Failed(_)));
        let chat = state.chat(ticket.chat_id).unwrap();
        let last = chat.messages.last().unwrap();
        assert_eq!(last.role, Role::Bot);
        assert_eq!(last.content, GENERATION_ERROR_MESSAGE);
        assert!(!last.is_typing);
        assert!(!state.is_generating());

        let updates = placeholder_updates(&mut rx);
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].content, "Generating solution...");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_reply_settles_empty() {
        let (controller, state, _rx) = controller(Ok(""), Duration::ZERO);
        let ticket = state.write(|s| s.submit_prompt("nothing")).unwrap().ticket;

        let outcome = controller.run(ticket.clone()).await;

        assert_eq!(outcome, GenerationOutcome::Empty);
        let chat = state.chat(ticket.chat_id).unwrap();
        assert_eq!(chat.messages[1], Message::bot(""));
        assert!(state.read(|s| s.typing_invariant_holds()));
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_generation_announces_and_settles() {
        let (controller, state, mut rx) = controller(Ok("one two"), Duration::from_millis(10));
        let ticket = state.write(|s| s.submit_prompt("count")).unwrap().ticket;
        let chat_id = ticket.chat_id;

        let outcome = controller.spawn(ticket).wait().await;

        assert_eq!(outcome, GenerationOutcome::Revealed);
        assert_eq!(
            rx.try_recv().unwrap(),
            AppEvent::MessageAdded {
                chat_id,
                index: 1,
                message: Message::placeholder(),
            }
        );
        assert_eq!(rx.try_recv().unwrap(), AppEvent::GenerationStarted { chat_id });
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(
            last,
            Some(AppEvent::GenerationSettled {
                chat_id,
                outcome: GenerationOutcome::Revealed,
            })
        );
    }

    struct PanickingBackend;

    #[async_trait]
    impl GenerationBackend for PanickingBackend {
        async fn generate(
            &self,
            _prompt: &str,
            _model: Option<&str>,
        ) -> Result<String, BackendError> {
            panic!("backend bug");
        }
    }

    #[tokio::test]
    async fn panicking_backend_still_releases_the_slot() {
        let state = SharedChatState::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let controller = GenerationController::new(state.clone(), Arc::new(PanickingBackend), tx);
        let ticket = state.write(|s| s.submit_prompt("hi")).unwrap().ticket;
        let chat_id = ticket.chat_id;

        let outcome = controller.spawn(ticket).wait().await;

        assert!(matches!(outcome, GenerationOutcome::Failed(_)));
        assert!(!state.is_generating());
        let chat = state.chat(chat_id).unwrap();
        assert_eq!(chat.messages.last().unwrap(), &Message::bot(GENERATION_ERROR_MESSAGE));
        assert!(state.read(|s| s.typing_invariant_holds()));
        assert!(state.write(|s| s.submit_prompt("again")).is_ok());

        let updates = placeholder_updates(&mut rx);
        assert_eq!(updates.last().unwrap(), &Message::bot(GENERATION_ERROR_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_generation_settles_with_error_text() {
        let (controller, state, mut rx) = controller(Ok("late"), Duration::from_secs(60));
        let ticket = state.write(|s| s.submit_prompt("slow")).unwrap().ticket;
        let chat_id = ticket.chat_id;

        let result = time::timeout(Duration::from_secs(5), controller.run(ticket)).await;
        assert!(result.is_err());

        assert!(!state.is_generating());
        let chat = state.chat(chat_id).unwrap();
        assert_eq!(chat.messages[1], Message::bot(GENERATION_ERROR_MESSAGE));

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert!(matches!(
            last,
            Some(AppEvent::GenerationSettled {
                outcome: GenerationOutcome::Failed(_),
                ..
            })
        ));
    }
}
