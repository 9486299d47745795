//! Shared Chat State
//!
//! Thread-safe handle to the `ChatStore` shared by the service, the
//! generation tasks and the front end. Every store operation runs under one
//! lock acquisition and no lock is held across an `.await`, so readers never
//! observe a half-applied change.

use std::sync::{Arc, RwLock};

use crate::core::{Chat, ChatId, ChatStore};

/// Shared chat store (thread-safe)
#[derive(Debug, Clone, Default)]
pub struct SharedChatState {
    inner: Arc<RwLock<ChatStore>>,
}

impl SharedChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_store(store: ChatStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Run `f` with shared access to the store
    pub fn read<R>(&self, f: impl FnOnce(&ChatStore) -> R) -> R {
        f(&self.read_inner())
    }

    /// Run `f` with exclusive access to the store
    pub fn write<R>(&self, f: impl FnOnce(&mut ChatStore) -> R) -> R {
        f(&mut self.write_inner())
    }

    /// Clone of the whole store, for rendering
    pub fn snapshot(&self) -> ChatStore {
        self.read_inner().clone()
    }

    pub fn chat(&self, id: ChatId) -> Option<Chat> {
        self.read(|store| store.chat(id).cloned())
    }

    pub fn active_chat(&self) -> Option<Chat> {
        self.read(|store| store.active_chat().cloned())
    }

    pub fn is_generating(&self) -> bool {
        self.read(|store| store.is_generating())
    }

    // ========== Private Helpers ==========

    /// Get a read lock on the inner state, recovering from poison
    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, ChatStore> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Chat state read lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Get a write lock on the inner state, recovering from poison
    fn write_inner(&self) -> std::sync::RwLockWriteGuard<'_, ChatStore> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Chat state write lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
