//! Process-wide session registry.
//!
//! The registry map is locked only to look up or insert a session. Each
//! session then carries its own locks: an async mutex around the memory
//! store, held for a whole chat turn, and the document slot written by the
//! ingestion pipeline.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use docent_core::types::{ContextKind, Turn};
use docent_vector::index::RetrievalIndex;
use docent_vector::pipeline::DocumentSlot;

use crate::error::ChatError;
use crate::memory::MemoryStore;

/// One of a session's two conversation contexts.
#[derive(Clone)]
pub enum ConversationContext {
    /// Always available; answers from the conversation alone.
    General,
    /// Available once a document index exists.
    Document(Arc<dyn RetrievalIndex>),
}

impl ConversationContext {
    pub fn kind(&self) -> ContextKind {
        match self {
            ConversationContext::General => ContextKind::General,
            ConversationContext::Document(_) => ContextKind::Document,
        }
    }
}

impl std::fmt::Debug for ConversationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationContext::General => f.write_str("General"),
            ConversationContext::Document(index) => {
                f.debug_struct("Document").field("chunks", &index.len()).finish()
            }
        }
    }
}

/// One user's conversation and document state.
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    memory: Mutex<MemoryStore>,
    document: Arc<DocumentSlot>,
}

impl Session {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            memory: Mutex::new(MemoryStore::new()),
            document: Arc::new(DocumentSlot::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The document slot the ingestion pipeline writes to.
    pub fn document(&self) -> &Arc<DocumentSlot> {
        &self.document
    }

    /// The context of the given kind, if the session has it.
    ///
    /// `General` always exists; `Document` exists once an ingestion has
    /// succeeded.
    pub fn context(&self, kind: ContextKind) -> Option<ConversationContext> {
        match kind {
            ContextKind::General => Some(ConversationContext::General),
            ContextKind::Document => self.document.index().map(ConversationContext::Document),
        }
    }

    /// Exclusive access to the memory store. Held for the duration of a turn
    /// so appends within one session stay in arrival order.
    pub async fn lock_memory(&self) -> MutexGuard<'_, MemoryStore> {
        self.memory.lock().await
    }

    /// The full conversation log, earliest first.
    pub async fn history(&self) -> Vec<Turn> {
        self.memory.lock().await.turns().to_vec()
    }

    /// Truncate the memory store. Document state is untouched.
    pub async fn clear_memory(&self) {
        self.memory.lock().await.clear();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("status", &self.document.status())
            .finish()
    }
}

/// Keyed store of live sessions. Sessions live until the process exits.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `id`, creating it on first contact.
    pub fn get_or_create(&self, id: Uuid) -> Result<Arc<Session>, ChatError> {
        if let Some(session) = self.read()?.get(&id) {
            return Ok(Arc::clone(session));
        }
        let mut sessions = self.write()?;
        let session = sessions.entry(id).or_insert_with(|| {
            info!(session_id = %id, "Session created");
            Arc::new(Session::new(id))
        });
        Ok(Arc::clone(session))
    }

    /// Create a session with a fresh identifier.
    pub fn create(&self) -> Result<Arc<Session>, ChatError> {
        self.get_or_create(Uuid::new_v4())
    }

    /// Return the session for `id` without creating it.
    pub fn get(&self, id: Uuid) -> Result<Arc<Session>, ChatError> {
        self.read()?
            .get(&id)
            .cloned()
            .ok_or(ChatError::SessionNotFound(id))
    }

    /// Truncate a session's memory store, leaving its document state alone.
    pub async fn clear_memory(&self, id: Uuid) -> Result<(), ChatError> {
        let session = self.get(id)?;
        session.clear_memory().await;
        debug!(session_id = %id, "Session memory cleared");
        Ok(())
    }

    /// Number of live sessions. Counting stays available on a poisoned
    /// lock.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<Uuid, Arc<Session>>>, ChatError> {
        self.sessions
            .read()
            .map_err(|e| ChatError::StorageError(format!("session lock poisoned: {}", e)))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Arc<Session>>>, ChatError> {
        self.sessions
            .write()
            .map_err(|e| ChatError::StorageError(format!("session lock poisoned: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docent_core::types::IngestionStatus;

    #[test]
    fn test_get_or_create_is_stable() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        let a = registry.get_or_create(id).unwrap();
        let b = registry.get_or_create(id).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.id(), id);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_new_session_has_general_context_only() {
        let registry = SessionRegistry::new();
        let session = registry.create().unwrap();
        assert_eq!(
            session.context(ContextKind::General).map(|c| c.kind()),
            Some(ContextKind::General)
        );
        assert!(session.context(ContextKind::Document).is_none());
        assert_eq!(session.document().status(), IngestionStatus::None);
    }

    #[test]
    fn test_get_unknown_session() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        assert!(matches!(registry.get(id), Err(ChatError::SessionNotFound(found)) if found == id));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_clear_memory_truncates_only_memory() {
        let registry = SessionRegistry::new();
        let session = registry.create().unwrap();
        {
            let mut memory = session.lock_memory().await;
            memory.append(Turn::user("My name is Ada"));
            memory.append(Turn::assistant("Noted."));
        }
        assert_eq!(session.history().await.len(), 2);

        registry.clear_memory(session.id()).await.unwrap();
        assert!(session.history().await.is_empty());
        assert_eq!(registry.len(), 1);
        assert_eq!(session.document().status(), IngestionStatus::None);
    }

    #[tokio::test]
    async fn test_clear_memory_unknown_session() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.clear_memory(Uuid::new_v4()).await,
            Err(ChatError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_poisoned_registry_reports_storage_error() {
        let registry = Arc::new(SessionRegistry::new());
        let existing = registry.create().unwrap();

        let poisoner = Arc::clone(&registry);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.sessions.write().unwrap();
            panic!("poison the registry lock");
        })
        .join();

        assert!(matches!(registry.create(), Err(ChatError::StorageError(_))));
        assert!(matches!(
            registry.get(existing.id()),
            Err(ChatError::StorageError(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sessions_are_independent() {
        let registry = SessionRegistry::new();
        let a = registry.create().unwrap();
        let b = registry.create().unwrap();
        assert_ne!(a.id(), b.id());
        assert!(!Arc::ptr_eq(a.document(), b.document()));
        assert_eq!(registry.len(), 2);
    }
}
