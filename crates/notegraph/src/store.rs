use async_trait::async_trait;
use notegraph_core::{LinkUpdate, Note, NoteDraft, NoteId, NotePatch};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Failure at the persistence boundary.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store transport failure: {0}")]
    Transport(String),
    #[error("store refused access: {0}")]
    Unauthorized(String),
    #[error("store constraint violated: {0}")]
    Constraint(String),
    #[error("note not found: {0}")]
    NotFound(NoteId),
}

/// Partition of the store a collection lives in (one per owner).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub owner: String,
}

impl Scope {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
        }
    }
}

/// Payload-free "something in the store changed" marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreChanged;

/// Receiving end of a store's change notifications.
pub struct ChangeSubscription {
    rx: broadcast::Receiver<StoreChanged>,
}

impl ChangeSubscription {
    pub fn new(rx: broadcast::Receiver<StoreChanged>) -> Self {
        Self { rx }
    }

    /// Wait for the next notification. Returns `false` once the store is gone.
    ///
    /// A lagged receiver missed notifications, but they carry no payload, so
    /// the lag itself counts as one.
    pub async fn changed(&mut self) -> bool {
        match self.rx.recv().await {
            Ok(StoreChanged) => true,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Change subscription lagged, {} notifications merged", skipped);
                true
            }
            Err(RecvError::Closed) => false,
        }
    }

    /// Drain notifications that are already queued. Returns how many were dropped.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        loop {
            match self.rx.try_recv() {
                Ok(StoreChanged) | Err(broadcast::error::TryRecvError::Lagged(_)) => drained += 1,
                Err(_) => return drained,
            }
        }
    }
}

/// Persistence and change-notification collaborator consumed by the engine.
///
/// `fetch_all` returns the scope's notes in canonical order (ascending creation
/// time); title tie-breaks depend on that order being stable.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn fetch_all(&self, scope: &Scope) -> Result<Vec<Note>, StoreError>;

    /// Store a new note. The store assigns id, timestamps and empty link sets.
    async fn insert(&self, scope: &Scope, draft: NoteDraft) -> Result<Note, StoreError>;

    async fn update_fields(&self, id: &NoteId, patch: NotePatch) -> Result<(), StoreError>;

    async fn delete(&self, id: &NoteId) -> Result<(), StoreError>;

    fn subscribe(&self) -> ChangeSubscription;

    /// Persist recomputed link fields for a batch of notes.
    ///
    /// The default applies `update_fields` note by note and stops at the first
    /// failure, leaving earlier notes written and later ones stale. Stores with
    /// multi-row transactions should override this to apply the batch atomically.
    async fn write_links(&self, updates: Vec<LinkUpdate>) -> Result<usize, StoreError> {
        let mut written = 0;
        for update in updates {
            let id = update.id.clone();
            self.update_fields(&id, NotePatch::links(update)).await?;
            written += 1;
        }
        Ok(written)
    }
}
