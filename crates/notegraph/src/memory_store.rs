use crate::store::{ChangeSubscription, NoteStore, Scope, StoreChanged, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use notegraph_core::{Note, NoteDraft, NoteId, NotePatch};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 1024;

struct StoredNote {
    scope: Scope,
    /// Insertion sequence, breaks `created_at` ties
    seq: u64,
    note: Note,
}

/// In-memory `NoteStore` keyed by note id, partitioned by scope.
///
/// Broadcasts one `StoreChanged` after every successful write. `fetch_all`
/// orders by (`created_at`, insertion sequence).
pub struct MemoryStore {
    notes: DashMap<NoteId, StoredNote>,
    next_seq: AtomicU64,
    changes: broadcast::Sender<StoreChanged>,
    /// Remaining `update_fields` calls that succeed before failures start; -1 disables
    updates_before_failure: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            notes: DashMap::new(),
            next_seq: AtomicU64::new(0),
            changes,
            updates_before_failure: AtomicI64::new(-1),
        }
    }

    /// Seed a fully formed note (id, timestamps, link fields) without notifying.
    pub fn seed(&self, scope: &Scope, note: Note) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.notes.insert(
            note.id.clone(),
            StoredNote {
                scope: scope.clone(),
                seq,
                note,
            },
        );
    }

    /// Let the next `n` calls to `update_fields` succeed, then fail every later
    /// one with `StoreError::Transport` until `clear_faults` is called.
    pub fn fail_updates_after(&self, n: usize) {
        let n = i64::try_from(n).unwrap_or(i64::MAX);
        self.updates_before_failure.store(n, Ordering::SeqCst);
    }

    pub fn clear_faults(&self) {
        self.updates_before_failure.store(-1, Ordering::SeqCst);
    }

    /// Read a note directly, bypassing scopes.
    pub fn get(&self, id: &NoteId) -> Option<Note> {
        self.notes.get(id).map(|entry| entry.note.clone())
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    fn notify(&self) {
        // No receivers is fine: nobody is watching yet
        let _ = self.changes.send(StoreChanged);
    }

    fn check_injected_failure(&self) -> Result<(), StoreError> {
        let outcome = self
            .updates_before_failure
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                if left > 0 {
                    Some(left - 1)
                } else {
                    None
                }
            });
        match outcome {
            // Faults disabled, or budget consumed successfully
            Ok(_) | Err(-1) => Ok(()),
            Err(_) => Err(StoreError::Transport("injected update failure".to_string())),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn fetch_all(&self, scope: &Scope) -> Result<Vec<Note>, StoreError> {
        let mut rows: Vec<(DateTime<Utc>, u64, Note)> = self
            .notes
            .iter()
            .filter(|entry| entry.scope == *scope)
            .map(|entry| (entry.note.created_at, entry.seq, entry.note.clone()))
            .collect();
        rows.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        Ok(rows.into_iter().map(|(_, _, note)| note).collect())
    }

    async fn insert(&self, scope: &Scope, draft: NoteDraft) -> Result<Note, StoreError> {
        let now = Self::now();
        let note = Note {
            id: NoteId::new(uuid::Uuid::new_v4().to_string()),
            title: draft.title,
            content: draft.content,
            created_at: now,
            updated_at: now,
            forward_links: Vec::new(),
            backlinks: Vec::new(),
        };
        self.seed(scope, note.clone());
        tracing::debug!("Inserted note {} ({:?})", note.id, note.title);
        self.notify();
        Ok(note)
    }

    async fn update_fields(&self, id: &NoteId, patch: NotePatch) -> Result<(), StoreError> {
        self.check_injected_failure()?;
        {
            let mut entry = self
                .notes
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            patch.apply_to(&mut entry.note);
            entry.note.updated_at = Self::now();
        } // shard lock dropped before notifying
        self.notify();
        Ok(())
    }

    async fn delete(&self, id: &NoteId) -> Result<(), StoreError> {
        if self.notes.remove(id).is_none() {
            return Err(StoreError::NotFound(id.clone()));
        }
        tracing::debug!("Deleted note {}", id);
        self.notify();
        Ok(())
    }

    fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription::new(self.changes.subscribe())
    }
}
