use crate::config::{CollisionPolicy, EngineConfig};
use crate::store::{NoteStore, Scope, StoreError};
use notegraph_core::{
    find_conflicting_title, find_title_collisions, link_updates, links_converged,
    project_with_style, recompute_links_with_stats, GraphView, Note, NoteDraft, NoteId, NotePatch,
    Snapshot,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::{Mutex, MutexGuard};

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("title {title:?} is already used by note {existing}")]
    TitleCollision { title: String, existing: NoteId },
    #[error("note {0} is missing from the collection after the recompute pass")]
    NoteNotFound(NoteId),
}

/// Title/content edit from the editing surface. `None` keeps the stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteEdit {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NoteEdit {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }
}

/// Owned neighbours of a note in the published snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteNeighbors {
    pub backlinks: Vec<Note>,
    pub forward_links: Vec<Note>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PassMode {
    /// Rewrite every note's link fields, as after a local mutation
    Rewrite,
    /// Skip the write-back when the store already holds the recomputed links
    SkipIfConverged,
}

/// Bidirectional link maintenance over one scope of a `NoteStore`.
///
/// Every mutation and every external refresh runs one monolithic pass:
/// fetch the whole collection, recompute all link fields, write them back,
/// then swap the published snapshot. Readers only ever see the snapshot of
/// the last pass that completed.
pub struct LinkEngine<S: NoteStore> {
    store: Arc<S>,
    scope: Scope,
    config: EngineConfig,
    published: RwLock<Arc<Snapshot>>,
    /// Serializes mutations and passes issued through this engine. A mutation
    /// holds it from its title check through its pass.
    pass_lock: Mutex<()>,
    needs_reconcile: AtomicBool,
}

impl<S: NoteStore> LinkEngine<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self {
            store,
            scope: Scope::new(config.owner.clone()),
            config,
            published: RwLock::new(Arc::new(Snapshot::default())),
            pass_lock: Mutex::new(()),
            needs_reconcile: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a note with the default template and relink the collection.
    pub async fn create_note(&self, title: &str) -> Result<Note, EngineError> {
        let pass = self.pass_lock.lock().await;
        self.check_title(title, None).await?;
        let created = self
            .store
            .insert(&self.scope, NoteDraft::templated(title))
            .await?;
        tracing::info!("Created note {} ({:?})", created.id, title);
        let snapshot = self.run_pass_locked(&pass, PassMode::Rewrite).await?;
        published_note(&snapshot, &created.id)
    }

    /// Change a note's title and/or content and relink the collection.
    ///
    /// A rename changes the resolution of references elsewhere even though no
    /// other content changed, hence the full pass.
    pub async fn update_note(&self, id: &NoteId, edit: NoteEdit) -> Result<Note, EngineError> {
        let pass = self.pass_lock.lock().await;
        if let Some(title) = &edit.title {
            self.check_title(title, Some(id)).await?;
        }
        let patch = NotePatch::edit(edit.title, edit.content);
        if !patch.is_empty() {
            self.store.update_fields(id, patch).await?;
            tracing::info!("Updated note {}", id);
        }
        let snapshot = self.run_pass_locked(&pass, PassMode::Rewrite).await?;
        published_note(&snapshot, id)
    }

    /// Delete a note. References to it elsewhere stop resolving in the same pass.
    pub async fn delete_note(&self, id: &NoteId) -> Result<(), EngineError> {
        let pass = self.pass_lock.lock().await;
        self.store.delete(id).await?;
        tracing::info!("Deleted note {}", id);
        self.run_pass_locked(&pass, PassMode::Rewrite).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Passes
    // -----------------------------------------------------------------------

    /// Fetch, recompute and rewrite every note's link fields.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, EngineError> {
        self.run_pass(PassMode::Rewrite).await
    }

    /// Pass for an external change notification. The notification says nothing
    /// about what changed, so the whole collection is refetched; the write-back
    /// is skipped when the stored links already match, which is what stops the
    /// engine's own writes from retriggering it forever.
    pub async fn sync_external(&self) -> Result<Arc<Snapshot>, EngineError> {
        self.run_pass(PassMode::SkipIfConverged).await
    }

    /// Repair after a failed write-back: a full rewriting pass.
    pub async fn reconcile(&self) -> Result<Arc<Snapshot>, EngineError> {
        tracing::info!("Reconciling link fields for scope {}", self.scope.owner);
        self.run_pass(PassMode::Rewrite).await
    }

    /// True after a write-back failed partway, until a pass completes.
    pub fn needs_reconcile(&self) -> bool {
        self.needs_reconcile.load(Ordering::SeqCst)
    }

    async fn run_pass(&self, mode: PassMode) -> Result<Arc<Snapshot>, EngineError> {
        let pass = self.pass_lock.lock().await;
        self.run_pass_locked(&pass, mode).await
    }

    /// Pass body; the guard proves the caller holds `pass_lock`.
    async fn run_pass_locked(
        &self,
        _pass: &MutexGuard<'_, ()>,
        mode: PassMode,
    ) -> Result<Arc<Snapshot>, EngineError> {

        let fetched = Snapshot::new(self.store.fetch_all(&self.scope).await?);
        let (recomputed, stats) = recompute_links_with_stats(&fetched);

        for collision in find_title_collisions(&recomputed) {
            tracing::warn!(
                "Title {:?} is shared by {} notes; references resolve to {}",
                collision.folded_title(),
                collision.ids().len(),
                collision.winner()
            );
        }

        let skip_write = mode == PassMode::SkipIfConverged && links_converged(&fetched, &recomputed);
        if skip_write {
            tracing::debug!("Links already converged for {} notes, nothing to write", stats.notes);
        } else {
            // A failure here leaves earlier notes rewritten and later ones stale
            // unless the store applies the batch atomically.
            match self.store.write_links(link_updates(&recomputed)).await {
                Ok(written) => tracing::debug!("Wrote link fields for {} notes", written),
                Err(e) => {
                    self.needs_reconcile.store(true, Ordering::SeqCst);
                    tracing::error!("Link write-back failed, collection may be partially updated: {}", e);
                    return Err(e.into());
                }
            }
        }
        self.needs_reconcile.store(false, Ordering::SeqCst);

        let snapshot = Arc::new(recomputed);
        {
            let mut published = self.published.write().unwrap_or_else(|e| e.into_inner());
            *published = Arc::clone(&snapshot);
        }
        tracing::info!(
            "Link pass complete: {} notes, {} edges, {} unresolved references",
            stats.notes,
            stats.edges,
            stats.misses
        );
        Ok(snapshot)
    }

    async fn check_title(&self, title: &str, except: Option<&NoteId>) -> Result<(), EngineError> {
        if self.config.collision_policy != CollisionPolicy::Reject {
            return Ok(());
        }
        let current = Snapshot::new(self.store.fetch_all(&self.scope).await?);
        match find_conflicting_title(title, except, &current) {
            Some(existing) => Err(EngineError::TitleCollision {
                title: title.to_string(),
                existing: existing.id.clone(),
            }),
            None => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Reads (published snapshot only)
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> Arc<Snapshot> {
        let published = self.published.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&published)
    }

    pub fn graph_view(&self) -> GraphView {
        project_with_style(&self.snapshot(), &self.config.graph)
    }

    pub fn note(&self, id: &NoteId) -> Option<Note> {
        self.snapshot().get(id).cloned()
    }

    pub fn linked_notes(&self, id: &NoteId) -> Option<NoteNeighbors> {
        let snapshot = self.snapshot();
        let linked = snapshot.linked_notes(id)?;
        Some(NoteNeighbors {
            backlinks: linked.backlinks.into_iter().cloned().collect(),
            forward_links: linked.forward_links.into_iter().cloned().collect(),
        })
    }

    pub fn search_titles(&self, query: &str) -> Vec<Note> {
        self.snapshot()
            .search_titles(query)
            .into_iter()
            .cloned()
            .collect()
    }
}

fn published_note(snapshot: &Snapshot, id: &NoteId) -> Result<Note, EngineError> {
    snapshot
        .get(id)
        .cloned()
        .ok_or_else(|| EngineError::NoteNotFound(id.clone()))
}
