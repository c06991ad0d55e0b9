use crate::config::WatcherConfig;
use crate::engine::LinkEngine;
use crate::store::{ChangeSubscription, NoteStore};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Background worker that turns store change notifications into link passes.
///
/// Notifications carry no payload, so every one of them means "refetch and
/// recompute everything". Bursts (an editor typing, another engine writing back
/// a whole collection) collapse into one pass once the store has been quiet for
/// the debounce window.
pub struct ChangeWatcher<S: NoteStore> {
    engine: Arc<LinkEngine<S>>,
    debounce: Duration,
}

impl<S: NoteStore + 'static> ChangeWatcher<S> {
    pub fn new(engine: Arc<LinkEngine<S>>, config: &WatcherConfig) -> Self {
        Self {
            engine,
            debounce: config.debounce(),
        }
    }

    /// Subscribe now and run the worker on the tokio runtime until `cancel` fires
    /// or the store closes its channel.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        // Subscribe before spawning so no notification between here and the
        // first poll is lost.
        let subscription = self.engine.store().subscribe();
        tokio::spawn(self.run(subscription, cancel))
    }

    pub async fn run(self, mut subscription: ChangeSubscription, cancel: CancellationToken) {
        tracing::info!("Change watcher started for scope {}", self.engine.scope().owner);
        loop {
            let alive = tokio::select! {
                _ = cancel.cancelled() => break,
                alive = subscription.changed() => alive,
            };
            if !alive {
                break;
            }

            // Wait until no notification has arrived for a full debounce window.
            let mut store_open = true;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Change watcher cancelled");
                        return;
                    }
                    _ = tokio::time::sleep(self.debounce) => break,
                    alive = subscription.changed() => {
                        if !alive {
                            store_open = false;
                            break;
                        }
                    }
                }
            }

            match self.engine.sync_external().await {
                Ok(snapshot) => {
                    tracing::info!("External change processed ({} notes)", snapshot.len())
                }
                Err(e) => tracing::error!("Failed to process external change: {}", e),
            }

            if !store_open {
                break;
            }
        }
        tracing::info!("Change watcher stopped");
    }
}
