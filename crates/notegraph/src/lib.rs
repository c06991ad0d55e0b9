//! Link-graph engine for titled notes.
//!
//! Wires the sans-IO pieces of `notegraph-core` to a [`NoteStore`]: every local
//! mutation or external change notification runs a full fetch, recompute,
//! write-back and publish pass.

pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
pub mod memory_store;
pub mod store;
pub mod watcher;

pub use config::{CollisionPolicy, EngineConfig, WatcherConfig};
pub use engine::{EngineError, LinkEngine, NoteEdit, NoteNeighbors};
pub use memory_store::MemoryStore;
pub use store::{ChangeSubscription, NoteStore, Scope, StoreChanged, StoreError};
pub use watcher::ChangeWatcher;
