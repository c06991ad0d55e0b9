//! Sans-IO core of the notegraph link engine.
//!
//! Operates on in-memory [`Snapshot`]s only: parse `[[...]]` references, resolve
//! them against titles, rebuild forward links and backlinks for the whole
//! collection, and project the result into a node/edge view.

pub mod graph_view;
pub mod link_graph;
pub mod link_parser;
pub mod note;
pub mod title_resolver;

pub use graph_view::{project, project_with_style, GraphEdge, GraphNode, GraphStyle, GraphView, NodeTier};
pub use link_graph::{link_updates, links_converged, recompute_links, recompute_links_with_stats, RecomputeStats};
pub use link_parser::{extract_reference_spans, extract_references, ReferenceSpan, References};
pub use note::{LinkUpdate, LinkedNotes, Note, NoteDraft, NoteId, NotePatch, Snapshot};
pub use title_resolver::{
    find_conflicting_title, find_title_collisions, fold_title, resolve_title, TitleCollision,
    TitleIndex,
};
