use crate::link_parser::extract_references;
use crate::note::{LinkUpdate, Note, NoteId, Snapshot};
use crate::title_resolver::TitleIndex;
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// Recompute pass
// ---------------------------------------------------------------------------

/// Counters from one recompute pass, for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecomputeStats {
    pub notes: usize,
    pub references: usize,
    /// References that matched no title and were dropped
    pub misses: usize,
    /// Distinct forward edges after deduplication
    pub edges: usize,
}

/// Resolved forward targets of one note, deduplicated in first-encounter order.
fn forward_targets(note: &Note, index: &TitleIndex, stats: &mut RecomputeStats) -> Vec<NoteId> {
    let mut seen: HashSet<&NoteId> = HashSet::new();
    let mut targets = Vec::new();
    for reference in extract_references(&note.content) {
        stats.references += 1;
        match index.resolve(reference) {
            Some(id) => {
                if seen.insert(id) {
                    targets.push(id.clone());
                }
            }
            None => stats.misses += 1,
        }
    }
    targets
}

/// Rebuild every note's `forward_links` and `backlinks` from scratch.
///
/// Steps:
/// 1. Extract each note's references and resolve them against this same snapshot
///    (misses are dropped, targets deduplicated in first-encounter order)
/// 2. Invert the forward relation over the whole collection; each backlink list
///    follows canonical collection order
///
/// Stored link fields on the input are ignored entirely. Titles, content and
/// timestamps are carried over unchanged.
pub fn recompute_links(snapshot: &Snapshot) -> Snapshot {
    recompute_links_with_stats(snapshot).0
}

pub fn recompute_links_with_stats(snapshot: &Snapshot) -> (Snapshot, RecomputeStats) {
    let index = TitleIndex::build(snapshot);
    let mut stats = RecomputeStats {
        notes: snapshot.len(),
        ..RecomputeStats::default()
    };

    // 1. Forward links
    let forward: Vec<Vec<NoteId>> = snapshot
        .iter()
        .map(|note| forward_targets(note, &index, &mut stats))
        .collect();
    stats.edges = forward.iter().map(Vec::len).sum();

    // 2. Backlinks by inversion. Sources are visited in canonical order, so each
    //    target's list comes out in that order too.
    let mut backlinks: HashMap<NoteId, Vec<NoteId>> = HashMap::new();
    for (source, targets) in snapshot.iter().zip(&forward) {
        for target in targets {
            backlinks
                .entry(target.clone())
                .or_default()
                .push(source.id.clone());
        }
    }

    let notes = snapshot
        .iter()
        .zip(forward)
        .map(|(note, forward_links)| Note {
            backlinks: backlinks.remove(&note.id).unwrap_or_default(),
            forward_links,
            ..note.clone()
        })
        .collect();

    tracing::debug!(
        "Recomputed links: {} notes, {} references, {} edges, {} unresolved",
        stats.notes,
        stats.references,
        stats.edges,
        stats.misses
    );

    (Snapshot::new(notes), stats)
}

/// Write-back plan for a recomputed snapshot: one entry per note, canonical order.
pub fn link_updates(snapshot: &Snapshot) -> Vec<LinkUpdate> {
    snapshot
        .iter()
        .map(|note| LinkUpdate {
            id: note.id.clone(),
            forward_links: note.forward_links.clone(),
            backlinks: note.backlinks.clone(),
        })
        .collect()
}

fn same_set(a: &[NoteId], b: &[NoteId]) -> bool {
    let a: HashSet<&NoteId> = a.iter().collect();
    let b: HashSet<&NoteId> = b.iter().collect();
    a == b
}

/// True when both snapshots hold the same notes with equal link sets.
///
/// Order inside a link set is not significant downstream, so it is not compared.
pub fn links_converged(before: &Snapshot, after: &Snapshot) -> bool {
    before.len() == after.len()
        && before.iter().zip(after.iter()).all(|(b, a)| {
            b.id == a.id
                && same_set(&b.forward_links, &a.forward_links)
                && same_set(&b.backlinks, &a.backlinks)
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
