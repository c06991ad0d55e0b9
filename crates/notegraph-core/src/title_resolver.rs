use crate::note::{Note, NoteId, Snapshot};
use std::collections::HashMap;

/// Fold a title or reference text for comparison.
///
/// Matching is case-insensitive exact equality; nothing else is normalized.
pub fn fold_title(text: &str) -> String {
    text.to_lowercase()
}

/// Resolve a reference text to a note in the snapshot.
///
/// Algorithm:
/// 1. Fold the reference and every title with `fold_title`
/// 2. Return the first note, in canonical order, whose folded title is equal
///
/// Several notes sharing a folded title is not an error: the earliest one wins.
/// No match returns `None`.
pub fn resolve_title<'a>(reference: &str, snapshot: &'a Snapshot) -> Option<&'a NoteId> {
    resolve_note(reference, snapshot.notes()).map(|n| &n.id)
}

fn resolve_note<'a>(reference: &str, notes: &'a [Note]) -> Option<&'a Note> {
    if reference.is_empty() {
        return None;
    }
    let folded = fold_title(reference);
    notes.iter().find(|n| fold_title(&n.title) == folded)
}

/// Folded title -> note id lookup built from one snapshot.
///
/// Answers exactly what `resolve_title` answers against the same snapshot, in
/// O(1) per reference instead of a scan over every title.
#[derive(Debug, Default)]
pub struct TitleIndex {
    /// Forward map: folded title -> first id in canonical order
    by_title: HashMap<String, NoteId>,
    /// Every id sharing a folded title, only kept when there is more than one
    shared: HashMap<String, Vec<NoteId>>,
}

impl TitleIndex {
    pub fn build(snapshot: &Snapshot) -> Self {
        let mut index = Self::default();
        for note in snapshot {
            index.insert(note);
        }
        index
    }

    fn insert(&mut self, note: &Note) {
        let folded = fold_title(&note.title);
        match self.by_title.get(&folded) {
            Some(first) => {
                let first = first.clone();
                self.shared
                    .entry(folded)
                    .or_insert_with(|| vec![first])
                    .push(note.id.clone());
            }
            None => {
                self.by_title.insert(folded, note.id.clone());
            }
        }
    }

    pub fn resolve(&self, reference: &str) -> Option<&NoteId> {
        if reference.is_empty() {
            return None;
        }
        self.by_title.get(&fold_title(reference))
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }

    /// Titles claimed by more than one note, sorted by folded title.
    pub fn collisions(&self) -> Vec<TitleCollision> {
        let mut collisions: Vec<TitleCollision> = self
            .shared
            .iter()
            .map(|(folded, ids)| TitleCollision {
                folded_title: folded.clone(),
                ids: ids.clone(),
            })
            .collect();
        collisions.sort_by(|a, b| a.folded_title.cmp(&b.folded_title));
        collisions
    }
}

/// Several notes whose titles fold to the same text.
///
/// Only built by [`TitleIndex::collisions`], so `ids` always holds at least two
/// claimants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TitleCollision {
    folded_title: String,
    /// All claimants in canonical order; the first one receives every reference.
    ids: Vec<NoteId>,
}

impl TitleCollision {
    pub fn folded_title(&self) -> &str {
        &self.folded_title
    }

    pub fn ids(&self) -> &[NoteId] {
        &self.ids
    }

    pub fn winner(&self) -> &NoteId {
        &self.ids[0]
    }

    pub fn shadowed(&self) -> &[NoteId] {
        &self.ids[1..]
    }
}

/// Every folded title shared by two or more notes in the snapshot.
pub fn find_title_collisions(snapshot: &Snapshot) -> Vec<TitleCollision> {
    TitleIndex::build(snapshot).collisions()
}

/// The note, other than `except`, whose title folds to the same text as `title`.
pub fn find_conflicting_title<'a>(
    title: &str,
    except: Option<&NoteId>,
    snapshot: &'a Snapshot,
) -> Option<&'a Note> {
    let folded = fold_title(title);
    snapshot
        .iter()
        .filter(|n| Some(&n.id) != except)
        .find(|n| fold_title(&n.title) == folded)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
