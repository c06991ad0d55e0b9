use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned note identity, stable for the note's lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NoteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A titled text document whose content may contain `[[...]]` reference markers.
///
/// `forward_links` keeps first-encounter order of the references in `content`;
/// `backlinks` keeps the canonical order of the collection it was computed from.
/// Neither contains duplicates after a recompute pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub forward_links: Vec<NoteId>,
    #[serde(default)]
    pub backlinks: Vec<NoteId>,
}

impl Note {
    /// Number of edges touching this note, in either direction.
    pub fn degree(&self) -> usize {
        self.backlinks.len() + self.forward_links.len()
    }
}

/// Fields the caller supplies when creating a note. The store assigns id and timestamps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    /// Draft with the default body every new note starts with.
    pub fn templated(title: &str) -> Self {
        Self {
            title: title.to_string(),
            content: format!("# {}\n\nStart writing here...", title),
        }
    }
}

/// Recomputed link fields for one note.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkUpdate {
    pub id: NoteId,
    pub forward_links: Vec<NoteId>,
    pub backlinks: Vec<NoteId>,
}

/// Partial update for `updateFields`. `None` leaves the stored field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_links: Option<Vec<NoteId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backlinks: Option<Vec<NoteId>>,
}

impl NotePatch {
    /// Title/content edit coming from the editing surface.
    pub fn edit(title: Option<String>, content: Option<String>) -> Self {
        Self {
            title,
            content,
            ..Self::default()
        }
    }

    /// Link-field write-back produced by a recompute pass.
    pub fn links(update: LinkUpdate) -> Self {
        Self {
            forward_links: Some(update.forward_links),
            backlinks: Some(update.backlinks),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.forward_links.is_none()
            && self.backlinks.is_none()
    }

    /// Apply the present fields to `note`. Timestamps are the caller's concern.
    pub fn apply_to(&self, note: &mut Note) {
        if let Some(title) = &self.title {
            note.title = title.clone();
        }
        if let Some(content) = &self.content {
            note.content = content.clone();
        }
        if let Some(forward_links) = &self.forward_links {
            note.forward_links = forward_links.clone();
        }
        if let Some(backlinks) = &self.backlinks {
            note.backlinks = backlinks.clone();
        }
    }
}

/// Notes resolved from another note's link sets, for "linked / backlinked notes" panels.
#[derive(Debug, PartialEq, Eq)]
pub struct LinkedNotes<'a> {
    pub backlinks: Vec<&'a Note>,
    pub forward_links: Vec<&'a Note>,
}

/// Immutable, ordered view of a whole note collection.
///
/// The order is the canonical iteration order used for title tie-breaks: whatever
/// order the store returned (ascending creation time for the bundled stores).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    notes: Vec<Note>,
}

impl Snapshot {
    pub fn new(notes: Vec<Note>) -> Self {
        Self { notes }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn into_notes(self) -> Vec<Note> {
        self.notes
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == *id)
    }

    /// Case-insensitive substring match on titles, in canonical order.
    /// An empty query returns every note.
    pub fn search_titles(&self, query: &str) -> Vec<&Note> {
        let query = query.to_lowercase();
        self.notes
            .iter()
            .filter(|n| n.title.to_lowercase().contains(&query))
            .collect()
    }

    /// Resolve a note's link sets to the notes they name. Ids that are not in
    /// this snapshot are skipped. Returns `None` if `id` itself is unknown.
    pub fn linked_notes(&self, id: &NoteId) -> Option<LinkedNotes<'_>> {
        let note = self.get(id)?;
        Some(LinkedNotes {
            backlinks: self.resolve_ids(&note.backlinks),
            forward_links: self.resolve_ids(&note.forward_links),
        })
    }

    fn resolve_ids(&self, ids: &[NoteId]) -> Vec<&Note> {
        ids.iter().filter_map(|linked| self.get(linked)).collect()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Note;
    type IntoIter = std::slice::Iter<'a, Note>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}

impl FromIterator<Note> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Note>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
