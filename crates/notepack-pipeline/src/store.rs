//! The seam to the application's state container.
//!
//! The orchestrator only needs two things from note state: the owning
//! note's bundling context, and a way to persist freshly resolved pins.
//! [`MemoryNoteStore`] is a complete in-process implementation used by
//! tests and embeddings without an external store.

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::model::{DepsLock, Note};

/// What the orchestrator reads about a note before bundling.
#[derive(Debug, Clone, Default)]
pub struct NoteContext {
    pub parent_id: Option<String>,
    pub deps_lock: DepsLock,
    /// Code-cell sources in display order.
    pub code_cells: Vec<String>,
}

/// Read/write access to note state.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// The note's bundling context, or `None` when the note cannot be
    /// located (the orchestrator proceeds with an empty context).
    async fn note_context(&self, note_id: &str) -> Option<NoteContext>;

    /// Merge resolved pins into the note's persisted lock. Visible to
    /// every other consumer of note state.
    async fn merge_pins(
        &self,
        parent_id: Option<&str>,
        note_id: &str,
        pins: &FxHashMap<String, String>,
    );
}

/// In-memory note store.
#[derive(Default)]
pub struct MemoryNoteStore {
    notes: RwLock<FxHashMap<String, Note>>,
}

impl MemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, note: Note) {
        self.notes.write().insert(note.id.clone(), note);
    }

    pub fn note(&self, note_id: &str) -> Option<Note> {
        self.notes.read().get(note_id).cloned()
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn note_context(&self, note_id: &str) -> Option<NoteContext> {
        let notes = self.notes.read();
        let note = notes.get(note_id)?;
        Some(NoteContext {
            parent_id: note.parent_id.clone(),
            deps_lock: note.deps_lock.clone(),
            code_cells: note.code_cells(),
        })
    }

    async fn merge_pins(
        &self,
        _parent_id: Option<&str>,
        note_id: &str,
        pins: &FxHashMap<String, String>,
    ) {
        let mut notes = self.notes.write();
        if let Some(note) = notes.get_mut(note_id) {
            note.deps_lock.merge(pins);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, CellContent};

    #[tokio::test]
    async fn test_context_for_missing_note_is_none() {
        let store = MemoryNoteStore::new();
        assert!(store.note_context("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_context_reflects_note_state() {
        let store = MemoryNoteStore::new();
        let mut note = Note::new("n1", Some("nb1".to_string()));
        note.cells.push(Cell {
            id: "c1".to_string(),
            content: CellContent::Code {
                source: "import 'lodash';".to_string(),
            },
        });
        note.deps_lock.insert("react", "18.2.0");
        store.insert(note);

        let context = store.note_context("n1").await.unwrap();
        assert_eq!(context.parent_id.as_deref(), Some("nb1"));
        assert_eq!(context.code_cells, vec!["import 'lodash';"]);
        assert_eq!(context.deps_lock.get("react"), Some("18.2.0"));
    }

    #[tokio::test]
    async fn test_merge_pins_persists() {
        let store = MemoryNoteStore::new();
        store.insert(Note::new("n1", None));

        let mut pins = FxHashMap::default();
        pins.insert("lodash".to_string(), "4.17.21".to_string());
        store.merge_pins(None, "n1", &pins).await;

        let note = store.note("n1").unwrap();
        assert_eq!(note.deps_lock.get("lodash"), Some("4.17.21"));
    }

    #[tokio::test]
    async fn test_merge_pins_for_missing_note_is_a_no_op() {
        let store = MemoryNoteStore::new();
        let mut pins = FxHashMap::default();
        pins.insert("lodash".to_string(), "4.17.21".to_string());

        store.merge_pins(None, "ghost", &pins).await;
        assert!(store.note("ghost").is_none());
    }
}
