//! Note and cell data model.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// What a cell holds. Import extraction only looks at the `Code` variant;
/// adding a new variant leaves the bundling pipeline untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CellContent {
    Code { source: String },
    Markdown { text: String },
}

impl CellContent {
    /// The source text if this is a code cell.
    pub fn code(&self) -> Option<&str> {
        match self {
            CellContent::Code { source } => Some(source),
            CellContent::Markdown { .. } => None,
        }
    }
}

/// One cell of a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub id: String,
    pub content: CellContent,
}

/// Version pin lock: package name to exact resolved version.
///
/// One lock per note, created empty. Entries are only added or overwritten
/// by successful resolution merges; nothing here removes them. Invariant:
/// values are non-empty concrete versions, never the `"latest"` sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepsLock(FxHashMap<String, String>);

impl DepsLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, package: &str) -> Option<&str> {
        self.0.get(package).map(String::as_str)
    }

    pub fn contains(&self, package: &str) -> bool {
        self.0.contains_key(package)
    }

    /// Pin a package. Empty names, empty versions, and the `"latest"`
    /// sentinel are rejected; returns whether the pin was stored.
    pub fn insert(&mut self, package: &str, version: &str) -> bool {
        if package.is_empty() || version.is_empty() || version == notepack_registry::LATEST {
            return false;
        }
        self.0.insert(package.to_string(), version.to_string());
        true
    }

    /// Merge a batch of resolved pins, overwriting existing entries.
    /// Entries violating the lock invariant are dropped.
    pub fn merge(&mut self, resolved: &FxHashMap<String, String>) {
        for (package, version) in resolved {
            self.insert(package, version);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying map (for the bundling engine).
    pub fn as_map(&self) -> &FxHashMap<String, String> {
        &self.0
    }
}

/// A note: an ordered list of cells plus its pin lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    /// Owning notebook, when the note lives inside one.
    pub parent_id: Option<String>,
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub deps_lock: DepsLock,
}

impl Note {
    pub fn new(id: impl Into<String>, parent_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            parent_id,
            cells: Vec::new(),
            deps_lock: DepsLock::new(),
        }
    }

    /// Source text of every code cell, in display order.
    pub fn code_cells(&self) -> Vec<String> {
        self.cells
            .iter()
            .filter_map(|cell| cell.content.code().map(str::to_string))
            .collect()
    }
}
