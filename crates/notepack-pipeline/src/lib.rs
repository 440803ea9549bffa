//! # notepack-pipeline
//!
//! Bundle orchestration for notebook notes.
//!
//! This crate is the control loop between the editing surface and the
//! bundling engine. A "bundle this code" request flows through:
//!
//! 1. publish `Creating` for the cell;
//! 2. read the owning note's pin lock and code-cell corpus;
//! 3. extract bare imports from the corpus and the edited source;
//! 4. resolve packages missing from the lock, merge new pins back into
//!    note state;
//! 5. invoke the bundling engine with the updated lock;
//! 6. publish `Created` with the bundle code and any accumulated error
//!    text.
//!
//! Every triggered request leaves `Creating` in finite time: failures of
//! any step are folded into a `Created` publish, never propagated.
//! Per-cell request sequence numbers suppress stale publishes when two
//! builds for the same cell overlap.

mod debounce;
mod events;
mod model;
mod orchestrator;
mod store;

pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use events::{BundleEvent, EventSink, RecordingSink};
pub use model::{Cell, CellContent, DepsLock, Note};
pub use orchestrator::{BundleRequest, Orchestrator};
pub use store::{MemoryNoteStore, NoteContext, NoteStore};
