//! The bundle orchestrator.
//!
//! Drives one request from `Creating` to `Created`. No step here returns
//! an error to the caller: resolution and bundling failures accumulate
//! into the `Created` event's error text, so the editing surface always
//! leaves its pending state.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use notepack_bundler::BundlerService;
use notepack_imports::extract_bare_imports;
use notepack_registry::VersionResolver;

use crate::events::{BundleEvent, EventSink};
use crate::store::NoteStore;

/// One "bundle this code" request from the editing surface.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    pub cell_id: String,
    pub note_id: String,
    /// Owning notebook, when known. Passed through to pin persistence.
    pub parent_id: Option<String>,
    /// The edited cell's current source, which may not be saved yet.
    pub raw_code: String,
}

/// Coordinates extraction, version pinning, and bundling for requests.
pub struct Orchestrator {
    store: Arc<dyn NoteStore>,
    sink: Arc<dyn EventSink>,
    resolver: Arc<VersionResolver>,
    bundler: Arc<BundlerService>,
    /// Newest accepted request sequence per cell. A finished build whose
    /// seq is no longer newest publishes nothing.
    latest_seq: Mutex<FxHashMap<String, u64>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn NoteStore>,
        sink: Arc<dyn EventSink>,
        resolver: Arc<VersionResolver>,
        bundler: Arc<BundlerService>,
    ) -> Self {
        Self {
            store,
            sink,
            resolver,
            bundler,
            latest_seq: Mutex::new(FxHashMap::default()),
        }
    }

    /// Service one request end to end.
    ///
    /// Publishes `Creating` immediately, then a matching `Created` unless
    /// a newer request for the same cell was accepted while this one ran.
    pub async fn handle(&self, request: BundleRequest) {
        let seq = self.next_seq(&request.cell_id);
        self.sink.publish(BundleEvent::Creating {
            cell_id: request.cell_id.clone(),
            seq,
        });

        let (code, error) = self.run(&request).await;

        if !self.is_latest(&request.cell_id, seq) {
            tracing::debug!(cell = %request.cell_id, seq, "superseded, dropping result");
            return;
        }
        self.sink.publish(BundleEvent::Created {
            cell_id: request.cell_id,
            seq,
            code,
            error,
        });
    }

    async fn run(&self, request: &BundleRequest) -> (String, String) {
        let context = self
            .store
            .note_context(&request.note_id)
            .await
            .unwrap_or_default();
        let mut lock = context.deps_lock;

        // Imports from every saved code cell plus the in-flight source.
        let corpus = context.code_cells.join("\n");
        let mut imports = extract_bare_imports(&corpus);
        imports.extend(extract_bare_imports(&request.raw_code));

        let mut missing: Vec<String> = imports
            .into_iter()
            .filter(|package| !lock.contains(package))
            .collect();
        missing.sort();

        let mut errors: Vec<String> = Vec::new();
        if !missing.is_empty() {
            tracing::debug!(note = %request.note_id, packages = ?missing, "pinning");
            let batch = self
                .resolver
                .resolve_pinned_versions(&missing, &FxHashMap::default())
                .await;

            for failure in &batch.errors {
                errors.push(format!(
                    "failed to resolve {}: {}",
                    failure.package, failure.message
                ));
            }

            if !batch.resolved.is_empty() {
                lock.merge(&batch.resolved);
                self.store
                    .merge_pins(request.parent_id.as_deref(), &request.note_id, &batch.resolved)
                    .await;
                self.sink.publish(BundleEvent::PinsMerged {
                    parent_id: request.parent_id.clone(),
                    note_id: request.note_id.clone(),
                    pins: batch.resolved,
                });
            }
        }

        let output = self.bundler.build(&request.raw_code, lock.as_map()).await;
        if !output.error.is_empty() {
            errors.insert(0, output.error);
        }
        (output.code, errors.join("\n"))
    }

    fn next_seq(&self, cell_id: &str) -> u64 {
        let mut latest = self.latest_seq.lock();
        let seq = latest.get(cell_id).copied().unwrap_or(0) + 1;
        latest.insert(cell_id.to_string(), seq);
        seq
    }

    fn is_latest(&self, cell_id: &str, seq: u64) -> bool {
        self.latest_seq.lock().get(cell_id).copied() == Some(seq)
    }
}
