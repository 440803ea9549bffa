//! Publish seam between the orchestrator and the editing surface.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Events the orchestrator publishes while servicing a request.
///
/// `Creating` and `Created` are paired per accepted request, matched by
/// `seq`. A `Created` for a superseded request is suppressed before it
/// reaches the sink, so consumers only ever see the newest result per
/// cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BundleEvent {
    /// A bundle request was accepted; a `Created` will follow.
    Creating { cell_id: String, seq: u64 },
    /// Terminal result. `code` and `error` may both be non-empty when the
    /// bundle succeeded but some version pins failed to resolve.
    Created {
        cell_id: String,
        seq: u64,
        code: String,
        error: String,
    },
    /// New version pins were merged into the note's lock.
    PinsMerged {
        parent_id: Option<String>,
        note_id: String,
        pins: FxHashMap<String, String>,
    },
}

/// Where bundle events go. Implementations must tolerate publishes from
/// concurrent requests.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: BundleEvent);
}

/// Sink that records everything it sees, for tests.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<BundleEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BundleEvent> {
        self.events.lock().clone()
    }

    /// The `Created` events seen so far, in publish order.
    pub fn created(&self) -> Vec<BundleEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, BundleEvent::Created { .. }))
            .cloned()
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: BundleEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_preserves_order() {
        let sink = RecordingSink::new();
        sink.publish(BundleEvent::Creating {
            cell_id: "c1".to_string(),
            seq: 1,
        });
        sink.publish(BundleEvent::Created {
            cell_id: "c1".to_string(),
            seq: 1,
            code: "x".to_string(),
            error: String::new(),
        });

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], BundleEvent::Creating { .. }));
        assert_eq!(sink.created().len(), 1);
    }

    #[test]
    fn test_event_serde_tagging() {
        let event = BundleEvent::Creating {
            cell_id: "c1".to_string(),
            seq: 7,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"creating\""));
        assert!(json.contains("\"seq\":7"));
    }
}
