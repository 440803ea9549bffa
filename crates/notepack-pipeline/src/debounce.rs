//! Trailing-edge debouncer for keystroke-driven rebuilds.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Default quiet period before a rebuild fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1250);

/// Runs an action after a quiet period, dropping earlier triggers.
///
/// Each [`Debouncer::trigger`] aborts the previously scheduled timer and
/// arms a new one, so a burst of edits produces exactly one run with the
/// final action. Only the timer is cancellable: once the quiet period
/// elapses the action runs on a detached task that no later trigger can
/// reach. An overtaken build is suppressed downstream, not killed.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debouncer {
    pub fn new() -> Self {
        Self::with_delay(DEFAULT_DEBOUNCE)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `action` after the quiet period, replacing any timer armed
    /// earlier. Must be called from within a tokio runtime.
    pub fn trigger<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Hand off to a detached task: aborting this handle can only
            // ever cancel the timer, never an action already underway.
            tokio::spawn(action());
        });

        let mut pending = self.pending.lock();
        if let Some(previous) = pending.replace(timer) {
            previous.abort();
        }
    }

    /// Drop the armed timer without running its action. An action that
    /// already started keeps running.
    pub fn cancel(&self) {
        if let Some(timer) = self.pending.lock().take() {
            timer.abort();
        }
    }
}
