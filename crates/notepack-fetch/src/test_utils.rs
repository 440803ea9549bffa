//! Canned-response fetcher for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{FetchError, FetchedText, Fetcher};

#[derive(Debug, Clone)]
enum Canned {
    Body { body: String, final_url: String },
    Status(u16),
    Transport(String),
}

/// In-memory [`Fetcher`] with per-URL canned responses and request counting.
///
/// Unknown URLs answer 404. Request counts let tests assert that cached
/// paths never hit the network.
#[derive(Debug, Default)]
pub struct RecordingFetcher {
    responses: Mutex<HashMap<String, Canned>>,
    requests: Mutex<Vec<String>>,
    count: AtomicUsize,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`, with `final_url == url` (no redirect).
    pub fn respond(&self, url: &str, body: &str) {
        self.responses.lock().insert(
            url.to_string(),
            Canned::Body {
                body: body.to_string(),
                final_url: url.to_string(),
            },
        );
    }

    /// Serve `body` for `url` as if the request had been redirected.
    pub fn respond_redirected(&self, url: &str, body: &str, final_url: &str) {
        self.responses.lock().insert(
            url.to_string(),
            Canned::Body {
                body: body.to_string(),
                final_url: final_url.to_string(),
            },
        );
    }

    /// Answer `url` with a non-2xx status.
    pub fn fail_with_status(&self, url: &str, status: u16) {
        self.responses
            .lock()
            .insert(url.to_string(), Canned::Status(status));
    }

    /// Answer `url` with a transport-level failure.
    pub fn fail_with_transport(&self, url: &str, message: &str) {
        self.responses
            .lock()
            .insert(url.to_string(), Canned::Transport(message.to_string()));
    }

    /// Total number of fetches performed.
    pub fn request_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Every requested URL, in call order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Fetcher for RecordingFetcher {
    async fn fetch_text(&self, url: &str) -> Result<FetchedText, FetchError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(url.to_string());

        let canned = self.responses.lock().get(url).cloned();
        match canned {
            Some(Canned::Body { body, final_url }) => Ok(FetchedText { body, final_url }),
            Some(Canned::Status(status)) => Err(FetchError::Status {
                status,
                reason: reason_for(status).to_string(),
                url: url.to_string(),
            }),
            Some(Canned::Transport(message)) => Err(FetchError::Transport {
                message,
                url: url.to_string(),
            }),
            None => Err(FetchError::Status {
                status: 404,
                reason: "Not Found".to_string(),
                url: url.to_string(),
            }),
        }
    }
}

fn reason_for(status: u16) -> &'static str {
    match status {
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        403 => "Forbidden",
        _ => "",
    }
}
