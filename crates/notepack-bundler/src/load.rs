//! Module loading plugin.
//!
//! Turns a resolved path into source text: the entry path returns the
//! user's cell source, everything else is served cache-first from the
//! content cache with a network fetch on miss. CSS is wrapped into a
//! style-injection snippet at load time so the rest of the pipeline only
//! ever sees JavaScript.

use std::sync::Arc;

use notepack_cache::{CachedModule, ContentCache, Loader};
use notepack_fetch::{FetchError, Fetcher};

use crate::resolve::ENTRY_PATH;

/// Loader-level failures. These surface as build errors through the
/// engine's error channel, never as panics.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Only secure transport is permitted for module content.
    #[error("refusing to load {0}: only secure (https) URLs are permitted")]
    InsecureUrl(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Cache-first module loader.
pub struct ModuleLoader {
    fetcher: Arc<dyn Fetcher>,
    cache: Arc<dyn ContentCache>,
}

impl ModuleLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Arc<dyn ContentCache>) -> Self {
        Self { fetcher, cache }
    }

    /// Load the module at `path`.
    ///
    /// `entry_source` is the user-authored cell text returned verbatim for
    /// the entry path. Any other path must be an `https://` URL; the
    /// security gate runs before the cache is consulted, so a rejected
    /// path performs no fetch and no cache write.
    pub async fn load(&self, path: &str, entry_source: &str) -> Result<CachedModule, LoadError> {
        if path == ENTRY_PATH {
            return Ok(CachedModule {
                loader: Loader::Jsx,
                contents: entry_source.to_string(),
                resolve_dir: None,
            });
        }

        if !path.starts_with("https://") {
            return Err(LoadError::InsecureUrl(path.to_string()));
        }

        match self.cache.get(path) {
            Ok(Some(cached)) => {
                tracing::trace!(path, "cache hit");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(err) => {
                // A broken cache read degrades to a fetch.
                tracing::warn!(path, error = %err, "cache read failed");
            }
        }

        let fetched = self.fetcher.fetch_text(path).await?;
        let resolve_dir = directory_of(&fetched.final_url);

        let contents = if path.ends_with(".css") {
            wrap_css(&fetched.body)
        } else {
            fetched.body
        };

        let module = CachedModule {
            loader: Loader::Jsx,
            contents,
            resolve_dir: Some(resolve_dir),
        };

        // Keyed by the originally requested path, not the final URL, so the
        // next resolve of the same specifier hits.
        if let Err(err) = self.cache.set(path, &module) {
            tracing::warn!(path, error = %err, "cache write failed");
        }

        Ok(module)
    }
}

/// The directory portion of a URL, trailing slash included.
fn directory_of(url: &str) -> String {
    match url.rfind('/') {
        Some(idx) => url[..idx + 1].to_string(),
        None => url.to_string(),
    }
}

/// Wrap fetched CSS in a snippet that injects a `<style>` element at
/// runtime. Backslashes, quotes, and newlines are escaped so the sheet
/// survives as a single-quoted JS string.
fn wrap_css(css: &str) -> String {
    let escaped = css
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\r', "")
        .replace('\n', "\\n");
    format!(
        "const style = document.createElement('style');\n\
         style.innerText = '{}';\n\
         document.head.appendChild(style);",
        escaped
    )
}
