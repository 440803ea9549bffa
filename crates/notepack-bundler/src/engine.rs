//! The bundling engine.
//!
//! Walks the import graph from the fixed entry point through the resolve
//! and load plugins, rewrites each module for the bundle runtime, and
//! assembles one self-contained script. The [`BundlerService::build`]
//! boundary converts every failure into the `error` field of
//! [`BundleOutput`]; nothing escapes it.

use std::collections::VecDeque;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use rustc_hash::{FxHashMap, FxHashSet};

use notepack_cache::{ContentCache, MemoryCache};
use notepack_fetch::{Fetcher, HttpFetcher};
use notepack_imports::extract_specifiers;
use notepack_registry::RegistryConfig;

use crate::load::{LoadError, ModuleLoader};
use crate::resolve::{ENTRY_SPECIFIER, ResolvePlugin};
use crate::rewrite::rewrite_esm;

/// Runtime scaffold for assembled bundles.
///
/// Registers module factories under their content URLs and executes them on
/// demand. `process.env.NODE_ENV` is fixed to the production branch and
/// `global` is aliased to the browser window for UMD-style modules.
const RUNTIME_PRELUDE: &str = r#"var __notepack_modules = {};
var __notepack_instances = {};
var global = window;
var process = { env: { NODE_ENV: "production" } };
function __notepack_define(id, factory) { __notepack_modules[id] = factory; }
function __notepack_require(id) {
  if (__notepack_instances[id]) { return __notepack_instances[id].exports; }
  var module = { exports: {} };
  __notepack_instances[id] = module;
  __notepack_modules[id](__notepack_require, module, module.exports);
  return module.exports;
}
"#;

/// Terminal result of a build: exactly one of `code`/`error` is non-empty
/// (both empty only for an empty entry source).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleOutput {
    pub code: String,
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
enum BundleError {
    #[error(transparent)]
    Load(#[from] LoadError),
}

static SHARED: OnceCell<Arc<BundlerService>> = OnceCell::new();

/// The in-process bundler.
///
/// Cheap to construct; intended to be shared. [`BundlerService::shared`]
/// gives the lazily-created process-wide instance, and orchestration code
/// takes an `Arc<BundlerService>` so tests can inject their own.
pub struct BundlerService {
    resolver: ResolvePlugin,
    loader: ModuleLoader,
}

impl BundlerService {
    pub fn new(
        config: &RegistryConfig,
        fetcher: Arc<dyn Fetcher>,
        cache: Arc<dyn ContentCache>,
    ) -> Self {
        Self {
            resolver: ResolvePlugin::new(config.cdn_base.clone()),
            loader: ModuleLoader::new(fetcher, cache),
        }
    }

    /// The process-wide shared service, created on first use and never
    /// torn down. Defaults to a live HTTP fetcher with an in-memory cache;
    /// call [`BundlerService::install_shared`] earlier to supply a
    /// persistent cache.
    pub fn shared() -> Arc<BundlerService> {
        SHARED
            .get_or_init(|| {
                Arc::new(BundlerService::new(
                    &RegistryConfig::default(),
                    Arc::new(HttpFetcher::new()),
                    Arc::new(MemoryCache::new()),
                ))
            })
            .clone()
    }

    /// Install the shared instance before first use. Returns `false` if a
    /// shared instance already exists (the existing one stays).
    pub fn install_shared(service: Arc<BundlerService>) -> bool {
        SHARED.set(service).is_ok()
    }

    /// Bundle `entry_source` with the given version pins.
    ///
    /// Never fails out of band: syntax problems, unresolved modules, and
    /// network errors all land in [`BundleOutput::error`].
    pub async fn build(
        &self,
        entry_source: &str,
        pins: &FxHashMap<String, String>,
    ) -> BundleOutput {
        match self.build_inner(entry_source, pins).await {
            Ok(code) => BundleOutput {
                code,
                error: String::new(),
            },
            Err(err) => {
                tracing::debug!(error = %err, "build failed");
                BundleOutput {
                    code: String::new(),
                    error: err.to_string(),
                }
            }
        }
    }

    async fn build_inner(
        &self,
        entry_source: &str,
        pins: &FxHashMap<String, String>,
    ) -> Result<String, BundleError> {
        let pinned = |pkg: &str| pins.get(pkg).cloned();

        let entry = self.resolver.resolve(ENTRY_SPECIFIER, None, &pinned);
        let mut visited: FxHashSet<String> = FxHashSet::default();
        visited.insert(entry.url.clone());

        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(entry.url.clone());

        let mut modules: Vec<(String, String)> = Vec::new();

        while let Some(url) = queue.pop_front() {
            let module = self.loader.load(&url, entry_source).await?;
            let resolve_dir = module.resolve_dir.clone();

            let mapper = |spec: &str| {
                self.resolver
                    .resolve(spec, resolve_dir.as_deref(), &pinned)
                    .url
            };

            for spec in extract_specifiers(&module.contents) {
                let dep = mapper(&spec);
                if visited.insert(dep.clone()) {
                    queue.push_back(dep);
                }
            }

            let rewritten = rewrite_esm(&module.contents, &mapper);
            modules.push((url, rewritten));
        }

        tracing::debug!(modules = modules.len(), "assembling bundle");
        Ok(assemble(&modules, &entry.url))
    }
}

fn assemble(modules: &[(String, String)], entry_id: &str) -> String {
    let mut out = String::with_capacity(
        RUNTIME_PRELUDE.len() + modules.iter().map(|(_, code)| code.len() + 96).sum::<usize>(),
    );
    out.push_str(RUNTIME_PRELUDE);
    for (id, code) in modules {
        out.push_str(&format!(
            "__notepack_define(\"{}\", function (require, module, exports) {{\n",
            escape(id)
        ));
        out.push_str(code);
        out.push_str("\n});\n");
    }
    out.push_str(&format!("__notepack_require(\"{}\");\n", escape(entry_id)));
    out
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ENTRY_PATH;
    use notepack_fetch::test_utils::RecordingFetcher;

    fn service_with(fetcher: Arc<RecordingFetcher>) -> BundlerService {
        BundlerService::new(
            &RegistryConfig::default(),
            fetcher,
            Arc::new(MemoryCache::new()),
        )
    }

    #[tokio::test]
    async fn test_entry_only_bundle() {
        let fetcher = Arc::new(RecordingFetcher::new());
        let service = service_with(fetcher.clone());

        let output = service
            .build("console.log('hello');", &FxHashMap::default())
            .await;

        assert!(output.error.is_empty());
        assert!(output.code.contains("console.log('hello');"));
        assert!(output.code.contains(&format!("__notepack_require(\"{}\")", ENTRY_PATH)));
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test]
    async fn test_bundle_with_pinned_import() {
        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.respond(
            "https://unpkg.com/lodash@4.17.21",
            "module.exports = { isEmpty: function (o) { return true; } };",
        );
        let service = service_with(fetcher.clone());

        let mut pins = FxHashMap::default();
        pins.insert("lodash".to_string(), "4.17.21".to_string());

        let output = service
            .build("import _ from 'lodash';\nconsole.log(_.isEmpty({}));", &pins)
            .await;

        assert!(output.error.is_empty(), "unexpected error: {}", output.error);
        assert!(output.code.contains("__notepack_define(\"https://unpkg.com/lodash@4.17.21\""));
        assert!(output.code.contains("require(\"https://unpkg.com/lodash@4.17.21\")"));
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_nested_relative_import_resolves_against_final_url() {
        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.respond_redirected(
            "https://unpkg.com/nested@1.0.0",
            "import './helper.js';\nmodule.exports = 1;",
            "https://unpkg.com/nested@1.0.0/src/index.js",
        );
        fetcher.respond(
            "https://unpkg.com/nested@1.0.0/src/helper.js",
            "console.log('helper');",
        );
        let service = service_with(fetcher.clone());

        let mut pins = FxHashMap::default();
        pins.insert("nested".to_string(), "1.0.0".to_string());

        let output = service.build("import 'nested';", &pins).await;

        assert!(output.error.is_empty(), "unexpected error: {}", output.error);
        assert!(output
            .code
            .contains("__notepack_define(\"https://unpkg.com/nested@1.0.0/src/helper.js\""));
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_module_surfaces_as_error() {
        let fetcher = Arc::new(RecordingFetcher::new());
        let service = service_with(fetcher);

        let mut pins = FxHashMap::default();
        pins.insert("ghost".to_string(), "1.0.0".to_string());

        let output = service.build("import 'ghost';", &pins).await;

        assert!(output.code.is_empty());
        assert!(output.error.contains("404"));
    }

    #[tokio::test]
    async fn test_insecure_import_rejected() {
        let fetcher = Arc::new(RecordingFetcher::new());
        let service = service_with(fetcher.clone());

        let output = service
            .build("import 'http://unpkg.com/lodash';", &FxHashMap::default())
            .await;

        assert!(output.code.is_empty());
        assert!(output.error.contains("secure"));
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test]
    async fn test_repeat_build_hits_cache() {
        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.respond("https://unpkg.com/pkg@1.0.0", "module.exports = 1;");
        let service = service_with(fetcher.clone());

        let mut pins = FxHashMap::default();
        pins.insert("pkg".to_string(), "1.0.0".to_string());

        let first = service.build("import 'pkg';", &pins).await;
        let second = service.build("import 'pkg';", &pins).await;

        assert!(first.error.is_empty());
        assert_eq!(first.code, second.code);
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_imports_bundle_once() {
        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.respond("https://unpkg.com/pkg@1.0.0", "module.exports = 1;");
        let service = service_with(fetcher.clone());

        let mut pins = FxHashMap::default();
        pins.insert("pkg".to_string(), "1.0.0".to_string());

        let output = service
            .build("import a from 'pkg';\nimport b from 'pkg';", &pins)
            .await;

        assert!(output.error.is_empty());
        assert_eq!(
            output
                .code
                .matches("__notepack_define(\"https://unpkg.com/pkg@1.0.0\"")
                .count(),
            1
        );
        assert_eq!(fetcher.request_count(), 1);
    }
}
