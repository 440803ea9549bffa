//! # notepack-bundler
//!
//! In-process bundling engine for notebook code cells.
//!
//! The engine turns one cell's source text plus a version-pin map into a
//! single runnable script. Module resolution and loading are split into two
//! plugins, mirroring the hook pair of conventional bundlers:
//!
//! - [`ResolvePlugin`] maps a specifier and resolution context to a
//!   fully-qualified content URL (pure, no I/O);
//! - [`ModuleLoader`] turns a resolved URL into source text, cache-first,
//!   with CSS wrapped into a style-injection snippet.
//!
//! [`BundlerService::build`] walks the import graph through those plugins,
//! rewrites every module's import/export statements into a registered
//! factory, and emits the assembled bundle. The build boundary never
//! panics or errors out of band: the result is always a
//! [`BundleOutput`] with either `code` or `error` populated.

mod engine;
mod load;
mod resolve;
mod rewrite;

#[cfg(feature = "logging")]
pub mod logging;

pub use engine::{BundleOutput, BundlerService};
pub use load::{LoadError, ModuleLoader};
pub use resolve::{ENTRY_PATH, ENTRY_SPECIFIER, MODULE_NAMESPACE, ResolvePlugin, ResolvedPath};
pub use rewrite::rewrite_esm;

pub use notepack_cache::{CachedModule, ContentCache, Loader, MemoryCache, ModuleCache};
