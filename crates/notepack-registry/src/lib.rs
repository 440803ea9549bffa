//! # notepack-registry
//!
//! Version resolution for bare package imports.
//!
//! Given package names (and optionally caller-chosen versions), the
//! [`VersionResolver`] pins each to one concrete version string via the
//! CDN's `package.json` metadata. Resolution is batch-concurrent and
//! tolerates partial failure: one broken package never blocks the others,
//! and no operation here returns a Rust error to the caller - failures are
//! carried as values so the orchestrator can fold them into bundle error
//! text.

mod config;
mod resolver;
mod semver;

pub use config::RegistryConfig;
pub use resolver::{
    BatchResolution, LATEST, Resolution, ResolveFailure, VersionList, VersionResolver,
};
pub use semver::compare_versions;
