//! The version resolver.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use notepack_fetch::Fetcher;

use crate::config::RegistryConfig;
use crate::semver::compare_versions;

/// Sentinel meaning "no concrete version chosen yet".
///
/// A pin lock never stores this value; seeing it from a caller means
/// "resolve to latest".
pub const LATEST: &str = "latest";

/// Registry metadata responses are truncated to this many newest versions.
const VERSION_LIST_LIMIT: usize = 30;

/// Outcome of resolving one package: a concrete version or a message.
///
/// Resolution never surfaces a Rust error; both variants are ordinary
/// values the caller folds into its own reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved { version: String },
    Failed { message: String },
}

/// One failed package in a batch resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveFailure {
    pub package: String,
    pub message: String,
}

/// Aggregate result of a batch resolution. A failure for one package never
/// blocks the others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResolution {
    pub resolved: FxHashMap<String, String>,
    pub errors: Vec<ResolveFailure>,
}

/// A package's known versions, descending-sorted, newest 30 only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionList {
    pub versions: Vec<String>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct PackageJson {
    version: Option<String>,
}

#[derive(Deserialize)]
struct RegistryMetadata {
    #[serde(default)]
    versions: FxHashMap<String, serde_json::Value>,
}

/// Resolves package names to concrete version strings over the network.
pub struct VersionResolver {
    fetcher: Arc<dyn Fetcher>,
    config: RegistryConfig,
}

impl VersionResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: RegistryConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Resolve one package to a concrete version.
    ///
    /// Fetches `<cdn>/<pkg>[@<explicit>]/package.json` and reads its
    /// `version` field, which is exact even when `explicit` was a range the
    /// CDN resolved. Non-2xx status, missing `version`, and transport or
    /// parse failures all come back as [`Resolution::Failed`].
    pub async fn resolve_version(&self, package: &str, explicit: Option<&str>) -> Resolution {
        let url = self.config.package_json_url(package, explicit);

        let fetched = match self.fetcher.fetch_text(&url).await {
            Ok(fetched) => fetched,
            Err(err) => {
                return Resolution::Failed {
                    message: err.to_string(),
                };
            }
        };

        let metadata: PackageJson = match serde_json::from_str(&fetched.body) {
            Ok(metadata) => metadata,
            Err(err) => {
                return Resolution::Failed {
                    message: format!("invalid package metadata for {}: {}", package, err),
                };
            }
        };

        match metadata.version {
            Some(version) if !version.is_empty() => Resolution::Resolved { version },
            _ => Resolution::Failed {
                message: format!("package metadata for {} has no version field", package),
            },
        }
    }

    /// Fetch a package's full version set from the registry.
    ///
    /// Versions are the keys of the registry's `versions` object, sorted
    /// newest-first by numeric major.minor.patch and truncated to the 30
    /// newest. On failure the list is empty and `error` says why; this
    /// never fails the caller.
    pub async fn fetch_version_list(&self, package: &str) -> VersionList {
        let url = self.config.registry_url(package);

        let fetched = match self.fetcher.fetch_text(&url).await {
            Ok(fetched) => fetched,
            Err(err) => {
                return VersionList {
                    versions: Vec::new(),
                    error: Some(err.to_string()),
                };
            }
        };

        let metadata: RegistryMetadata = match serde_json::from_str(&fetched.body) {
            Ok(metadata) => metadata,
            Err(err) => {
                return VersionList {
                    versions: Vec::new(),
                    error: Some(format!("invalid registry metadata for {}: {}", package, err)),
                };
            }
        };

        let mut versions: Vec<String> = metadata.versions.into_keys().collect();
        versions.sort_by(|a, b| match compare_versions(b, a) {
            // Equal numeric triples keep a stable textual order.
            Ordering::Equal => a.cmp(b),
            other => other,
        });
        versions.truncate(VERSION_LIST_LIMIT);

        VersionList {
            versions,
            error: None,
        }
    }

    /// Resolve a batch of packages concurrently.
    ///
    /// For each package the caller-chosen version is used unless it is the
    /// [`LATEST`] sentinel, in which case the package resolves to latest.
    /// Successes aggregate into `resolved`, failures into `errors`; the
    /// result object is always returned.
    pub async fn resolve_pinned_versions(
        &self,
        packages: &[String],
        chosen: &FxHashMap<String, String>,
    ) -> BatchResolution {
        let tasks = packages.iter().map(|package| {
            let explicit = chosen
                .get(package)
                .map(String::as_str)
                .filter(|v| *v != LATEST);
            async move { (package.clone(), self.resolve_version(package, explicit).await) }
        });

        let mut batch = BatchResolution::default();
        for (package, resolution) in join_all(tasks).await {
            match resolution {
                Resolution::Resolved { version } => {
                    tracing::debug!(package = %package, version = %version, "pinned");
                    batch.resolved.insert(package, version);
                }
                Resolution::Failed { message } => {
                    tracing::warn!(package = %package, message = %message, "resolution failed");
                    batch.errors.push(ResolveFailure { package, message });
                }
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notepack_fetch::test_utils::RecordingFetcher;

    fn resolver_with(fetcher: Arc<RecordingFetcher>) -> VersionResolver {
        VersionResolver::new(fetcher, RegistryConfig::default())
    }

    #[tokio::test]
    async fn test_resolve_latest() {
        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.respond(
            "https://unpkg.com/lodash/package.json",
            r#"{"name": "lodash", "version": "4.17.21"}"#,
        );

        let resolver = resolver_with(fetcher);
        let resolution = resolver.resolve_version("lodash", None).await;

        assert_eq!(
            resolution,
            Resolution::Resolved {
                version: "4.17.21".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_resolve_explicit_version_is_fetched_pinned() {
        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.respond(
            "https://unpkg.com/react@18.2.0/package.json",
            r#"{"version": "18.2.0"}"#,
        );

        let resolver = resolver_with(fetcher.clone());
        let resolution = resolver.resolve_version("react", Some("18.2.0")).await;

        assert_eq!(
            resolution,
            Resolution::Resolved {
                version: "18.2.0".to_string()
            }
        );
        assert_eq!(
            fetcher.requests(),
            vec!["https://unpkg.com/react@18.2.0/package.json"]
        );
    }

    #[tokio::test]
    async fn test_resolve_http_error_includes_status() {
        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.fail_with_status("https://unpkg.com/ghost/package.json", 404);

        let resolver = resolver_with(fetcher);
        let resolution = resolver.resolve_version("ghost", None).await;

        let Resolution::Failed { message } = resolution else {
            panic!("expected failure");
        };
        assert!(message.contains("404"));
    }

    #[tokio::test]
    async fn test_resolve_missing_version_field() {
        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.respond(
            "https://unpkg.com/odd/package.json",
            r#"{"name": "odd"}"#,
        );

        let resolver = resolver_with(fetcher);
        let resolution = resolver.resolve_version("odd", None).await;

        let Resolution::Failed { message } = resolution else {
            panic!("expected failure");
        };
        assert!(message.contains("version field"));
    }

    #[tokio::test]
    async fn test_resolve_unparseable_metadata() {
        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.respond("https://unpkg.com/junk/package.json", "not json");

        let resolver = resolver_with(fetcher);
        let resolution = resolver.resolve_version("junk", None).await;

        assert!(matches!(resolution, Resolution::Failed { .. }));
    }

    #[tokio::test]
    async fn test_version_list_sorted_and_truncated() {
        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.respond(
            "https://registry.npmjs.org/demo",
            r#"{"versions": {"1.2.0": {}, "1.10.0": {}, "2.0.0": {}, "1.2.10": {}}}"#,
        );

        let resolver = resolver_with(fetcher);
        let list = resolver.fetch_version_list("demo").await;

        assert_eq!(list.error, None);
        assert_eq!(list.versions, vec!["2.0.0", "1.10.0", "1.2.10", "1.2.0"]);
    }

    #[tokio::test]
    async fn test_version_list_truncates_to_thirty() {
        let versions: Vec<String> = (0..40).map(|i| format!("\"1.{}.0\": {{}}", i)).collect();
        let body = format!("{{\"versions\": {{{}}}}}", versions.join(", "));

        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.respond("https://registry.npmjs.org/big", &body);

        let resolver = resolver_with(fetcher);
        let list = resolver.fetch_version_list("big").await;

        assert_eq!(list.versions.len(), 30);
        assert_eq!(list.versions[0], "1.39.0");
        assert_eq!(list.versions[29], "1.10.0");
    }

    #[tokio::test]
    async fn test_version_list_failure_is_empty_with_error() {
        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.fail_with_transport("https://registry.npmjs.org/offline", "connection refused");

        let resolver = resolver_with(fetcher);
        let list = resolver.fetch_version_list("offline").await;

        assert!(list.versions.is_empty());
        assert!(list.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_batch_partial_failure() {
        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.respond(
            "https://unpkg.com/lodash/package.json",
            r#"{"version": "4.17.21"}"#,
        );
        fetcher.respond(
            "https://unpkg.com/axios/package.json",
            r#"{"version": "1.7.0"}"#,
        );
        fetcher.fail_with_status("https://unpkg.com/ghost/package.json", 404);

        let resolver = resolver_with(fetcher);
        let packages = vec![
            "lodash".to_string(),
            "ghost".to_string(),
            "axios".to_string(),
        ];
        let batch = resolver
            .resolve_pinned_versions(&packages, &FxHashMap::default())
            .await;

        assert_eq!(batch.resolved.len(), 2);
        assert_eq!(batch.resolved["lodash"], "4.17.21");
        assert_eq!(batch.resolved["axios"], "1.7.0");
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].package, "ghost");
        assert!(batch.errors[0].message.contains("404"));
    }

    #[tokio::test]
    async fn test_batch_chosen_version_used_unless_latest() {
        let fetcher = Arc::new(RecordingFetcher::new());
        fetcher.respond(
            "https://unpkg.com/react@17.0.2/package.json",
            r#"{"version": "17.0.2"}"#,
        );
        fetcher.respond(
            "https://unpkg.com/lodash/package.json",
            r#"{"version": "4.17.21"}"#,
        );

        let mut chosen = FxHashMap::default();
        chosen.insert("react".to_string(), "17.0.2".to_string());
        chosen.insert("lodash".to_string(), LATEST.to_string());

        let resolver = resolver_with(fetcher.clone());
        let packages = vec!["react".to_string(), "lodash".to_string()];
        let batch = resolver.resolve_pinned_versions(&packages, &chosen).await;

        assert_eq!(batch.resolved["react"], "17.0.2");
        assert_eq!(batch.resolved["lodash"], "4.17.21");
        assert!(batch.errors.is_empty());

        let mut requests = fetcher.requests();
        requests.sort();
        assert_eq!(
            requests,
            vec![
                "https://unpkg.com/lodash/package.json",
                "https://unpkg.com/react@17.0.2/package.json",
            ]
        );
    }

    #[tokio::test]
    async fn test_batch_empty_input() {
        let fetcher = Arc::new(RecordingFetcher::new());
        let resolver = resolver_with(fetcher.clone());

        let batch = resolver
            .resolve_pinned_versions(&[], &FxHashMap::default())
            .await;

        assert!(batch.resolved.is_empty());
        assert!(batch.errors.is_empty());
        assert_eq!(fetcher.request_count(), 0);
    }
}
