//! Module resolution plugin.
//!
//! Maps a specifier plus resolution context to the content URL it should be
//! loaded from. Pure path computation - no I/O happens here.

use notepack_imports::parse_specifier;

/// The fixed entry-point specifier. Every build starts from it regardless
/// of how the user organizes their cell.
pub const ENTRY_SPECIFIER: &str = "index.js";

/// Virtual path the entry specifier resolves to.
pub const ENTRY_PATH: &str = "entry:index.js";

/// Namespace shared by every resolved module, so the loader intercepts
/// relative and bare imports uniformly.
pub const MODULE_NAMESPACE: &str = "notepack";

/// Where a specifier resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub namespace: &'static str,
    pub url: String,
}

/// Specifier-to-URL resolution against a CDN base.
#[derive(Debug, Clone)]
pub struct ResolvePlugin {
    cdn_base: String,
}

impl ResolvePlugin {
    pub fn new(cdn_base: impl Into<String>) -> Self {
        Self {
            cdn_base: cdn_base.into(),
        }
    }

    /// Resolve a specifier seen in the module at `resolve_dir`.
    ///
    /// - the entry specifier (exact match) maps to its fixed virtual path;
    /// - relative specifiers URL-join against the current resolve
    ///   directory, falling back to the CDN base at the top level;
    /// - absolute URLs pass through unchanged;
    /// - bare specifiers embed an explicit version if the specifier carries
    ///   one, else the pinned version from `pinned`, else the raw specifier
    ///   lands directly on the CDN base and the CDN resolves "latest"
    ///   implicitly.
    pub fn resolve(
        &self,
        specifier: &str,
        resolve_dir: Option<&str>,
        pinned: &dyn Fn(&str) -> Option<String>,
    ) -> ResolvedPath {
        if specifier == ENTRY_SPECIFIER {
            return ResolvedPath {
                namespace: MODULE_NAMESPACE,
                url: ENTRY_PATH.to_string(),
            };
        }

        if specifier.starts_with("./") || specifier.starts_with("../") {
            let base = match resolve_dir {
                Some(dir) if !dir.is_empty() => dir.to_string(),
                _ => format!("{}/", self.cdn_base),
            };
            return ResolvedPath {
                namespace: MODULE_NAMESPACE,
                url: join_url(&base, specifier),
            };
        }

        if specifier.starts_with("http://") || specifier.starts_with("https://") {
            return ResolvedPath {
                namespace: MODULE_NAMESPACE,
                url: specifier.to_string(),
            };
        }

        let parsed = parse_specifier(specifier);
        let version = parsed.version.or_else(|| pinned(&parsed.package));

        let url = match version {
            Some(version) if parsed.subpath.is_empty() => {
                format!("{}/{}@{}", self.cdn_base, parsed.package, version)
            }
            Some(version) => {
                format!(
                    "{}/{}@{}/{}",
                    self.cdn_base, parsed.package, version, parsed.subpath
                )
            }
            // Implicit latest: the raw specifier appended as written.
            None => format!("{}/{}", self.cdn_base, specifier),
        };

        ResolvedPath {
            namespace: MODULE_NAMESPACE,
            url,
        }
    }
}

/// Join a relative specifier onto an absolute URL directory.
///
/// `base` looks like `https://unpkg.com/pkg@1.0.0/src/`; `.` segments are
/// dropped and `..` pops one path segment (never past the host).
fn join_url(base: &str, relative: &str) -> String {
    let (origin, path) = match base.find("://").map(|i| i + 3) {
        Some(host_start) => match base[host_start..].find('/') {
            Some(path_start) => base.split_at(host_start + path_start),
            None => (base, ""),
        },
        None => (base, ""),
    };

    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for part in relative.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    format!("{}/{}", origin.trim_end_matches('/'), segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_pins(_pkg: &str) -> Option<String> {
        None
    }

    fn plugin() -> ResolvePlugin {
        ResolvePlugin::new("https://unpkg.com")
    }

    #[test]
    fn test_entry_specifier_resolves_to_virtual_path() {
        let resolved = plugin().resolve(ENTRY_SPECIFIER, None, &no_pins);
        assert_eq!(resolved.namespace, MODULE_NAMESPACE);
        assert_eq!(resolved.url, ENTRY_PATH);

        // Exact match only.
        let other = plugin().resolve("index.jsx", None, &no_pins);
        assert_ne!(other.url, ENTRY_PATH);
    }

    #[test]
    fn test_entry_ignores_pin_state() {
        let pins = |_pkg: &str| Some("9.9.9".to_string());
        let resolved = plugin().resolve(ENTRY_SPECIFIER, Some("https://x/"), &pins);
        assert_eq!(resolved.url, ENTRY_PATH);
    }

    #[test]
    fn test_bare_with_pinned_version() {
        let pins = |pkg: &str| (pkg == "lodash").then(|| "4.17.21".to_string());
        let resolved = plugin().resolve("lodash", None, &pins);
        assert_eq!(resolved.url, "https://unpkg.com/lodash@4.17.21");
    }

    #[test]
    fn test_bare_explicit_version_wins_over_pin() {
        let pins = |_pkg: &str| Some("1.0.0".to_string());
        let resolved = plugin().resolve("lodash@4.0.0", None, &pins);
        assert_eq!(resolved.url, "https://unpkg.com/lodash@4.0.0");
    }

    #[test]
    fn test_bare_unpinned_falls_back_to_raw_specifier() {
        let resolved = plugin().resolve("lodash/debounce", None, &no_pins);
        assert_eq!(resolved.url, "https://unpkg.com/lodash/debounce");
    }

    #[test]
    fn test_bare_pinned_with_subpath() {
        let pins = |_pkg: &str| Some("4.17.21".to_string());
        let resolved = plugin().resolve("lodash/debounce", None, &pins);
        assert_eq!(resolved.url, "https://unpkg.com/lodash@4.17.21/debounce");
    }

    #[test]
    fn test_scoped_bare_pinned() {
        let pins = |pkg: &str| (pkg == "@scope/pkg").then(|| "2.0.0".to_string());
        let resolved = plugin().resolve("@scope/pkg/sub", None, &pins);
        assert_eq!(resolved.url, "https://unpkg.com/@scope/pkg@2.0.0/sub");
    }

    #[test]
    fn test_relative_joins_resolve_dir() {
        let resolved = plugin().resolve(
            "./helpers/utils.js",
            Some("https://unpkg.com/nested@1.0.0/src/"),
            &no_pins,
        );
        assert_eq!(
            resolved.url,
            "https://unpkg.com/nested@1.0.0/src/helpers/utils.js"
        );
    }

    #[test]
    fn test_relative_parent_pops_segment() {
        let resolved = plugin().resolve(
            "../styles.css",
            Some("https://unpkg.com/nested@1.0.0/src/"),
            &no_pins,
        );
        assert_eq!(resolved.url, "https://unpkg.com/nested@1.0.0/styles.css");
    }

    #[test]
    fn test_relative_without_resolve_dir_uses_cdn_base() {
        let resolved = plugin().resolve("./mod.js", None, &no_pins);
        assert_eq!(resolved.url, "https://unpkg.com/mod.js");
    }

    #[test]
    fn test_absolute_url_passes_through() {
        let resolved = plugin().resolve("https://esm.sh/react", None, &no_pins);
        assert_eq!(resolved.url, "https://esm.sh/react");
    }

    #[test]
    fn test_join_url_does_not_escape_host() {
        assert_eq!(
            join_url("https://unpkg.com/a/", "../../../x.js"),
            "https://unpkg.com/x.js"
        );
    }
}
