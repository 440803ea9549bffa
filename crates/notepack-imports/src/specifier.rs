//! Import specifier parsing.
//!
//! A specifier is the raw string a user writes in an `import` statement:
//! `lodash`, `lodash/debounce`, `@scope/pkg@1.2.3/sub`, `./local`,
//! `https://example.com/mod.js`. Parsing is pure and total - malformed
//! input degrades to a best-effort split, never a panic.

/// The decomposition of an import specifier.
///
/// `package` is the normalized package name (`@scope/name` for scoped
/// packages, the first path segment otherwise), `version` is an explicit
/// `@version` suffix if one was written, and `subpath` is everything after
/// the package/version boundary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedSpecifier {
    pub package: String,
    pub subpath: String,
    pub version: Option<String>,
}

/// Parse an import specifier into package name, subpath, and explicit version.
///
/// Empty or whitespace-only input yields an empty result. Scoped packages
/// keep their leading `@`; a version delimiter is only recognized after the
/// scope/name boundary so `@scope/pkg` is never misread as version `scope/pkg`.
/// With multiple `@` after the name, the first one is the version delimiter.
///
/// # Examples
///
/// ```
/// use notepack_imports::parse_specifier;
///
/// let p = parse_specifier("@scope/pkg@1.2.3/sub/mod.js");
/// assert_eq!(p.package, "@scope/pkg");
/// assert_eq!(p.version.as_deref(), Some("1.2.3"));
/// assert_eq!(p.subpath, "sub/mod.js");
/// ```
pub fn parse_specifier(spec: &str) -> ParsedSpecifier {
    let spec = spec.trim();
    if spec.is_empty() {
        return ParsedSpecifier::default();
    }

    if let Some(scoped_rest) = spec.strip_prefix('@') {
        let Some(slash) = scoped_rest.find('/') else {
            // `@scope` with no name segment: invalid on the registry, but we
            // treat the whole string as the package name rather than fail.
            return ParsedSpecifier {
                package: spec.to_string(),
                subpath: String::new(),
                version: None,
            };
        };
        let scope = &scoped_rest[..slash];
        let rest = &scoped_rest[slash + 1..];
        let (name, version, subpath) = split_segment(rest);
        ParsedSpecifier {
            package: format!("@{}/{}", scope, name),
            subpath,
            version,
        }
    } else {
        let (name, version, subpath) = split_segment(spec);
        ParsedSpecifier {
            package: name,
            subpath,
            version,
        }
    }
}

/// Split `name[@version][/subpath]` at the name boundary.
fn split_segment(rest: &str) -> (String, Option<String>, String) {
    let boundary = rest.find(['@', '/']);
    match boundary {
        None => (rest.to_string(), None, String::new()),
        Some(idx) => {
            let name = rest[..idx].to_string();
            let tail = &rest[idx..];
            if let Some(after_at) = tail.strip_prefix('@') {
                // Version runs until the subpath boundary; a second `@` in
                // the version text is carried through verbatim.
                match after_at.find('/') {
                    Some(slash) => (
                        name,
                        non_empty(&after_at[..slash]),
                        after_at[slash + 1..].to_string(),
                    ),
                    None => (name, non_empty(after_at), String::new()),
                }
            } else {
                (name, None, tail[1..].to_string())
            }
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Normalize a specifier to its package name.
///
/// Idempotent: feeding the output back in returns the same name.
pub fn package_name(spec: &str) -> String {
    parse_specifier(spec).package
}

/// Whether a specifier is a bare package import.
///
/// Relative (`./`, `../`), absolute (`/`) and URL (`http://`, `https://`)
/// specifiers are never bare.
pub fn is_bare(spec: &str) -> bool {
    let spec = spec.trim();
    !(spec.is_empty()
        || spec.starts_with("./")
        || spec.starts_with("../")
        || spec.starts_with('/')
        || spec.starts_with("http://")
        || spec.starts_with("https://"))
}
