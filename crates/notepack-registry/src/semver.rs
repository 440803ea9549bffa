//! Numeric three-component version comparison.
//!
//! Used only for descending-sorting version lists. There is no range
//! satisfaction logic here - pinning works on exact versions.

use std::cmp::Ordering;

/// Compare two version strings by up to three dot-separated numeric
/// components. Missing or non-numeric components compare as 0, so
/// `"1.2"` == `"1.2.0"` and `"1.x"` == `"1.0.0"`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a = components(a);
    let b = components(b);
    a.cmp(&b)
}

fn components(version: &str) -> [u64; 3] {
    let mut out = [0u64; 3];
    for (slot, part) in out.iter_mut().zip(version.split('.')) {
        // Strip pre-release/build suffixes so "1.2.3-beta.1" sorts as 1.2.3.
        let numeric: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
        *slot = numeric.parse().unwrap_or(0);
    }
    out
}
