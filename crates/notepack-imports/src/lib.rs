//! # notepack-imports
//!
//! Specifier parsing and bare-import extraction for notebook code cells.
//!
//! A notebook cell is freeform JavaScript/JSX text that may import arbitrary
//! npm packages. This crate answers two questions about that text:
//!
//! - what does a single import string mean? ([`parse_specifier`])
//! - which packages does a whole cell depend on? ([`extract_bare_imports`])
//!
//! Extraction is structural (Oxc parse) with a textual fallback for source
//! the parser rejects, so it never fails outright.

mod extract;
mod specifier;

pub use extract::{extract_bare_imports, extract_specifiers};
pub use specifier::{ParsedSpecifier, is_bare, package_name, parse_specifier};
