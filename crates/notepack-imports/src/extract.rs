//! Bare-import extraction from cell source text.
//!
//! The primary path parses the text structurally with Oxc (JSX-capable) and
//! walks the AST for every import-like construct. When the parse fails the
//! extraction falls back to a textual scan for `from '...'` clauses. The
//! fallback is a strict subset of what the structural walk finds - it misses
//! side-effect-only imports - and that under-count is accepted behavior.

use once_cell::sync::Lazy;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ExportAllDeclaration, ExportNamedDeclaration, Expression, ImportDeclaration, ImportExpression,
};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::specifier::{is_bare, package_name};

/// Matches `from '<specifier>'` / `from "<specifier>"` occurrences.
static FROM_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"from\s+['"]([^'"]+)['"]"#).expect("valid from-clause pattern"));

/// AST visitor that collects every import specifier in source order.
struct SpecifierCollector {
    specifiers: Vec<String>,
}

impl<'a> Visit<'a> for SpecifierCollector {
    fn visit_import_declaration(&mut self, it: &ImportDeclaration<'a>) {
        self.specifiers.push(it.source.value.to_string());
        walk::walk_import_declaration(self, it);
    }

    fn visit_export_named_declaration(&mut self, it: &ExportNamedDeclaration<'a>) {
        if let Some(source) = &it.source {
            self.specifiers.push(source.value.to_string());
        }
        walk::walk_export_named_declaration(self, it);
    }

    fn visit_export_all_declaration(&mut self, it: &ExportAllDeclaration<'a>) {
        self.specifiers.push(it.source.value.to_string());
        walk::walk_export_all_declaration(self, it);
    }

    fn visit_import_expression(&mut self, it: &ImportExpression<'a>) {
        // Only literal dynamic imports can be resolved ahead of execution.
        if let Expression::StringLiteral(lit) = &it.source {
            self.specifiers.push(lit.value.to_string());
        }
        walk::walk_import_expression(self, it);
    }
}

/// Collect every import specifier (bare or not) from a module text, in
/// source order, duplicates included.
///
/// Structural parse first; on parse failure, the `from`-clause fallback.
/// Never fails - unparseable text without any `from` clause yields an
/// empty list.
pub fn extract_specifiers(source: &str) -> Vec<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::jsx()).parse();

    if ret.panicked || !ret.errors.is_empty() {
        return fallback_specifiers(source);
    }

    let mut collector = SpecifierCollector {
        specifiers: Vec::new(),
    };
    collector.visit_program(&ret.program);
    collector.specifiers
}

/// Extract the set of bare package names a source text imports.
///
/// # Examples
///
/// ```
/// use notepack_imports::extract_bare_imports;
///
/// let names = extract_bare_imports("import _ from 'lodash'; import './side';");
/// assert!(names.contains("lodash"));
/// assert_eq!(names.len(), 1);
/// ```
pub fn extract_bare_imports(source: &str) -> FxHashSet<String> {
    extract_specifiers(source)
        .iter()
        .filter(|spec| is_bare(spec))
        .map(|spec| package_name(spec))
        .filter(|name| !name.is_empty())
        .collect()
}

fn fallback_specifiers(source: &str) -> Vec<String> {
    FROM_CLAUSE
        .captures_iter(source)
        .map(|cap| cap[1].to_string())
        .collect()
}
