//! Span-accurate rewrite of ESM import/export statements.
//!
//! The bundle runtime registers each module as a CommonJS-style factory
//! `(require, module, exports)`. This rewrite splices every top-level
//! import/export statement into that vocabulary, leaving all other source
//! text (JSX included) byte-for-byte untouched. Import specifiers are
//! mapped through the caller's resolver so the emitted `require` calls
//! carry final content URLs.
//!
//! Source that fails to parse is returned unchanged; the failure shows up
//! at execution time in the preview sink, same as any other runtime error.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPatternKind, Declaration, ExportDefaultDeclarationKind, ImportDeclarationSpecifier,
    ModuleExportName, Statement,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};

/// Rewrite a module's import/export statements for the bundle runtime.
///
/// `map_specifier` resolves each import source to the module id that will
/// be registered in the bundle (a content URL or the entry path).
pub fn rewrite_esm(source: &str, map_specifier: &dyn Fn(&str) -> String) -> String {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::jsx()).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return source.to_string();
    }

    let mut splices: Vec<(u32, u32, String)> = Vec::new();
    let mut temp = 0usize;
    let mut has_exports = false;

    for stmt in &ret.program.body {
        match stmt {
            Statement::ImportDeclaration(import) => {
                let mapped = map_specifier(&import.source.value);
                let mut out = String::new();

                match &import.specifiers {
                    None => {
                        out.push_str(&format!("require(\"{}\");", escape(&mapped)));
                    }
                    Some(specs) if specs.is_empty() => {
                        out.push_str(&format!("require(\"{}\");", escape(&mapped)));
                    }
                    Some(specs) => {
                        temp += 1;
                        let m = format!("__np_m{}", temp);
                        out.push_str(&format!("const {} = require(\"{}\");", m, escape(&mapped)));
                        for spec in specs {
                            match spec {
                                ImportDeclarationSpecifier::ImportDefaultSpecifier(default) => {
                                    out.push_str(&format!(
                                        " const {local} = {m} && {m}.__esModule ? {m}.default : {m};",
                                        local = default.local.name,
                                        m = m
                                    ));
                                }
                                ImportDeclarationSpecifier::ImportNamespaceSpecifier(ns) => {
                                    out.push_str(&format!(
                                        " const {} = {};",
                                        ns.local.name, m
                                    ));
                                }
                                ImportDeclarationSpecifier::ImportSpecifier(named) => {
                                    out.push_str(&format!(
                                        " const {} = {}[\"{}\"];",
                                        named.local.name,
                                        m,
                                        escape(&export_name(&named.imported))
                                    ));
                                }
                            }
                        }
                    }
                }

                let span = stmt.span();
                splices.push((span.start, span.end, out));
            }

            Statement::ExportNamedDeclaration(export) => {
                has_exports = true;
                let mut out = String::new();

                if let Some(source_lit) = &export.source {
                    // Re-export: pull through a require of the source module.
                    let mapped = map_specifier(&source_lit.value);
                    temp += 1;
                    let m = format!("__np_m{}", temp);
                    out.push_str(&format!("const {} = require(\"{}\");", m, escape(&mapped)));
                    for spec in &export.specifiers {
                        out.push_str(&format!(
                            " exports[\"{}\"] = {}[\"{}\"];",
                            escape(&export_name(&spec.exported)),
                            m,
                            escape(&export_name(&spec.local))
                        ));
                    }
                } else if let Some(decl) = &export.declaration {
                    // Keep the declaration itself, then publish its bindings.
                    let decl_span = decl.span();
                    out.push_str(slice(source, decl_span.start, decl_span.end));
                    if !out.ends_with(';') {
                        out.push(';');
                    }
                    for name in declared_names(decl) {
                        out.push_str(&format!(" exports.{name} = {name};"));
                    }
                } else {
                    for spec in &export.specifiers {
                        out.push_str(&format!(
                            "exports[\"{}\"] = {}; ",
                            escape(&export_name(&spec.exported)),
                            export_name(&spec.local)
                        ));
                    }
                }

                let span = stmt.span();
                splices.push((span.start, span.end, out.trim_end().to_string()));
            }

            Statement::ExportDefaultDeclaration(export) => {
                has_exports = true;
                let out = match &export.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func)
                        if func.id.is_some() =>
                    {
                        let name = &func.id.as_ref().map(|id| id.name.to_string()).unwrap_or_default();
                        let span = func.span();
                        format!(
                            "{} exports.default = {};",
                            slice(source, span.start, span.end),
                            name
                        )
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(class) if class.id.is_some() => {
                        let name = &class.id.as_ref().map(|id| id.name.to_string()).unwrap_or_default();
                        let span = class.span();
                        format!(
                            "{} exports.default = {};",
                            slice(source, span.start, span.end),
                            name
                        )
                    }
                    other => {
                        let span = other.span();
                        format!("exports.default = {};", slice(source, span.start, span.end))
                    }
                };

                let span = stmt.span();
                splices.push((span.start, span.end, out));
            }

            Statement::ExportAllDeclaration(export) => {
                has_exports = true;
                let mapped = map_specifier(&export.source.value);
                let out = match &export.exported {
                    Some(name) => format!(
                        "exports[\"{}\"] = require(\"{}\");",
                        escape(&export_name(name)),
                        escape(&mapped)
                    ),
                    None => format!(
                        "Object.assign(exports, require(\"{}\"));",
                        escape(&mapped)
                    ),
                };

                let span = stmt.span();
                splices.push((span.start, span.end, out));
            }

            _ => {}
        }
    }

    if splices.is_empty() {
        return source.to_string();
    }

    splices.sort_by_key(|(start, _, _)| *start);

    let mut out = String::with_capacity(source.len());
    if has_exports {
        out.push_str("Object.defineProperty(exports, \"__esModule\", { value: true });\n");
    }

    let mut cursor = 0usize;
    for (start, end, replacement) in splices {
        out.push_str(&source[cursor..start as usize]);
        out.push_str(&replacement);
        cursor = end as usize;
    }
    out.push_str(&source[cursor..]);
    out
}

fn slice(source: &str, start: u32, end: u32) -> &str {
    &source[start as usize..end as usize]
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.to_string(),
        ModuleExportName::IdentifierReference(ident) => ident.name.to_string(),
        ModuleExportName::StringLiteral(lit) => lit.value.to_string(),
    }
}

/// Top-level bindings introduced by an exported declaration. Destructuring
/// patterns and TS-only declarations are skipped.
fn declared_names(decl: &Declaration) -> Vec<String> {
    match decl {
        Declaration::FunctionDeclaration(func) => func
            .id
            .as_ref()
            .map(|id| vec![id.name.to_string()])
            .unwrap_or_default(),
        Declaration::ClassDeclaration(class) => class
            .id
            .as_ref()
            .map(|id| vec![id.name.to_string()])
            .unwrap_or_default(),
        Declaration::VariableDeclaration(var) => var
            .declarations
            .iter()
            .filter_map(|d| match &d.id.kind {
                BindingPatternKind::BindingIdentifier(ident) => Some(ident.name.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
