//! the module/config tree model and module-call extraction
//!
//! A [Config] is one resolved configuration directory. Its [Module] keeps the
//! parsed file bodies opaque; the only structure this crate pulls out of them
//! is the set of `module` blocks, because those drive the recursion.

use crate::diagnostics::{Diagnostic, Diagnostics, SourceRange};
use hcl_edit::structure::{Block, BlockLabel, Body};
use hcl_edit::Span;
use indexmap::IndexMap;
use std::ops::Range;
use std::path::PathBuf;

/// How far the resolver descends into module calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleWalkMode {
    /// Descend into every call, local or fetched.
    All,
    /// Descend only into calls with a local path source; other calls produce
    /// no child entry.
    Local,
    /// Never descend; children stay empty.
    None,
}

/// A resolved node of the configuration tree.
///
/// Owned by the caller of `load_config`; nodes are never shared between
/// trees and never mutated after being returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub module: Module,
    /// Child configurations keyed by module call name.
    pub children: IndexMap<String, Config>,
}

/// The parsed content of one configuration directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Directory of this module as the resolver addressed it. The root keeps
    /// the exact path passed to `load_config`, so loading `.` yields `.`.
    pub source_dir: PathBuf,
    /// Parsed file bodies keyed by their registry path.
    pub files: IndexMap<PathBuf, Body>,
    pub module_calls: IndexMap<String, ModuleCall>,
}

/// A `module` block found in a configuration directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleCall {
    pub name: String,
    pub source_addr: String,
    /// Span of the block identifier through its label.
    pub decl_range: SourceRange,
}

impl ModuleCall {
    /// Whether the source address is a filesystem path relative to the
    /// calling directory, as opposed to a registry or remote address.
    pub fn is_local(&self) -> bool {
        self.source_addr.starts_with("./") || self.source_addr.starts_with("../")
    }
}

/// Collect the module calls declared in a directory's parsed bodies.
///
/// Call order follows source order: files in the order given (the reader
/// sorts them by name), blocks in file order. A duplicate call name is a
/// diagnostic and only the first occurrence is kept.
pub(crate) fn decode_module_calls(
    files: &IndexMap<PathBuf, Body>,
    sources: &IndexMap<PathBuf, String>,
) -> (IndexMap<String, ModuleCall>, Diagnostics) {
    let mut calls: IndexMap<String, ModuleCall> = IndexMap::new();
    let mut diags = Diagnostics::new();

    for (filename, body) in files {
        let src = sources.get(filename).map(String::as_str).unwrap_or("");

        for block in body.blocks() {
            if block.ident.value().as_str() != "module" {
                continue;
            }

            let decl_range = SourceRange::from_span(filename, src, decl_span(block));

            let Some(name) = block.labels.first() else {
                diags.push(Diagnostic::error(
                    "Missing name for module",
                    "All module blocks must have one label, the module name.",
                    decl_range,
                ));
                continue;
            };
            if block.labels.len() > 1 {
                diags.push(Diagnostic::error(
                    "Extraneous label for module",
                    "Only one label may be provided for a module block.",
                    decl_range,
                ));
                continue;
            }
            let name = name.as_str().to_string();

            let Some(source) = block.body.attributes().find(|a| a.key.value().as_str() == "source")
            else {
                diags.push(Diagnostic::error(
                    "Missing required argument",
                    "The argument \"source\" is required, but no definition was found.",
                    decl_range,
                ));
                continue;
            };

            let source_addr = match &source.value {
                hcl_edit::expr::Expression::String(addr) => addr.value().clone(),
                other => {
                    diags.push(Diagnostic::error(
                        "Invalid module source address",
                        "Module source must be a literal string.",
                        SourceRange::from_span(filename, src, span_or_empty(other.span())),
                    ));
                    continue;
                }
            };

            if calls.contains_key(&name) {
                diags.push(Diagnostic::error(
                    "Duplicate module call",
                    format!(
                        "A module call named \"{name}\" was already defined. Module call names must be unique within a directory."
                    ),
                    decl_range,
                ));
                continue;
            }

            calls.insert(
                name.clone(),
                ModuleCall {
                    name,
                    source_addr,
                    decl_range,
                },
            );
        }
    }

    (calls, diags)
}

/// Byte span of a block's declaration: the identifier through the last label.
fn decl_span(block: &Block) -> Range<usize> {
    let ident = span_or_empty(block.ident.span());
    let end = block
        .labels
        .last()
        .and_then(|label| match label {
            BlockLabel::Ident(ident) => ident.span(),
            BlockLabel::String(string) => string.span(),
        })
        .map(|span| span.end)
        .unwrap_or(ident.end);
    ident.start..end
}

fn span_or_empty(span: Option<Range<usize>>) -> Range<usize> {
    span.unwrap_or(0..0)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode(src: &str) -> (IndexMap<String, ModuleCall>, Diagnostics) {
        let body = hcl_edit::parser::parse_body(src).expect("body must parse");
        let mut files = IndexMap::new();
        files.insert(PathBuf::from("main.tf"), body);
        let mut sources = IndexMap::new();
        sources.insert(PathBuf::from("main.tf"), src.to_string());
        decode_module_calls(&files, &sources)
    }

    #[test]
    fn extracts_calls_in_source_order() {
        let (calls, diags) = decode(
            "module \"one\" {\n  source = \"./one\"\n}\n\nmodule \"two\" {\n  source = \"registry.example.com/acme/two/aws\"\n}\n",
        );
        assert!(diags.is_empty(), "{diags}");
        let names: Vec<&String> = calls.keys().collect();
        assert_eq!(names, vec!["one", "two"]);
        assert!(calls["one"].is_local());
        assert!(!calls["two"].is_local());
        assert_eq!(calls["one"].decl_range.to_string(), "main.tf:1,1-13");
    }

    #[test]
    fn ignores_other_block_types_and_attributes() {
        let (calls, diags) =
            decode("locals {\n  name = \"web\"\n}\n\nresource \"aws_instance\" \"web\" {\n  ami = \"ami-123\"\n}\n");
        assert!(calls.is_empty());
        assert!(diags.is_empty(), "{diags}");
    }

    #[test]
    fn duplicate_call_names_keep_the_first_occurrence() {
        let (calls, diags) = decode(
            "module \"dup\" {\n  source = \"./first\"\n}\n\nmodule \"dup\" {\n  source = \"./second\"\n}\n",
        );
        assert_eq!(calls.len(), 1);
        assert_eq!(calls["dup"].source_addr, "./first");
        assert_eq!(diags.len(), 1);
        assert!(diags.to_string().contains("Duplicate module call"), "{diags}");
    }

    #[test]
    fn missing_source_is_a_diagnostic_not_a_call() {
        let (calls, diags) = decode("module \"broken\" {\n  version = \"1.0.0\"\n}\n");
        assert!(calls.is_empty());
        insta::assert_snapshot!(
            diags.to_string(),
            @r#"main.tf:1,1-16: Missing required argument; The argument "source" is required, but no definition was found."#
        );
    }

    #[test]
    fn non_literal_source_is_rejected() {
        let (calls, diags) = decode("module \"dynamic\" {\n  source = var.source\n}\n");
        assert!(calls.is_empty());
        assert!(
            diags.to_string().contains("Invalid module source address"),
            "{diags}"
        );
    }

    #[test]
    fn missing_label_is_a_diagnostic() {
        let (calls, diags) = decode("module {\n  source = \"./x\"\n}\n");
        assert!(calls.is_empty());
        assert!(diags.to_string().contains("Missing name for module"), "{diags}");
    }
}
