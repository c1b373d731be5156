//! loading configuration trees and values files
//!
//! [Loader] is the entry point of this crate. One loader serves one analysis
//! session: every file it reads lands in its file registry keyed by a
//! base-relative path, so diagnostics rendered later can point back at real
//! source text no matter how many load calls populated the registry.
//!
//! Loading never aborts halfway. Each operation returns whatever it could
//! resolve plus every diagnostic collected along the way; only constructing
//! the loader itself can fail hard.

use crate::diagnostics::{Diagnostic, Diagnostics, SourceRange};
use crate::fs::{Filesystem, OsFs};
use crate::manifest::{ModuleManifest, MANIFEST_PATH};
use crate::module::{decode_module_calls, Config, Module, ModuleCall, ModuleWalkMode};
use crate::util;
use crate::value::{InputValue, InputValues, Value};
use hcl_edit::structure::Body;
use hcl_edit::Span;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Recursion ceiling for module calls, root at depth zero.
///
/// Cycles are not graph-detected; a circular reference simply runs into this
/// bound and is reported with the call path it accumulated on the way down.
const MAX_MODULE_DEPTH: usize = 10;

const DEFAULT_VALUES_FILENAME: &str = "terraform.tfvars";
const AUTO_VALUES_SUFFIX: &str = ".auto.tfvars";

#[derive(thiserror::Error, Debug)]
pub enum LoaderError {
    #[error("IO error")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse the module manifest")]
    ManifestInvalid(#[from] serde_json::Error),
    #[error("The base directory {0:?} cannot be resolved against the work directory")]
    BaseDirUnresolvable(PathBuf),
}

/// Loads configuration directories and values files.
///
/// `base_dir` anchors the file registry: keys are expressed relative to it,
/// while the paths passed to the load operations stay relative to the
/// process work directory. Passing the work directory itself as the base
/// makes both coincide.
pub struct Loader<F = OsFs> {
    fs: F,
    /// Work directory expressed relative to the configured base directory.
    base_dir: PathBuf,
    sources: IndexMap<PathBuf, String>,
    manifest: ModuleManifest,
}

impl Loader<OsFs> {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, LoaderError> {
        Self::with_fs(OsFs, base_dir)
    }
}

impl<F: Filesystem> Loader<F> {
    pub fn with_fs(fs: F, base_dir: impl AsRef<Path>) -> Result<Self, LoaderError> {
        let work_dir = std::env::current_dir()?;
        let base_dir = base_dir.as_ref();
        let base = if base_dir.is_absolute() {
            util::clean(base_dir)
        } else {
            util::clean(&work_dir.join(base_dir))
        };
        let prefix = util::relative(&base, &work_dir)
            .ok_or_else(|| LoaderError::BaseDirUnresolvable(base.clone()))?;

        let manifest = if fs.is_file(Path::new(MANIFEST_PATH)) {
            let raw = fs.read_to_string(Path::new(MANIFEST_PATH))?;
            let manifest = ModuleManifest::parse(&raw)?;
            tracing::debug!(records = manifest.len(), "module manifest loaded");
            manifest
        } else {
            ModuleManifest::default()
        };

        tracing::info!(base_dir = %base.display(), prefix = %prefix.display(), "initialize loader");

        Ok(Self {
            fs,
            base_dir: prefix,
            sources: IndexMap::new(),
            manifest,
        })
    }

    /// Every file read so far, keyed by base-relative path.
    pub fn files(&self) -> &IndexMap<PathBuf, String> {
        &self.sources
    }

    /// Build the resolved configuration tree rooted at `dir`.
    ///
    /// `dir` is kept verbatim as the root's `source_dir`, so the
    /// conventional `.` stays the literal `.`. Resolution failures in one
    /// branch never stop sibling branches; the returned tree is whatever
    /// could be resolved, alongside every diagnostic.
    pub fn load_config(
        &mut self,
        dir: impl AsRef<Path>,
        walk: ModuleWalkMode,
    ) -> (Config, Diagnostics) {
        let dir = dir.as_ref();
        tracing::info!(dir = %dir.display(), ?walk, "load configuration tree");
        let mut call_path = Vec::new();
        self.load_config_dir(dir.to_path_buf(), walk, &mut call_path)
    }

    fn load_config_dir(
        &mut self,
        dir: PathBuf,
        walk: ModuleWalkMode,
        call_path: &mut Vec<String>,
    ) -> (Config, Diagnostics) {
        let (files, mut diags) = self.read_config_dir(&dir);
        let (calls, call_diags) = decode_module_calls(&files, &self.sources);
        diags.extend(call_diags);

        let mut children = IndexMap::new();
        if walk != ModuleWalkMode::None {
            for call in calls.values() {
                if walk == ModuleWalkMode::Local && !call.is_local() {
                    tracing::debug!(call = %call.name, "skip non-local module call");
                    continue;
                }

                let child_dir = match self.resolve_module_dir(&dir, call_path, call) {
                    Ok(child_dir) => child_dir,
                    Err(diagnostic) => {
                        diags.push(diagnostic);
                        continue;
                    }
                };

                if call_path.len() + 1 > MAX_MODULE_DEPTH {
                    diags.push(Diagnostic::error(
                        "Module stack level too deep",
                        format!(
                            "This configuration has nested modules more than {} levels deep. This is mainly caused by circular references. current path: module.{}",
                            MAX_MODULE_DEPTH,
                            call_path.join(".module.")
                        ),
                        call.decl_range.clone(),
                    ));
                    continue;
                }

                call_path.push(call.name.clone());
                let (child, child_diags) = self.load_config_dir(child_dir, walk, call_path);
                call_path.pop();

                diags.extend(child_diags);
                children.insert(call.name.clone(), child);
            }
        }

        let config = Config {
            module: Module {
                source_dir: dir,
                files,
                module_calls: calls,
            },
            children,
        };
        (config, diags)
    }

    /// Resolve the directory a module call points at.
    ///
    /// Local path addresses join onto the calling directory and must exist.
    /// Everything else is looked up in the module manifest under the dotted
    /// call path; the recorded directory is trusted verbatim.
    fn resolve_module_dir(
        &self,
        current_dir: &Path,
        call_path: &[String],
        call: &ModuleCall,
    ) -> Result<PathBuf, Diagnostic> {
        if call.is_local() {
            let dir = util::clean(&current_dir.join(&call.source_addr));
            if !self.fs.is_dir(&dir) {
                return Err(Diagnostic::error(
                    format!("\"{}\" module is not found", call.name),
                    format!(
                        "The module directory \"{}\" does not exist or cannot be read.",
                        dir.display()
                    ),
                    call.decl_range.clone(),
                ));
            }
            tracing::debug!(call = %call.name, dir = %dir.display(), "local module call");
            return Ok(dir);
        }

        let key = if call_path.is_empty() {
            call.name.clone()
        } else {
            format!("{}.{}", call_path.join("."), call.name)
        };
        match self.manifest.get(&key) {
            Some(record) => {
                tracing::debug!(key = %key, dir = %record.dir.display(), "module call via manifest");
                Ok(record.dir.clone())
            }
            None => Err(Diagnostic::error(
                format!(
                    "\"{}\" module is not found. Did you run \"terraform init\"?",
                    call.name
                ),
                "",
                call.decl_range.clone(),
            )),
        }
    }

    /// Parse the primary configuration files of a single directory, without
    /// walking module calls.
    pub fn load_config_dir_files(
        &mut self,
        dir: impl AsRef<Path>,
    ) -> (IndexMap<PathBuf, Body>, Diagnostics) {
        let dir = dir.as_ref();
        tracing::info!(dir = %dir.display(), "load configuration directory files");
        self.read_config_dir(dir)
    }

    fn read_config_dir(&mut self, dir: &Path) -> (IndexMap<PathBuf, Body>, Diagnostics) {
        let mut files = IndexMap::new();
        let mut diags = Diagnostics::new();

        let mut entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!(dir = %dir.display(), %err, "directory is not readable");
                diags.push(Diagnostic::error_without_range(
                    "Failed to read module directory",
                    format!(
                        "Module directory \"{}\" does not exist or cannot be read.",
                        dir.display()
                    ),
                ));
                return (files, diags);
            }
        };
        entries.sort();

        for path in entries {
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !is_primary_config_file(name) {
                continue;
            }
            if let Some((key, body)) = self.parse_file(&path, &mut diags) {
                files.insert(key, body);
            }
        }

        (files, diags)
    }

    /// Discover and parse values files for `dir`, in precedence order.
    ///
    /// The sequence is `terraform.tfvars` first, then `*.auto.tfvars` sorted
    /// by name, then `explicit` in caller order. Explicit paths are relative
    /// to the process work directory, not to `dir` - they are caller-supplied
    /// references, not directory discoveries. A file that fails to load is
    /// omitted from the sequence; the rest still load.
    pub fn load_values_files(
        &mut self,
        dir: impl AsRef<Path>,
        explicit: &[PathBuf],
    ) -> (Vec<InputValues>, Diagnostics) {
        let dir = dir.as_ref();
        tracing::info!(dir = %dir.display(), explicit = explicit.len(), "load values files");

        let mut diags = Diagnostics::new();
        let mut default_file = None;
        let mut auto_files = Vec::new();

        match self.fs.read_dir(dir) {
            Ok(entries) => {
                for path in entries {
                    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                        continue;
                    };
                    if name == DEFAULT_VALUES_FILENAME {
                        default_file = Some(path);
                    } else if name.ends_with(AUTO_VALUES_SUFFIX) {
                        auto_files.push(path);
                    }
                }
            }
            Err(err) => {
                tracing::debug!(dir = %dir.display(), %err, "directory is not readable");
                diags.push(Diagnostic::error_without_range(
                    "Failed to read module directory",
                    format!(
                        "Module directory \"{}\" does not exist or cannot be read.",
                        dir.display()
                    ),
                ));
            }
        }
        auto_files.sort();

        let mut values = Vec::new();
        for path in default_file.iter().chain(&auto_files).chain(explicit) {
            if let Some(file_values) = self.load_values_file(path, &mut diags) {
                values.push(file_values);
            }
        }

        (values, diags)
    }

    fn load_values_file(&mut self, path: &Path, diags: &mut Diagnostics) -> Option<InputValues> {
        let (key, src) = self.register_file(path, diags)?;
        let body = match hcl_edit::parser::parse_body(&src) {
            Ok(body) => body,
            Err(err) => {
                diags.push(Diagnostic::syntax_error(&key, &err));
                return None;
            }
        };

        let mut valid = true;
        for block in body.blocks() {
            diags.push(Diagnostic::error(
                format!("Unexpected \"{}\" block", block.ident.value().as_str()),
                "Blocks are not allowed here.",
                SourceRange::from_span(&key, &src, block.ident.span().unwrap_or(0..0)),
            ));
            valid = false;
        }
        if !valid {
            return None;
        }

        let mut values = InputValues::new();
        for attr in body.attributes() {
            let start = attr.key.span().map(|span| span.start).unwrap_or(0);
            let end = attr.value.span().map(|span| span.end).unwrap_or(start);
            let range = SourceRange::from_span(&key, &src, start..end);

            match Value::try_from(hcl::Expression::from(attr.value.clone())) {
                Ok(value) => {
                    values.insert(attr.key.value().to_string(), InputValue::new(value, range));
                }
                Err(err) => {
                    diags.push(Diagnostic::error(
                        "Invalid value for input variable",
                        format!(
                            "The value of \"{}\" is unsuitable: {err}.",
                            attr.key.value().as_str()
                        ),
                        range,
                    ));
                }
            }
        }

        Some(values)
    }

    /// Parse one configuration file and record it in the registry.
    fn parse_file(&mut self, path: &Path, diags: &mut Diagnostics) -> Option<(PathBuf, Body)> {
        let (key, src) = self.register_file(path, diags)?;
        match hcl_edit::parser::parse_body(&src) {
            Ok(body) => Some((key, body)),
            Err(err) => {
                diags.push(Diagnostic::syntax_error(&key, &err));
                None
            }
        }
    }

    /// Read a file and write it through the registry under its base-relative
    /// key. Every file read by this loader passes through here, whether or
    /// not it ends up contributing to a result.
    fn register_file(&mut self, path: &Path, diags: &mut Diagnostics) -> Option<(PathBuf, String)> {
        let key = util::clean(&self.base_dir.join(path));
        let src = match self.fs.read_to_string(path) {
            Ok(src) => src,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "file is not readable");
                diags.push(Diagnostic::error_without_range(
                    "Failed to read file",
                    format!("The file \"{}\" could not be read.", key.display()),
                ));
                return None;
            }
        };
        tracing::trace!(key = %key.display(), bytes = src.len(), "register file");
        self.sources.insert(key.clone(), src.clone());
        Some((key, src))
    }
}

/// Primary configuration files are `*.tf`, excluding override files which
/// have merge semantics this resolver does not apply.
fn is_primary_config_file(name: &str) -> bool {
    name.ends_with(".tf") && name != "override.tf" && !name.ends_with("_override.tf")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fs::MemoryFs;
    use pretty_assertions::assert_eq;

    fn loader(files: &[(&str, &str)]) -> Loader<MemoryFs> {
        let mut fs = MemoryFs::new();
        for (path, content) in files {
            fs.insert(path, *content);
        }
        Loader::with_fs(fs, ".").expect("loader must build")
    }

    #[test]
    fn config_file_filter() {
        assert!(is_primary_config_file("main.tf"));
        assert!(!is_primary_config_file("main.tf.json"));
        assert!(!is_primary_config_file("terraform.tfvars"));
        assert!(!is_primary_config_file("override.tf"));
        assert!(!is_primary_config_file("instance_override.tf"));
    }

    #[test]
    fn directory_without_calls_resolves_to_a_leaf() {
        let mut loader = loader(&[("main.tf", "resource \"aws_instance\" \"web\" {\n  ami = \"ami-123\"\n}\n")]);
        let (config, diags) = loader.load_config(".", ModuleWalkMode::All);
        assert!(diags.is_empty(), "{diags}");
        assert_eq!(config.module.source_dir, PathBuf::from("."));
        assert!(config.children.is_empty());
        assert_eq!(config.module.files.len(), 1);
    }

    #[test]
    fn walk_mode_none_never_descends() {
        let mut loader = loader(&[
            ("main.tf", "module \"child\" {\n  source = \"./child\"\n}\n"),
            ("child/main.tf", "# leaf\n"),
        ]);
        let (config, diags) = loader.load_config(".", ModuleWalkMode::None);
        assert!(diags.is_empty(), "{diags}");
        assert!(config.children.is_empty());
        assert_eq!(config.module.module_calls.len(), 1);
    }

    #[test]
    fn walk_mode_local_skips_fetched_modules_silently() {
        let mut loader = loader(&[
            (
                "main.tf",
                "module \"local\" {\n  source = \"./local\"\n}\n\nmodule \"fetched\" {\n  source = \"acme/fetched/aws\"\n}\n",
            ),
            ("local/main.tf", "# leaf\n"),
        ]);
        let (config, diags) = loader.load_config(".", ModuleWalkMode::Local);
        assert!(diags.is_empty(), "{diags}");
        let children: Vec<&String> = config.children.keys().collect();
        assert_eq!(children, vec!["local"]);
    }

    #[test]
    fn sibling_modules_survive_one_failed_resolution() {
        let mut loader = loader(&[
            (
                "main.tf",
                "module \"missing\" {\n  source = \"./missing\"\n}\n\nmodule \"present\" {\n  source = \"./present\"\n}\n",
            ),
            ("present/main.tf", "# leaf\n"),
        ]);
        let (config, diags) = loader.load_config(".", ModuleWalkMode::All);
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 1);
        let children: Vec<&String> = config.children.keys().collect();
        assert_eq!(children, vec!["present"]);
    }

    #[test]
    fn syntax_error_in_one_file_keeps_the_sibling_file() {
        let mut loader = loader(&[
            ("broken.tf", "resource \"aws_instance\" {\n"),
            ("main.tf", "module \"child\" {\n  source = \"./child\"\n}\n"),
            ("child/main.tf", "# leaf\n"),
        ]);
        let (config, diags) = loader.load_config(".", ModuleWalkMode::All);
        assert!(diags.has_errors());
        assert_eq!(config.module.files.len(), 1);
        assert_eq!(config.children.len(), 1);
        // both files were read, so both are registered
        assert!(loader.files().contains_key(Path::new("broken.tf")));
        assert!(loader.files().contains_key(Path::new("main.tf")));
    }

    #[test]
    fn repeated_loads_are_idempotent() {
        let mut loader = loader(&[
            ("main.tf", "module \"child\" {\n  source = \"./child\"\n}\n"),
            ("child/main.tf", "variable \"name\" {\n  default = \"x\"\n}\n"),
        ]);
        let (first, first_diags) = loader.load_config(".", ModuleWalkMode::All);
        let (second, second_diags) = loader.load_config(".", ModuleWalkMode::All);
        assert!(first_diags.is_empty() && second_diags.is_empty());
        assert_eq!(first, second);
        assert_eq!(loader.files().len(), 2);
    }

    fn nested_chain(depth: usize) -> Loader<MemoryFs> {
        let mut fs = MemoryFs::new();
        let mut dir = PathBuf::from(".");
        for level in 1..=depth {
            fs.insert(
                dir.join("main.tf"),
                format!("module \"child{level}\" {{\n  source = \"./child{level}\"\n}}\n"),
            );
            dir = util::clean(&dir.join(format!("child{level}")));
        }
        fs.insert(dir.join("main.tf"), "# leaf\n");
        Loader::with_fs(fs, ".").expect("loader must build")
    }

    #[test]
    fn ten_nested_levels_resolve_without_diagnostics() {
        let mut loader = nested_chain(10);
        let (config, diags) = loader.load_config(".", ModuleWalkMode::All);
        assert!(diags.is_empty(), "{diags}");

        let mut node = &config;
        for level in 1..=10 {
            node = &node.children[&format!("child{level}")];
        }
        assert!(node.children.is_empty());
    }

    #[test]
    fn the_eleventh_level_hits_the_depth_ceiling() {
        let mut loader = nested_chain(11);
        let (config, diags) = loader.load_config(".", ModuleWalkMode::All);
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 1);

        let rendered = diags.to_string();
        assert!(rendered.contains("Module stack level too deep"), "{rendered}");
        assert!(
            rendered.contains("current path: module.child1.module.child2"),
            "{rendered}"
        );

        // the denied call produces no child entry on the deepest node
        let mut node = &config;
        for level in 1..=10 {
            node = &node.children[&format!("child{level}")];
        }
        assert!(node.children.is_empty());
        assert_eq!(node.module.module_calls.len(), 1);
    }

    #[test]
    fn values_files_skip_non_literal_attributes_but_keep_the_file() {
        let mut loader = loader(&[(
            "terraform.tfvars",
            "good = \"value\"\nbad = var.reference\n",
        )]);
        let (values, diags) = loader.load_values_files(".", &[]);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["good"].value, Value::String("value".to_string()));
        assert!(!values[0].contains_key("bad"));
        assert!(diags.has_errors());
        assert!(
            diags.to_string().contains("Invalid value for input variable"),
            "{diags}"
        );
    }

    #[test]
    fn unreadable_values_dir_still_loads_explicit_files() {
        let mut loader = loader(&[("vars/cli.tfvars", "cli = 1\n")]);
        let (values, diags) =
            loader.load_values_files("missing", &[PathBuf::from("vars/cli.tfvars")]);
        assert_eq!(values.len(), 1);
        assert_eq!(values[0]["cli"].value, Value::Integer(1));
        assert!(diags.has_errors());
    }
}
