//! filesystem access used by the loader
//!
//! The loader never touches `std::fs` directly. Everything goes through
//! [Filesystem] so tests (and embedders) can substitute [MemoryFs] for the
//! real disk. Paths handed to these methods are relative to the process work
//! directory, same as the paths the loader operates on.

use crate::util;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

pub trait Filesystem {
    /// File entries of `path`, excluding subdirectories. Order is unspecified.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn is_dir(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;
}

/// The real disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl Filesystem for OsFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                entries.push(entry.path());
            }
        }
        Ok(entries)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// In-memory filesystem keyed by cleaned relative paths.
///
/// Directories exist implicitly: inserting `ec2/main.tf` makes `ec2` a
/// directory. `.` refers to the top level.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files.insert(util::clean(path.as_ref()), content.into());
    }
}

impl Filesystem for MemoryFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let dir = util::clean(path);
        let entries: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|key| parent_of(key) == dir)
            .cloned()
            .collect();

        if entries.is_empty() && !self.is_dir(&dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", dir.display()),
            ));
        }

        Ok(entries)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(&util::clean(path))
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such file: {}", path.display()),
                )
            })
    }

    fn is_dir(&self, path: &Path) -> bool {
        let dir = util::clean(path);
        if dir == Path::new(".") {
            return !self.files.is_empty();
        }
        self.files.keys().any(|key| key.starts_with(&dir) && *key != dir)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&util::clean(path))
    }
}

fn parent_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> MemoryFs {
        let mut fs = MemoryFs::new();
        fs.insert("main.tf", "# root");
        fs.insert("terraform.tfvars", "x = 1");
        fs.insert("ec2/main.tf", "# ec2");
        fs
    }

    #[test]
    fn read_dir_lists_only_direct_files() {
        let fs = sample();
        let mut names = fs.read_dir(Path::new(".")).unwrap();
        names.sort();
        assert_eq!(
            names,
            vec![PathBuf::from("main.tf"), PathBuf::from("terraform.tfvars")]
        );
        assert_eq!(fs.read_dir(Path::new("ec2")).unwrap(), vec![PathBuf::from("ec2/main.tf")]);
    }

    #[test]
    fn read_dir_fails_for_missing_directories() {
        assert!(sample().read_dir(Path::new("nope")).is_err());
    }

    #[test]
    fn directories_exist_implicitly() {
        let fs = sample();
        assert!(fs.is_dir(Path::new(".")));
        assert!(fs.is_dir(Path::new("./ec2")));
        assert!(!fs.is_dir(Path::new("ec2/main.tf")));
        assert!(fs.is_file(Path::new("ec2/main.tf")));
    }
}
