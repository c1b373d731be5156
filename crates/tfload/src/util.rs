use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path.
///
/// Resolves `.` and `..` segments without touching the filesystem, so
/// `module1/../module2` becomes `module2`. An empty result is `.`, which is
/// also what the loader uses as the root marker.
pub(crate) fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }

    out.iter().collect()
}

/// Express `target` relative to `base`.
///
/// Both paths must be absolute (or share their first component). Returns
/// `None` when no common root exists, e.g. across drive prefixes.
pub(crate) fn relative(base: &Path, target: &Path) -> Option<PathBuf> {
    let base: Vec<Component> = base.components().collect();
    let target: Vec<Component> = target.components().collect();

    let mut shared = 0;
    while shared < base.len() && shared < target.len() && base[shared] == target[shared] {
        shared += 1;
    }

    if shared == 0 {
        return None;
    }

    let mut out = PathBuf::new();
    for _ in shared..base.len() {
        out.push("..");
    }
    for component in &target[shared..] {
        out.push(component.as_os_str());
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }

    Some(out)
}
