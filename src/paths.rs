// src/paths.rs

//! Lexical path helpers.
//!
//! Task files spell paths with forward slashes and may contain `.`/`..`
//! segments. Everything that keys on a path (the producer index, the mock
//! filesystem, dedup sets) goes through [`normalize`] first so that
//! `./out/../out/a.o` and `out/a.o` are the same key. Nothing here touches the
//! filesystem; symlinks are not resolved.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` segments and fold `..` into the
/// preceding normal segment where there is one.
///
/// Leading `..` segments of a relative path are kept. `..` directly under a
/// root is dropped. An empty result becomes `.`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Render a path with forward slashes regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Normalize a path given as a string and render it with forward slashes.
pub fn normalize_str(path: &str) -> String {
    to_slash(&normalize(Path::new(&path.replace('\\', "/"))))
}

/// Join `rel` onto `base` unless it is already absolute, then normalize.
pub fn resolve(base: &Path, rel: impl AsRef<Path>) -> PathBuf {
    normalize(&base.join(rel))
}
