// src/pattern/expand.rs

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::BuildError;
use crate::fs::FileSystem;
use crate::paths::resolve;
use crate::pattern::glob::{CompiledGlob, is_wild};

/// Result of expanding a list of input patterns.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Concrete paths, deduplicated.
    pub files: Vec<PathBuf>,
    /// Directories that could not be listed. Each one only removed its own
    /// branch from `files`.
    pub warnings: Vec<BuildError>,
}

/// Expand `patterns` (relative to `cwd`) into concrete paths.
///
/// - Patterns without wildcards resolve to `cwd/pattern` whether or not the
///   file exists; the caller decides what a missing file means.
/// - Wildcard patterns are walked segment by segment. A literal segment is
///   joined directly; a wildcard segment lists the directory and keeps the
///   children whose name matches; a `**` segment matches the rest of the
///   pattern both in the current directory and, recursively, in every
///   subdirectory. Only non-directory entries end up in the result.
pub fn expand(fs: &dyn FileSystem, patterns: &[String], cwd: &Path) -> Expansion {
    let mut walker = Walker {
        fs,
        files: BTreeSet::new(),
        warnings: Vec::new(),
    };

    for pattern in patterns {
        let full = resolve(cwd, pattern);
        if !is_wild(pattern) {
            walker.files.insert(full);
            continue;
        }

        let (base, segments) = split_at_first_wildcard(&full);
        debug!(pattern = %pattern, base = ?base, ?segments, "expanding wildcard pattern");
        walker.walk(&base, &segments);
    }

    Expansion {
        files: walker.files.into_iter().collect(),
        warnings: walker.warnings,
    }
}

/// Split `path` into the literal directory prefix and the remaining segments,
/// the first of which contains a wildcard.
fn split_at_first_wildcard(path: &Path) -> (PathBuf, Vec<String>) {
    let mut base = PathBuf::new();
    let mut segments = Vec::new();

    for comp in path.components() {
        let text = comp.as_os_str().to_string_lossy();
        if segments.is_empty() && (!matches!(comp, Component::Normal(_)) || !is_wild(&text)) {
            base.push(comp);
        } else {
            segments.push(text.into_owned());
        }
    }

    if base.as_os_str().is_empty() {
        base.push(".");
    }
    (base, segments)
}

struct Walker<'a> {
    fs: &'a dyn FileSystem,
    files: BTreeSet<PathBuf>,
    warnings: Vec<BuildError>,
}

impl Walker<'_> {
    fn walk(&mut self, dir: &Path, segments: &[String]) {
        let Some((segment, rest)) = segments.split_first() else {
            if self.fs.is_file(dir) {
                self.files.insert(dir.to_path_buf());
            }
            return;
        };

        if segment == "**" {
            // Zero directories deep.
            self.walk(dir, rest);

            let Some(children) = self.list(dir) else {
                return;
            };
            for child in children {
                if self.fs.is_dir(&child) {
                    self.walk(&child, segments);
                } else if rest.is_empty() {
                    self.files.insert(child);
                }
            }
            return;
        }

        if !is_wild(segment) {
            self.walk(&dir.join(segment), rest);
            return;
        }

        let glob = CompiledGlob::new(segment);
        let Some(children) = self.list(dir) else {
            return;
        };
        for child in children {
            let matched = child
                .file_name()
                .is_some_and(|name| glob.matches(&name.to_string_lossy()));
            if !matched {
                continue;
            }
            if rest.is_empty() {
                if !self.fs.is_dir(&child) {
                    self.files.insert(child);
                }
            } else if self.fs.is_dir(&child) {
                self.walk(&child, rest);
            }
        }
    }

    fn list(&mut self, dir: &Path) -> Option<Vec<PathBuf>> {
        match self.fs.read_dir(dir) {
            Ok(children) => Some(children),
            Err(e) => {
                let warning = BuildError::DirectoryRead {
                    dir: dir.to_path_buf(),
                    reason: format!("{e:#}"),
                };
                warn!(dir = ?dir, error = %e, "cannot read directory during expansion");
                if !self.warnings.contains(&warning) {
                    self.warnings.push(warning);
                }
                None
            }
        }
    }
}
