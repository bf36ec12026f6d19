// src/pattern/template.rs

//! `${...}` placeholder substitution.
//!
//! A [`PlaceholderTable`] maps placeholder keys (including the `${` `}`
//! delimiters) to values. Tables are usually derived from one concrete path
//! with [`PlaceholderTable::for_path`] and then extended, e.g. with the
//! wildcard stem under [`STEM`].
//!
//! Substitution walks a `toml::Value` by shape: strings are rewritten, arrays
//! and tables are rebuilt with the same layout, everything else is passed
//! through. [`PlaceholderTable::apply_to`] lifts that to any serde type by
//! round-tripping it through `toml::Value`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::paths::to_slash;

/// The whole matched path.
pub const FILE: &str = "${file}";
/// Directory containing the matched path.
pub const FILE_DIRNAME: &str = "${fileDirname}";
/// Last component of [`FILE_DIRNAME`].
pub const FILE_DIRNAME_BASENAME: &str = "${fileDirnameBasename}";
/// File name of the matched path.
pub const FILE_BASENAME: &str = "${fileBasename}";
/// File name without its extension.
pub const FILE_BASENAME_NO_EXTENSION: &str = "${fileBasenameNoExtension}";
/// Extension including the leading dot, or empty.
pub const FILE_EXTNAME: &str = "${fileExtname}";
/// Substring captured by the producing glob's wildcard run.
pub const STEM: &str = "${*}";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderTable {
    entries: BTreeMap<String, String>,
}

impl PlaceholderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard file-derived placeholders for `path`.
    pub fn for_path(path: &Path) -> Self {
        let os = |s: Option<&std::ffi::OsStr>| {
            s.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
        };
        let dir = path.parent();

        Self::new()
            .with(FILE, to_slash(path))
            .with(FILE_DIRNAME, dir.map(to_slash).unwrap_or_default())
            .with(FILE_DIRNAME_BASENAME, os(dir.and_then(Path::file_name)))
            .with(FILE_BASENAME, os(path.file_name()))
            .with(FILE_BASENAME_NO_EXTENSION, os(path.file_stem()))
            .with(
                FILE_EXTNAME,
                path.extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_default(),
            )
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Add every entry of `other`, overriding keys present in both.
    pub fn merge(&mut self, other: &PlaceholderTable) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every occurrence of every key in `input`.
    pub fn fix(&self, input: &str) -> String {
        if !input.contains("${") {
            return input.to_string();
        }
        let mut out = input.to_string();
        for (key, value) in &self.entries {
            out = out.replace(key.as_str(), value);
        }
        out
    }

    /// Substitute inside a value tree, keeping its shape.
    pub fn apply(&self, value: toml::Value) -> toml::Value {
        match value {
            toml::Value::String(s) => toml::Value::String(self.fix(&s)),
            toml::Value::Array(items) => {
                toml::Value::Array(items.into_iter().map(|v| self.apply(v)).collect())
            }
            toml::Value::Table(table) => toml::Value::Table(
                table.into_iter().map(|(k, v)| (k, self.apply(v))).collect(),
            ),
            other => other,
        }
    }

    /// Substitute inside any serializable value.
    pub fn apply_to<T>(&self, value: &T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let tree = toml::Value::try_from(value).context("serializing value for substitution")?;
        self.apply(tree)
            .try_into()
            .context("rebuilding value after substitution")
    }
}
