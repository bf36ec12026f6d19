// src/config/mod.rs

//! Task-file loading and validation.
//!
//! - [`model`] is the TOML-backed data model.
//! - [`loader`] reads a task file from disk.
//! - [`validate`] turns a raw file into a [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_TASK_FILE, load_and_validate, load_from_path, parse_str};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig, parse_duration};
pub use validate::dependency_warnings;
