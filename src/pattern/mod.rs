// src/pattern/mod.rs

//! Path patterns.
//!
//! - [`glob`] compiles `*` / `**` / `?` globs and extracts wildcard stems.
//! - [`template`] substitutes `${...}` placeholders derived from a matched
//!   path into strings and whole task definitions.
//! - [`expand`] turns input globs into the concrete files currently on disk.

pub mod expand;
pub mod glob;
pub mod template;

pub use expand::{Expansion, expand};
pub use glob::{CompiledGlob, is_wild};
pub use template::PlaceholderTable;
