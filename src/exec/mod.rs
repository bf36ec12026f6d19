// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `ProcessBackend` trait and the `Invocation` the
//!   engine hands to it.
//! - [`process`] is the production backend on `tokio::process::Command`.

pub mod backend;
pub mod process;

pub use backend::{Invocation, ProcessBackend};
pub use process::{RealProcessBackend, TERMINATED_EXIT_CODE};
