//! Core engine for repofix: locate files in the CareerOS monorepo, apply
//! idempotent patches with timestamped backups, scan for test smells and
//! stubs, and drive vitest config/setup matrix runs.
//!
//! Everything here is synchronous and filesystem-first; the CLI crate owns
//! argument parsing and output formatting.

pub mod backup;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod health;
pub mod io;
pub mod locate;
pub mod matrix;
pub mod mutate;
pub mod paths;
pub mod prisma;
pub mod recipes;
pub mod report;
pub mod runner;
pub mod scan;
pub mod stubs;

pub use error::{RepofixError, Result};
