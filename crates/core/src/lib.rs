//! Domain types for the sequence conductor.
//!
//! This crate holds the shared vocabulary of the orchestration core:
//! sequence requests and their priorities, caller contexts used for
//! authorization decisions, recorded violations, and the error taxonomy.

pub mod domain;
pub mod error;

pub use domain::*;
pub use error::{ConductorError, Result};
