//! Pipeline orchestration module.
//!
//! Coordinates a scrub run:
//! - Run context (id, prefix, protected domain, credential)
//! - Guards (protected target, confirmation)
//! - Plan assembly
//! - Execution and dry-run preview

pub mod context;
pub mod executor;
pub mod guard;
pub mod plan;
pub mod scrub;

pub use context::*;
pub use executor::*;
pub use guard::*;
pub use plan::*;
pub use scrub::*;
