//! Schema discovery module.
//!
//! Read-only lookups made while building a plan:
//! - Wildcard meta key expansion
//! - Plugin detection by marker tables

pub mod extensions;
pub mod resolver;

pub use extensions::*;
pub use resolver::*;
