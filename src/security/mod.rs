//! Security module.
//!
//! Provides masking transforms and SQL identifier/literal sanitization.

pub mod masking;
pub mod sanitizer;

pub use masking::*;
pub use sanitizer::*;
