//! Field classification module.
//!
//! Maps a column or meta key name to the kind of PII it holds:
//! - Email addresses
//! - URLs / websites
//! - Phone numbers
//! - Anything else (free text)

pub mod classifier;

pub use classifier::*;
