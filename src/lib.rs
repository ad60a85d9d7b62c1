//! WordPress PII scrubber core.
//!
//! Rewrites personally identifiable information in a copy of a WordPress
//! database with placeholders while keeping the data shape intact. Rows
//! belonging to a protected email domain are left alone. Every rewrite is a
//! plain SQL UPDATE, so a dry run can print exactly what a real run would do.
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `classification` - Field name classification (email/url/phone/other)
//! - `security` - Identifier sanitizing and masking expressions
//! - `discovery` - Wildcard meta key expansion and plugin detection
//! - `pipeline` - Plan assembly, guards, execution and dry-run preview
//! - `storage` - SQL builders, schema descriptors and the `Store` trait
//! - `config` - Run configuration and environment settings
//! - `logging` - Structured logging with run context

pub mod classification;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod security;
pub mod storage;

pub use config::ScrubConfig;
pub use error::{Result, ScrubError};
pub use pipeline::{scrub, RunReport};
pub use storage::{MySqlStore, Store};
