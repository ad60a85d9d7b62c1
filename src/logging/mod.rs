//! Structured logging with run context.
//!
//! Provides logging macros and utilities that include the run id and the
//! current operation label in every log message for easy correlation.

pub mod structured;

#[cfg(test)]
pub mod testing;

pub use structured::*;

/// Initialize the process-wide logger.
///
/// Defaults to `info`; `RUST_LOG` overrides.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
