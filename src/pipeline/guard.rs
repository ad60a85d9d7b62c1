//! Pre-flight checks.
//!
//! A run is refused before any statement is issued when the target is
//! marked live without an override, or when a real run was not confirmed.

use crate::config::ScrubConfig;
use crate::error::{GuardRejection, Result, ScrubError};

/// Refuse a target marked live unless the operator overrode the guard.
///
/// Applies to dry runs too; nothing is read from a live target unasked.
pub fn check_target(config: &ScrubConfig) -> Result<()> {
    if config.environment_is_protected_target && !config.allow_protected_target_override {
        return Err(ScrubError::Guard(GuardRejection::ProtectedTarget));
    }
    Ok(())
}

/// Refuse an unconfirmed run. Dry runs need no confirmation.
pub fn check_confirmed(config: &ScrubConfig) -> Result<()> {
    if !config.dry_run && !config.confirmed {
        return Err(ScrubError::Guard(GuardRejection::NotConfirmed));
    }
    Ok(())
}
