//! Run context management.
//!
//! Everything that stays fixed for one scrub run: its id, table prefix,
//! protected domain, URL policy and the shared replacement credential.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::ScrubConfig;
use crate::logging::structured::LogContext;
use crate::security::masking::{MaskPolicy, UrlPolicy};
use crate::security::sanitizer::ProtectedDomain;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    PlanBuilt,
    Executing,
    DryRunPreview,
    Done,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::PlanBuilt => "plan_built",
            RunPhase::Executing => "executing",
            RunPhase::DryRunPreview => "dry_run_preview",
            RunPhase::Done => "done",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub table_prefix: String,
    pub protected: Option<ProtectedDomain>,
    pub url_policy: UrlPolicy,
    /// Written to every non-exempt identity's password column.
    pub credential: String,
}

impl RunContext {
    pub fn new(config: &ScrubConfig) -> Self {
        let run_id = format!("run-{}", &Uuid::new_v4().to_string()[..8]);

        Self {
            run_id,
            started_at: Utc::now(),
            table_prefix: config.table_prefix.clone(),
            protected: config
                .protected_domain
                .as_deref()
                .and_then(ProtectedDomain::new),
            url_policy: config.url_policy,
            credential: generate_credential(),
        }
    }

    /// Pin the credential, e.g. to compare two renderings of one plan.
    pub fn with_credential(mut self, credential: &str) -> Self {
        self.credential = credential.to_string();
        self
    }

    /// Apply the table prefix to a prefix-relative name.
    pub fn table(&self, name: &str) -> String {
        format!("{}{}", self.table_prefix, name)
    }

    pub fn mask_policy(&self) -> MaskPolicy<'_> {
        MaskPolicy {
            protected: self.protected.as_ref(),
            url_policy: self.url_policy,
        }
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.run_id)
    }
}

/// A fresh unguessable credential: hex SHA-256 of a random UUID.
pub fn generate_credential() -> String {
    let mut hasher = Sha256::new();
    hasher.update(Uuid::new_v4().as_bytes());
    hex::encode(hasher.finalize())
}
