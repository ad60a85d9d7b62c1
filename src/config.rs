//! Run configuration.
//!
//! `ScrubConfig` is what the core consumes. It can be deserialized from a
//! JSON file and is otherwise filled in by the CLI from flags. `Settings`
//! carries the environment: database location, table prefix, the
//! protected domain, and whether the target is marked live.

use std::env;
use std::fs;
use std::path::Path;

use dotenvy::dotenv;
use serde::Deserialize;

use crate::error::{Result, ScrubError};
use crate::security::masking::UrlPolicy;

pub const DEFAULT_TABLE_PREFIX: &str = "wp_";

/// A custom table and the columns to scrub in it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomTableSpec {
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrubConfig {
    /// Extra usermeta keys; `%` wildcards allowed.
    pub extra_user_fields: Vec<String>,
    /// Extra postmeta keys; `%` wildcards allowed.
    pub extra_content_fields: Vec<String>,
    pub custom_tables: Vec<CustomTableSpec>,
    /// Contact-method meta keys registered by the site (e.g. `aim`, `jabber`).
    pub contact_methods: Vec<String>,
    pub dry_run: bool,
    pub confirmed: bool,
    pub protected_domain: Option<String>,
    pub environment_is_protected_target: bool,
    pub allow_protected_target_override: bool,
    pub table_prefix: String,
    pub url_policy: UrlPolicy,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            extra_user_fields: Vec::new(),
            extra_content_fields: Vec::new(),
            custom_tables: Vec::new(),
            contact_methods: Vec::new(),
            dry_run: false,
            confirmed: false,
            protected_domain: None,
            environment_is_protected_target: false,
            allow_protected_target_override: false,
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            url_policy: UrlPolicy::default(),
        }
    }
}

impl ScrubConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ScrubError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| ScrubError::Config(format!("cannot parse {}: {}", path.display(), e)))
    }
}

/// Split a comma separated field list, trimming and dropping empties.
pub fn parse_field_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `table:col1,col2;other:col3`.
///
/// Empty segments (such as after a trailing `;`) are ignored. A segment
/// without a `:` or with an empty table name is a configuration error.
pub fn parse_custom_tables(raw: &str) -> Result<Vec<CustomTableSpec>> {
    let mut specs = Vec::new();

    for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let (table, columns) = segment.split_once(':').ok_or_else(|| {
            ScrubError::Config(format!(
                "custom table spec '{}' must be 'table:column1,column2'",
                segment
            ))
        })?;

        let table = table.trim();
        if table.is_empty() {
            return Err(ScrubError::Config(format!(
                "custom table spec '{}' has no table name",
                segment
            )));
        }

        specs.push(CustomTableSpec {
            table: table.to_string(),
            columns: parse_field_list(columns),
        });
    }

    Ok(specs)
}

/// Environment-derived settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub table_prefix: Option<String>,
    pub protected_domain: Option<String>,
    pub live_environment: bool,
}

impl Settings {
    /// Load settings from environment variables, reading `.env` if present.
    pub fn from_env() -> Self {
        let _ = dotenv();

        Self {
            database_url: env::var("DATABASE_URL").ok(),
            table_prefix: env::var("WP_TABLE_PREFIX").ok(),
            protected_domain: env::var("PII_PROTECTED_DOMAIN").ok(),
            live_environment: env::var("LIVE_ENVIRONMENT")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
