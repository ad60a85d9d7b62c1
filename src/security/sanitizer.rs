//! Identifier and literal sanitization for generated SQL.
//!
//! Table and column names cannot be bound as parameters, so every identifier
//! is reduced to a safe alphabet before it is interpolated. Values are
//! escaped as string literals.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Anything outside the key alphabet.
    static ref KEY_DISALLOWED: Regex = Regex::new(r"[^a-z0-9_\-]").unwrap();
}

/// Lowercase a key and drop everything but `[a-z0-9_-]`.
///
/// May return an empty string; callers drop those.
pub fn sanitize_key(key: &str) -> String {
    KEY_DISALLOWED
        .replace_all(&key.to_lowercase(), "")
        .into_owned()
}

/// Sanitize a user-supplied table or column name.
///
/// Backticks are stripped first so quoting cannot be broken out of.
pub fn sanitize_identifier(name: &str) -> String {
    sanitize_key(&name.trim().replace('`', ""))
}

/// Backtick-quote an identifier.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', ""))
}

/// Render a string as a SQL literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// Escape LIKE wildcards so `value` matches literally.
pub fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// The email-domain marker that exempts identities from scrubbing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedDomain {
    marker: String,
}

impl ProtectedDomain {
    /// Returns `None` when the marker is blank, in which case nobody is exempt.
    pub fn new(raw: &str) -> Option<Self> {
        let marker = raw.trim().trim_start_matches('@').to_string();
        if marker.is_empty() {
            None
        } else {
            Some(Self { marker })
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// LIKE literal matching any value containing `@<marker>`.
    pub fn like_literal(&self) -> String {
        quote_literal(&format!("%@{}%", escape_like(&self.marker)))
    }
}
