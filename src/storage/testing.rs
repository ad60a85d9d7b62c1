//! In-memory store for tests.
//!
//! Holds a tiny schema (tables, their columns, and stored values per column)
//! and records every executed statement instead of running it.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::StoreError;
use crate::storage::store::Store;

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    pub executed: Vec<String>,
    pub lookups: usize,
    fail_on: Option<(usize, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The core WordPress tables with their scrubbed columns.
    pub fn wordpress(prefix: &str) -> Self {
        Self::new()
            .with_table(
                &format!("{}users", prefix),
                &["ID", "user_login", "user_nicename", "display_name", "user_email", "user_pass", "user_url"],
            )
            .with_table(&format!("{}usermeta", prefix), &["user_id", "meta_key", "meta_value"])
            .with_table(&format!("{}postmeta", prefix), &["post_id", "meta_key", "meta_value"])
            .with_table(
                &format!("{}comments", prefix),
                &["user_id", "comment_author", "comment_author_email", "comment_author_url", "comment_author_IP"],
            )
            .with_table(&format!("{}posts", prefix), &["ID", "post_type", "post_excerpt"])
    }

    pub fn with_table(mut self, table: &str, columns: &[&str]) -> Self {
        let entry = self.tables.entry(table.to_string()).or_default();
        for column in columns {
            entry.entry(column.to_string()).or_default();
        }
        self
    }

    pub fn with_values(mut self, table: &str, column: &str, values: &[&str]) -> Self {
        self.tables
            .entry(table.to_string())
            .or_default()
            .entry(column.to_string())
            .or_default()
            .extend(values.iter().map(|v| v.to_string()));
        self
    }

    /// Make the `n`th executed statement (zero based) fail with `message`.
    pub fn failing_at(mut self, n: usize, message: &str) -> Self {
        self.fail_on = Some((n, message.to_string()));
        self
    }
}

/// MySQL LIKE semantics: `%`, `_`, backslash escapes, case-insensitive.
pub fn like_matches(pattern: &str, value: &str) -> bool {
    let mut re = String::from("(?is)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            '\\' => {
                if let Some(next) = chars.next() {
                    re.push_str(&regex::escape(&next.to_string()));
                }
            }
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).map(|r| r.is_match(value)).unwrap_or(false)
}

impl Store for MemoryStore {
    fn tables_like(&mut self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.lookups += 1;
        Ok(self
            .tables
            .keys()
            .filter(|name| like_matches(pattern, name))
            .cloned()
            .collect())
    }

    fn column_exists(&mut self, table: &str, column: &str) -> Result<bool, StoreError> {
        self.lookups += 1;
        Ok(self
            .tables
            .get(table)
            .map(|cols| cols.keys().any(|c| c.eq_ignore_ascii_case(column)))
            .unwrap_or(false))
    }

    fn distinct_like(&mut self, table: &str, column: &str, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.lookups += 1;
        let values = self
            .tables
            .get(table)
            .and_then(|cols| cols.get(column))
            .ok_or_else(|| StoreError::new(format!("Unknown column '{}' in '{}'", column, table)))?;

        let mut found: Vec<String> = Vec::new();
        for value in values {
            if like_matches(pattern, value) && !found.contains(value) {
                found.push(value.clone());
            }
        }
        Ok(found)
    }

    fn execute(&mut self, sql: &str) -> Result<u64, StoreError> {
        if let Some((n, message)) = &self.fail_on {
            if *n == self.executed.len() {
                return Err(StoreError::new(message.clone()));
            }
        }
        self.executed.push(sql.to_string());
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_matches() {
        assert!(like_matches("billing_%", "billing_email"));
        assert!(like_matches("billing_%", "BILLING_phone"));
        assert!(!like_matches("billing_%", "other_key"));
        assert!(like_matches(r"wp\_users", "wp_users"));
        assert!(!like_matches(r"wp\_users", "wpxusers"));
        assert!(like_matches("wp_bp_%", "wp_bp_xprofile_data"));
    }

    #[test]
    fn test_failure_injection() {
        let mut store = MemoryStore::new().failing_at(1, "boom");
        assert!(store.execute("A").is_ok());
        assert_eq!(store.execute("B").unwrap_err().message, "boom");
        assert_eq!(store.executed, vec!["A".to_string()]);
    }
}
