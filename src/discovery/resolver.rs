//! Wildcard key resolution.
//!
//! Caller-supplied meta keys may contain `%`. Those are expanded into the
//! concrete keys already stored in the metadata table.

use std::collections::BTreeSet;

use crate::error::StoreError;
use crate::logging::structured::LogContext;
use crate::storage::models::MetaTable;
use crate::storage::store::Store;

pub struct Resolver<'s, S: Store> {
    store: &'s mut S,
    table_prefix: String,
    log_ctx: LogContext,
}

impl<'s, S: Store> Resolver<'s, S> {
    pub fn new(store: &'s mut S, table_prefix: &str, log_ctx: LogContext) -> Self {
        Self {
            store,
            table_prefix: table_prefix.to_string(),
            log_ctx,
        }
    }

    /// Distinct stored keys matching `pattern`, which is passed verbatim.
    ///
    /// Nothing matching is an empty set, not an error.
    pub fn resolve_wildcard(&mut self, meta: &MetaTable, pattern: &str) -> Result<BTreeSet<String>, StoreError> {
        let table = format!("{}{}", self.table_prefix, meta.table);
        let keys: BTreeSet<String> = self
            .store
            .distinct_like(&table, meta.key_column, pattern)?
            .into_iter()
            .collect();

        crate::log_debug!(
            self.log_ctx,
            "WILDCARD_RESOLVED",
            table = table,
            pattern = pattern,
            matched = keys.len()
        );

        Ok(keys)
    }

    /// Replace every wildcard field by its matches.
    ///
    /// Plain fields pass through; the result keeps first-seen order with
    /// duplicates removed.
    pub fn expand_keys(&mut self, meta: &MetaTable, fields: &[String]) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = Vec::new();

        for field in fields {
            if field.contains('%') {
                for key in self.resolve_wildcard(meta, field)? {
                    push_unique(&mut keys, key);
                }
            } else {
                push_unique(&mut keys, field.clone());
            }
        }

        Ok(keys)
    }
}

pub(crate) fn push_unique(keys: &mut Vec<String>, key: String) {
    if !keys.contains(&key) {
        keys.push(key);
    }
}
