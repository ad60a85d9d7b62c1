//! The database collaborator.
//!
//! Everything the scrubber needs from a live database: a little schema
//! lookup, distinct-value discovery, and statement execution.

use crate::error::StoreError;
use crate::security::sanitizer::escape_like;

pub trait Store {
    /// Names of tables matching a LIKE pattern, passed through verbatim.
    fn tables_like(&mut self, pattern: &str) -> Result<Vec<String>, StoreError>;

    fn column_exists(&mut self, table: &str, column: &str) -> Result<bool, StoreError>;

    /// Distinct values of `column` in `table` matching a LIKE pattern.
    fn distinct_like(&mut self, table: &str, column: &str, pattern: &str) -> Result<Vec<String>, StoreError>;

    /// Execute one complete statement, returning rows affected.
    fn execute(&mut self, sql: &str) -> Result<u64, StoreError>;

    fn table_exists(&mut self, table: &str) -> Result<bool, StoreError> {
        let found = self.tables_like(&escape_like(table))?;
        Ok(found.iter().any(|name| name.eq_ignore_ascii_case(table)))
    }
}
