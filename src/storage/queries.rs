//! SQL query builders.
//!
//! Generates the UPDATE statements a scrub run issues and the lookup
//! queries the store runs. Identifiers arrive already sanitized and are
//! backtick-quoted here; values are escaped literals.

use crate::security::sanitizer::{quote_ident, quote_literal, ProtectedDomain};

/// Build an UPDATE with one assignment per line.
///
/// `assignments` are `(column, expression)` pairs; `conditions` are ANDed.
pub fn build_update(table: &str, assignments: &[(String, String)], conditions: &[String]) -> String {
    let set: Vec<String> = assignments
        .iter()
        .map(|(column, expr)| format!("\t{} = {}", quote_ident(column), expr))
        .collect();

    let mut sql = format!("UPDATE {} SET\n{}", quote_ident(table), set.join(",\n"));
    if !conditions.is_empty() {
        sql.push_str("\nWHERE ");
        sql.push_str(&conditions.join("\n\tAND "));
    }
    sql
}

/// `` `column` IN ('a', 'b') ``.
pub fn key_in_condition(column: &str, keys: &[String]) -> String {
    let literals: Vec<String> = keys.iter().map(|k| quote_literal(k)).collect();
    format!("{} IN ( {} )", quote_ident(column), literals.join(", "))
}

pub fn not_empty_condition(column: &str) -> String {
    format!("{} <> ''", quote_ident(column))
}

pub fn equals_condition(column: &str, value: &str) -> String {
    format!("{} = {}", quote_ident(column), quote_literal(value))
}

/// Rows whose own email column is not on the protected domain.
pub fn email_not_protected_condition(column: &str, domain: &ProtectedDomain) -> String {
    format!("{} NOT LIKE {}", quote_ident(column), domain.like_literal())
}

/// Rows whose owner is not a protected identity.
pub fn owner_not_protected_condition(
    owner_column: &str,
    users_table: &str,
    id_column: &str,
    email_column: &str,
    domain: &ProtectedDomain,
) -> String {
    format!(
        "{} NOT IN ( SELECT {} FROM {} WHERE {} LIKE {} )",
        quote_ident(owner_column),
        quote_ident(id_column),
        quote_ident(users_table),
        quote_ident(email_column),
        domain.like_literal()
    )
}

/// Tables in the current schema matching a bound LIKE pattern.
pub fn build_tables_like_query() -> &'static str {
    "SELECT CAST(table_name AS CHAR) FROM information_schema.tables \
     WHERE table_schema = DATABASE() AND table_name LIKE ?"
}

/// Count of matching columns; binds table then column.
pub fn build_column_exists_query() -> &'static str {
    "SELECT COUNT(*) FROM information_schema.columns \
     WHERE table_schema = DATABASE() AND table_name = ? AND column_name = ?"
}

/// Distinct values of a column matching a bound LIKE pattern.
pub fn build_distinct_like_query(table: &str, column: &str) -> String {
    let col = quote_ident(column);
    format!(
        "SELECT DISTINCT {} FROM {} WHERE {} LIKE ?",
        col,
        quote_ident(table),
        col
    )
}
