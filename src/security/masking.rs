//! Masking transforms.
//!
//! Each field class maps to one conditional SQL expression evaluated by the
//! database against the current column value:
//! - Email: local part replaced by a seed, domain kept
//! - URL: replaced by a placeholder site
//! - Phone: replaced by a fake number, random per row
//! - Other: replaced by a repeating token of (almost) the same length

use serde::{Deserialize, Serialize};

use crate::classification::FieldClass;
use crate::security::sanitizer::{quote_ident, quote_literal, ProtectedDomain};

/// Six-character masking token.
pub const MASK_TOKEN: &str = "XXXXX ";

/// Placeholder written over URLs.
pub const PLACEHOLDER_URL: &str = "http://www.example.org/";

/// Prefix of generated phone numbers.
pub const PHONE_PREFIX: &str = "555-";

/// Label used for the deterministic identity name and email seed.
pub const IDENTITY_LABEL: &str = "user";

/// How URL columns are overwritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UrlPolicy {
    /// Overwrite every value, empty ones included.
    Always,
    /// Overwrite only non-empty values; empty stays empty.
    #[default]
    NonEmpty,
}

/// Where the replacement local part of an email comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailSeed {
    /// `<label>-<owner id>`, e.g. `user-42`.
    Owner { label: String, owner_column: String },
    /// `<meta key>-<owner id>`, read from the row itself.
    KeyColumn {
        key_column: String,
        owner_column: String,
    },
    /// `<column>-<random digits>` for tables without a known owner.
    Random,
}

impl EmailSeed {
    pub fn identity(owner_column: &str) -> Self {
        EmailSeed::Owner {
            label: IDENTITY_LABEL.to_string(),
            owner_column: owner_column.to_string(),
        }
    }

    /// SQL expression producing the replacement local part for `column`.
    pub fn to_sql(&self, column: &str) -> String {
        match self {
            EmailSeed::Owner {
                label,
                owner_column,
            } => identity_label_sql(label, owner_column),
            EmailSeed::KeyColumn {
                key_column,
                owner_column,
            } => format!(
                "CONCAT({}, '-', {})",
                quote_ident(key_column),
                quote_ident(owner_column)
            ),
            EmailSeed::Random => format!(
                "CONCAT({}, {})",
                quote_literal(&format!("{}-", column)),
                random_digits_sql()
            ),
        }
    }
}

/// Policy shared by every expression rendered in one run.
#[derive(Debug, Clone, Copy)]
pub struct MaskPolicy<'a> {
    pub protected: Option<&'a ProtectedDomain>,
    pub url_policy: UrlPolicy,
}

/// `CONCAT('<label>-', <owner>)`.
pub fn identity_label_sql(label: &str, owner_column: &str) -> String {
    format!(
        "CONCAT({}, {})",
        quote_literal(&format!("{}-", label)),
        quote_ident(owner_column)
    )
}

fn random_digits_sql() -> &'static str {
    "LPAD(FLOOR(RAND() * 1000000), 6, '0')"
}

/// Email: swap the local part for the seed, keep `@domain`.
///
/// Empty values and values already on the protected domain are left alone.
pub fn email_expression(column: &str, seed: &EmailSeed, protected: Option<&ProtectedDomain>) -> String {
    let col = quote_ident(column);
    let replaced = format!(
        "CONCAT({}, SUBSTRING({}, LOCATE('@', {})))",
        seed.to_sql(column),
        col,
        col
    );
    let keep = match protected {
        Some(domain) => format!("{} = '' OR {} LIKE {}", col, col, domain.like_literal()),
        None => format!("{} = ''", col),
    };
    format!("IF({}, {}, {})", keep, col, replaced)
}

pub fn url_expression(column: &str, policy: UrlPolicy) -> String {
    let placeholder = quote_literal(PLACEHOLDER_URL);
    match policy {
        UrlPolicy::Always => placeholder,
        UrlPolicy::NonEmpty => {
            let col = quote_ident(column);
            format!("IF({} <> '', {}, {})", col, placeholder, col)
        }
    }
}

/// Phone: fixed prefix plus six random digits, drawn per row.
pub fn phone_expression(column: &str) -> String {
    let col = quote_ident(column);
    format!(
        "IF({} <> '', CONCAT({}, {}), {})",
        col,
        quote_literal(PHONE_PREFIX),
        random_digits_sql(),
        col
    )
}

/// Other: `MASK_TOKEN` repeated `floor(len / 6)` times.
pub fn other_expression(column: &str) -> String {
    format!(
        "REPEAT({}, FLOOR(CHAR_LENGTH({}) / {}))",
        quote_literal(MASK_TOKEN),
        quote_ident(column),
        MASK_TOKEN.len()
    )
}

/// Pick the expression for a column of the given class.
pub fn mask_expression(class: FieldClass, column: &str, seed: &EmailSeed, policy: &MaskPolicy<'_>) -> String {
    match class {
        FieldClass::Email => email_expression(column, seed, policy.protected),
        FieldClass::Url => url_expression(column, policy.url_policy),
        FieldClass::Phone => phone_expression(column),
        FieldClass::Other => other_expression(column),
    }
}
