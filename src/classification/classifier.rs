//! Field classification.
//!
//! Decides what kind of PII a column or meta key holds from its name alone.

use std::fmt;

use serde::Serialize;

/// Semantic category of a field, driving which mask applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldClass {
    Email,
    Url,
    Phone,
    Other,
}

impl FieldClass {
    /// All classes in bucket order.
    pub const ALL: [FieldClass; 4] = [
        FieldClass::Email,
        FieldClass::Url,
        FieldClass::Phone,
        FieldClass::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldClass::Email => "email",
            FieldClass::Url => "url",
            FieldClass::Phone => "phone",
            FieldClass::Other => "other",
        }
    }
}

impl fmt::Display for FieldClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const URL_MARKERS: &[&str] = &["url", "website"];
const PHONE_MARKERS: &[&str] = &["phone", "tel", "mobile", "fax"];

/// Classify a field by name.
///
/// Case-insensitive substring tests, first match wins:
/// email, then url/website, then phone/tel/mobile/fax, else other.
///
/// # Examples
/// ```
/// use wp_pii_scrub::classification::{classify, FieldClass};
///
/// assert_eq!(classify("billing_email"), FieldClass::Email);
/// assert_eq!(classify("billing_email_or_phone"), FieldClass::Email);
/// assert_eq!(classify("user_url"), FieldClass::Url);
/// assert_eq!(classify("Mobile"), FieldClass::Phone);
/// assert_eq!(classify("first_name"), FieldClass::Other);
/// ```
pub fn classify(field_name: &str) -> FieldClass {
    let name = field_name.to_lowercase();

    if name.contains("email") {
        FieldClass::Email
    } else if URL_MARKERS.iter().any(|m| name.contains(m)) {
        FieldClass::Url
    } else if PHONE_MARKERS.iter().any(|m| name.contains(m)) {
        FieldClass::Phone
    } else {
        FieldClass::Other
    }
}
