//! Plugin detection.
//!
//! Plugins that store PII are detected by their tables. Tables survive
//! deactivation, so a plugin that was active at some point still counts as
//! present; its data is still there.

use serde::Serialize;

use crate::error::StoreError;
use crate::logging::structured::LogContext;
use crate::storage::store::Store;

/// WooCommerce customer keys, stored per user and copied onto each order.
pub const WOOCOMMERCE_CUSTOMER_KEYS: &[&str] = &[
    "billing_country",
    "billing_first_name",
    "billing_last_name",
    "billing_company",
    "billing_address_1",
    "billing_address_2",
    "billing_city",
    "billing_state",
    "billing_postcode",
    "billing_email",
    "billing_phone",
    "shipping_country",
    "shipping_first_name",
    "shipping_last_name",
    "shipping_company",
    "shipping_address_1",
    "shipping_address_2",
    "shipping_city",
    "shipping_state",
    "shipping_postcode",
];

/// Order post meta outside the customer copies. The PayPal keys really do
/// contain uppercase and spaces.
const WOOCOMMERCE_ORDER_KEYS: &[&str] = &[
    "_customer_ip_address",
    "_customer_user_agent",
    "Payer PayPal address",
    "Payer first name",
    "Payer last name",
];

pub const WOOCOMMERCE_ORDER_POST_TYPE: &str = "shop_order";
pub const WOOCOMMERCE_CUSTOMER_NOTE_COLUMN: &str = "post_excerpt";
pub const WOOCOMMERCE_ORDER_NOTE_TYPE: &str = "order_note";

pub const BUDDYPRESS_PROFILE_TABLE: &str = "bp_xprofile_data";
pub const BUDDYPRESS_PROFILE_OWNER: &str = "user_id";
pub const BUDDYPRESS_PROFILE_VALUE: &str = "value";

/// Order post meta keys: the fixed order keys plus `_`-prefixed customer keys.
pub fn woocommerce_order_meta_keys() -> Vec<String> {
    WOOCOMMERCE_ORDER_KEYS
        .iter()
        .map(|k| k.to_string())
        .chain(WOOCOMMERCE_CUSTOMER_KEYS.iter().map(|k| format!("_{}", k)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    WooCommerce,
    BuddyPress,
}

impl Extension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Extension::WooCommerce => "woocommerce",
            Extension::BuddyPress => "buddypress",
        }
    }

    /// Prefix-relative LIKE pattern of the plugin's tables.
    pub fn marker_pattern(&self) -> &'static str {
        match self {
            Extension::WooCommerce => "woocommerce%",
            Extension::BuddyPress => "bp_%",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DetectedExtensions {
    pub woocommerce: bool,
    pub buddypress: bool,
}

/// Check each known plugin's marker tables once.
pub fn detect_extensions<S: Store>(
    store: &mut S,
    table_prefix: &str,
    ctx: &LogContext,
) -> Result<DetectedExtensions, StoreError> {
    let mut detected = DetectedExtensions::default();

    for extension in [Extension::WooCommerce, Extension::BuddyPress] {
        let pattern = format!("{}{}", table_prefix, extension.marker_pattern());
        let tables = store.tables_like(&pattern)?;
        let present = !tables.is_empty();

        if present {
            log::info!(
                "{} EXTENSION_DETECTED extension={} tables={}",
                ctx,
                extension.as_str(),
                tables.len()
            );
        } else {
            log::debug!("{} EXTENSION_ABSENT extension={}", ctx, extension.as_str());
        }

        match extension {
            Extension::WooCommerce => detected.woocommerce = present,
            Extension::BuddyPress => detected.buddypress = present,
        }
    }

    Ok(detected)
}
