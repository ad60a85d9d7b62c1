//! Scrub plan assembly.
//!
//! Builds the ordered list of operations for one run:
//! 1. Users (always)
//! 2. User meta (always; core, contact-method, extra and WooCommerce keys)
//! 3. Commenters (always)
//! 4. Post meta (extra content keys and/or WooCommerce order keys)
//! 5. Custom tables (one per table that exists)
//! 6. Plugin operations (WooCommerce order notes, BuddyPress profiles)

use serde::Serialize;

use crate::classification::FieldClass;
use crate::config::{CustomTableSpec, ScrubConfig};
use crate::discovery::extensions::{
    detect_extensions, woocommerce_order_meta_keys, DetectedExtensions, BUDDYPRESS_PROFILE_OWNER,
    BUDDYPRESS_PROFILE_TABLE, BUDDYPRESS_PROFILE_VALUE, WOOCOMMERCE_CUSTOMER_KEYS,
    WOOCOMMERCE_CUSTOMER_NOTE_COLUMN, WOOCOMMERCE_ORDER_NOTE_TYPE, WOOCOMMERCE_ORDER_POST_TYPE,
};
use crate::discovery::resolver::{push_unique, Resolver};
use crate::error::StoreError;
use crate::security::masking::EmailSeed;
use crate::security::sanitizer::{sanitize_identifier, sanitize_key};
use crate::storage::models::*;
use crate::storage::store::Store;

use super::context::RunContext;

/// Meta keys WordPress itself stores per user.
pub const CORE_USER_META_KEYS: &[&str] = &["first_name", "last_name", "nickname", "description"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Users,
    UserMeta,
    Commenters,
    PostMeta,
    CustomTable,
    WooCommerceOrders,
    BuddyPressProfiles,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Users => "users",
            OperationKind::UserMeta => "user_meta",
            OperationKind::Commenters => "commenters",
            OperationKind::PostMeta => "post_meta",
            OperationKind::CustomTable => "custom_table",
            OperationKind::WooCommerceOrders => "woocommerce_orders",
            OperationKind::BuddyPressProfiles => "buddypress_profiles",
        }
    }
}

/// How one column of a fixed-column operation is rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRule {
    /// `user-<id>`, whatever the column holds.
    IdentityLabel { id_column: String },
    /// The run's shared credential.
    Credential,
    /// Mask chosen by classifying the column name.
    Classified,
    /// Mask of a fixed class.
    Masked(FieldClass),
}

/// Row restriction on a fixed-column operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    NotEmpty(String),
    Equals(String, String),
    /// The row's own email column is off the protected domain.
    EmailNotProtected(String),
    /// The row's owner id is not a protected identity.
    OwnerNotProtected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTarget {
    pub table: String,
    pub columns: Vec<(String, ColumnRule)>,
    pub email_seed: EmailSeed,
    pub filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTarget {
    pub table: String,
    pub meta: MetaTable,
    pub keys: Vec<String>,
    /// Skip rows owned by protected identities.
    pub identity_aware: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Columns(ColumnTarget),
    Meta(MetaTarget),
}

impl Target {
    pub fn table(&self) -> &str {
        match self {
            Target::Columns(t) => &t.table,
            Target::Meta(t) => &t.table,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrubOperation {
    pub kind: OperationKind,
    pub label: String,
    pub description: String,
    /// Caller-supplied extras worth listing in the summary.
    pub details: Vec<String>,
    pub target: Target,
}

#[derive(Debug, Clone, Default)]
pub struct ScrubPlan {
    pub operations: Vec<ScrubOperation>,
    pub extensions: DetectedExtensions,
}

impl ScrubPlan {
    /// Human-readable summary shown before confirmation.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec!["Summary of data to be scrubbed:".to_string()];
        for op in &self.operations {
            if op.details.is_empty() {
                lines.push(format!(" * {}", op.description));
            } else {
                lines.push(format!(
                    " * {} Including the following extra fields:",
                    op.description
                ));
                lines.extend(op.details.iter().map(|d| format!(" * * {}", d)));
            }
        }
        lines
    }
}

pub struct PlanBuilder<'a, S: Store> {
    store: &'a mut S,
    ctx: &'a RunContext,
}

impl<'a, S: Store> PlanBuilder<'a, S> {
    pub fn new(store: &'a mut S, ctx: &'a RunContext) -> Self {
        Self { store, ctx }
    }

    /// Assemble the plan. Only read queries are issued.
    pub fn build(mut self, config: &ScrubConfig) -> Result<ScrubPlan, StoreError> {
        let log_ctx = self.ctx.log_context();
        let extensions = detect_extensions(self.store, &self.ctx.table_prefix, &log_ctx)?;

        let mut operations = vec![
            self.users_op(),
            self.user_meta_op(config, extensions)?,
            self.commenters_op(),
        ];

        if let Some(op) = self.post_meta_op(config, extensions)? {
            operations.push(op);
        }

        operations.extend(self.custom_table_ops(&config.custom_tables)?);

        if extensions.woocommerce {
            operations.extend(self.woocommerce_ops());
        }
        if extensions.buddypress {
            operations.extend(self.buddypress_op()?);
        }

        log::info!(
            "{} PLAN_BUILT operations={} woocommerce={} buddypress={}",
            log_ctx,
            operations.len(),
            extensions.woocommerce,
            extensions.buddypress
        );

        Ok(ScrubPlan {
            operations,
            extensions,
        })
    }

    fn users_op(&self) -> ScrubOperation {
        let mut columns: Vec<(String, ColumnRule)> = USER_LABEL_COLUMNS
            .iter()
            .map(|c| {
                (
                    c.to_string(),
                    ColumnRule::IdentityLabel {
                        id_column: USER_ID_COLUMN.to_string(),
                    },
                )
            })
            .collect();
        columns.push((USER_EMAIL_COLUMN.to_string(), ColumnRule::Classified));
        columns.push((USER_PASS_COLUMN.to_string(), ColumnRule::Credential));
        columns.extend(
            USER_CLASSIFIED_COLUMNS
                .iter()
                .filter(|c| **c != USER_EMAIL_COLUMN)
                .map(|c| (c.to_string(), ColumnRule::Classified)),
        );

        let table = self.ctx.table(USERS_TABLE);
        ScrubOperation {
            kind: OperationKind::Users,
            label: "Users data".to_string(),
            description: format!("Users data in {}.", table),
            details: Vec::new(),
            target: Target::Columns(ColumnTarget {
                table,
                columns,
                email_seed: EmailSeed::identity(USER_ID_COLUMN),
                filters: vec![Filter::EmailNotProtected(USER_EMAIL_COLUMN.to_string())],
            }),
        }
    }

    fn user_meta_op(
        &mut self,
        config: &ScrubConfig,
        extensions: DetectedExtensions,
    ) -> Result<ScrubOperation, StoreError> {
        let mut keys: Vec<String> = Vec::new();
        for key in CORE_USER_META_KEYS
            .iter()
            .map(|k| k.to_string())
            .chain(config.contact_methods.iter().cloned())
        {
            push_unique(&mut keys, key);
        }

        // Extras already covered by the core keys are not listed again.
        let mut details: Vec<String> = Vec::new();
        for key in self
            .resolver()
            .expand_keys(&USER_META, &config.extra_user_fields)?
        {
            if !keys.contains(&key) {
                keys.push(key.clone());
                details.push(key);
            }
        }

        if extensions.woocommerce {
            for key in WOOCOMMERCE_CUSTOMER_KEYS {
                push_unique(&mut keys, key.to_string());
            }
        }

        let table = self.ctx.table(USER_META.table);
        Ok(ScrubOperation {
            kind: OperationKind::UserMeta,
            label: "Users meta data".to_string(),
            description: format!("Users meta data in {}.", table),
            details,
            target: Target::Meta(MetaTarget {
                table,
                meta: USER_META,
                keys,
                identity_aware: true,
            }),
        })
    }

    fn commenters_op(&self) -> ScrubOperation {
        let table = self.ctx.table(COMMENTS_TABLE);
        ScrubOperation {
            kind: OperationKind::Commenters,
            label: "Commenters data".to_string(),
            description: format!("Commenters data in {}.", table),
            details: Vec::new(),
            target: Target::Columns(ColumnTarget {
                table,
                columns: COMMENT_AUTHOR_COLUMNS
                    .iter()
                    .map(|c| (c.to_string(), ColumnRule::Classified))
                    .collect(),
                email_seed: EmailSeed::identity(COMMENT_OWNER_COLUMN),
                filters: vec![Filter::EmailNotProtected(
                    COMMENT_AUTHOR_EMAIL_COLUMN.to_string(),
                )],
            }),
        }
    }

    fn post_meta_op(
        &mut self,
        config: &ScrubConfig,
        extensions: DetectedExtensions,
    ) -> Result<Option<ScrubOperation>, StoreError> {
        if config.extra_content_fields.is_empty() && !extensions.woocommerce {
            return Ok(None);
        }

        let mut keys: Vec<String> = Vec::new();
        let expanded = self
            .resolver()
            .expand_keys(&POST_META, &config.extra_content_fields)?;
        for key in expanded.iter().map(|k| sanitize_key(k)) {
            if !key.is_empty() {
                push_unique(&mut keys, key);
            }
        }
        let details = keys.clone();

        // Plugin keys are trusted and may not survive sanitize_key.
        if extensions.woocommerce {
            for key in woocommerce_order_meta_keys() {
                push_unique(&mut keys, key);
            }
        }

        if keys.is_empty() {
            log::info!(
                "{} POST_META_SKIPPED reason=no_keys_after_sanitizing",
                self.ctx.log_context()
            );
            return Ok(None);
        }

        let table = self.ctx.table(POST_META.table);
        Ok(Some(ScrubOperation {
            kind: OperationKind::PostMeta,
            label: "Posts meta data".to_string(),
            description: format!("Posts meta data in {}.", table),
            details,
            target: Target::Meta(MetaTarget {
                table,
                meta: POST_META,
                keys,
                identity_aware: false,
            }),
        }))
    }

    fn custom_table_ops(&mut self, specs: &[CustomTableSpec]) -> Result<Vec<ScrubOperation>, StoreError> {
        let log_ctx = self.ctx.log_context();
        let mut operations = Vec::new();

        for spec in specs {
            let relative = spec.table.trim();
            let relative = relative
                .strip_prefix(self.ctx.table_prefix.as_str())
                .unwrap_or(relative);
            let name = sanitize_identifier(relative);
            if name.is_empty() {
                crate::log_warn!(log_ctx, "CUSTOM_TABLE_SKIPPED", table = spec.table, reason = "invalid_name");
                continue;
            }

            let table = self.ctx.table(&name);
            if !self.store.table_exists(&table)? {
                log::debug!("{} CUSTOM_TABLE_SKIPPED table={} reason=missing", log_ctx, table);
                continue;
            }

            let mut columns: Vec<(String, ColumnRule)> = Vec::new();
            for raw in &spec.columns {
                let column = sanitize_identifier(raw);
                if column.is_empty() || columns.iter().any(|(c, _)| *c == column) {
                    continue;
                }
                if !self.store.column_exists(&table, &column)? {
                    log::debug!(
                        "{} CUSTOM_COLUMN_SKIPPED table={} column={} reason=missing",
                        log_ctx,
                        table,
                        column
                    );
                    continue;
                }
                columns.push((column, ColumnRule::Classified));
            }

            if columns.is_empty() {
                log::debug!("{} CUSTOM_TABLE_SKIPPED table={} reason=no_columns", log_ctx, table);
                continue;
            }

            let column_names: Vec<&str> = columns.iter().map(|(c, _)| c.as_str()).collect();
            operations.push(ScrubOperation {
                kind: OperationKind::CustomTable,
                label: format!("Custom table {}", table),
                description: "Custom tables and columns data.".to_string(),
                details: vec![format!("{} - {}", table, column_names.join(","))],
                target: Target::Columns(ColumnTarget {
                    table,
                    columns,
                    email_seed: EmailSeed::Random,
                    filters: Vec::new(),
                }),
            });
        }

        Ok(operations)
    }

    fn woocommerce_ops(&self) -> Vec<ScrubOperation> {
        let posts = self.ctx.table(POSTS_TABLE);
        let comments = self.ctx.table(COMMENTS_TABLE);

        vec![
            ScrubOperation {
                kind: OperationKind::WooCommerceOrders,
                label: "WooCommerce customer notes".to_string(),
                description: format!("WooCommerce customer order notes in {}.", posts),
                details: Vec::new(),
                target: Target::Columns(ColumnTarget {
                    table: posts,
                    columns: vec![(
                        WOOCOMMERCE_CUSTOMER_NOTE_COLUMN.to_string(),
                        ColumnRule::Masked(FieldClass::Other),
                    )],
                    email_seed: EmailSeed::Random,
                    filters: vec![
                        Filter::Equals("post_type".to_string(), WOOCOMMERCE_ORDER_POST_TYPE.to_string()),
                        Filter::NotEmpty(WOOCOMMERCE_CUSTOMER_NOTE_COLUMN.to_string()),
                    ],
                }),
            },
            ScrubOperation {
                kind: OperationKind::WooCommerceOrders,
                label: "WooCommerce order notes".to_string(),
                description: format!("WooCommerce order notes in {}.", comments),
                details: Vec::new(),
                target: Target::Columns(ColumnTarget {
                    table: comments,
                    columns: vec![(
                        "comment_content".to_string(),
                        ColumnRule::Masked(FieldClass::Other),
                    )],
                    email_seed: EmailSeed::Random,
                    filters: vec![
                        Filter::Equals("comment_type".to_string(), WOOCOMMERCE_ORDER_NOTE_TYPE.to_string()),
                        Filter::NotEmpty("comment_content".to_string()),
                    ],
                }),
            },
        ]
    }

    fn buddypress_op(&mut self) -> Result<Option<ScrubOperation>, StoreError> {
        let table = self.ctx.table(BUDDYPRESS_PROFILE_TABLE);
        if !self.store.table_exists(&table)? {
            crate::log_warn!(self.ctx.log_context(), "BUDDYPRESS_PROFILE_TABLE_MISSING", table = table);
            return Ok(None);
        }

        Ok(Some(ScrubOperation {
            kind: OperationKind::BuddyPressProfiles,
            label: "BuddyPress data".to_string(),
            description: format!("BuddyPress data within {}.", table),
            details: Vec::new(),
            target: Target::Columns(ColumnTarget {
                table,
                columns: vec![(
                    BUDDYPRESS_PROFILE_VALUE.to_string(),
                    ColumnRule::Masked(FieldClass::Other),
                )],
                email_seed: EmailSeed::Random,
                filters: vec![
                    Filter::NotEmpty(BUDDYPRESS_PROFILE_VALUE.to_string()),
                    Filter::OwnerNotProtected(BUDDYPRESS_PROFILE_OWNER.to_string()),
                ],
            }),
        }))
    }

    fn resolver(&mut self) -> Resolver<'_, S> {
        Resolver::new(self.store, &self.ctx.table_prefix, self.ctx.log_context())
    }
}
