//! Plan execution.
//!
//! Renders each planned operation into UPDATE statements and either runs
//! them through the store or, in dry-run mode, only collects them. Both
//! modes render the same text.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classification::{classify, FieldClass};
use crate::error::{Result, ScrubError};
use crate::security::masking::{identity_label_sql, mask_expression, EmailSeed, IDENTITY_LABEL};
use crate::security::sanitizer::{quote_literal, ProtectedDomain};
use crate::storage::models::{USERS_TABLE, USER_EMAIL_COLUMN, USER_ID_COLUMN};
use crate::storage::queries::{
    build_update, email_not_protected_condition, equals_condition, key_in_condition,
    not_empty_condition, owner_not_protected_condition,
};
use crate::storage::store::Store;
use crate::{log_debug, log_error, log_info};

use super::context::{RunContext, RunPhase};
use super::plan::{ColumnRule, ColumnTarget, Filter, MetaTarget, ScrubOperation, ScrubPlan, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Execute,
    DryRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationReport {
    pub label: String,
    pub statements: Vec<String>,
    pub rows_affected: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub dry_run: bool,
    pub operations: Vec<OperationReport>,
    pub total_statements: usize,
    pub total_rows_affected: u64,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Every statement in plan order.
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.operations
            .iter()
            .flat_map(|op| op.statements.iter().map(String::as_str))
    }

    /// Operator-facing rendering. Dry runs list the statements first.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if self.dry_run {
            for sql in self.statements() {
                out.push_str(sql);
                out.push_str(";\n\n");
            }
            out.push_str(&format!(
                "Dry run: {} statements would be run. Time taken: {:.3} secs.\n",
                self.total_statements,
                self.elapsed_ms as f64 / 1000.0
            ));
        } else {
            out.push_str(&format!(
                "PII data all scrubbed. {} statements run, {} rows affected. Time taken: {:.3} secs.\n",
                self.total_statements,
                self.total_rows_affected,
                self.elapsed_ms as f64 / 1000.0
            ));
        }
        out
    }
}

pub struct Executor<'a, S: Store> {
    store: &'a mut S,
    ctx: &'a RunContext,
    mode: ExecutionMode,
}

impl<'a, S: Store> Executor<'a, S> {
    pub fn new(store: &'a mut S, ctx: &'a RunContext, mode: ExecutionMode) -> Self {
        Self { store, ctx, mode }
    }

    /// Run every operation in order, stopping at the first store error.
    pub fn run(self, plan: &ScrubPlan) -> Result<RunReport> {
        let started = Instant::now();
        let log_ctx = self.ctx.log_context();
        let phase = match self.mode {
            ExecutionMode::Execute => RunPhase::Executing,
            ExecutionMode::DryRun => RunPhase::DryRunPreview,
        };
        log_info!(log_ctx, "RUN_PHASE", phase = phase.as_str(), operations = plan.operations.len());

        let mut operations = Vec::with_capacity(plan.operations.len());
        for op in &plan.operations {
            let op_ctx = log_ctx.with_operation(&op.label);
            let statements = render_operation(op, self.ctx);
            let mut rows_affected = 0;

            log_info!(
                op_ctx,
                "OPERATION_START",
                kind = op.kind.as_str(),
                statements = statements.len()
            );

            if self.mode == ExecutionMode::Execute {
                for sql in &statements {
                    match self.store.execute(sql) {
                        Ok(rows) => rows_affected += rows,
                        Err(e) => {
                            log_error!(op_ctx, "STATEMENT_FAILED", error = e.message);
                            return Err(ScrubError::Store(e));
                        }
                    }
                }
            }

            log_debug!(
                op_ctx,
                "OPERATION_DONE",
                statements = statements.len(),
                rows_affected = rows_affected
            );
            operations.push(OperationReport {
                label: op.label.clone(),
                statements,
                rows_affected,
            });
        }

        let total_statements: usize = operations.iter().map(|op| op.statements.len()).sum();
        let total_rows_affected: u64 = operations.iter().map(|op| op.rows_affected).sum();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        log_info!(
            log_ctx,
            "RUN_PHASE",
            phase = RunPhase::Done.as_str(),
            statements = total_statements,
            rows_affected = total_rows_affected,
            elapsed_ms = elapsed_ms
        );

        Ok(RunReport {
            run_id: self.ctx.run_id.clone(),
            started_at: self.ctx.started_at,
            dry_run: self.mode == ExecutionMode::DryRun,
            operations,
            total_statements,
            total_rows_affected,
            elapsed_ms,
        })
    }
}

/// Render one operation into its statements without touching the store.
pub fn render_operation(op: &ScrubOperation, ctx: &RunContext) -> Vec<String> {
    match &op.target {
        Target::Columns(target) => vec![render_columns(target, ctx)],
        Target::Meta(target) => render_meta(target, ctx),
    }
}

fn render_columns(target: &ColumnTarget, ctx: &RunContext) -> String {
    let policy = ctx.mask_policy();

    let assignments: Vec<(String, String)> = target
        .columns
        .iter()
        .map(|(column, rule)| {
            let expr = match rule {
                ColumnRule::IdentityLabel { id_column } => identity_label_sql(IDENTITY_LABEL, id_column),
                ColumnRule::Credential => quote_literal(&ctx.credential),
                ColumnRule::Classified => {
                    mask_expression(classify(column), column, &target.email_seed, &policy)
                }
                ColumnRule::Masked(class) => mask_expression(*class, column, &target.email_seed, &policy),
            };
            (column.clone(), expr)
        })
        .collect();

    let conditions: Vec<String> = target
        .filters
        .iter()
        .filter_map(|filter| match filter {
            Filter::NotEmpty(column) => Some(not_empty_condition(column)),
            Filter::Equals(column, value) => Some(equals_condition(column, value)),
            Filter::EmailNotProtected(column) => ctx
                .protected
                .as_ref()
                .map(|domain| email_not_protected_condition(column, domain)),
            Filter::OwnerNotProtected(column) => ctx
                .protected
                .as_ref()
                .map(|domain| owner_not_protected(column, ctx, domain)),
        })
        .collect();

    build_update(&target.table, &assignments, &conditions)
}

fn render_meta(target: &MetaTarget, ctx: &RunContext) -> Vec<String> {
    let policy = ctx.mask_policy();
    let meta = &target.meta;
    let seed = EmailSeed::KeyColumn {
        key_column: meta.key_column.to_string(),
        owner_column: meta.owner_column.to_string(),
    };

    let mut buckets: BTreeMap<FieldClass, Vec<String>> = BTreeMap::new();
    for key in &target.keys {
        buckets.entry(classify(key)).or_default().push(key.clone());
    }

    buckets
        .into_iter()
        .map(|(class, keys)| {
            let expr = mask_expression(class, meta.value_column, &seed, &policy);
            let mut conditions = vec![
                key_in_condition(meta.key_column, &keys),
                not_empty_condition(meta.value_column),
            ];
            if target.identity_aware {
                if let Some(domain) = ctx.protected.as_ref() {
                    conditions.push(owner_not_protected(meta.owner_column, ctx, domain));
                }
            }
            build_update(
                &target.table,
                &[(meta.value_column.to_string(), expr)],
                &conditions,
            )
        })
        .collect()
}

fn owner_not_protected(column: &str, ctx: &RunContext, domain: &ProtectedDomain) -> String {
    owner_not_protected_condition(
        column,
        &ctx.table(USERS_TABLE),
        USER_ID_COLUMN,
        USER_EMAIL_COLUMN,
        domain,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CustomTableSpec, ScrubConfig};
    use crate::logging::testing as captured_logs;
    use crate::pipeline::plan::{OperationKind, PlanBuilder};
    use crate::security::masking::UrlPolicy;
    use crate::storage::testing::MemoryStore;

    const CREDENTIAL: &str = "0123456789abcdef";

    fn config() -> ScrubConfig {
        ScrubConfig {
            protected_domain: Some("psycle".to_string()),
            extra_user_fields: vec!["billing_%".to_string(), "telephone".to_string()],
            ..ScrubConfig::default()
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::wordpress("wp_").with_values(
            "wp_usermeta",
            "meta_key",
            &["billing_email", "billing_phone", "billing_city"],
        )
    }

    fn build(store: &mut MemoryStore, ctx: &RunContext, config: &ScrubConfig) -> ScrubPlan {
        PlanBuilder::new(store, ctx).build(config).unwrap()
    }

    #[test]
    fn test_dry_run_matches_live_run() {
        let config = config();
        let ctx = RunContext::new(&config).with_credential(CREDENTIAL);

        let mut dry_store = store();
        let plan = build(&mut dry_store, &ctx, &config);
        let dry = Executor::new(&mut dry_store, &ctx, ExecutionMode::DryRun)
            .run(&plan)
            .unwrap();
        assert!(dry_store.executed.is_empty());

        let mut live_store = store();
        let plan = build(&mut live_store, &ctx, &config);
        let live = Executor::new(&mut live_store, &ctx, ExecutionMode::Execute)
            .run(&plan)
            .unwrap();

        let dry_text: Vec<&str> = dry.statements().collect();
        let live_text: Vec<&str> = live.statements().collect();
        assert_eq!(dry_text, live_text);
        assert_eq!(live_store.executed, dry_text);
        assert!(dry.dry_run);
        assert_eq!(live.total_rows_affected, live.total_statements as u64);
    }

    #[test]
    fn test_users_statement() {
        let config = config();
        let ctx = RunContext::new(&config).with_credential(CREDENTIAL);
        let mut store = store();
        let plan = build(&mut store, &ctx, &config);

        let sql = render_operation(&plan.operations[0], &ctx).remove(0);
        assert!(sql.starts_with("UPDATE `wp_users` SET\n\t`user_login` = CONCAT('user-', `ID`),"));
        assert!(sql.contains("`user_pass` = '0123456789abcdef'"));
        assert!(sql.contains("`user_url` = IF(`user_url` <> '', 'http://www.example.org/', `user_url`)"));
        assert!(sql.ends_with("WHERE `user_email` NOT LIKE '%@psycle%'"));
    }

    #[test]
    fn test_no_protected_domain_drops_exemptions() {
        let config = ScrubConfig::default();
        let ctx = RunContext::new(&config);
        let mut store = store();
        let plan = build(&mut store, &ctx, &config);

        for op in &plan.operations {
            for sql in render_operation(op, &ctx) {
                assert!(!sql.contains("NOT LIKE"), "{}", sql);
                assert!(!sql.contains("NOT IN"), "{}", sql);
            }
        }
    }

    #[test]
    fn test_meta_keys_split_by_class() {
        let config = config();
        let ctx = RunContext::new(&config);
        let mut store = store();
        let plan = build(&mut store, &ctx, &config);

        let statements = render_operation(&plan.operations[1], &ctx);
        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains("`meta_key` IN ( 'billing_email' )"));
        assert!(statements[0].contains("CONCAT(`meta_key`, '-', `user_id`)"));
        assert!(statements[1].contains("`meta_key` IN ( 'billing_phone', 'telephone' )"));
        assert!(statements[1].contains("'555-'"));
        assert!(statements[2].contains(
            "`meta_key` IN ( 'first_name', 'last_name', 'nickname', 'description', 'billing_city' )"
        ));
        for sql in &statements {
            assert!(sql.contains("AND `meta_value` <> ''"));
            assert!(sql.contains(
                "`user_id` NOT IN ( SELECT `ID` FROM `wp_users` WHERE `user_email` LIKE '%@psycle%' )"
            ));
        }
    }

    #[test]
    fn test_custom_table_renders_single_column() {
        let config = ScrubConfig {
            custom_tables: vec![CustomTableSpec {
                table: "audit".to_string(),
                columns: vec!["user_email".to_string(), "operation".to_string()],
            }],
            ..ScrubConfig::default()
        };
        let ctx = RunContext::new(&config);
        let mut store = MemoryStore::wordpress("wp_").with_table("wp_audit", &["user_email"]);
        let plan = build(&mut store, &ctx, &config);

        let op = plan.operations.last().unwrap();
        let statements = render_operation(op, &ctx);
        assert_eq!(statements.len(), 1);
        assert!(statements[0].starts_with("UPDATE `wp_audit` SET\n\t`user_email` = IF("));
        assert!(statements[0].contains("CONCAT('user_email-', LPAD("));
        assert!(!statements[0].contains("operation"));
        assert!(!statements[0].contains("WHERE"));
    }

    #[test]
    fn test_store_failure_aborts_run() {
        let config = config();
        let ctx = RunContext::new(&config);
        let mut store = store().failing_at(1, "Lock wait timeout exceeded");
        let plan = build(&mut store, &ctx, &config);

        let err = Executor::new(&mut store, &ctx, ExecutionMode::Execute)
            .run(&plan)
            .unwrap_err();
        assert_eq!(err.to_string(), "Lock wait timeout exceeded");
        assert_eq!(err.exit_code(), 1);
        assert_eq!(store.executed.len(), 1);
    }

    #[test]
    fn test_report_rendering() {
        let config = ScrubConfig::default();
        let ctx = RunContext::new(&config);
        let mut store = store();
        let plan = build(&mut store, &ctx, &config);
        let report = Executor::new(&mut store, &ctx, ExecutionMode::DryRun)
            .run(&plan)
            .unwrap();

        let text = report.render_text();
        assert!(text.starts_with("UPDATE `wp_users` SET"));
        assert!(text.contains(";\n\n"));
        assert!(text.contains("Dry run:"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["dry_run"], true);
        assert_eq!(json["total_statements"], report.total_statements);
    }

    fn rendered(plan: &ScrubPlan, ctx: &RunContext, kind: OperationKind) -> Vec<String> {
        plan.operations
            .iter()
            .filter(|op| op.kind == kind)
            .flat_map(|op| render_operation(op, ctx))
            .collect()
    }

    #[test]
    fn test_commenters_statement_skips_protected_authors() {
        let config = config();
        let ctx = RunContext::new(&config);
        let mut store = store();
        let plan = build(&mut store, &ctx, &config);

        let statements = rendered(&plan, &ctx, OperationKind::Commenters);
        assert_eq!(statements.len(), 1);
        let sql = &statements[0];
        assert!(sql.starts_with("UPDATE `wp_comments` SET\n\t`comment_author` = REPEAT("));
        assert!(sql.contains("CONCAT(CONCAT('user-', `user_id`), SUBSTRING(`comment_author_email`"));
        assert!(sql.contains("`comment_author_url` = IF(`comment_author_url` <> ''"));
        assert!(sql.contains("`comment_author_IP` = REPEAT('XXXXX ', FLOOR(CHAR_LENGTH(`comment_author_IP`) / 6))"));
        assert!(!sql.contains("comment_content"));
        assert!(sql.ends_with("WHERE `comment_author_email` NOT LIKE '%@psycle%'"));
    }

    #[test]
    fn test_buddypress_statement_skips_protected_owners() {
        let config = config();
        let ctx = RunContext::new(&config);
        let mut store = store().with_table("wp_bp_xprofile_data", &["user_id", "value"]);
        let plan = build(&mut store, &ctx, &config);

        let statements = rendered(&plan, &ctx, OperationKind::BuddyPressProfiles);
        assert_eq!(
            statements,
            vec![
                "UPDATE `wp_bp_xprofile_data` SET\n\
                 \t`value` = REPEAT('XXXXX ', FLOOR(CHAR_LENGTH(`value`) / 6))\n\
                 WHERE `value` <> ''\n\
                 \tAND `user_id` NOT IN ( SELECT `ID` FROM `wp_users` WHERE `user_email` LIKE '%@psycle%' )"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_woocommerce_order_note_statements() {
        let config = config();
        let ctx = RunContext::new(&config);
        let mut store = store().with_table("wp_woocommerce_order_items", &["order_item_id"]);
        let plan = build(&mut store, &ctx, &config);

        let statements = rendered(&plan, &ctx, OperationKind::WooCommerceOrders);
        assert_eq!(
            statements,
            vec![
                "UPDATE `wp_posts` SET\n\
                 \t`post_excerpt` = REPEAT('XXXXX ', FLOOR(CHAR_LENGTH(`post_excerpt`) / 6))\n\
                 WHERE `post_type` = 'shop_order'\n\
                 \tAND `post_excerpt` <> ''"
                    .to_string(),
                "UPDATE `wp_comments` SET\n\
                 \t`comment_content` = REPEAT('XXXXX ', FLOOR(CHAR_LENGTH(`comment_content`) / 6))\n\
                 WHERE `comment_type` = 'order_note'\n\
                 \tAND `comment_content` <> ''"
                    .to_string(),
            ]
        );

        // Order keys ride along in the post meta statements, unsanitized.
        let post_meta = rendered(&plan, &ctx, OperationKind::PostMeta).join("\n");
        assert!(post_meta.contains("'Payer PayPal address'"));
        assert!(post_meta.contains("'_billing_email'"));
        assert!(!post_meta.contains("NOT IN"));
    }

    #[test]
    fn test_always_url_policy_overwrites_unconditionally() {
        let config = ScrubConfig {
            url_policy: UrlPolicy::Always,
            ..config()
        };
        let ctx = RunContext::new(&config);
        let mut store = store();
        let plan = build(&mut store, &ctx, &config);

        let all: Vec<String> = plan
            .operations
            .iter()
            .flat_map(|op| render_operation(op, &ctx))
            .collect();
        let text = all.join("\n");
        assert!(text.contains("`user_url` = 'http://www.example.org/'"));
        assert!(text.contains("`comment_author_url` = 'http://www.example.org/'"));
        assert!(!text.contains("<> '', 'http://www.example.org/'"));
        // The rest of the plan is unaffected by the URL policy.
        assert!(text.contains("'555-'"));
        assert!(text.contains("WHERE `user_email` NOT LIKE '%@psycle%'"));
    }

    #[test]
    fn test_each_operation_is_logged_before_it_runs() {
        captured_logs::install();
        let config = config();
        let ctx = RunContext::new(&config);
        let mut store = store();
        let plan = build(&mut store, &ctx, &config);

        Executor::new(&mut store, &ctx, ExecutionMode::DryRun)
            .run(&plan)
            .unwrap();
        let lines = captured_logs::lines_containing(&ctx.run_id);
        for op in &plan.operations {
            let marker = format!("[op={}] OPERATION_START", op.label);
            assert!(
                lines.iter().any(|l| l.starts_with("INFO") && l.contains(&marker)),
                "no start line for {}",
                op.label
            );
        }

        // The failing operation is still announced.
        let ctx = RunContext::new(&config);
        let mut store = store.failing_at(0, "Access denied");
        assert!(Executor::new(&mut store, &ctx, ExecutionMode::Execute)
            .run(&plan)
            .is_err());
        let lines = captured_logs::lines_containing(&ctx.run_id);
        assert!(lines
            .iter()
            .any(|l| l.contains("[op=Users data] OPERATION_START")));
        assert!(lines.iter().all(|l| !l.contains("[op=Users meta data]")));
    }
}
