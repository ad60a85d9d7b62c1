//! Scrub run orchestration.
//!
//! Coordinates one run:
//! 1. Protected-target guard
//! 2. Plan assembly (read-only lookups)
//! 3. Confirmation guard
//! 4. Execution or dry-run preview

use crate::config::ScrubConfig;
use crate::error::Result;
use crate::log_info;
use crate::storage::store::Store;

use super::context::{RunContext, RunPhase};
use super::executor::{ExecutionMode, Executor, RunReport};
use super::guard::{check_confirmed, check_target};
use super::plan::{PlanBuilder, ScrubPlan};

/// Run a whole scrub with a fresh context.
pub fn scrub<S: Store>(store: &mut S, config: &ScrubConfig) -> Result<RunReport> {
    let ctx = RunContext::new(config);
    scrub_with_context(store, config, &ctx)
}

/// Run a whole scrub. `config.confirmed` stands in for the operator prompt.
pub fn scrub_with_context<S: Store>(store: &mut S, config: &ScrubConfig, ctx: &RunContext) -> Result<RunReport> {
    let plan = prepare(store, config, ctx)?;
    execute(store, config, ctx, &plan)
}

/// [1]-[2]: refuse a protected target, then build the plan.
pub fn prepare<S: Store>(store: &mut S, config: &ScrubConfig, ctx: &RunContext) -> Result<ScrubPlan> {
    let log_ctx = ctx.log_context();
    log_info!(
        log_ctx,
        "RUN_PHASE",
        phase = RunPhase::Idle.as_str(),
        prefix = ctx.table_prefix,
        dry_run = config.dry_run
    );

    check_target(config)?;
    let plan = PlanBuilder::new(store, ctx).build(config)?;

    log_info!(
        log_ctx,
        "RUN_PHASE",
        phase = RunPhase::PlanBuilt.as_str(),
        operations = plan.operations.len()
    );
    Ok(plan)
}

/// [3]-[4]: refuse an unconfirmed real run, then run or preview the plan.
pub fn execute<S: Store>(
    store: &mut S,
    config: &ScrubConfig,
    ctx: &RunContext,
    plan: &ScrubPlan,
) -> Result<RunReport> {
    check_confirmed(config)?;

    let mode = if config.dry_run {
        ExecutionMode::DryRun
    } else {
        ExecutionMode::Execute
    };
    Executor::new(store, ctx, mode).run(plan)
}
