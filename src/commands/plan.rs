//! `aclsync plan` - preview the changes apply would make

use anyhow::{Result, bail};

use crate::Context;
use crate::engine::{self, PlanSet, differ};
use crate::ui;

/// Number of shares read in parallel while planning
const PLAN_JOBS: usize = 4;

pub fn run(ctx: &Context, target: Option<&str>) -> Result<()> {
    let config = super::load_config(ctx)?;
    let state = super::load_state(ctx)?;
    let shares = super::select_shares(&config, target)?;

    let set = engine::plan_shares(&config, &shares, &state, PLAN_JOBS, ctx.quiet)?;
    differ::display_plans(&set);

    if set.operations() > 0 && !ctx.quiet {
        println!();
        ui::dim("Run 'aclsync apply' to make these changes");
    }
    ensure_planned(&set)
}

/// Fail when any selected share has no usable plan
fn ensure_planned(set: &PlanSet) -> Result<()> {
    if set.has_errors() {
        bail!(
            "{} could not be planned",
            ui::plural(set.failures.len() + set.invalid(), "share")
        );
    }
    Ok(())
}
