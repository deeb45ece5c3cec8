//! `aclsync apply` - make share ACLs match the config

use anyhow::{Result, bail};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{self, ExecuteOptions, ExecuteResult};
use crate::engine::executor::ShareOutcome;
use crate::engine::planner::PlanFailure;
use crate::state::AclState;
use crate::ui;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let config = super::load_config(ctx)?;
    let state_path = ctx.state_path()?;
    let mut state = AclState::load(&state_path)?;
    let shares = super::select_shares(&config, args.target.as_deref())?;

    let set = engine::plan_shares(&config, &shares, &state, args.jobs, ctx.quiet)?;
    let plan_failures = set.failures.clone();

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: args.jobs,
        yes: args.yes,
        refresh: args.refresh,
        quiet: ctx.quiet,
    };
    let result = engine::execute(set, &opts)?;

    if result.aborted {
        return Ok(());
    }

    if !args.dry_run {
        for outcome in &result.outcomes {
            record(&mut state, outcome);
        }
        for failure in &plan_failures {
            // Unrecorded shares stay unrecorded so the next run reads them first
            if let Some(share) = state.shares.get_mut(&failure.id) {
                share.last_error = Some(failure.error.clone());
            }
        }
        state.touch(&state_path)?;
    }

    let failed = failed_shares(&result, &plan_failures);
    if failed > 0 {
        for outcome in result.failed() {
            if let Some(error) = &outcome.report.error {
                ui::error(&format!("{}: {}", outcome.id, error));
            }
        }
        bail!("{} did not converge", ui::plural(failed, "share"));
    }
    Ok(())
}

/// Shares that failed to plan or whose cycle did not succeed
///
/// A dry run still fails shares whose desired ACL is invalid.
fn failed_shares(result: &ExecuteResult, plan_failures: &[PlanFailure]) -> usize {
    result.failed().count() + plan_failures.len()
}

/// Record one share's cycle in the state
fn record(state: &mut AclState, outcome: &ShareOutcome) {
    let report = &outcome.report;
    match &report.error {
        None => state.mark_applied(&outcome.id, report.applied.clone()),
        Some(error) => {
            log::warn!("{}: cycle ended {}: {error}", outcome.id, report.phase);
            state.mark_failed(&outcome.id, report.applied.clone(), &error.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{default_entry, AclEntry, AclType, Permission};
    use declarative::{
        ApplyError, Collection, CycleReport, CyclePhase, Entry, ExecuteSummary, GatewayError,
        OperationKind, ReconcileError, ReconciliationPlan,
    };

    fn outcome(applied: Collection<AclEntry>, error: Option<ApplyError>) -> ShareOutcome {
        ShareOutcome {
            id: "svm1/eng".into(),
            report: CycleReport {
                phase: if error.is_none() {
                    CyclePhase::Succeeded
                } else {
                    CyclePhase::PartiallyFailed
                },
                plan: ReconciliationPlan::new(),
                applied,
                summary: ExecuteSummary::default(),
                error,
                refresh_error: None,
            },
        }
    }

    #[test]
    fn test_record_success_clears_error() {
        let mut state = AclState::default();
        state.mark_failed("svm1/eng", Collection::new(), "earlier failure");

        let admins = AclEntry::new("BUILTIN\\Administrators", AclType::Windows, Permission::Read);
        record(&mut state, &outcome(Collection::from_entries([admins]), None));

        let share = state.share("svm1/eng").unwrap();
        assert!(share.last_error.is_none());
        assert!(share.last_applied.is_some());
        assert_eq!(share.acls.len(), 1);
    }

    #[test]
    fn test_record_failure_keeps_partial_applied() {
        let mut state = AclState::default();
        let error = ApplyError::Operation {
            kind: OperationKind::Create,
            key: "staff (unix_group)".into(),
            source: GatewayError::rejected("invalid user"),
        };
        record(
            &mut state,
            &outcome(Collection::from_entries([default_entry()]), Some(error)),
        );

        let share = state.share("svm1/eng").unwrap();
        assert!(share.last_applied.is_none());
        assert!(share.last_error.as_deref().unwrap().contains("staff (unix_group)"));
        assert!(share.acls.contains_key(&default_entry().key()));
    }

    #[test]
    fn test_dry_run_with_invalid_desired_counts_as_failed() {
        let duplicate = ApplyError::from(ReconcileError::DuplicateKey {
            key: "Everyone (windows)".into(),
        });
        let result = ExecuteResult {
            outcomes: vec![outcome(Collection::new(), Some(duplicate))],
            ..Default::default()
        };
        assert_eq!(failed_shares(&result, &[]), 1);
    }

    #[test]
    fn test_plan_failures_count_as_failed() {
        let result = ExecuteResult {
            outcomes: vec![outcome(Collection::new(), None)],
            ..Default::default()
        };
        assert_eq!(failed_shares(&result, &[]), 0);

        let failures = [PlanFailure {
            id: "svm1/ops".into(),
            error: "Connection 'lab': password variable not set".into(),
        }];
        assert_eq!(failed_shares(&result, &failures), 1);
    }
}
