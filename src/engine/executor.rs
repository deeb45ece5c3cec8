//! Execution engine - runs share plans with UI integration

use anyhow::Result;
use colored::Colorize;
use declarative::{ApplyDriver, ApplyResult, CycleReport, ExecuteSummary, ProgressCallback};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::sync::{Arc, Mutex};

use super::differ::display_plans;
use super::planner::{PlanSet, SharePlan};
use crate::acl::{share_policy, AclEntry};
use crate::progress;
use crate::ui;

/// Options for execution (includes `yes` for confirmation skip)
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of shares applied in parallel
    pub jobs: usize,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Re-read each share's ACL after applying
    pub refresh: bool,
    /// Hide progress bars
    pub quiet: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            yes: false,
            refresh: false,
            quiet: false,
        }
    }
}

/// Result of one share's cycle
pub struct ShareOutcome {
    pub id: String,
    pub report: CycleReport<AclEntry>,
}

/// What an apply run did
#[derive(Default)]
pub struct ExecuteResult {
    pub outcomes: Vec<ShareOutcome>,
    pub summary: ExecuteSummary,
    /// The user declined the prompt
    pub aborted: bool,
}

impl ExecuteResult {
    /// Shares whose cycle stopped at a fatal error
    pub fn failed(&self) -> impl Iterator<Item = &ShareOutcome> {
        self.outcomes.iter().filter(|o| !o.report.is_success())
    }
}

/// Execute the plans with aclsync's UI integration
pub fn execute(set: PlanSet, opts: &ExecuteOptions) -> Result<ExecuteResult> {
    // 1. Display what will change
    display_plans(&set);

    if set.operations() == 0 || opts.dry_run {
        if opts.dry_run {
            println!();
            println!("  {} Dry run - no changes made", "ℹ".blue());
        }
        // Shares with a DuplicateKey still need their cycle reported
        let outcomes = run_shares(set.shares, opts)?;
        return Ok(ExecuteResult {
            summary: summarize(&outcomes),
            outcomes,
            aborted: false,
        });
    }

    // 2. Confirm (unless --yes)
    if !opts.yes && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(ExecuteResult {
            summary: ExecuteSummary {
                skipped: set.operations(),
                ..Default::default()
            },
            aborted: true,
            ..Default::default()
        });
    }

    // 3. Execute shares in parallel, each one sequentially
    println!();
    println!(
        "  {} Applying {} across {}...",
        "→".cyan(),
        ui::plural(set.operations(), "change"),
        ui::plural(set.shares.len(), "share")
    );

    let outcomes = run_shares(set.shares, opts)?;
    let summary = summarize(&outcomes);

    // 4. Summary
    print_summary(&outcomes, &summary);

    Ok(ExecuteResult {
        outcomes,
        summary,
        aborted: false,
    })
}

/// Run one cycle per share on a bounded pool
fn run_shares(shares: Vec<SharePlan>, opts: &ExecuteOptions) -> Result<Vec<ShareOutcome>> {
    let total: usize = shares.iter().map(SharePlan::operations).sum();
    let quiet = opts.quiet || opts.dry_run || total == 0;
    let pb = progress::bar(total as u64, "Applying", quiet);
    let results: Arc<Mutex<Vec<ShareOutcome>>> = Arc::new(Mutex::new(Vec::new()));

    let pool = super::thread_pool(opts.jobs)?;
    let driver_options = declarative::ExecuteOptions {
        dry_run: opts.dry_run,
        refresh: opts.refresh,
    };

    pool.install(|| {
        shares.into_par_iter().for_each(|share| {
            let mut bar = BarProgress {
                pb: &pb,
                share: &share.id,
            };
            let mut driver =
                ApplyDriver::new(&share.gateway, share_policy()).with_options(driver_options.clone());
            let report = driver.run_with_progress(&share.desired, share.baseline, &mut bar);

            push_outcome(
                &results,
                ShareOutcome {
                    id: share.id,
                    report,
                },
            );
        });
    });

    pb.finish_and_clear();

    let mut outcomes = into_outcomes(results)?;
    outcomes.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(outcomes)
}

/// Forwards driver progress to the shared bar
struct BarProgress<'a> {
    pb: &'a ProgressBar,
    share: &'a str,
}

impl ProgressCallback for BarProgress<'_> {
    fn on_cycle_start(&mut self, operations: usize) {
        log::info!("{}: applying {operations} operations", self.share);
    }

    fn on_operation_start(&mut self, description: &str) {
        self.pb.set_message(format!("{} {}", self.share, description));
    }

    fn on_operation_complete(&mut self, description: &str, result: &ApplyResult) {
        let symbol = match result {
            ApplyResult::Created | ApplyResult::Modified | ApplyResult::Removed => "✓".green(),
            ApplyResult::AlreadyAbsent | ApplyResult::DefaultSuppressed => "○".dimmed(),
            ApplyResult::Failed { .. } => "✗".red(),
            ApplyResult::Skipped { .. } => "⊘".yellow(),
        };

        if let ApplyResult::Failed { error } = result {
            self.pb
                .suspend(|| println!("  {symbol} {}: {description}: {error}", self.share));
        } else {
            log::debug!("{}: {description}: {result:?}", self.share);
        }
        self.pb.inc(1);
    }

    fn on_cycle_complete(&mut self) {}
}

fn push_outcome(results: &Arc<Mutex<Vec<ShareOutcome>>>, outcome: ShareOutcome) {
    match results.lock() {
        Ok(mut locked) => locked.push(outcome),
        Err(poisoned) => poisoned.into_inner().push(outcome),
    }
}

fn into_outcomes(results: Arc<Mutex<Vec<ShareOutcome>>>) -> Result<Vec<ShareOutcome>> {
    let mutex = Arc::try_unwrap(results)
        .map_err(|_| anyhow::anyhow!("Failed to collect apply results: shared result state"))?;

    match mutex.into_inner() {
        Ok(collected) => Ok(collected),
        Err(poisoned) => Ok(poisoned.into_inner()),
    }
}

/// Merge every share's counts
fn summarize(outcomes: &[ShareOutcome]) -> ExecuteSummary {
    let mut summary = ExecuteSummary::default();
    for outcome in outcomes {
        summary.merge(&outcome.report.summary);
    }
    summary
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(false)
        .interact()?;

    Ok(confirmed)
}

/// Print final summary
fn print_summary(outcomes: &[ShareOutcome], summary: &ExecuteSummary) {
    println!();
    let failed: Vec<_> = outcomes.iter().filter(|o| !o.report.is_success()).collect();
    if failed.is_empty() {
        println!("  {} Share ACLs applied successfully!", "✓".green().bold());
    } else {
        println!("  {} Share ACLs applied with errors", "⚠".yellow().bold());
    }

    if summary.created > 0 {
        println!("    • {} created", ui::plural(summary.created, "entry"));
    }
    if summary.modified > 0 {
        println!("    • {} modified", ui::plural(summary.modified, "entry"));
    }
    if summary.removed > 0 {
        println!("    • {} removed", ui::plural(summary.removed, "entry"));
    }
    if summary.suppressed_defaults > 0 {
        println!(
            "    • {} suppressed",
            ui::plural(summary.suppressed_defaults, "remote default")
        );
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", ui::plural(summary.skipped, "operation"));
    }

    for outcome in failed {
        if let Some(error) = &outcome.report.error {
            println!("    • {} {}: {}", "failed".red(), outcome.id, error);
            if let Some(category) = error.category() {
                println!("      {}", category.advice().dimmed());
            }
        }
    }

    for outcome in outcomes {
        if let Some(error) = &outcome.report.refresh_error {
            println!(
                "    • {} {}: could not re-read ACL: {}",
                "⚠".yellow(),
                outcome.id,
                error
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{into_outcomes, push_outcome, summarize, ShareOutcome};
    use declarative::{
        Collection, CycleReport, CyclePhase, ExecuteSummary, ReconciliationPlan,
    };
    use std::sync::{Arc, Mutex};

    fn outcome(id: &str, phase: CyclePhase, created: usize) -> ShareOutcome {
        ShareOutcome {
            id: id.to_string(),
            report: CycleReport {
                phase,
                plan: ReconciliationPlan::new(),
                applied: Collection::new(),
                summary: ExecuteSummary {
                    created,
                    ..Default::default()
                },
                error: None,
                refresh_error: None,
            },
        }
    }

    #[test]
    fn test_summarize_merges_shares() {
        let outcomes = vec![
            outcome("svm1/eng", CyclePhase::Succeeded, 2),
            outcome("svm1/ops", CyclePhase::PartiallyFailed, 1),
        ];
        let summary = summarize(&outcomes);
        assert_eq!(summary.created, 3);
    }

    #[test]
    fn push_outcome_handles_poisoned_mutex() {
        let results: Arc<Mutex<Vec<ShareOutcome>>> = Arc::new(Mutex::new(Vec::new()));
        let poisoned = Arc::clone(&results);

        let _ = std::thread::spawn(move || {
            let _guard = poisoned
                .lock()
                .expect("lock should succeed before poisoning");
            panic!("intentional poison");
        })
        .join();

        push_outcome(&results, outcome("svm1/eng", CyclePhase::Succeeded, 0));

        let collected = into_outcomes(results).expect("poisoned mutex should be recovered");
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].id, "svm1/eng");
    }
}
