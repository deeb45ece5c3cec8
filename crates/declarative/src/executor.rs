//! Apply driver - executes reconciliation plans against a gateway

use crate::context::{NoProgress, ProgressCallback, SubResourceGateway};
use crate::diff::reconcile;
use crate::entry::{Collection, Entry};
use crate::error::{ApplyError, GatewayError};
use crate::planner::{DeleteReason, Operation, ReconciliationPlan};
use crate::policy::DefaultEntryPolicy;
use crate::types::{ApplyResult, CyclePhase, ExecuteOptions, ExecuteSummary};

/// Outcome of executing one plan
#[derive(Debug, Clone)]
pub struct ApplyOutcome<E: Entry> {
    /// Collection reflecting every operation that succeeded
    pub applied: Collection<E>,
    /// Per-kind counts
    pub summary: ExecuteSummary,
    /// The fatal error that stopped execution, if any
    pub error: Option<ApplyError>,
}

impl<E: Entry> ApplyOutcome<E> {
    /// Check if every operation succeeded
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Execute a plan against a gateway
///
/// Operations run sequentially in plan order (deletes, updates, creates).
/// A delete answered with not-found counts as done. Any other failure stops
/// the pass: the remaining operations are reported as skipped and `applied`
/// reflects only the operations that completed, so the next cycle computes a
/// smaller diff instead of repeating finished work.
///
/// # Arguments
/// * `plan` - The plan to run
/// * `gateway` - Remote operations for the parent resource
/// * `applied` - The collection the plan was computed against
/// * `progress` - Progress callback
pub fn apply<E, G, P>(
    plan: &ReconciliationPlan<E>,
    gateway: &G,
    applied: Collection<E>,
    progress: &mut P,
) -> ApplyOutcome<E>
where
    E: Entry,
    G: SubResourceGateway<E> + ?Sized,
    P: ProgressCallback,
{
    let mut applied = applied;
    let mut summary = ExecuteSummary::default();
    let mut error = None;

    if plan.is_empty() {
        return ApplyOutcome {
            applied,
            summary,
            error,
        };
    }

    progress.on_cycle_start(plan.len());

    for op in plan.operations() {
        let description = op.description();

        if error.is_some() {
            let result = ApplyResult::Skipped {
                reason: "an earlier operation failed".into(),
            };
            progress.on_operation_complete(&description, &result);
            summary.add_result(&result);
            continue;
        }

        progress.on_operation_start(&description);
        let result = match apply_operation(op, gateway, &mut applied) {
            Ok(result) => result,
            Err(source) => {
                let result = ApplyResult::Failed {
                    error: source.to_string(),
                };
                error = Some(ApplyError::Operation {
                    kind: op.kind(),
                    key: op.key().to_string(),
                    source,
                });
                result
            }
        };
        progress.on_operation_complete(&description, &result);
        summary.add_result(&result);
    }

    progress.on_cycle_complete();

    ApplyOutcome {
        applied,
        summary,
        error,
    }
}

/// Run one operation and record its effect in `applied`
fn apply_operation<E, G>(
    op: &Operation<E>,
    gateway: &G,
    applied: &mut Collection<E>,
) -> Result<ApplyResult, GatewayError>
where
    E: Entry,
    G: SubResourceGateway<E> + ?Sized,
{
    match op {
        Operation::Delete { key, reason } => {
            let result = match gateway.delete(key) {
                Ok(()) => match reason {
                    DeleteReason::Removed => ApplyResult::Removed,
                    DeleteReason::SuppressDefault => ApplyResult::DefaultSuppressed,
                },
                Err(e) if e.is_not_found() => {
                    log::debug!("{key} already absent: {e}");
                    ApplyResult::AlreadyAbsent
                }
                Err(e) => return Err(e),
            };
            applied.remove(key);
            Ok(result)
        }
        Operation::Update { key, to, .. } => {
            gateway.update(key, to)?;
            applied.upsert(E::from_parts(key.clone(), to.clone()));
            Ok(ApplyResult::Modified)
        }
        Operation::Create(entry) => {
            let canonical = gateway.create(entry)?;
            let recorded = if canonical.key() == entry.key() {
                canonical
            } else {
                // The request names the sub-resource; keep its key
                log::warn!(
                    "Remote returned {} for created {}, recording {}",
                    canonical.key(),
                    entry.key(),
                    entry.key()
                );
                E::from_parts(entry.key(), canonical.attributes())
            };
            applied.upsert(recorded);
            Ok(ApplyResult::Created)
        }
    }
}

/// Report of one full reconciliation cycle
#[derive(Debug, Clone)]
pub struct CycleReport<E: Entry> {
    /// Terminal phase
    pub phase: CyclePhase,
    /// The plan that was computed (empty if diffing failed)
    pub plan: ReconciliationPlan<E>,
    /// Collection to record for the next cycle
    pub applied: Collection<E>,
    /// Per-kind counts
    pub summary: ExecuteSummary,
    /// The fatal error that ended the cycle, if any
    pub error: Option<ApplyError>,
    /// Failure to re-read the remote after execution
    ///
    /// Not fatal: `applied` then holds the driver's own bookkeeping.
    pub refresh_error: Option<GatewayError>,
}

impl<E: Entry> CycleReport<E> {
    /// Check if the cycle succeeded
    pub fn is_success(&self) -> bool {
        self.phase == CyclePhase::Succeeded
    }
}

/// Drives reconciliation cycles for one parent resource
///
/// Owns the applied collection's lifecycle for the duration of a cycle:
/// reads it in, diffs, executes, and hands back what should be recorded.
pub struct ApplyDriver<'g, E: Entry, G: ?Sized> {
    gateway: &'g G,
    policy: DefaultEntryPolicy<E>,
    options: ExecuteOptions,
    phase: CyclePhase,
}

impl<'g, E, G> ApplyDriver<'g, E, G>
where
    E: Entry,
    G: SubResourceGateway<E> + ?Sized,
{
    /// Create a driver for the given gateway and default-entry policy
    pub fn new(gateway: &'g G, policy: DefaultEntryPolicy<E>) -> Self {
        Self {
            gateway,
            policy,
            options: ExecuteOptions::default(),
            phase: CyclePhase::Start,
        }
    }

    /// Set execution options
    pub fn with_options(mut self, options: ExecuteOptions) -> Self {
        self.options = options;
        self
    }

    /// Current phase of the last (or running) cycle
    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    /// Run one cycle without progress reporting
    pub fn run(&mut self, desired: &Collection<E>, applied: Collection<E>) -> CycleReport<E> {
        self.run_with_progress(desired, applied, &mut NoProgress)
    }

    /// Run one cycle: diff, execute, optionally refresh
    pub fn run_with_progress<P: ProgressCallback>(
        &mut self,
        desired: &Collection<E>,
        applied: Collection<E>,
        progress: &mut P,
    ) -> CycleReport<E> {
        self.transition(CyclePhase::Start);
        self.transition(CyclePhase::Diffing);

        let plan = match reconcile(desired, &applied, &self.policy) {
            Ok(plan) => plan,
            Err(e) => {
                log::error!("Reconciliation failed: {e}");
                self.transition(CyclePhase::PartiallyFailed);
                return CycleReport {
                    phase: self.phase,
                    plan: ReconciliationPlan::new(),
                    applied,
                    summary: ExecuteSummary::default(),
                    error: Some(e.into()),
                    refresh_error: None,
                };
            }
        };

        if self.options.dry_run {
            log::info!("Dry run: {} operations planned, none executed", plan.len());
            self.transition(CyclePhase::Succeeded);
            return CycleReport {
                phase: self.phase,
                summary: ExecuteSummary {
                    skipped: plan.len(),
                    ..Default::default()
                },
                plan,
                applied,
                error: None,
                refresh_error: None,
            };
        }

        self.transition(CyclePhase::Executing);
        let outcome = apply(&plan, self.gateway, applied, progress);

        let (applied, refresh_error) = if self.options.refresh {
            self.refresh(outcome.applied)
        } else {
            (outcome.applied, None)
        };

        self.transition(if outcome.error.is_none() {
            CyclePhase::Succeeded
        } else {
            CyclePhase::PartiallyFailed
        });

        CycleReport {
            phase: self.phase,
            plan,
            applied,
            summary: outcome.summary,
            error: outcome.error,
            refresh_error,
        }
    }

    /// Replace bookkeeping with the remote's canonical collection when possible
    fn refresh(&self, bookkeeping: Collection<E>) -> (Collection<E>, Option<GatewayError>) {
        match self.gateway.list() {
            Ok(Some(remote)) => {
                if !remote.same_as(&bookkeeping) {
                    log::info!(
                        "Remote holds {} entries after apply, bookkeeping expected {}",
                        remote.len(),
                        bookkeeping.len()
                    );
                }
                (remote, None)
            }
            Ok(None) => (bookkeeping, None),
            Err(e) => {
                log::warn!("Could not re-read remote collection: {e}");
                (bookkeeping, Some(e))
            }
        }
    }

    fn transition(&mut self, next: CyclePhase) {
        log::debug!("Cycle phase {} -> {}", self.phase, next);
        self.phase = next;
    }
}
