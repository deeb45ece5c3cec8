//! # Declarative
//!
//! Declarative reconciliation of keyed sub-resource collections.
//!
//! Some remote APIs expose a set-valued attribute (the grants in a share's
//! ACL, the rules in a policy) as individually addressed objects: one call to
//! add a member, one to change it, one to remove it. This crate lets callers
//! declare the whole set and converges the remote side with the fewest calls.
//!
//! ## Core Concepts
//!
//! - **Entry**: one keyed member of a collection, plus mutable attributes
//! - **Collection**: an unordered set of entries, unique by key
//! - **DefaultEntryPolicy**: names the entry a remote injects on its own
//! - **reconcile**: key-indexed diff of desired vs. applied into a plan
//! - **ApplyDriver**: executes a plan through a gateway, tracking what stuck
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ApplyDriver, Collection, DefaultEntryPolicy};
//!
//! let desired = Collection::from_entries(share.acls);
//! let applied = state.applied(&share.id()).unwrap_or_default();
//!
//! let mut driver = ApplyDriver::new(&gateway, DefaultEntryPolicy::new(everyone));
//! let report = driver.run(&desired, applied);
//!
//! match report.error {
//!     None => state.mark_applied(&share.id(), report.applied),
//!     Some(err) => state.mark_failed(&share.id(), report.applied, &err.to_string()),
//! }
//! ```
//!
//! ## Provider Traits
//!
//! - [`SubResourceGateway`]: create/update/delete (and optionally list) one
//!   entry on the remote side
//! - [`ProgressCallback`]: receives progress updates
//!
//! The crate performs no I/O of its own; transport, authentication and job
//! polling live behind the gateway.

pub mod context;
pub mod diff;
pub mod entry;
pub mod error;
pub mod executor;
pub mod planner;
pub mod policy;
pub mod types;

// Re-export main types at crate root
pub use context::{NoProgress, ProgressCallback, SubResourceGateway};
pub use diff::reconcile;
pub use entry::{Collection, Entry};
pub use error::{
    ApplyError, ErrorCategory, GatewayError, GatewayResult, OperationKind, ReconcileError,
};
pub use executor::{apply, ApplyDriver, ApplyOutcome, CycleReport};
pub use planner::{DeleteReason, Operation, PlanSummary, ReconciliationPlan};
pub use policy::DefaultEntryPolicy;
pub use types::{ApplyResult, CyclePhase, ExecuteOptions, ExecuteSummary};
