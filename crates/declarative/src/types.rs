//! Core types for apply cycles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of one apply cycle
///
/// `Start → Diffing → Executing → {Succeeded | PartiallyFailed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CyclePhase {
    Start,
    Diffing,
    Executing,
    /// Every operation succeeded
    Succeeded,
    /// The cycle stopped at a fatal error; earlier operations are kept
    PartiallyFailed,
}

impl CyclePhase {
    /// Check if the cycle has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::PartiallyFailed)
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Diffing => "diffing",
            Self::Executing => "executing",
            Self::Succeeded => "succeeded",
            Self::PartiallyFailed => "partially failed",
        };
        f.write_str(name)
    }
}

/// Result of a single plan operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// Entry was created
    Created,
    /// Entry attributes were replaced
    Modified,
    /// Entry was removed
    Removed,
    /// Entry was already absent on delete
    AlreadyAbsent,
    /// Remote default entry was removed
    DefaultSuppressed,
    /// Operation failed
    Failed { error: String },
    /// Operation was not attempted
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub suppressed_defaults: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed + self.suppressed_defaults
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of operations processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.removed += other.removed;
        self.suppressed_defaults += other.suppressed_defaults;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed | ApplyResult::AlreadyAbsent => self.removed += 1,
            ApplyResult::DefaultSuppressed => self.suppressed_defaults += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for an apply cycle
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Compute the plan without calling the gateway
    pub dry_run: bool,
    /// Re-read the remote collection after execution
    pub refresh: bool,
}
