//! Reconciliation plan - the ordered operations one apply cycle performs

use crate::entry::Entry;
use crate::error::OperationKind;

/// Why a delete is in the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteReason {
    /// The entry was applied before and is no longer declared
    Removed,
    /// The remote injected a default entry the user never declared
    SuppressDefault,
}

/// One remote mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Operation<E: Entry> {
    /// Create a sub-resource that is declared but not applied
    Create(E),
    /// Replace the attributes of an applied sub-resource
    Update {
        key: E::Key,
        /// Applied attributes, kept for display
        from: E::Attributes,
        /// Full desired attribute set
        to: E::Attributes,
    },
    /// Remove an applied sub-resource
    Delete { key: E::Key, reason: DeleteReason },
}

impl<E: Entry> Operation<E> {
    /// Key this operation addresses
    pub fn key(&self) -> E::Key {
        match self {
            Self::Create(entry) => entry.key(),
            Self::Update { key, .. } | Self::Delete { key, .. } => key.clone(),
        }
    }

    /// Kind of this operation
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Create(_) => OperationKind::Create,
            Self::Update { .. } => OperationKind::Update,
            Self::Delete { .. } => OperationKind::Delete,
        }
    }

    /// Human-readable description
    pub fn description(&self) -> String {
        match self {
            Self::Create(entry) => format!("create {} ({:?})", entry.key(), entry.attributes()),
            Self::Update { key, from, to } => format!("update {key} ({from:?} → {to:?})"),
            Self::Delete {
                key,
                reason: DeleteReason::Removed,
            } => format!("delete {key}"),
            Self::Delete {
                key,
                reason: DeleteReason::SuppressDefault,
            } => format!("delete {key} (remote default)"),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Delete { .. } => 0,
            Self::Update { .. } => 1,
            Self::Create(_) => 2,
        }
    }
}

/// Ordered operations for one reconciliation cycle
///
/// Operations are kept in execution order: deletes, then updates, then
/// creates, each group sorted by key. Keys never repeat across the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationPlan<E: Entry> {
    operations: Vec<Operation<E>>,
}

impl<E: Entry> ReconciliationPlan<E> {
    /// Create an empty plan
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    /// Build a plan from operations in any order
    pub fn from_operations(mut operations: Vec<Operation<E>>) -> Self {
        operations.sort_by(|a, b| a.rank().cmp(&b.rank()).then_with(|| a.key().cmp(&b.key())));
        Self { operations }
    }

    /// Operations in execution order
    pub fn operations(&self) -> &[Operation<E>] {
        &self.operations
    }

    /// Delete operations
    pub fn deletes(&self) -> impl Iterator<Item = &Operation<E>> {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Delete { .. }))
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if the plan has nothing to do
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Summary counts for display
    pub fn summary(&self) -> PlanSummary {
        PlanSummary::from_operations(&self.operations)
    }
}

impl<E: Entry> Default for ReconciliationPlan<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entry> IntoIterator for ReconciliationPlan<E> {
    type Item = Operation<E>;
    type IntoIter = std::vec::IntoIter<Operation<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.into_iter()
    }
}

/// Plan summary statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    /// Entries to create
    pub creates: usize,
    /// Entries to update
    pub updates: usize,
    /// Declared removals
    pub removals: usize,
    /// Remote defaults to suppress
    pub suppressed_defaults: usize,
}

impl PlanSummary {
    fn from_operations<E: Entry>(operations: &[Operation<E>]) -> Self {
        let mut summary = Self::default();
        for op in operations {
            match op {
                Operation::Create(_) => summary.creates += 1,
                Operation::Update { .. } => summary.updates += 1,
                Operation::Delete {
                    reason: DeleteReason::Removed,
                    ..
                } => summary.removals += 1,
                Operation::Delete {
                    reason: DeleteReason::SuppressDefault,
                    ..
                } => summary.suppressed_defaults += 1,
            }
        }
        summary
    }

    /// Total number of operations
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.removals + self.suppressed_defaults
    }

    /// Number of operations that reflect configuration drift
    ///
    /// Suppressing a remote default is housekeeping, not drift.
    pub fn drift(&self) -> usize {
        self.creates + self.updates + self.removals
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &PlanSummary) {
        self.creates += other.creates;
        self.updates += other.updates;
        self.removals += other.removals;
        self.suppressed_defaults += other.suppressed_defaults;
    }
}
