//! Set reconciliation - key-indexed three-way diff
//!
//! Compares the desired collection against the applied one and produces the
//! minimal [`ReconciliationPlan`] that converges the remote side. Remote
//! defaults are classified through the [`DefaultEntryPolicy`].

use crate::entry::{Collection, Entry};
use crate::error::ReconcileError;
use crate::planner::{DeleteReason, Operation, ReconciliationPlan};
use crate::policy::DefaultEntryPolicy;
use std::collections::BTreeMap;

/// Compute the plan that turns `applied` into `desired`
///
/// Pure and total apart from [`ReconcileError::DuplicateKey`], which is
/// returned when two desired entries share a key. Keys present in both
/// collections with equal attributes produce nothing, so reconciling a
/// collection against itself yields an empty plan.
pub fn reconcile<E: Entry>(
    desired: &Collection<E>,
    applied: &Collection<E>,
    policy: &DefaultEntryPolicy<E>,
) -> Result<ReconciliationPlan<E>, ReconcileError> {
    let desired = index_desired(desired)?;
    let applied = index_applied(applied);

    let mut operations = Vec::new();

    for (key, current) in &applied {
        match desired.get(key) {
            None => {
                let reason = if policy.suppresses(current, false) {
                    log::debug!("Remote default {key} is not declared, suppressing");
                    DeleteReason::SuppressDefault
                } else {
                    DeleteReason::Removed
                };
                operations.push(Operation::Delete {
                    key: key.clone(),
                    reason,
                });
            }
            Some(wanted) if !current.attributes_equal(wanted) => {
                operations.push(Operation::Update {
                    key: key.clone(),
                    from: current.attributes(),
                    to: wanted.attributes(),
                });
            }
            Some(_) => {}
        }
    }

    for (key, wanted) in &desired {
        if !applied.contains_key(key) {
            operations.push(Operation::Create((*wanted).clone()));
        }
    }

    Ok(ReconciliationPlan::from_operations(operations))
}

/// Index the desired collection, rejecting repeated keys
fn index_desired<E: Entry>(
    desired: &Collection<E>,
) -> Result<BTreeMap<E::Key, &E>, ReconcileError> {
    let mut map = BTreeMap::new();
    for entry in desired {
        let key = entry.key();
        if map.contains_key(&key) {
            return Err(ReconcileError::DuplicateKey {
                key: key.to_string(),
            });
        }
        map.insert(key, entry);
    }
    Ok(map)
}

/// Index the applied collection, first occurrence wins
fn index_applied<E: Entry>(applied: &Collection<E>) -> BTreeMap<E::Key, &E> {
    let map = applied.index();
    if map.len() != applied.len() {
        log::warn!(
            "Applied collection holds {} entries under {} keys; keeping the first of each",
            applied.len(),
            map.len()
        );
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::testing::{grant, key, Grant};
    use crate::error::OperationKind;

    fn everyone_policy() -> DefaultEntryPolicy<Grant> {
        DefaultEntryPolicy::new(grant("Everyone", "full_control"))
    }

    fn collection(entries: &[Grant]) -> Collection<Grant> {
        Collection::unchecked(entries.to_vec())
    }

    fn kinds(plan: &ReconciliationPlan<Grant>) -> Vec<OperationKind> {
        plan.operations().iter().map(Operation::kind).collect()
    }

    #[test]
    fn test_identical_collections_yield_empty_plan() {
        let entries = collection(&[grant("alice", "read"), grant("bob", "change")]);
        let plan = reconcile(&entries, &entries, &everyone_policy()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let desired = collection(&[grant("bob", "read"), grant("alice", "change")]);
        let applied = collection(&[grant("carol", "read"), grant("alice", "read")]);

        let first = reconcile(&desired, &applied, &everyone_policy()).unwrap();
        let second = reconcile(&desired, &applied, &everyone_policy()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_order_of_input_does_not_matter() {
        let a = collection(&[grant("bob", "read"), grant("alice", "change")]);
        let b = collection(&[grant("alice", "change"), grant("bob", "read")]);
        let applied = collection(&[grant("carol", "read")]);

        assert_eq!(
            reconcile(&a, &applied, &everyone_policy()).unwrap(),
            reconcile(&b, &applied, &everyone_policy()).unwrap()
        );
    }

    #[test]
    fn test_empty_applied_only_creates() {
        let desired = collection(&[grant("alice", "read"), grant("bob", "change")]);
        let plan = reconcile(&desired, &Collection::new(), &everyone_policy()).unwrap();

        assert_eq!(kinds(&plan), vec![OperationKind::Create; 2]);
    }

    #[test]
    fn test_empty_desired_only_deletes() {
        let applied = collection(&[grant("alice", "read"), grant("bob", "change")]);
        let plan = reconcile(&Collection::new(), &applied, &everyone_policy()).unwrap();

        assert_eq!(kinds(&plan), vec![OperationKind::Delete; 2]);
        assert!(plan.deletes().all(|op| matches!(
            op,
            Operation::Delete {
                reason: DeleteReason::Removed,
                ..
            }
        )));
    }

    #[test]
    fn test_changed_attributes_yield_single_update() {
        let desired = collection(&[grant("BUILTIN\\Administrators", "full_control")]);
        let applied = collection(&[grant("BUILTIN\\Administrators", "read")]);

        let plan = reconcile(&desired, &applied, &everyone_policy()).unwrap();
        assert_eq!(
            plan.operations(),
            &[Operation::Update {
                key: key("BUILTIN\\Administrators"),
                from: "read".into(),
                to: "full_control".into(),
            }]
        );
    }

    #[test]
    fn test_never_deletes_and_creates_same_key() {
        let desired = collection(&[
            grant("alice", "change"),
            grant("bob", "read"),
            grant("carol", "read"),
        ]);
        let applied = collection(&[
            grant("alice", "read"),
            grant("bob", "read"),
            grant("dave", "read"),
        ]);

        let plan = reconcile(&desired, &applied, &everyone_policy()).unwrap();
        let mut keys: Vec<_> = plan.operations().iter().map(Operation::key).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert_eq!(
            kinds(&plan),
            vec![
                OperationKind::Delete,
                OperationKind::Update,
                OperationKind::Create
            ]
        );
    }

    #[test]
    fn test_undeclared_default_is_suppressed() {
        let applied = collection(&[grant("Everyone", "full_control")]);
        let plan = reconcile(&Collection::new(), &applied, &everyone_policy()).unwrap();

        assert_eq!(
            plan.operations(),
            &[Operation::Delete {
                key: key("Everyone"),
                reason: DeleteReason::SuppressDefault,
            }]
        );
        assert_eq!(plan.summary().drift(), 0);
    }

    #[test]
    fn test_declared_default_is_preserved() {
        let entries = collection(&[grant("Everyone", "full_control")]);
        let plan = reconcile(&entries, &entries, &everyone_policy()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_declared_sentinel_key_with_other_attributes_is_updated() {
        let desired = collection(&[grant("Everyone", "read")]);
        let applied = collection(&[grant("Everyone", "full_control")]);

        let plan = reconcile(&desired, &applied, &everyone_policy()).unwrap();
        assert_eq!(kinds(&plan), vec![OperationKind::Update]);
    }

    #[test]
    fn test_removed_non_default_at_sentinel_key_is_a_removal() {
        let applied = collection(&[grant("Everyone", "read")]);
        let plan = reconcile(&Collection::new(), &applied, &everyone_policy()).unwrap();

        assert_eq!(
            plan.operations(),
            &[Operation::Delete {
                key: key("Everyone"),
                reason: DeleteReason::Removed,
            }]
        );
    }

    #[test]
    fn test_without_policy_default_is_a_removal() {
        let applied = collection(&[grant("Everyone", "full_control")]);
        let plan = reconcile(&Collection::new(), &applied, &DefaultEntryPolicy::none()).unwrap();

        assert_eq!(plan.summary().removals, 1);
    }

    #[test]
    fn test_duplicate_desired_key_is_rejected() {
        let desired = collection(&[grant("alice", "read"), grant("alice", "change")]);
        let err = reconcile(&desired, &Collection::new(), &everyone_policy()).unwrap_err();

        assert_eq!(
            err,
            ReconcileError::DuplicateKey {
                key: "alice/windows".into()
            }
        );
    }

    #[test]
    fn test_duplicate_applied_key_keeps_first() {
        let applied = collection(&[grant("alice", "read"), grant("alice", "change")]);
        let desired = collection(&[grant("alice", "read")]);

        let plan = reconcile(&desired, &applied, &everyone_policy()).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_default_reappearing_after_create_is_suppressed_next_cycle() {
        let desired = collection(&[grant("BUILTIN\\Administrators", "read")]);

        let first = reconcile(&desired, &Collection::new(), &everyone_policy()).unwrap();
        assert_eq!(
            first.operations(),
            &[Operation::Create(grant("BUILTIN\\Administrators", "read"))]
        );

        // A later read shows the share also carries the injected default.
        let applied = collection(&[
            grant("BUILTIN\\Administrators", "read"),
            grant("Everyone", "full_control"),
        ]);
        let second = reconcile(&desired, &applied, &everyone_policy()).unwrap();
        assert_eq!(
            second.operations(),
            &[Operation::Delete {
                key: key("Everyone"),
                reason: DeleteReason::SuppressDefault,
            }]
        );
    }
}
