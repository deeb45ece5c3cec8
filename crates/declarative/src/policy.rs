//! Default-entry policy
//!
//! Some remote systems add a member to a collection on their own when the
//! parent resource is created (ONTAP grants `Everyone / full_control` on every
//! new CIFS share). The policy names that sentinel entry so the reconciler can
//! tell "the remote injected this" from "the user removed this".

use crate::entry::Entry;

/// Identifies remote-injected default entries
///
/// Matching is by key *and* attributes: an entry at the sentinel key with
/// different attributes was put there deliberately and is treated like any
/// other entry.
#[derive(Debug, Clone)]
pub struct DefaultEntryPolicy<E: Entry> {
    sentinel: Option<E>,
}

impl<E: Entry> DefaultEntryPolicy<E> {
    /// Policy for a remote that injects `sentinel` on parent creation
    pub fn new(sentinel: E) -> Self {
        Self {
            sentinel: Some(sentinel),
        }
    }

    /// Policy for a remote that never injects entries
    pub fn none() -> Self {
        Self { sentinel: None }
    }

    /// Check if an entry has the exact shape of the remote default
    pub fn is_default(&self, entry: &E) -> bool {
        self.sentinel
            .as_ref()
            .is_some_and(|s| s.key() == entry.key() && s.attributes_equal(entry))
    }

    /// Check if an applied entry absent from desired must be deleted as an
    /// undesired remote default rather than reported as a user removal
    ///
    /// Callers only ask this for keys the desired collection lacks; a desired
    /// entry at the sentinel key is always an ordinary desired entry.
    pub fn suppresses(&self, applied: &E, desired_has_key: bool) -> bool {
        !desired_has_key && self.is_default(applied)
    }
}

impl<E: Entry> Default for DefaultEntryPolicy<E> {
    fn default() -> Self {
        Self::none()
    }
}
