//! Entry model for declarative sub-resource collections
//!
//! An [`Entry`] is one keyed member of a collection whose members live as
//! separate remote objects (for example, one grant in a share's ACL).
//! A [`Collection`] is an unordered set of entries, unique by key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

/// One keyed member of a declarative sub-resource collection
///
/// Two entries denote the same remote sub-resource iff their keys are equal.
/// Everything that is not part of the key is the mutable attribute payload.
///
/// # Example
///
/// ```
/// use declarative::Entry;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Grant {
///     principal: String,
///     level: u8,
/// }
///
/// impl Entry for Grant {
///     type Key = String;
///     type Attributes = u8;
///
///     fn key(&self) -> String {
///         self.principal.clone()
///     }
///
///     fn attributes(&self) -> u8 {
///         self.level
///     }
///
///     fn from_parts(key: String, attributes: u8) -> Self {
///         Self { principal: key, level: attributes }
///     }
/// }
///
/// let grant = Grant { principal: "alice".into(), level: 2 };
/// assert_eq!(grant.key(), "alice");
/// ```
pub trait Entry: Clone + fmt::Debug {
    /// Composite identity of the entry
    ///
    /// Ordered so plans are deterministic, displayable so errors can name
    /// the sub-resource that failed.
    type Key: Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display;

    /// Mutable payload attached to a key
    type Attributes: Clone + PartialEq + fmt::Debug;

    /// Identity of this entry
    ///
    /// Must be pure and deterministic. Any normalization (case folding,
    /// trimming) belongs here; the reconciler compares keys exactly.
    fn key(&self) -> Self::Key;

    /// Full set of managed attributes
    fn attributes(&self) -> Self::Attributes;

    /// Rebuild an entry from its key and attributes
    fn from_parts(key: Self::Key, attributes: Self::Attributes) -> Self;

    /// Field-wise equality over all managed attributes
    fn attributes_equal(&self, other: &Self) -> bool {
        self.attributes() == other.attributes()
    }
}

/// An unordered set of entries, unique by key
///
/// Serializes as a plain list so it can be recorded in a state file.
/// Construction through [`Collection::from_entries`] keeps the last entry
/// for a repeated key; use [`crate::reconcile`] when duplicates must be
/// rejected instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection<E> {
    entries: Vec<E>,
}

impl<E> Default for Collection<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: Entry> Collection<E> {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from entries, later entries replacing earlier ones
    /// with the same key
    pub fn from_entries(entries: impl IntoIterator<Item = E>) -> Self {
        let mut collection = Self::new();
        for entry in entries {
            collection.upsert(entry);
        }
        collection
    }

    /// Wrap entries as-is, without enforcing key uniqueness
    ///
    /// Used for declared input, which the reconciler validates itself.
    pub fn unchecked(entries: Vec<E>) -> Self {
        Self { entries }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.entries.iter()
    }

    /// Look up an entry by key
    pub fn get(&self, key: &E::Key) -> Option<&E> {
        self.entries.iter().find(|e| &e.key() == key)
    }

    /// Check if an entry with this key exists
    pub fn contains_key(&self, key: &E::Key) -> bool {
        self.get(key).is_some()
    }

    /// Insert an entry, replacing any entry with the same key
    pub fn upsert(&mut self, entry: E) {
        let key = entry.key();
        match self.entries.iter_mut().find(|e| e.key() == key) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Remove the entry with this key, returning it if present
    pub fn remove(&mut self, key: &E::Key) -> Option<E> {
        let index = self.entries.iter().position(|e| &e.key() == key)?;
        Some(self.entries.remove(index))
    }

    /// Keys of all entries, sorted
    pub fn keys(&self) -> Vec<E::Key> {
        let mut keys: Vec<_> = self.entries.iter().map(Entry::key).collect();
        keys.sort();
        keys
    }

    /// Entries sorted by key
    pub fn sorted(&self) -> Vec<&E> {
        let mut entries: Vec<&E> = self.entries.iter().collect();
        entries.sort_by_key(|e| e.key());
        entries
    }

    /// Key-indexed view, first occurrence wins
    pub(crate) fn index(&self) -> BTreeMap<E::Key, &E> {
        let mut map = BTreeMap::new();
        for entry in &self.entries {
            map.entry(entry.key()).or_insert(entry);
        }
        map
    }

    /// Set equality by key and attributes, ignoring order
    pub fn same_as(&self, other: &Self) -> bool {
        let ours = self.index();
        let theirs = other.index();
        ours.len() == theirs.len()
            && ours.iter().all(|(key, entry)| {
                theirs
                    .get(key)
                    .is_some_and(|other| entry.attributes_equal(other))
            })
    }
}

impl<E: Entry> FromIterator<E> for Collection<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

impl<E> IntoIterator for Collection<E> {
    type Item = E;
    type IntoIter = std::vec::IntoIter<E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a Collection<E> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A small grant entry shared by the crate's tests

    use super::Entry;
    use std::fmt;

    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct GrantKey {
        pub principal: String,
        pub kind: String,
    }

    impl fmt::Display for GrantKey {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}/{}", self.principal, self.kind)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Grant {
        pub principal: String,
        pub kind: String,
        pub permission: String,
    }

    impl Entry for Grant {
        type Key = GrantKey;
        type Attributes = String;

        fn key(&self) -> GrantKey {
            GrantKey {
                principal: self.principal.clone(),
                kind: self.kind.clone(),
            }
        }

        fn attributes(&self) -> String {
            self.permission.clone()
        }

        fn from_parts(key: GrantKey, attributes: String) -> Self {
            Self {
                principal: key.principal,
                kind: key.kind,
                permission: attributes,
            }
        }
    }

    pub fn grant(principal: &str, permission: &str) -> Grant {
        Grant {
            principal: principal.to_string(),
            kind: "windows".to_string(),
            permission: permission.to_string(),
        }
    }

    pub fn key(principal: &str) -> GrantKey {
        GrantKey {
            principal: principal.to_string(),
            kind: "windows".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{grant, key};
    use super::*;

    #[test]
    fn test_upsert_replaces_same_key() {
        let mut collection = Collection::new();
        collection.upsert(grant("alice", "read"));
        collection.upsert(grant("alice", "change"));

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get(&key("alice")).unwrap().permission, "change");
    }

    #[test]
    fn test_remove() {
        let mut collection = Collection::from_entries([grant("alice", "read"), grant("bob", "read")]);

        assert!(collection.remove(&key("alice")).is_some());
        assert!(collection.remove(&key("alice")).is_none());
        assert_eq!(collection.keys(), vec![key("bob")]);
    }

    #[test]
    fn test_same_as_ignores_order() {
        let a = Collection::from_entries([grant("alice", "read"), grant("bob", "change")]);
        let b = Collection::from_entries([grant("bob", "change"), grant("alice", "read")]);
        let c = Collection::from_entries([grant("bob", "read"), grant("alice", "read")]);

        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let collection = Collection::from_entries([grant("Alice", "read"), grant("alice", "read")]);
        assert_eq!(collection.len(), 2);
    }
}
