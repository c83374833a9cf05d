// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Two-phase catalog collections
//!
//! Every catalog collection (properties, indexes, labels, edge roles,
//! schemas) is a [`StagedMap`]: one ordered map whose entries carry their own
//! lifecycle state. Visibility is a single filter over that map:
//!
//! | state          | lock owner sees | everyone else sees |
//! |----------------|-----------------|--------------------|
//! | Committed      | yes             | yes                |
//! | Uncommitted    | yes             | no                 |
//! | PendingRemoval | no              | yes                |
//!
//! When the lock owner removes a committed entry and then creates a new one
//! under the same name, the committed value is kept aside as `displaced` so
//! other readers keep seeing it and rollback can restore it.

use std::collections::BTreeMap;

/// Lifecycle state of one catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Committed,
    Uncommitted,
    /// Committed entry the lock owner has removed
    PendingRemoval,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    state: EntryState,
}

#[derive(Debug, Clone)]
pub struct StagedMap<V> {
    entries: BTreeMap<String, Entry<V>>,
    displaced: BTreeMap<String, V>,
}

impl<V> Default for StagedMap<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            displaced: BTreeMap::new(),
        }
    }
}

impl<V> StagedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn visible_value<'a>(&'a self, name: &str, entry: &'a Entry<V>, own: bool) -> Option<&'a V> {
        match (entry.state, own) {
            (EntryState::Committed, _) => Some(&entry.value),
            (EntryState::Uncommitted, true) => Some(&entry.value),
            (EntryState::Uncommitted, false) => self.displaced.get(name),
            (EntryState::PendingRemoval, true) => None,
            (EntryState::PendingRemoval, false) => Some(&entry.value),
        }
    }

    /// Value under `name` as seen by the lock owner (`own`) or anyone else
    pub fn get(&self, name: &str, own: bool) -> Option<&V> {
        self.entries
            .get(name)
            .and_then(|entry| self.visible_value(name, entry, own))
    }

    pub fn contains(&self, name: &str, own: bool) -> bool {
        self.get(name, own).is_some()
    }

    /// Visible entries in name order
    pub fn visible(&self, own: bool) -> impl Iterator<Item = (&String, &V)> + '_ {
        self.entries
            .iter()
            .filter_map(move |(name, entry)| self.visible_value(name, entry, own).map(|v| (name, v)))
    }

    pub fn state(&self, name: &str) -> Option<EntryState> {
        self.entries.get(name).map(|entry| entry.state)
    }

    /// Whether `name` is part of committed state, pending removal included
    pub fn is_committed(&self, name: &str) -> bool {
        matches!(
            self.state(name),
            Some(EntryState::Committed) | Some(EntryState::PendingRemoval)
        ) || self.displaced.contains_key(name)
    }

    /// Whether any entry predates the current transaction
    pub fn has_committed(&self) -> bool {
        !self.displaced.is_empty()
            || self
                .entries
                .values()
                .any(|entry| entry.state != EntryState::Uncommitted)
    }

    /// Entries created in the current transaction
    pub fn uncommitted(&self) -> impl Iterator<Item = (&String, &V)> + '_ {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.state == EntryState::Uncommitted)
            .map(|(name, entry)| (name, &entry.value))
    }

    /// Entries removed in the current transaction
    pub fn removed(&self) -> impl Iterator<Item = (&String, &V)> + '_ {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.state == EntryState::PendingRemoval)
            .map(|(name, entry)| (name, &entry.value))
            .chain(self.displaced.iter())
    }

    /// Every value held, in any state, including displaced ones
    pub fn all(&self) -> impl Iterator<Item = &V> + '_ {
        self.entries
            .values()
            .map(|entry| &entry.value)
            .chain(self.displaced.values())
    }

    pub fn has_pending(&self) -> bool {
        !self.displaced.is_empty()
            || self
                .entries
                .values()
                .any(|entry| entry.state != EntryState::Committed)
    }

    /// Insert straight into committed state
    pub fn insert_committed(&mut self, name: impl Into<String>, value: V) {
        let name = name.into();
        self.displaced.remove(&name);
        self.entries.insert(
            name,
            Entry {
                value,
                state: EntryState::Committed,
            },
        );
    }

    /// Stage a creation; a pending removal under the same name is displaced
    pub fn insert_uncommitted(&mut self, name: impl Into<String>, value: V) {
        let name = name.into();
        let previous = self.entries.insert(
            name.clone(),
            Entry {
                value,
                state: EntryState::Uncommitted,
            },
        );
        if let Some(previous) = previous {
            if previous.state == EntryState::PendingRemoval {
                self.displaced.insert(name, previous.value);
            }
        }
    }

    /// Stage a removal; returns false if the lock owner could not see `name`
    ///
    /// An entry created in the same transaction disappears at once, so a
    /// create-then-remove sequence never reaches committed state.
    pub fn mark_removed(&mut self, name: &str) -> bool {
        let state = match self.entries.get(name) {
            Some(entry) => entry.state,
            None => return false,
        };
        match state {
            EntryState::Committed => {
                if let Some(entry) = self.entries.get_mut(name) {
                    entry.state = EntryState::PendingRemoval;
                }
                true
            }
            EntryState::Uncommitted => {
                self.entries.remove(name);
                if let Some(value) = self.displaced.remove(name) {
                    self.entries.insert(
                        name.to_string(),
                        Entry {
                            value,
                            state: EntryState::PendingRemoval,
                        },
                    );
                }
                true
            }
            EntryState::PendingRemoval => false,
        }
    }

    /// Drop an entry regardless of state
    pub fn remove(&mut self, name: &str) -> Option<V> {
        self.displaced.remove(name);
        self.entries.remove(name).map(|entry| entry.value)
    }

    /// Fold creations into committed state, then purge removals
    pub fn commit(&mut self) {
        for entry in self.entries.values_mut() {
            if entry.state == EntryState::Uncommitted {
                entry.state = EntryState::Committed;
            }
        }
        self.entries
            .retain(|_, entry| entry.state != EntryState::PendingRemoval);
        self.displaced.clear();
    }

    /// Discard creations and abandon removals
    pub fn rollback(&mut self) {
        self.entries
            .retain(|_, entry| entry.state != EntryState::Uncommitted);
        for entry in self.entries.values_mut() {
            entry.state = EntryState::Committed;
        }
        for (name, value) in std::mem::take(&mut self.displaced) {
            self.entries.insert(
                name,
                Entry {
                    value,
                    state: EntryState::Committed,
                },
            );
        }
    }
}

impl<V: Clone> StagedMap<V> {
    /// Visible entries, cloned into a plain map
    pub fn snapshot(&self, own: bool) -> BTreeMap<String, V> {
        self.visible(own)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uncommitted_visible_to_owner_only() {
        let mut map = StagedMap::new();
        map.insert_uncommitted("a", 1);
        assert_eq!(map.get("a", true), Some(&1));
        assert_eq!(map.get("a", false), None);

        map.commit();
        assert_eq!(map.get("a", false), Some(&1));
        assert!(!map.has_pending());
    }

    #[test]
    fn test_create_then_remove_collapses() {
        let mut map = StagedMap::new();
        map.insert_uncommitted("a", 1);
        assert!(map.mark_removed("a"));
        map.commit();
        assert!(map.get("a", true).is_none());
        assert_eq!(map.all().count(), 0);
    }

    #[test]
    fn test_pending_removal_visible_to_others() {
        let mut map = StagedMap::new();
        map.insert_committed("a", 1);
        assert!(map.mark_removed("a"));
        assert!(!map.mark_removed("a"));
        assert!(map.get("a", true).is_none());
        assert_eq!(map.get("a", false), Some(&1));

        map.rollback();
        assert_eq!(map.get("a", true), Some(&1));

        map.mark_removed("a");
        map.commit();
        assert!(map.get("a", false).is_none());
    }

    #[test]
    fn test_remove_then_recreate() {
        let mut map = StagedMap::new();
        map.insert_committed("a", 1);
        map.mark_removed("a");
        map.insert_uncommitted("a", 2);

        assert_eq!(map.get("a", true), Some(&2));
        assert_eq!(map.get("a", false), Some(&1));
        assert!(map.is_committed("a"));

        let mut rolled_back = map.clone();
        rolled_back.rollback();
        assert_eq!(rolled_back.get("a", false), Some(&1));

        map.commit();
        assert_eq!(map.get("a", false), Some(&2));
    }

    #[test]
    fn test_remove_recreate_remove_restores_pending_removal() {
        let mut map = StagedMap::new();
        map.insert_committed("a", 1);
        map.mark_removed("a");
        map.insert_uncommitted("a", 2);
        map.mark_removed("a");

        assert_eq!(map.state("a"), Some(EntryState::PendingRemoval));
        assert_eq!(map.get("a", false), Some(&1));
        map.commit();
        assert!(map.get("a", false).is_none());
    }

    #[test]
    fn test_visible_is_ordered() {
        let mut map = StagedMap::new();
        map.insert_committed("b", 2);
        map.insert_uncommitted("a", 1);
        map.insert_committed("c", 3);
        map.mark_removed("c");

        let own: Vec<_> = map.visible(true).map(|(k, _)| k.as_str()).collect();
        assert_eq!(own, vec!["a", "b"]);
        let others: Vec<_> = map.visible(false).map(|(k, _)| k.as_str()).collect();
        assert_eq!(others, vec!["b", "c"]);
    }
}
