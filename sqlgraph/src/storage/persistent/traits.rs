// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver traits
//!
//! The catalog store keeps its rows and its notification log in named trees
//! of a key-value driver. Trees iterate in ascending key order; the log
//! relies on that to read entries in commit order.

use super::types::{StorageResult, StorageType};
use std::path::Path;

/// Ordered key-value pairs yielded by a tree scan
pub type TreeIter<'a> = Box<dyn Iterator<Item = StorageResult<(Vec<u8>, Vec<u8>)>> + 'a>;

/// A named, ordered collection of key-value pairs
pub trait StorageTree: Send + Sync {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    fn remove(&self, key: &[u8]) -> StorageResult<()>;

    fn contains_key(&self, key: &[u8]) -> StorageResult<bool>;

    fn is_empty(&self) -> StorageResult<bool>;

    /// All pairs in ascending key order
    fn iter(&self) -> StorageResult<TreeIter<'_>>;

    /// Pairs with a key strictly greater than `key`, in ascending order
    fn iter_after(&self, key: &[u8]) -> StorageResult<TreeIter<'_>>;

    /// Last pair in key order
    fn last(&self) -> StorageResult<Option<(Vec<u8>, Vec<u8>)>>;

    fn flush(&self) -> StorageResult<()>;
}

/// A key-value database holding named trees
pub trait StorageDriver: Send + Sync {
    type Tree: StorageTree;

    /// Open or create a database at `path`
    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self>
    where
        Self: Sized;

    /// Open or create a named tree
    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree>;

    fn list_trees(&self) -> StorageResult<Vec<String>>;

    fn flush(&self) -> StorageResult<()>;

    fn storage_type(&self) -> StorageType;

    /// Flush and release what the driver holds before it is dropped
    fn shutdown(&mut self) -> StorageResult<()> {
        self.flush()
    }
}

impl StorageTree for Box<dyn StorageTree> {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        (**self).insert(key, value)
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn contains_key(&self, key: &[u8]) -> StorageResult<bool> {
        (**self).contains_key(key)
    }

    fn is_empty(&self) -> StorageResult<bool> {
        (**self).is_empty()
    }

    fn iter(&self) -> StorageResult<TreeIter<'_>> {
        (**self).iter()
    }

    fn iter_after(&self, key: &[u8]) -> StorageResult<TreeIter<'_>> {
        (**self).iter_after(key)
    }

    fn last(&self) -> StorageResult<Option<(Vec<u8>, Vec<u8>)>> {
        (**self).last()
    }

    fn flush(&self) -> StorageResult<()> {
        (**self).flush()
    }
}
