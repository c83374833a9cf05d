// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory storage driver
//!
//! Trees opened twice under one name share their data, so two catalog stores
//! built over one driver see each other's rows.

use super::traits::{StorageDriver, StorageTree, TreeIter};
use super::types::{StorageResult, StorageType};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

type TreeData = Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>;

#[derive(Default)]
pub struct MemoryStorageDriver {
    trees: RwLock<BTreeMap<String, TreeData>>,
}

pub struct MemoryTree {
    data: TreeData,
}

impl MemoryStorageDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

fn collect<'a>(
    pairs: impl Iterator<Item = (&'a Vec<u8>, &'a Vec<u8>)>,
) -> TreeIter<'static> {
    let items: Vec<_> = pairs.map(|(k, v)| Ok((k.clone(), v.clone()))).collect();
    Box::new(items.into_iter())
}

impl StorageTree for MemoryTree {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn contains_key(&self, key: &[u8]) -> StorageResult<bool> {
        Ok(self.data.read().contains_key(key))
    }

    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.data.read().is_empty())
    }

    fn iter(&self) -> StorageResult<TreeIter<'_>> {
        Ok(collect(self.data.read().iter()))
    }

    fn iter_after(&self, key: &[u8]) -> StorageResult<TreeIter<'_>> {
        let data = self.data.read();
        let range = data.range::<[u8], _>((Bound::Excluded(key), Bound::Unbounded));
        Ok(collect(range))
    }

    fn last(&self) -> StorageResult<Option<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .data
            .read()
            .iter()
            .next_back()
            .map(|(k, v)| (k.clone(), v.clone())))
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl StorageDriver for MemoryStorageDriver {
    type Tree = Box<dyn StorageTree>;

    fn open<P: AsRef<Path>>(_path: P) -> StorageResult<Self> {
        Ok(Self::new())
    }

    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree> {
        let data = Arc::clone(self.trees.write().entry(name.to_string()).or_default());
        Ok(Box::new(MemoryTree { data }) as Box<dyn StorageTree>)
    }

    fn list_trees(&self) -> StorageResult<Vec<String>> {
        Ok(self.trees.read().keys().cloned().collect())
    }

    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trees_share_data_by_name() {
        let driver = MemoryStorageDriver::new();
        let first = driver.open_tree("rows").unwrap();
        let second = driver.open_tree("rows").unwrap();
        first.insert(b"k", b"v").unwrap();
        assert_eq!(second.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(driver.list_trees().unwrap(), vec!["rows".to_string()]);
    }

    #[test]
    fn test_iter_after_is_exclusive_and_ordered() {
        let driver = MemoryStorageDriver::new();
        let tree = driver.open_tree("log").unwrap();
        for key in [b"c", b"a", b"b"] {
            tree.insert(key, b"").unwrap();
        }
        let keys: Vec<Vec<u8>> = tree
            .iter_after(b"a")
            .unwrap()
            .map(|pair| pair.unwrap().0)
            .collect();
        assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(tree.last().unwrap().map(|(k, _)| k), Some(b"c".to_vec()));
    }
}
