// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sled storage driver

use super::traits::{StorageDriver, StorageTree, TreeIter};
use super::types::{StorageDriverError, StorageResult, StorageType};
use std::ops::Bound;
use std::path::Path;

pub struct SledDriver {
    db: sled::Db,
}

pub struct SledTree {
    tree: sled::Tree,
}

fn backend(e: sled::Error) -> StorageDriverError {
    StorageDriverError::BackendSpecific(e.to_string())
}

impl StorageTree for SledTree {
    fn insert(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.tree.insert(key, value).map_err(backend)?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.tree
            .get(key)
            .map_err(backend)
            .map(|opt| opt.map(|v| v.to_vec()))
    }

    fn remove(&self, key: &[u8]) -> StorageResult<()> {
        self.tree.remove(key).map_err(backend)?;
        Ok(())
    }

    fn contains_key(&self, key: &[u8]) -> StorageResult<bool> {
        self.tree.contains_key(key).map_err(backend)
    }

    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.tree.is_empty())
    }

    fn iter(&self) -> StorageResult<TreeIter<'_>> {
        let iter = self.tree.iter().map(|result| {
            result
                .map(|(k, v)| (k.to_vec(), v.to_vec()))
                .map_err(backend)
        });
        Ok(Box::new(iter))
    }

    fn iter_after(&self, key: &[u8]) -> StorageResult<TreeIter<'_>> {
        let iter = self
            .tree
            .range::<&[u8], _>((Bound::Excluded(key), Bound::Unbounded))
            .map(|result| {
                result
                    .map(|(k, v)| (k.to_vec(), v.to_vec()))
                    .map_err(backend)
            });
        Ok(Box::new(iter))
    }

    fn last(&self) -> StorageResult<Option<(Vec<u8>, Vec<u8>)>> {
        self.tree
            .last()
            .map_err(backend)
            .map(|opt| opt.map(|(k, v)| (k.to_vec(), v.to_vec())))
    }

    fn flush(&self) -> StorageResult<()> {
        self.tree.flush().map_err(backend)?;
        Ok(())
    }
}

impl StorageDriver for SledDriver {
    type Tree = Box<dyn StorageTree>;

    fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::open(path).map_err(backend)?;
        Ok(SledDriver { db })
    }

    fn open_tree(&self, name: &str) -> StorageResult<Self::Tree> {
        let tree = self.db.open_tree(name).map_err(backend)?;
        Ok(Box::new(SledTree { tree }) as Box<dyn StorageTree>)
    }

    fn list_trees(&self) -> StorageResult<Vec<String>> {
        let tree_names = self
            .db
            .tree_names()
            .into_iter()
            .map(|name| String::from_utf8_lossy(&name).to_string())
            .collect();
        Ok(tree_names)
    }

    fn flush(&self) -> StorageResult<()> {
        self.db.flush().map_err(backend)?;
        Ok(())
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Sled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let driver = SledDriver::open(dir.path()).unwrap();
            let tree = driver.open_tree("rows").unwrap();
            tree.insert(b"public", b"{}").unwrap();
            driver.flush().unwrap();
        }
        let driver = SledDriver::open(dir.path()).unwrap();
        let tree = driver.open_tree("rows").unwrap();
        assert_eq!(tree.get(b"public").unwrap(), Some(b"{}".to_vec()));
        assert_eq!(tree.iter_after(b"public").unwrap().count(), 0);
    }
}
