// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog store
//!
//! Two trees over one storage driver:
//! - `topology_schemas`: schema name -> JSON [`SchemaRecord`]
//! - `topology_log`: log key -> JSON [`TopologyDiff`]
//!
//! Log keys are the commit timestamp in big-endian nanoseconds, then the
//! origin instance id, then a per-store sequence number, so byte order is
//! commit order and two instances never collide.

use super::persistent::{create_storage_driver, BoxedStorageDriver, StorageTree, StorageType};
use crate::topology::error::TopologyResult;
use crate::topology::notification::TopologyDiff;
use crate::topology::record::SchemaRecord;
use log::{debug, warn};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

const SCHEMAS_TREE: &str = "topology_schemas";
const LOG_TREE: &str = "topology_log";

pub struct CatalogStore {
    driver: BoxedStorageDriver,
    schemas: Box<dyn StorageTree>,
    log: Box<dyn StorageTree>,
    sequence: AtomicU64,
}

impl CatalogStore {
    /// Open the store at `path` on the given backend
    pub fn open<P: AsRef<Path>>(storage_type: StorageType, path: P) -> TopologyResult<Self> {
        let driver = create_storage_driver(storage_type, path)?;
        Self::with_driver(driver)
    }

    /// A store that lives as long as the process
    pub fn in_memory() -> TopologyResult<Self> {
        Self::open(StorageType::Memory, "")
    }

    pub fn with_driver(driver: BoxedStorageDriver) -> TopologyResult<Self> {
        let schemas = driver.open_tree(SCHEMAS_TREE)?;
        let log = driver.open_tree(LOG_TREE)?;
        debug!("catalog store opened on {}", driver.storage_type());
        Ok(Self {
            driver,
            schemas,
            log,
            sequence: AtomicU64::new(0),
        })
    }

    pub fn storage_type(&self) -> StorageType {
        self.driver.storage_type()
    }

    pub fn save_schema(&self, record: &SchemaRecord) -> TopologyResult<()> {
        let value = serde_json::to_vec(record)?;
        self.schemas.insert(record.name.as_bytes(), &value)?;
        Ok(())
    }

    pub fn remove_schema(&self, name: &str) -> TopologyResult<()> {
        self.schemas.remove(name.as_bytes())?;
        Ok(())
    }

    pub fn load_schema(&self, name: &str) -> TopologyResult<Option<SchemaRecord>> {
        match self.schemas.get(name.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Every stored schema row, in name order
    pub fn load_schemas(&self) -> TopologyResult<Vec<SchemaRecord>> {
        let mut records = Vec::new();
        for pair in self.schemas.iter()? {
            let (_, value) = pair?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }

    /// Append a committed diff; returns its log key
    pub fn append_log(&self, diff: &TopologyDiff) -> TopologyResult<Vec<u8>> {
        let nanos = diff.timestamp.timestamp_nanos_opt().unwrap_or(i64::MAX).max(0) as u64;
        let mut key = Vec::with_capacity(32);
        key.extend_from_slice(&nanos.to_be_bytes());
        key.extend_from_slice(diff.origin.as_bytes());
        key.extend_from_slice(&self.sequence.fetch_add(1, Ordering::Relaxed).to_be_bytes());
        self.log.insert(&key, &serde_json::to_vec(diff)?)?;
        Ok(key)
    }

    /// Log entries after `cursor`, or all of them, in commit order
    ///
    /// An entry that no longer parses is skipped with a warning.
    pub fn log_after(&self, cursor: Option<&[u8]>) -> TopologyResult<Vec<(Vec<u8>, TopologyDiff)>> {
        let iter = match cursor {
            Some(cursor) => self.log.iter_after(cursor)?,
            None => self.log.iter()?,
        };
        let mut entries = Vec::new();
        for pair in iter {
            let (key, value) = pair?;
            match serde_json::from_slice(&value) {
                Ok(diff) => entries.push((key, diff)),
                Err(e) => warn!("skipping unreadable notification log entry: {}", e),
            }
        }
        Ok(entries)
    }

    pub fn last_log_key(&self) -> TopologyResult<Option<Vec<u8>>> {
        Ok(self.log.last()?.map(|(key, _)| key))
    }

    pub fn flush(&self) -> TopologyResult<()> {
        self.driver.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::notification::SchemaDiff;
    use chrono::Duration;
    use uuid::Uuid;

    fn record(name: &str) -> SchemaRecord {
        SchemaRecord {
            name: name.to_string(),
            vertex_labels: vec![],
            edge_labels: vec![],
            global_unique_indexes: vec![],
        }
    }

    #[test]
    fn test_schema_rows() {
        let store = CatalogStore::in_memory().unwrap();
        store.save_schema(&record("b")).unwrap();
        store.save_schema(&record("a")).unwrap();
        let names: Vec<String> = store.load_schemas().unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a", "b"]);

        store.remove_schema("a").unwrap();
        assert!(store.load_schema("a").unwrap().is_none());
        assert_eq!(store.load_schema("b").unwrap(), Some(record("b")));
    }

    #[test]
    fn test_log_is_read_in_commit_order() {
        let store = CatalogStore::in_memory().unwrap();
        let mut later = TopologyDiff::new(Uuid::new_v4());
        later.schemas.push(SchemaDiff {
            name: "later".to_string(),
            ..SchemaDiff::default()
        });
        let mut earlier = TopologyDiff::new(Uuid::new_v4());
        earlier.timestamp = later.timestamp - Duration::seconds(1);

        let later_key = store.append_log(&later).unwrap();
        let earlier_key = store.append_log(&earlier).unwrap();
        assert!(earlier_key < later_key);

        let entries = store.log_after(None).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1.origin, earlier.origin);

        let rest = store.log_after(Some(&earlier_key)).unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].1, later);
        assert_eq!(store.last_log_key().unwrap(), Some(later_key));
    }
}
