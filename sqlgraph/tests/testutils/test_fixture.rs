// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Test fixture for sqlgraph integration tests
//!
//! Every fixture owns its own in-memory database, so tests never share
//! physical state unless they build siblings on purpose.

use parking_lot::Mutex;
use sqlgraph::sql::{MemoryDatabase, PostgresDialect};
use sqlgraph::topology::listener::ListenerError;
use sqlgraph::{
    CatalogStore, NotificationPublisher, PropertyType, Topology, TopologyChangeAction,
    TopologyConfig, TopologyDiff, TopologyEntity, TopologyListener, TopologyResult,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Build a property map from `(name, type)` pairs
pub fn props(entries: &[(&str, PropertyType)]) -> BTreeMap<String, PropertyType> {
    entries
        .iter()
        .map(|(name, property_type)| (name.to_string(), *property_type))
        .collect()
}

pub fn no_props() -> BTreeMap<String, PropertyType> {
    BTreeMap::new()
}

/// A topology over an in-memory database
pub struct TopologyFixture {
    pub db: Arc<MemoryDatabase>,
    pub topology: Arc<Topology>,
}

impl TopologyFixture {
    pub fn new() -> Self {
        Self::with_config(TopologyConfig::default())
    }

    pub fn with_config(config: TopologyConfig) -> Self {
        init_logging();
        let db = Arc::new(MemoryDatabase::new());
        let topology = Topology::builder(Arc::new(PostgresDialect::new()), db.clone())
            .config(config)
            .open()
            .expect("Failed to open topology");
        Self {
            db,
            topology: Arc::new(topology),
        }
    }

    /// A distributed instance over a shared database and catalog store
    pub fn sibling(
        db: Arc<MemoryDatabase>,
        store: Arc<CatalogStore>,
        publisher: Option<Arc<dyn NotificationPublisher>>,
    ) -> Self {
        init_logging();
        let mut builder = Topology::builder(Arc::new(PostgresDialect::new()), db.clone())
            .config(TopologyConfig::distributed())
            .store(store);
        if let Some(publisher) = publisher {
            builder = builder.publisher(publisher);
        }
        let topology = builder.open().expect("Failed to open sibling topology");
        Self {
            db,
            topology: Arc::new(topology),
        }
    }

    /// A second, non-distributed topology over the same physical database
    pub fn replica(&self) -> Self {
        let topology = Topology::builder(Arc::new(PostgresDialect::new()), self.db.clone())
            .open()
            .expect("Failed to open replica topology");
        Self {
            db: self.db.clone(),
            topology: Arc::new(topology),
        }
    }
}

/// Records every event as `"ACTION kind name"`
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn sorted_events(&self) -> Vec<String> {
        let mut events = self.events();
        events.sort();
        events
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl TopologyListener for RecordingListener {
    fn change(
        &self,
        entity: &TopologyEntity,
        action: TopologyChangeAction,
    ) -> Result<(), ListenerError> {
        self.events.lock().push(format!("{} {}", action, entity));
        Ok(())
    }
}

/// Collects every published diff
#[derive(Default)]
pub struct RecordingPublisher {
    diffs: Mutex<Vec<TopologyDiff>>,
}

impl RecordingPublisher {
    pub fn diffs(&self) -> Vec<TopologyDiff> {
        self.diffs.lock().clone()
    }
}

impl NotificationPublisher for RecordingPublisher {
    fn publish(&self, diff: &TopologyDiff) -> TopologyResult<()> {
        self.diffs.lock().push(diff.clone());
        Ok(())
    }
}
