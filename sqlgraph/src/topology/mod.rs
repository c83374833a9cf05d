// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Property graph topology catalog
//!
//! The catalog is an in-memory model of schemas, vertex and edge labels, their
//! properties and indexes, kept consistent with the physical relational tables
//! that back them.
//!
//! # Transactions
//!
//! Every mutation runs on behalf of a [`TopologyTx`]. The first mutation of a
//! transaction takes the topology lock and keeps it until
//! [`Topology::commit`] or [`Topology::rollback`]. While the lock is held the
//! transaction sees its own uncommitted edits; every other transaction keeps
//! seeing the committed catalog.
//!
//! ```ignore
//! let topology = Topology::builder(Arc::new(PostgresDialect::new()), db).open()?;
//! let tx = topology.begin();
//! let person = topology.ensure_vertex_label_exists(&tx, "public", "Person", &props)?;
//! topology.ensure_index_exists(&tx, person.as_ref(), IndexType::Unique, &columns)?;
//! topology.commit(&tx)?;
//! ```
//!
//! # Rollback and physical DDL
//!
//! DDL runs through the [`SqlExecutor`] as soon as a mutation needs it and is
//! not reversed by [`Topology::rollback`]. Callers that need atomicity run the
//! executor inside the same database transaction as their catalog work; a
//! rollback otherwise leaves orphaned physical objects, and the count of such
//! statements is logged.

pub mod config;
pub mod edge_label;
pub mod edge_role;
pub mod error;
pub mod global_unique_index;
pub mod index;
pub mod label;
pub mod listener;
pub mod lock;
pub mod notification;
pub mod property;
pub mod record;
mod removal;
mod replay;
pub mod schema;
mod services;
pub mod staged;
pub mod types;
pub mod validation;
pub mod vertex_label;

pub use config::TopologyConfig;
pub use edge_label::EdgeLabel;
pub use edge_role::EdgeRole;
pub use error::{TopologyError, TopologyResult};
pub use global_unique_index::GlobalUniqueIndex;
pub use index::{Index, IndexType};
pub use label::AbstractLabel;
pub use listener::{ListenerId, TopologyChangeAction, TopologyEntity, TopologyListener};
pub use lock::{TopologyTx, TxId};
pub use notification::{NotificationPublisher, TopologyDiff};
pub use property::{PropertyColumn, PropertyType};
pub use record::SchemaRecord;
pub use schema::Schema;
pub use types::{Direction, LabelKind, LabelRef, GLOBAL_UNIQUE_INDEX_SCHEMA};
pub use validation::{DriftKind, TopologyValidationError};
pub use vertex_label::VertexLabel;

use crate::sql::{Ddl, SqlDialect, SqlExecutor};
use crate::storage::CatalogStore;
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use services::TopologyServices;
use staged::{EntryState, StagedMap};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Builder for [`Topology`]
pub struct TopologyBuilder {
    config: TopologyConfig,
    dialect: Arc<dyn SqlDialect>,
    executor: Arc<dyn SqlExecutor>,
    store: Option<Arc<CatalogStore>>,
    publisher: Option<Arc<dyn NotificationPublisher>>,
}

impl TopologyBuilder {
    pub fn config(mut self, config: TopologyConfig) -> Self {
        self.config = config;
        self
    }

    /// Persist committed catalog rows here and reload them on open
    pub fn store(mut self, store: Arc<CatalogStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Deliver committed diffs to sibling instances; used when distributed
    pub fn publisher(mut self, publisher: Arc<dyn NotificationPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Build the topology, loading the committed catalog from the store if any
    pub fn open(self) -> TopologyResult<Topology> {
        let services = Arc::new(TopologyServices::new(self.config, self.dialect, self.executor));
        let default_schema = services.config.default_schema.clone();
        services.validate_name(&default_schema)?;

        let mut schemas = StagedMap::new();
        schemas.insert_committed(
            default_schema.clone(),
            Schema::new(Arc::clone(&services), &default_schema),
        );
        let topology = Topology {
            instance_id: Uuid::new_v4(),
            services,
            schemas: Arc::new(RwLock::new(schemas)),
            store: self.store,
            publisher: self.publisher,
            log_cursor: Mutex::new(None),
        };

        if let Some(store) = &topology.store {
            let records = store.load_schemas()?;
            if !records.is_empty() {
                topology.apply_diff(&TopologyDiff::from_records(&records))?;
            }
            *topology.log_cursor.lock() = store.last_log_key()?;
            info!(
                "topology {} loaded {} schemas from {} catalog store",
                topology.instance_id,
                records.len(),
                store.storage_type()
            );
        }
        Ok(topology)
    }
}

pub(crate) type SchemaMap = RwLock<StagedMap<Arc<Schema>>>;

/// Root of the catalog: schemas, the topology lock, listeners and persistence
pub struct Topology {
    instance_id: Uuid,
    services: Arc<TopologyServices>,
    schemas: Arc<SchemaMap>,
    store: Option<Arc<CatalogStore>>,
    publisher: Option<Arc<dyn NotificationPublisher>>,
    /// Last notification log key this instance has applied or skipped
    log_cursor: Mutex<Option<Vec<u8>>>,
}

impl Topology {
    pub fn builder(dialect: Arc<dyn SqlDialect>, executor: Arc<dyn SqlExecutor>) -> TopologyBuilder {
        TopologyBuilder {
            config: TopologyConfig::default(),
            dialect,
            executor,
            store: None,
            publisher: None,
        }
    }

    /// Identity of this instance, carried as the origin of its diffs
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn config(&self) -> &TopologyConfig {
        &self.services.config
    }

    pub fn store(&self) -> Option<&Arc<CatalogStore>> {
        self.store.as_ref()
    }

    pub fn begin(&self) -> TopologyTx {
        TopologyTx::bound(&self.services, &self.schemas)
    }

    /// Take the topology lock for `tx`, blocking while another transaction holds it
    pub fn lock(&self, tx: &TopologyTx) {
        self.services.lock(tx);
    }

    /// Whether reads on behalf of `tx` include its own uncommitted edits
    pub fn is_write_lock_held_by(&self, tx: &TopologyTx) -> bool {
        self.services.is_locked_by(tx)
    }

    fn own(&self, tx: &TopologyTx) -> bool {
        self.services.is_locked_by(tx)
    }

    // ========================================================================
    // Schemas
    // ========================================================================

    pub(crate) fn schema_for(&self, own: bool, name: &str) -> Option<Arc<Schema>> {
        self.schemas.read().get(name, own).cloned()
    }

    pub fn default_schema_name(&self) -> &str {
        &self.services.config.default_schema
    }

    pub fn get_schema(&self, tx: &TopologyTx, name: &str) -> Option<Arc<Schema>> {
        self.schema_for(self.own(tx), name)
    }

    pub fn get_schemas(&self, tx: &TopologyTx) -> BTreeMap<String, Arc<Schema>> {
        self.schemas.read().snapshot(self.own(tx))
    }

    /// Get or create a schema
    ///
    /// The reserved global unique index schema cannot be created this way.
    pub fn ensure_schema_exists(&self, tx: &TopologyTx, name: &str) -> TopologyResult<Arc<Schema>> {
        if name == GLOBAL_UNIQUE_INDEX_SCHEMA {
            return Err(TopologyError::IllegalState(format!(
                "schema {} is reserved for global unique indexes",
                name
            )));
        }
        self.ensure_schema(tx, name)
    }

    pub(crate) fn ensure_schema(&self, tx: &TopologyTx, name: &str) -> TopologyResult<Arc<Schema>> {
        if let Some(schema) = self.get_schema(tx, name) {
            return Ok(schema);
        }

        self.services.lock(tx);
        if let Some(schema) = self.schema_for(true, name) {
            return Ok(schema);
        }
        self.services.validate_name(name)?;
        if self.services.dialect.supports_schemas() {
            self.services.execute(
                tx,
                Ddl::CreateSchema {
                    schema: name.to_string(),
                },
            )?;
        }
        let schema = Schema::new(Arc::clone(&self.services), name);
        self.schemas
            .write()
            .insert_uncommitted(name, Arc::clone(&schema));
        self.services.fire(
            TopologyEntity::Schema {
                name: name.to_string(),
            },
            TopologyChangeAction::Create,
        );
        Ok(schema)
    }

    // ========================================================================
    // Labels
    // ========================================================================

    /// Get or create a vertex label, creating its schema if needed
    ///
    /// An existing label gains any of `properties` it lacks; a property that
    /// exists with another type is an `IllegalState` error.
    pub fn ensure_vertex_label_exists(
        &self,
        tx: &TopologyTx,
        schema: &str,
        label: &str,
        properties: &BTreeMap<String, PropertyType>,
    ) -> TopologyResult<Arc<VertexLabel>> {
        if schema == GLOBAL_UNIQUE_INDEX_SCHEMA {
            return Err(TopologyError::IllegalState(format!(
                "schema {} is reserved for global unique indexes",
                schema
            )));
        }
        let schema = self.ensure_schema(tx, schema)?;
        schema.ensure_vertex_label_exists(tx, label, properties)
    }

    pub fn get_vertex_label(&self, tx: &TopologyTx, schema: &str, label: &str) -> Option<Arc<VertexLabel>> {
        self.get_schema(tx, schema)?.vertex_label(tx, label)
    }

    /// Get or create an edge label from `out_vertex` to `in_vertex`
    ///
    /// The edge label lives in the out-vertex label's schema. If it exists
    /// already, the vertex pair joins it as new roles.
    pub fn ensure_edge_label_exists(
        &self,
        tx: &TopologyTx,
        label: &str,
        out_vertex: &Arc<VertexLabel>,
        in_vertex: &Arc<VertexLabel>,
        properties: &BTreeMap<String, PropertyType>,
    ) -> TopologyResult<Arc<EdgeLabel>> {
        for vertex in [out_vertex, in_vertex] {
            let visible = self
                .get_vertex_label(tx, vertex.schema_name(), vertex.name())
                .map_or(false, |found| Arc::ptr_eq(&found, vertex));
            if !visible {
                return Err(TopologyError::VertexLabelNotFound(vertex.label_ref().qualified_name()));
            }
        }
        let schema = self
            .get_schema(tx, out_vertex.schema_name())
            .ok_or_else(|| TopologyError::SchemaNotFound(out_vertex.schema_name().to_string()))?;
        schema.ensure_edge_label(tx, label, out_vertex, in_vertex, properties)
    }

    pub fn get_edge_label(&self, tx: &TopologyTx, schema: &str, label: &str) -> Option<Arc<EdgeLabel>> {
        self.get_schema(tx, schema)?.edge_label(tx, label)
    }

    /// Every label table visible to `tx`, `schema.V_label` or `schema.E_label`,
    /// with its properties
    pub fn get_all_tables(&self, tx: &TopologyTx) -> BTreeMap<String, BTreeMap<String, PropertyType>> {
        let mut tables = BTreeMap::new();
        for schema in self.get_schemas(tx).into_values() {
            for vertex in schema.vertex_labels(tx).into_values() {
                tables.insert(vertex.label_ref().to_string(), property_types(vertex.as_ref(), tx));
            }
            for edge in schema.edge_labels(tx).into_values() {
                tables.insert(edge.label_ref().to_string(), property_types(edge.as_ref(), tx));
            }
        }
        tables
    }

    // ========================================================================
    // Properties and indexes
    // ========================================================================

    pub fn ensure_property_exists<L: AbstractLabel + ?Sized>(
        &self,
        tx: &TopologyTx,
        label: &L,
        name: &str,
        property_type: PropertyType,
    ) -> TopologyResult<PropertyColumn> {
        label.ensure_property_exists(tx, name, property_type)
    }

    pub fn ensure_index_exists<L: AbstractLabel + ?Sized>(
        &self,
        tx: &TopologyTx,
        label: &L,
        index_type: IndexType,
        properties: &[PropertyColumn],
    ) -> TopologyResult<Index> {
        label.ensure_index_exists(tx, index_type, properties)
    }

    /// Resolve a column to the catalog's current entry for it
    pub(crate) fn find_property(&self, own: bool, column: &PropertyColumn) -> TopologyResult<PropertyColumn> {
        let owner = column.owner();
        let schema = self
            .schema_for(own, &owner.schema)
            .ok_or_else(|| TopologyError::SchemaNotFound(owner.schema.clone()))?;
        let found = match owner.kind {
            LabelKind::Vertex => schema
                .vertex_label_for(own, &owner.label)
                .and_then(|vertex| vertex.core().property(own, column.name())),
            LabelKind::Edge => schema
                .edge_label_for(own, &owner.label)
                .and_then(|edge| edge.core().property(own, column.name())),
        };
        found.ok_or_else(|| TopologyError::PropertyNotFound(format!("{}.{}", owner, column.name())))
    }

    /// Get or create a global unique index over properties of any labels
    ///
    /// All properties must exist and share one type.
    pub fn ensure_global_unique_index_exists(
        &self,
        tx: &TopologyTx,
        properties: &[PropertyColumn],
    ) -> TopologyResult<GlobalUniqueIndex> {
        let Some(first) = properties.first() else {
            return Err(TopologyError::IllegalState(
                "a global unique index needs at least one property".to_string(),
            ));
        };
        if let Some(other) = properties
            .iter()
            .find(|p| p.property_type() != first.property_type())
        {
            return Err(TopologyError::IllegalState(format!(
                "global unique index properties must share one type, found {} and {}",
                first.property_type(),
                other.property_type()
            )));
        }
        let own = self.own(tx);
        let resolved = properties
            .iter()
            .map(|p| self.find_property(own, p))
            .collect::<TopologyResult<Vec<_>>>()?;
        let schema = self.ensure_schema(tx, GLOBAL_UNIQUE_INDEX_SCHEMA)?;
        schema.ensure_global_unique_index(tx, resolved)
    }

    pub fn get_global_unique_indexes(&self, tx: &TopologyTx) -> BTreeMap<String, GlobalUniqueIndex> {
        self.get_schema(tx, GLOBAL_UNIQUE_INDEX_SCHEMA)
            .map(|schema| schema.global_unique_indexes(tx))
            .unwrap_or_default()
    }

    // ========================================================================
    // Listeners
    // ========================================================================

    pub fn register_listener(&self, listener: Arc<dyn TopologyListener>) -> ListenerId {
        self.services.listeners.register(listener)
    }

    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.services.listeners.unregister(id)
    }

    pub fn listener_count(&self) -> usize {
        self.services.listeners.len()
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Committed catalog, one record per schema in name order
    pub fn snapshot(&self) -> Vec<SchemaRecord> {
        let schemas: Vec<Arc<Schema>> = self.schemas.read().visible(false).map(|(_, s)| Arc::clone(s)).collect();
        schemas.iter().map(|schema| schema.to_record(false)).collect()
    }

    /// Names of schemas the lock owner changed, and of those it removed
    fn pending_schemas(&self) -> (Vec<String>, Vec<String>) {
        let map = self.schemas.read();
        let changed = map
            .visible(true)
            .filter(|(name, schema)| map.state(name) != Some(EntryState::Committed) || schema.has_pending())
            .map(|(name, _)| name.clone())
            .collect();
        let removed = map.removed().map(|(name, _)| name.clone()).collect();
        (changed, removed)
    }

    fn reconcile_commit(&self, tx: &TopologyTx) {
        let schemas: Vec<Arc<Schema>> = self.schemas.read().all().cloned().collect();
        for schema in &schemas {
            schema.after_commit(tx);
        }
        self.schemas.write().commit();
    }

    fn reconcile_rollback(&self, tx: &TopologyTx) {
        reconcile_rollback(&self.schemas, tx);
    }

    fn persist(&self, changed: &[String], removed: &[String]) -> TopologyResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        for name in removed {
            store.remove_schema(name)?;
        }
        for name in changed {
            if let Some(schema) = self.schema_for(false, name) {
                store.save_schema(&schema.to_record(false))?;
            }
        }
        store.flush()
    }

    fn publish(&self, diff: &TopologyDiff) -> TopologyResult<()> {
        if !self.services.config.distributed || diff.is_empty() {
            return Ok(());
        }
        if let Some(store) = &self.store {
            store.append_log(diff)?;
        }
        if let Some(publisher) = &self.publisher {
            if let Err(e) = publisher.publish(diff) {
                error!("publishing topology diff from {} failed: {}", self.instance_id, e);
            }
        }
        Ok(())
    }

    /// Make `tx`'s catalog changes visible to everyone and release the lock
    ///
    /// Returns the notification diff of the transaction, or `None` if it
    /// changed nothing or never took the lock. The in-memory catalog is
    /// committed even when writing the catalog store fails; that failure is
    /// still returned.
    pub fn commit(&self, tx: &TopologyTx) -> TopologyResult<Option<TopologyDiff>> {
        if !self.services.is_locked_by(tx) {
            return Ok(None);
        }
        let diff = self.build_diff(tx);
        let (changed, removed) = self.pending_schemas();
        self.reconcile_commit(tx);
        let statements = self.services.take_statement_count();
        let persisted = self
            .persist(&changed, &removed)
            .and_then(|_| self.publish(&diff));
        self.services.unlock(tx);
        debug!(
            "{} committed: {} schemas changed, {} removed, {} statements",
            tx.id(),
            changed.len(),
            removed.len(),
            statements
        );
        persisted?;
        Ok((!diff.is_empty()).then_some(diff))
    }

    /// Discard `tx`'s catalog changes and release the lock
    ///
    /// DDL already executed for the transaction is not reversed.
    pub fn rollback(&self, tx: &TopologyTx) {
        if !self.services.is_locked_by(tx) {
            return;
        }
        rollback_locked(&self.services, &self.schemas, tx);
    }
}

fn reconcile_rollback(schemas: &SchemaMap, tx: &TopologyTx) {
    let all: Vec<Arc<Schema>> = schemas.read().all().cloned().collect();
    for schema in &all {
        schema.after_rollback(tx);
    }
    schemas.write().rollback();
}

/// Discard the lock owner's catalog changes and release the lock
pub(crate) fn rollback_locked(services: &TopologyServices, schemas: &SchemaMap, tx: &TopologyTx) {
    reconcile_rollback(schemas, tx);
    let orphaned = services.take_statement_count();
    if orphaned > 0 {
        warn!(
            "{} rolled back; {} executed DDL statements are not reversed",
            tx.id(),
            orphaned
        );
    }
    services.unlock(tx);
    debug!("{} rolled back", tx.id());
}

fn property_types<L: AbstractLabel + ?Sized>(label: &L, tx: &TopologyTx) -> BTreeMap<String, PropertyType> {
    label
        .properties(tx)
        .into_iter()
        .map(|(name, column)| (name, column.property_type()))
        .collect()
}

impl fmt::Debug for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topology")
            .field("instance_id", &self.instance_id)
            .field("default_schema", &self.services.config.default_schema)
            .field("distributed", &self.services.config.distributed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{MemoryDatabase, PostgresDialect};

    fn topology() -> (Topology, Arc<MemoryDatabase>) {
        let db = Arc::new(MemoryDatabase::new());
        let topology = Topology::builder(Arc::new(PostgresDialect::new()), db.clone())
            .open()
            .unwrap();
        (topology, db)
    }

    fn props(entries: &[(&str, PropertyType)]) -> BTreeMap<String, PropertyType> {
        entries.iter().map(|(n, t)| (n.to_string(), *t)).collect()
    }

    #[test]
    fn test_default_schema_is_committed() {
        let (topology, db) = topology();
        let tx = topology.begin();
        assert!(topology.get_schema(&tx, "public").is_some());
        assert!(!topology.is_write_lock_held_by(&tx));
        assert!(db.executed().is_empty());
    }

    #[test]
    fn test_reserved_schema_is_rejected() {
        let (topology, _db) = topology();
        let tx = topology.begin();
        assert!(matches!(
            topology.ensure_schema_exists(&tx, GLOBAL_UNIQUE_INDEX_SCHEMA),
            Err(TopologyError::IllegalState(_))
        ));
        assert!(matches!(
            topology.ensure_vertex_label_exists(&tx, GLOBAL_UNIQUE_INDEX_SCHEMA, "X", &BTreeMap::new()),
            Err(TopologyError::IllegalState(_))
        ));
        assert!(!topology.is_write_lock_held_by(&tx));
    }

    #[test]
    fn test_commit_returns_diff_and_releases_lock() {
        let (topology, _db) = topology();
        let tx = topology.begin();
        topology
            .ensure_vertex_label_exists(&tx, "public", "Person", &props(&[("name", PropertyType::String)]))
            .unwrap();
        assert!(topology.is_write_lock_held_by(&tx));

        let diff = topology.commit(&tx).unwrap().unwrap();
        assert!(!topology.is_write_lock_held_by(&tx));
        let person = diff.schema("public").unwrap().vertex_label("Person").unwrap();
        assert!(person.uncommitted);
        assert_eq!(person.uncommitted_properties[0].name, "name");

        let reader = topology.begin();
        assert!(topology.get_vertex_label(&reader, "public", "Person").is_some());
        assert!(topology.commit(&reader).unwrap().is_none());
    }

    #[test]
    fn test_get_all_tables() {
        let (topology, _db) = topology();
        let tx = topology.begin();
        let a = topology
            .ensure_vertex_label_exists(&tx, "public", "A", &props(&[("x", PropertyType::Integer)]))
            .unwrap();
        topology
            .ensure_edge_label_exists(&tx, "self", &a, &a, &BTreeMap::new())
            .unwrap();
        let tables = topology.get_all_tables(&tx);
        assert_eq!(
            tables.keys().cloned().collect::<Vec<_>>(),
            vec!["public.E_self".to_string(), "public.V_A".to_string()]
        );
        assert_eq!(tables["public.V_A"]["x"], PropertyType::Integer);
        topology.rollback(&tx);
        assert!(topology.get_all_tables(&tx).is_empty());
    }

    #[test]
    fn test_edge_label_requires_visible_vertices() {
        let (topology, _db) = topology();
        let tx = topology.begin();
        let a = topology
            .ensure_vertex_label_exists(&tx, "public", "A", &BTreeMap::new())
            .unwrap();
        topology.rollback(&tx);

        let tx = topology.begin();
        assert!(matches!(
            topology.ensure_edge_label_exists(&tx, "e", &a, &a, &BTreeMap::new()),
            Err(TopologyError::VertexLabelNotFound(_))
        ));
    }
}
