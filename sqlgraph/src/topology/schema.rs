// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Schemas
//!
//! A schema owns its vertex labels, the edge labels whose out-vertex labels
//! live in it, and (for the reserved `gui_schema` only) the global unique
//! indexes.

use super::edge_label::EdgeLabel;
use super::error::TopologyResult;
use super::global_unique_index::{self, GlobalUniqueIndex};
use super::index::random_index_name;
use super::label::AbstractLabel;
use super::listener::{TopologyChangeAction, TopologyEntity};
use super::lock::TopologyTx;
use super::property::{PropertyColumn, PropertyType};
use super::services::TopologyServices;
use super::staged::StagedMap;
use super::types::{Direction, LabelKind, LabelRef, VERTEX_PREFIX};
use super::vertex_label::VertexLabel;
use crate::sql::Ddl;
use log::debug;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub struct Schema {
    name: String,
    services: Arc<TopologyServices>,
    pub(crate) vertex_labels: RwLock<StagedMap<Arc<VertexLabel>>>,
    pub(crate) edge_labels: RwLock<StagedMap<Arc<EdgeLabel>>>,
    pub(crate) global_unique_indexes: RwLock<StagedMap<GlobalUniqueIndex>>,
}

impl Schema {
    pub(crate) fn new(services: Arc<TopologyServices>, name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            services,
            vertex_labels: RwLock::new(StagedMap::new()),
            edge_labels: RwLock::new(StagedMap::new()),
            global_unique_indexes: RwLock::new(StagedMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn own(&self, tx: &TopologyTx) -> bool {
        self.services.is_locked_by(tx)
    }

    pub(crate) fn vertex_label_for(&self, own: bool, label: &str) -> Option<Arc<VertexLabel>> {
        self.vertex_labels.read().get(label, own).cloned()
    }

    pub(crate) fn vertex_labels_for(&self, own: bool) -> BTreeMap<String, Arc<VertexLabel>> {
        self.vertex_labels.read().snapshot(own)
    }

    pub(crate) fn edge_label_for(&self, own: bool, label: &str) -> Option<Arc<EdgeLabel>> {
        self.edge_labels.read().get(label, own).cloned()
    }

    pub(crate) fn edge_labels_for(&self, own: bool) -> BTreeMap<String, Arc<EdgeLabel>> {
        self.edge_labels.read().snapshot(own)
    }

    pub(crate) fn global_unique_indexes_for(&self, own: bool) -> BTreeMap<String, GlobalUniqueIndex> {
        self.global_unique_indexes.read().snapshot(own)
    }

    pub fn vertex_label(&self, tx: &TopologyTx, label: &str) -> Option<Arc<VertexLabel>> {
        self.vertex_label_for(self.own(tx), label)
    }

    pub fn vertex_labels(&self, tx: &TopologyTx) -> BTreeMap<String, Arc<VertexLabel>> {
        self.vertex_labels_for(self.own(tx))
    }

    pub fn edge_label(&self, tx: &TopologyTx, label: &str) -> Option<Arc<EdgeLabel>> {
        self.edge_label_for(self.own(tx), label)
    }

    pub fn edge_labels(&self, tx: &TopologyTx) -> BTreeMap<String, Arc<EdgeLabel>> {
        self.edge_labels_for(self.own(tx))
    }

    pub fn global_unique_indexes(&self, tx: &TopologyTx) -> BTreeMap<String, GlobalUniqueIndex> {
        self.global_unique_indexes_for(self.own(tx))
    }

    /// Get or create a vertex label with at least `properties`
    ///
    /// A new label's table is created with all requested columns in one
    /// statement; an existing label gets missing columns added one by one.
    pub fn ensure_vertex_label_exists(
        &self,
        tx: &TopologyTx,
        label: &str,
        properties: &BTreeMap<String, PropertyType>,
    ) -> TopologyResult<Arc<VertexLabel>> {
        if let Some(vertex) = self.vertex_label(tx, label) {
            vertex.ensure_properties_exist(tx, properties)?;
            return Ok(vertex);
        }

        self.services.lock(tx);
        if let Some(vertex) = self.vertex_label_for(true, label) {
            vertex.ensure_properties_exist(tx, properties)?;
            return Ok(vertex);
        }
        self.services.validate_label_name(label, LabelKind::Vertex)?;
        for name in properties.keys() {
            self.services.validate_name(name)?;
        }

        let vertex = VertexLabel::new(Arc::clone(&self.services), &self.name, label);
        self.services.execute(
            tx,
            Ddl::CreateVertexTable {
                schema: self.name.clone(),
                table: vertex.table_name(),
                columns: properties.iter().map(|(n, t)| (n.clone(), *t)).collect(),
            },
        )?;
        vertex.core().stage_initial_properties(properties);
        self.vertex_labels
            .write()
            .insert_uncommitted(label, Arc::clone(&vertex));
        self.services.fire(
            TopologyEntity::VertexLabel(vertex.label_ref().clone()),
            TopologyChangeAction::Create,
        );
        Ok(vertex)
    }

    /// Get or create an edge label homed in this schema
    ///
    /// An existing label gains `(out_vertex, in_vertex)` as new roles if it
    /// does not connect them yet.
    pub(crate) fn ensure_edge_label(
        &self,
        tx: &TopologyTx,
        label: &str,
        out_vertex: &Arc<VertexLabel>,
        in_vertex: &Arc<VertexLabel>,
        properties: &BTreeMap<String, PropertyType>,
    ) -> TopologyResult<Arc<EdgeLabel>> {
        let existing = match self.edge_label(tx, label) {
            Some(edge) => Some(edge),
            None => {
                self.services.lock(tx);
                self.edge_label_for(true, label)
            }
        };
        if let Some(edge) = existing {
            edge.ensure_edge_role(tx, out_vertex, Direction::Out)?;
            edge.ensure_edge_role(tx, in_vertex, Direction::In)?;
            edge.ensure_properties_exist(tx, properties)?;
            return Ok(edge);
        }

        self.services.validate_label_name(label, LabelKind::Edge)?;
        for name in properties.keys() {
            self.services.validate_name(name)?;
        }

        let edge = EdgeLabel::new(Arc::clone(&self.services), &self.name, label);
        self.services.execute(
            tx,
            Ddl::CreateEdgeTable {
                schema: self.name.clone(),
                table: edge.table_name(),
                columns: properties.iter().map(|(n, t)| (n.clone(), *t)).collect(),
                foreign_keys: vec![
                    edge.foreign_key(out_vertex.label_ref(), Direction::Out),
                    edge.foreign_key(in_vertex.label_ref(), Direction::In),
                ],
            },
        )?;
        edge.core().stage_initial_properties(properties);
        edge.stage_initial_role(out_vertex, Direction::Out);
        edge.stage_initial_role(in_vertex, Direction::In);
        self.edge_labels
            .write()
            .insert_uncommitted(label, Arc::clone(&edge));
        self.services.fire(
            TopologyEntity::EdgeLabel(edge.label_ref().clone()),
            TopologyChangeAction::Create,
        );
        Ok(edge)
    }

    /// Get or create an edge label before any of its roles are known
    ///
    /// Used when roles arrive one at a time, as when applying a notification.
    pub(crate) fn ensure_edge_label_without_roles(
        &self,
        tx: &TopologyTx,
        label: &str,
        properties: &BTreeMap<String, PropertyType>,
    ) -> TopologyResult<Arc<EdgeLabel>> {
        self.services.lock(tx);
        if let Some(edge) = self.edge_label_for(true, label) {
            return Ok(edge);
        }
        self.services.validate_label_name(label, LabelKind::Edge)?;

        let edge = EdgeLabel::new(Arc::clone(&self.services), &self.name, label);
        self.services.execute(
            tx,
            Ddl::CreateEdgeTable {
                schema: self.name.clone(),
                table: edge.table_name(),
                columns: properties.iter().map(|(n, t)| (n.clone(), *t)).collect(),
                foreign_keys: Vec::new(),
            },
        )?;
        edge.core().stage_initial_properties(properties);
        self.edge_labels
            .write()
            .insert_uncommitted(label, Arc::clone(&edge));
        self.services.fire(
            TopologyEntity::EdgeLabel(edge.label_ref().clone()),
            TopologyChangeAction::Create,
        );
        Ok(edge)
    }

    /// Get or create a global unique index over `properties`
    ///
    /// The caller has resolved the properties and checked they share a type.
    pub(crate) fn ensure_global_unique_index(
        &self,
        tx: &TopologyTx,
        properties: Vec<PropertyColumn>,
    ) -> TopologyResult<GlobalUniqueIndex> {
        let find = |own: bool| {
            self.global_unique_indexes
                .read()
                .visible(own)
                .map(|(_, index)| index)
                .find(|index| index.same_properties(&properties))
                .cloned()
        };
        if let Some(existing) = find(self.own(tx)) {
            return Ok(existing);
        }

        self.services.lock(tx);
        if let Some(existing) = find(true) {
            return Ok(existing);
        }

        let limit = self.services.max_identifier_length();
        let deterministic = global_unique_index::deterministic_name(&properties);
        let taken = |name: &str| self.global_unique_indexes.read().state(name).is_some();
        let name = if deterministic.len() + VERTEX_PREFIX.len() > limit || taken(&deterministic) {
            let mut random = random_index_name(limit.saturating_sub(VERTEX_PREFIX.len()));
            while taken(&random) {
                random = random_index_name(limit.saturating_sub(VERTEX_PREFIX.len()));
            }
            random
        } else {
            deterministic
        };
        self.create_global_unique_index(tx, GlobalUniqueIndex::new(name, properties))
    }

    /// Get or create a global unique index under a name chosen elsewhere
    pub(crate) fn ensure_named_global_unique_index(
        &self,
        tx: &TopologyTx,
        name: &str,
        properties: Vec<PropertyColumn>,
    ) -> TopologyResult<GlobalUniqueIndex> {
        self.services.lock(tx);
        if let Some(existing) = self.global_unique_indexes.read().get(name, true) {
            return Ok(existing.clone());
        }
        self.create_global_unique_index(tx, GlobalUniqueIndex::new(name, properties))
    }

    fn create_global_unique_index(
        &self,
        tx: &TopologyTx,
        index: GlobalUniqueIndex,
    ) -> TopologyResult<GlobalUniqueIndex> {
        let limit = self.services.max_index_name_length();
        let mut unique_index = global_unique_index::unique_index_name(self.services.dialect.as_ref(), index.name());
        if unique_index.len() > limit {
            unique_index = random_index_name(limit);
        }
        for ddl in index.create_ddl(unique_index) {
            self.services.execute(tx, ddl)?;
        }
        self.global_unique_indexes
            .write()
            .insert_uncommitted(index.name(), index.clone());
        self.services.fire(
            TopologyEntity::GlobalUniqueIndex {
                name: index.name().to_string(),
                properties: index.properties().to_vec(),
            },
            TopologyChangeAction::Create,
        );
        Ok(index)
    }

    pub(crate) fn remove_global_unique_index(
        &self,
        tx: &TopologyTx,
        name: &str,
        preserve_data: bool,
    ) -> TopologyResult<()> {
        self.services.lock(tx);
        let index = match self.global_unique_indexes.read().get(name, true) {
            Some(index) => index.clone(),
            None => return Ok(()),
        };
        if !preserve_data {
            self.services.execute(tx, index.drop_ddl())?;
        }
        self.global_unique_indexes.write().mark_removed(name);
        self.services.fire(
            TopologyEntity::GlobalUniqueIndex {
                name: index.name().to_string(),
                properties: index.properties().to_vec(),
            },
            TopologyChangeAction::Delete,
        );
        Ok(())
    }

    /// Global unique indexes covering any property of `owner`, or only `property`
    pub(crate) fn global_unique_indexes_referencing(
        &self,
        owner: &LabelRef,
        property: Option<&str>,
    ) -> Vec<String> {
        self.global_unique_indexes
            .read()
            .visible(true)
            .filter(|(_, index)| match property {
                Some(property) => index.references(owner, property),
                None => index.references_label(owner),
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Whether this schema or anything it owns has uncommitted changes
    pub(crate) fn has_pending(&self) -> bool {
        self.vertex_labels.read().has_pending()
            || self.edge_labels.read().has_pending()
            || self.global_unique_indexes.read().has_pending()
            || self.vertex_labels.read().all().any(|v| v.has_pending())
            || self.edge_labels.read().all().any(|e| e.has_pending())
    }

    /// Reconcile every label held, in any state, then this schema's maps
    ///
    /// # Panics
    /// If `tx` does not hold the topology lock.
    pub(crate) fn after_commit(&self, tx: &TopologyTx) {
        assert!(
            self.own(tx),
            "schema {} reconciled by {} without the topology lock",
            self.name,
            tx.id()
        );
        let vertices: Vec<_> = self.vertex_labels.read().all().cloned().collect();
        let edges: Vec<_> = self.edge_labels.read().all().cloned().collect();
        for vertex in &vertices {
            vertex.after_commit(tx);
        }
        for edge in &edges {
            edge.after_commit(tx);
        }
        self.vertex_labels.write().commit();
        self.edge_labels.write().commit();
        self.global_unique_indexes.write().commit();
        debug!("schema {} committed", self.name);
    }

    /// # Panics
    /// If `tx` does not hold the topology lock.
    pub(crate) fn after_rollback(&self, tx: &TopologyTx) {
        assert!(
            self.own(tx),
            "schema {} reconciled by {} without the topology lock",
            self.name,
            tx.id()
        );
        let vertices: Vec<_> = self.vertex_labels.read().all().cloned().collect();
        let edges: Vec<_> = self.edge_labels.read().all().cloned().collect();
        for vertex in &vertices {
            vertex.after_rollback(tx);
        }
        for edge in &edges {
            edge.after_rollback(tx);
        }
        self.vertex_labels.write().rollback();
        self.edge_labels.write().rollback();
        self.global_unique_indexes.write().rollback();
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").field("name", &self.name).finish()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
