// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Edge labels
//!
//! An edge label lives in the schema of its out-vertex labels and connects a
//! set of vertex labels on each side. Each participation is a foreign key
//! column on the edge table, `<schema>.<label>__O` or `<schema>.<label>__I`.

use super::error::TopologyResult;
use super::label::{AbstractLabel, LabelCore};
use super::listener::{TopologyChangeAction, TopologyEntity};
use super::lock::TopologyTx;
use super::services::TopologyServices;
use super::staged::{EntryState, StagedMap};
use super::types::{Direction, LabelRef};
use super::vertex_label::VertexLabel;
use crate::sql::{Ddl, ForeignKey};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Weak};

pub struct EdgeLabel {
    core: LabelCore,
    out_vertex_labels: RwLock<StagedMap<Weak<VertexLabel>>>,
    in_vertex_labels: RwLock<StagedMap<Weak<VertexLabel>>>,
    /// Uncommitted roles the table was created with
    initial_roles: RwLock<BTreeSet<(Direction, String)>>,
}

impl EdgeLabel {
    pub(crate) fn new(services: Arc<TopologyServices>, schema: &str, label: &str) -> Arc<Self> {
        Arc::new(Self {
            core: LabelCore::new(LabelRef::edge(schema, label), services),
            out_vertex_labels: RwLock::new(StagedMap::new()),
            in_vertex_labels: RwLock::new(StagedMap::new()),
            initial_roles: RwLock::new(BTreeSet::new()),
        })
    }

    pub(crate) fn vertex_map(&self, direction: Direction) -> &RwLock<StagedMap<Weak<VertexLabel>>> {
        match direction {
            Direction::Out => &self.out_vertex_labels,
            Direction::In => &self.in_vertex_labels,
        }
    }

    pub(crate) fn vertex_labels_for(
        &self,
        own: bool,
        direction: Direction,
    ) -> BTreeMap<String, Arc<VertexLabel>> {
        self.vertex_map(direction)
            .read()
            .visible(own)
            .filter_map(|(name, vertex)| vertex.upgrade().map(|v| (name.clone(), v)))
            .collect()
    }

    /// Vertex labels connected on `direction`, keyed by qualified name
    pub fn vertex_labels(&self, tx: &TopologyTx, direction: Direction) -> BTreeMap<String, Arc<VertexLabel>> {
        self.vertex_labels_for(self.core.own(tx), direction)
    }

    pub fn out_vertex_labels(&self, tx: &TopologyTx) -> BTreeMap<String, Arc<VertexLabel>> {
        self.vertex_labels(tx, Direction::Out)
    }

    pub fn in_vertex_labels(&self, tx: &TopologyTx) -> BTreeMap<String, Arc<VertexLabel>> {
        self.vertex_labels(tx, Direction::In)
    }

    pub(crate) fn foreign_key(&self, vertex: &LabelRef, direction: Direction) -> ForeignKey {
        ForeignKey {
            column: direction.foreign_key_column(vertex),
            references_schema: vertex.schema.clone(),
            references_table: vertex.table_name(),
            constraint: self.core.services.config.implement_foreign_keys,
        }
    }

    /// Record a participation in both directions without DDL or events
    fn stage_role(self: &Arc<Self>, vertex: &Arc<VertexLabel>, direction: Direction) {
        self.vertex_map(direction)
            .write()
            .insert_uncommitted(vertex.label_ref().qualified_name(), Arc::downgrade(vertex));
        vertex
            .edge_map(direction)
            .write()
            .insert_uncommitted(self.label_ref().qualified_name(), Arc::clone(self));
    }

    /// Stage a role whose foreign key the edge table was created with
    pub(crate) fn stage_initial_role(self: &Arc<Self>, vertex: &Arc<VertexLabel>, direction: Direction) {
        self.stage_role(vertex, direction);
        self.initial_roles
            .write()
            .insert((direction, vertex.label_ref().qualified_name()));
    }

    /// Whether the uncommitted role of `vertex` on `direction` came with the table
    pub(crate) fn is_initial_role(&self, direction: Direction, vertex: &str) -> bool {
        self.vertex_map(direction).read().state(vertex) == Some(EntryState::Uncommitted)
            && self
                .initial_roles
                .read()
                .contains(&(direction, vertex.to_string()))
    }

    /// Add `vertex` as a participant on `direction` unless it already is one
    pub fn ensure_edge_role(
        self: &Arc<Self>,
        tx: &TopologyTx,
        vertex: &Arc<VertexLabel>,
        direction: Direction,
    ) -> TopologyResult<()> {
        let key = vertex.label_ref().qualified_name();
        if self.vertex_map(direction).read().contains(&key, self.core.own(tx)) {
            return Ok(());
        }

        self.core.services.lock(tx);
        if self.vertex_map(direction).read().contains(&key, true) {
            return Ok(());
        }
        self.core.services.execute(
            tx,
            Ddl::AddForeignKey {
                schema: self.schema_name().to_string(),
                table: self.table_name(),
                foreign_key: self.foreign_key(vertex.label_ref(), direction),
            },
        )?;
        self.stage_role(vertex, direction);
        self.core.services.fire(
            TopologyEntity::EdgeRole {
                vertex_label: vertex.label_ref().clone(),
                edge_label: self.label_ref().clone(),
                direction,
            },
            TopologyChangeAction::Create,
        );
        Ok(())
    }

    /// Drop one participation, leaving the edge label in place
    pub(crate) fn remove_role(
        &self,
        tx: &TopologyTx,
        vertex: &Arc<VertexLabel>,
        direction: Direction,
        preserve_data: bool,
    ) -> TopologyResult<()> {
        if !preserve_data {
            self.core.services.execute(
                tx,
                Ddl::DropForeignKey {
                    schema: self.schema_name().to_string(),
                    table: self.table_name(),
                    foreign_key: self.foreign_key(vertex.label_ref(), direction),
                },
            )?;
        }
        self.vertex_map(direction)
            .write()
            .mark_removed(&vertex.label_ref().qualified_name());
        vertex
            .edge_map(direction)
            .write()
            .mark_removed(&self.label_ref().qualified_name());
        self.core.services.fire(
            TopologyEntity::EdgeRole {
                vertex_label: vertex.label_ref().clone(),
                edge_label: self.label_ref().clone(),
                direction,
            },
            TopologyChangeAction::Delete,
        );
        Ok(())
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.core.has_pending()
            || self.out_vertex_labels.read().has_pending()
            || self.in_vertex_labels.read().has_pending()
    }
}

impl AbstractLabel for EdgeLabel {
    fn core(&self) -> &LabelCore {
        &self.core
    }

    fn after_commit(&self, tx: &TopologyTx) {
        self.core.commit(tx);
        self.out_vertex_labels.write().commit();
        self.in_vertex_labels.write().commit();
        self.initial_roles.write().clear();
    }

    fn after_rollback(&self, tx: &TopologyTx) {
        self.core.rollback(tx);
        self.out_vertex_labels.write().rollback();
        self.in_vertex_labels.write().rollback();
        self.initial_roles.write().clear();
    }
}

impl fmt::Debug for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeLabel")
            .field("label", self.core.reference())
            .finish()
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.core.reference())
    }
}
