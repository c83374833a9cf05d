// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog removals
//!
//! Every removal takes the topology lock, stages a pending removal and fires
//! a DELETE event. With `preserve_data` the physical table, column, index or
//! foreign key is left in place and only the catalog entry goes. Removing
//! something the caller cannot see is a no-op.

use super::edge_label::EdgeLabel;
use super::edge_role::EdgeRole;
use super::error::{TopologyError, TopologyResult};
use super::label::AbstractLabel;
use super::listener::{TopologyChangeAction, TopologyEntity};
use super::lock::TopologyTx;
use super::types::{Direction, LabelRef, GLOBAL_UNIQUE_INDEX_SCHEMA};
use super::vertex_label::VertexLabel;
use super::Topology;
use crate::sql::Ddl;
use std::sync::Arc;

impl Topology {
    /// Remove a schema with all its labels
    ///
    /// The default schema and the global unique index schema cannot be removed.
    pub fn remove_schema(&self, tx: &TopologyTx, name: &str, preserve_data: bool) -> TopologyResult<()> {
        if name == self.default_schema_name() || name == GLOBAL_UNIQUE_INDEX_SCHEMA {
            return Err(TopologyError::IllegalState(format!(
                "schema {} cannot be removed",
                name
            )));
        }
        self.services.lock(tx);
        let Some(schema) = self.schema_for(true, name) else {
            return Ok(());
        };
        for vertex in schema.vertex_labels_for(true).into_values() {
            self.remove_vertex_label(tx, &vertex, preserve_data)?;
        }
        for edge in schema.edge_labels_for(true).into_values() {
            self.remove_edge_label(tx, &edge, preserve_data)?;
        }
        if !preserve_data && self.services.dialect.supports_schemas() {
            self.services.execute(
                tx,
                Ddl::DropSchema {
                    schema: name.to_string(),
                },
            )?;
        }
        self.schemas.write().mark_removed(name);
        self.services.fire(
            TopologyEntity::Schema {
                name: name.to_string(),
            },
            TopologyChangeAction::Delete,
        );
        Ok(())
    }

    /// Remove a vertex label with every edge role it plays
    ///
    /// An edge label left without participants on a side goes with it.
    pub fn remove_vertex_label(
        &self,
        tx: &TopologyTx,
        vertex: &Arc<VertexLabel>,
        preserve_data: bool,
    ) -> TopologyResult<()> {
        self.services.lock(tx);
        let Some(schema) = self.schema_for(true, vertex.schema_name()) else {
            return Ok(());
        };
        match schema.vertex_label_for(true, vertex.name()) {
            Some(found) if Arc::ptr_eq(&found, vertex) => {}
            _ => return Ok(()),
        }

        for direction in [Direction::Out, Direction::In] {
            for edge in vertex.edge_labels(tx, direction).into_values() {
                self.remove_participation(tx, vertex, &edge, direction, preserve_data)?;
            }
        }
        self.remove_referencing_global_unique_indexes(tx, vertex.label_ref(), preserve_data)?;
        if !preserve_data {
            self.services.execute(
                tx,
                Ddl::DropTable {
                    schema: vertex.schema_name().to_string(),
                    table: vertex.table_name(),
                },
            )?;
        }
        schema.vertex_labels.write().mark_removed(vertex.name());
        self.services.fire(
            TopologyEntity::VertexLabel(vertex.label_ref().clone()),
            TopologyChangeAction::Delete,
        );
        Ok(())
    }

    /// Remove one participation of a vertex label in an edge label
    ///
    /// If the vertex label is the only participant on its side, the whole edge
    /// label is removed instead.
    pub fn remove_edge_role(&self, tx: &TopologyTx, role: &EdgeRole, preserve_data: bool) -> TopologyResult<()> {
        self.remove_participation(
            tx,
            role.vertex_label(),
            role.edge_label(),
            role.direction(),
            preserve_data,
        )
    }

    fn remove_participation(
        &self,
        tx: &TopologyTx,
        vertex: &Arc<VertexLabel>,
        edge: &Arc<EdgeLabel>,
        direction: Direction,
        preserve_data: bool,
    ) -> TopologyResult<()> {
        self.services.lock(tx);
        let side = edge.vertex_labels_for(true, direction);
        if !side.contains_key(&vertex.label_ref().qualified_name()) {
            return Ok(());
        }
        if side.len() == 1 {
            self.remove_edge_label(tx, edge, preserve_data)
        } else {
            edge.remove_role(tx, vertex, direction, preserve_data)
        }
    }

    /// Remove an edge label from its schema and from every vertex label it connects
    pub fn remove_edge_label(&self, tx: &TopologyTx, edge: &Arc<EdgeLabel>, preserve_data: bool) -> TopologyResult<()> {
        self.services.lock(tx);
        let Some(schema) = self.schema_for(true, edge.schema_name()) else {
            return Ok(());
        };
        match schema.edge_label_for(true, edge.name()) {
            Some(found) if Arc::ptr_eq(&found, edge) => {}
            _ => return Ok(()),
        }

        let key = edge.label_ref().qualified_name();
        for direction in [Direction::Out, Direction::In] {
            for vertex in edge.vertex_labels_for(true, direction).into_values() {
                vertex.edge_map(direction).write().mark_removed(&key);
            }
        }
        self.remove_referencing_global_unique_indexes(tx, edge.label_ref(), preserve_data)?;
        if !preserve_data {
            self.services.execute(
                tx,
                Ddl::DropTable {
                    schema: edge.schema_name().to_string(),
                    table: edge.table_name(),
                },
            )?;
        }
        schema.edge_labels.write().mark_removed(edge.name());
        self.services.fire(
            TopologyEntity::EdgeLabel(edge.label_ref().clone()),
            TopologyChangeAction::Delete,
        );
        Ok(())
    }

    /// Remove a property, the indexes covering it and the global unique
    /// indexes that include it
    pub fn remove_property<L: AbstractLabel + ?Sized>(
        &self,
        tx: &TopologyTx,
        label: &L,
        name: &str,
        preserve_data: bool,
    ) -> TopologyResult<()> {
        self.services.lock(tx);
        if let Some(gui) = self.schema_for(true, GLOBAL_UNIQUE_INDEX_SCHEMA) {
            for index in gui.global_unique_indexes_referencing(label.label_ref(), Some(name)) {
                gui.remove_global_unique_index(tx, &index, preserve_data)?;
            }
        }
        label.remove_property(tx, name, preserve_data)
    }

    pub fn remove_index<L: AbstractLabel + ?Sized>(
        &self,
        tx: &TopologyTx,
        label: &L,
        name: &str,
        preserve_data: bool,
    ) -> TopologyResult<()> {
        label.remove_index(tx, name, preserve_data)
    }

    pub fn remove_global_unique_index(&self, tx: &TopologyTx, name: &str, preserve_data: bool) -> TopologyResult<()> {
        self.services.lock(tx);
        match self.schema_for(true, GLOBAL_UNIQUE_INDEX_SCHEMA) {
            Some(gui) => gui.remove_global_unique_index(tx, name, preserve_data),
            None => Ok(()),
        }
    }

    fn remove_referencing_global_unique_indexes(
        &self,
        tx: &TopologyTx,
        owner: &LabelRef,
        preserve_data: bool,
    ) -> TopologyResult<()> {
        if let Some(gui) = self.schema_for(true, GLOBAL_UNIQUE_INDEX_SCHEMA) {
            for index in gui.global_unique_indexes_referencing(owner, None) {
                gui.remove_global_unique_index(tx, &index, preserve_data)?;
            }
        }
        Ok(())
    }
}
