// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Applying notification diffs
//!
//! A diff is applied through the same ensure and remove paths local
//! mutations use, under an internal replay transaction that skips DDL and
//! catalog store writes. Entries this instance already has are no-ops, so
//! listeners only hear about what is actually new or gone here.
//!
//! Order of application:
//! 1. removed schemas, then every schema the diff names
//! 2. per schema: removed vertex labels, edge labels and global unique indexes
//! 3. vertex labels: removed incident edges, then property and index changes
//! 4. edge labels on out sides, then on in sides
//! 5. new global unique indexes

use super::edge_label::EdgeLabel;
use super::error::{TopologyError, TopologyResult};
use super::label::AbstractLabel;
use super::lock::TopologyTx;
use super::notification::{PropertyDiff, TopologyDiff, VertexLabelDiff, TOPOLOGY_DIFF_VERSION};
use super::property::{PropertyColumn, PropertyType};
use super::record::IndexRecord;
use super::types::{split_qualified, Direction, RemovalType, GLOBAL_UNIQUE_INDEX_SCHEMA};
use super::vertex_label::VertexLabel;
use super::Topology;
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Columns a new label's table was created with; the rest of its properties
/// replay through `ensure_property_exists` and fire as they did on the origin
fn initial_property_map(
    uncommitted: bool,
    properties: &[PropertyDiff],
    initial: &[String],
) -> BTreeMap<String, PropertyType> {
    if !uncommitted {
        return BTreeMap::new();
    }
    properties
        .iter()
        .filter(|p| initial.contains(&p.name))
        .map(|p| (p.name.clone(), p.property_type))
        .collect()
}

/// Property and index changes of one label, as carried by a diff
struct LabelChanges<'a> {
    properties: &'a [PropertyDiff],
    removed_properties: &'a [String],
    indexes: &'a [IndexRecord],
    removed_indexes: &'a [String],
}

impl Topology {
    /// Apply a diff committed by a sibling instance
    ///
    /// Returns `false` for a diff this instance published itself. Blocks while
    /// another transaction holds the topology lock, so a thread must not call
    /// this while its own transaction is open.
    pub fn apply_notification(&self, diff: &TopologyDiff) -> TopologyResult<bool> {
        if diff.origin == self.instance_id {
            debug!("ignoring own topology diff");
            return Ok(false);
        }
        if diff.version == 0 || diff.version > TOPOLOGY_DIFF_VERSION {
            return Err(TopologyError::Notification(format!(
                "unsupported diff version {}, expected 1..={}",
                diff.version, TOPOLOGY_DIFF_VERSION
            )));
        }
        self.apply_diff(diff)?;
        Ok(true)
    }

    pub fn apply_notification_json(&self, json: &str) -> TopologyResult<bool> {
        self.apply_notification(&TopologyDiff::from_json(json)?)
    }

    /// Apply every logged diff this instance has not seen yet
    ///
    /// Returns the number of diffs applied; this instance's own entries are
    /// skipped. Without a catalog store there is nothing to catch up on.
    pub fn catch_up(&self) -> TopologyResult<usize> {
        let Some(store) = &self.store else {
            return Ok(0);
        };
        let mut cursor = self.log_cursor.lock();
        let mut applied = 0;
        for (key, diff) in store.log_after(cursor.as_deref())? {
            if self.apply_notification(&diff)? {
                applied += 1;
            }
            *cursor = Some(key);
        }
        if applied > 0 {
            info!("topology {} caught up on {} diffs", self.instance_id, applied);
        }
        Ok(applied)
    }

    /// Apply `diff` under a replay transaction and reconcile it at once
    pub(crate) fn apply_diff(&self, diff: &TopologyDiff) -> TopologyResult<()> {
        let tx = TopologyTx::replay();
        self.services.lock(&tx);
        let result = self.apply_changes(&tx, diff);
        match &result {
            Ok(()) => self.reconcile_commit(&tx),
            Err(e) => {
                debug!("discarding partially applied diff from {}: {}", diff.origin, e);
                self.reconcile_rollback(&tx);
            }
        }
        self.services.unlock(&tx);
        result
    }

    fn apply_changes(&self, tx: &TopologyTx, diff: &TopologyDiff) -> TopologyResult<()> {
        for name in &diff.uncommitted_removed_schemas {
            if name != self.default_schema_name() && name != GLOBAL_UNIQUE_INDEX_SCHEMA {
                self.remove_schema(tx, name, true)?;
            }
        }

        for schema_diff in &diff.schemas {
            let schema = self.ensure_schema(tx, &schema_diff.name)?;
            for label in &schema_diff.uncommitted_removed_vertex_labels {
                if let Some(vertex) = schema.vertex_label_for(true, label) {
                    self.remove_vertex_label(tx, &vertex, true)?;
                }
            }
            for label in &schema_diff.uncommitted_removed_edge_labels {
                if let Some(edge) = schema.edge_label_for(true, label) {
                    self.remove_edge_label(tx, &edge, true)?;
                }
            }
            for name in &schema_diff.uncommitted_removed_global_unique_indexes {
                schema.remove_global_unique_index(tx, name, true)?;
            }
        }

        for schema_diff in &diff.schemas {
            let schema = self
                .schema_for(true, &schema_diff.name)
                .ok_or_else(|| TopologyError::SchemaNotFound(schema_diff.name.clone()))?;
            for vertex_diff in &schema_diff.vertex_labels {
                let initial = initial_property_map(
                    vertex_diff.uncommitted,
                    &vertex_diff.uncommitted_properties,
                    &vertex_diff.initial_properties,
                );
                let vertex = schema.ensure_vertex_label_exists(tx, &vertex_diff.label, &initial)?;
                self.apply_removed_edges(tx, &vertex, vertex_diff)?;
                self.apply_label_changes(
                    tx,
                    vertex.as_ref(),
                    LabelChanges {
                        properties: &vertex_diff.uncommitted_properties,
                        removed_properties: &vertex_diff.uncommitted_removed_properties,
                        indexes: &vertex_diff.uncommitted_indexes,
                        removed_indexes: &vertex_diff.uncommitted_removed_indexes,
                    },
                )?;
            }
        }

        for direction in [Direction::Out, Direction::In] {
            for schema_diff in &diff.schemas {
                let Some(schema) = self.schema_for(true, &schema_diff.name) else {
                    continue;
                };
                for vertex_diff in &schema_diff.vertex_labels {
                    let Some(vertex) = schema.vertex_label_for(true, &vertex_diff.label) else {
                        continue;
                    };
                    for edge_diff in vertex_diff.edge_labels(direction) {
                        let home = self.ensure_schema(tx, &edge_diff.schema)?;
                        let initial = initial_property_map(
                            edge_diff.uncommitted,
                            &edge_diff.uncommitted_properties,
                            &edge_diff.initial_properties,
                        );
                        let edge = home.ensure_edge_label_without_roles(tx, &edge_diff.label, &initial)?;
                        self.apply_role(tx, &edge, &vertex, direction, edge_diff.initial_role)?;
                        self.apply_label_changes(
                            tx,
                            edge.as_ref(),
                            LabelChanges {
                                properties: &edge_diff.uncommitted_properties,
                                removed_properties: &edge_diff.uncommitted_removed_properties,
                                indexes: &edge_diff.uncommitted_indexes,
                                removed_indexes: &edge_diff.uncommitted_removed_indexes,
                            },
                        )?;
                    }
                }
            }
        }

        for schema_diff in &diff.schemas {
            if schema_diff.uncommitted_global_unique_indexes.is_empty() {
                continue;
            }
            let schema = self.ensure_schema(tx, &schema_diff.name)?;
            for index in &schema_diff.uncommitted_global_unique_indexes {
                let properties = index
                    .properties()
                    .iter()
                    .map(|p| self.find_property(true, p))
                    .collect::<TopologyResult<Vec<PropertyColumn>>>()?;
                schema.ensure_named_global_unique_index(tx, index.name(), properties)?;
            }
        }
        Ok(())
    }

    fn apply_removed_edges(
        &self,
        tx: &TopologyTx,
        vertex: &Arc<VertexLabel>,
        vertex_diff: &VertexLabelDiff,
    ) -> TopologyResult<()> {
        for direction in [Direction::Out, Direction::In] {
            for removed in vertex_diff.removed_edge_labels(direction) {
                let Some((schema, label)) = split_qualified(&removed.name) else {
                    continue;
                };
                let Some(edge) = self
                    .schema_for(true, schema)
                    .and_then(|schema| schema.edge_label_for(true, label))
                else {
                    continue;
                };
                match removed.removal_type {
                    RemovalType::Label => self.remove_edge_label(tx, &edge, true)?,
                    RemovalType::Role => {
                        let key = vertex.label_ref().qualified_name();
                        if edge.vertex_map(direction).read().contains(&key, true) {
                            edge.remove_role(tx, vertex, direction, true)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Add a role; the roles an edge label created by this replay had at
    /// creation are staged silently, as its creator's were
    fn apply_role(
        &self,
        tx: &TopologyTx,
        edge: &Arc<EdgeLabel>,
        vertex: &Arc<VertexLabel>,
        direction: Direction,
        initial_role: bool,
    ) -> TopologyResult<()> {
        let key = vertex.label_ref().qualified_name();
        if edge.vertex_map(direction).read().contains(&key, true) {
            return Ok(());
        }
        let created_here = initial_role
            && !edge.vertex_map(Direction::Out).read().has_committed()
            && !edge.vertex_map(Direction::In).read().has_committed();
        if created_here {
            edge.stage_initial_role(vertex, direction);
            Ok(())
        } else {
            edge.ensure_edge_role(tx, vertex, direction)
        }
    }

    fn apply_label_changes<L: AbstractLabel + ?Sized>(
        &self,
        tx: &TopologyTx,
        label: &L,
        changes: LabelChanges<'_>,
    ) -> TopologyResult<()> {
        for name in changes.removed_indexes {
            label.remove_index(tx, name, true)?;
        }
        for name in changes.removed_properties {
            label.remove_property(tx, name, true)?;
        }
        for property in changes.properties {
            label.ensure_property_exists(tx, &property.name, property.property_type)?;
        }
        for index in changes.indexes {
            let core = label.core();
            let columns = index
                .properties
                .iter()
                .map(|name| {
                    core.property(true, name).ok_or_else(|| {
                        TopologyError::PropertyNotFound(format!("{}.{}", label.label_ref(), name))
                    })
                })
                .collect::<TopologyResult<Vec<_>>>()?;
            core.ensure_named_index(tx, &index.name, index.index_type.clone(), &columns)?;
        }
        Ok(())
    }
}
