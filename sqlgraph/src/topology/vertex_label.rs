// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Vertex labels

use super::edge_label::EdgeLabel;
use super::edge_role::EdgeRole;
use super::label::{AbstractLabel, LabelCore};
use super::lock::TopologyTx;
use super::services::TopologyServices;
use super::staged::StagedMap;
use super::types::{Direction, LabelRef};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A vertex label and the edge labels incident to it
///
/// Incident edge labels are keyed by their qualified name, `schema.label`.
pub struct VertexLabel {
    core: LabelCore,
    out_edge_labels: RwLock<StagedMap<Arc<EdgeLabel>>>,
    in_edge_labels: RwLock<StagedMap<Arc<EdgeLabel>>>,
}

impl VertexLabel {
    pub(crate) fn new(services: Arc<TopologyServices>, schema: &str, label: &str) -> Arc<Self> {
        Arc::new(Self {
            core: LabelCore::new(LabelRef::vertex(schema, label), services),
            out_edge_labels: RwLock::new(StagedMap::new()),
            in_edge_labels: RwLock::new(StagedMap::new()),
        })
    }

    pub(crate) fn edge_map(&self, direction: Direction) -> &RwLock<StagedMap<Arc<EdgeLabel>>> {
        match direction {
            Direction::Out => &self.out_edge_labels,
            Direction::In => &self.in_edge_labels,
        }
    }

    /// Edge labels this label participates in on `direction`, visible to `tx`
    pub fn edge_labels(&self, tx: &TopologyTx, direction: Direction) -> BTreeMap<String, Arc<EdgeLabel>> {
        self.edge_map(direction).read().snapshot(self.core.own(tx))
    }

    pub fn out_edge_labels(&self, tx: &TopologyTx) -> BTreeMap<String, Arc<EdgeLabel>> {
        self.edge_labels(tx, Direction::Out)
    }

    pub fn in_edge_labels(&self, tx: &TopologyTx) -> BTreeMap<String, Arc<EdgeLabel>> {
        self.edge_labels(tx, Direction::In)
    }

    /// Every participation of this label, out roles first
    pub fn edge_roles(self: &Arc<Self>, tx: &TopologyTx) -> Vec<EdgeRole> {
        let mut roles = Vec::new();
        for direction in [Direction::Out, Direction::In] {
            for edge in self.edge_labels(tx, direction).into_values() {
                roles.push(EdgeRole::new(Arc::clone(self), edge, direction));
            }
        }
        roles
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.core.has_pending()
            || self.out_edge_labels.read().has_pending()
            || self.in_edge_labels.read().has_pending()
    }
}

impl AbstractLabel for VertexLabel {
    fn core(&self) -> &LabelCore {
        &self.core
    }

    fn after_commit(&self, tx: &TopologyTx) {
        self.core.commit(tx);
        self.out_edge_labels.write().commit();
        self.in_edge_labels.write().commit();
    }

    fn after_rollback(&self, tx: &TopologyTx) {
        self.core.rollback(tx);
        self.out_edge_labels.write().rollback();
        self.in_edge_labels.write().rollback();
    }
}

impl fmt::Debug for VertexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexLabel")
            .field("label", self.core.reference())
            .finish()
    }
}

impl fmt::Display for VertexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.core.reference())
    }
}
