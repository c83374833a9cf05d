// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! One vertex label's participation in one edge label

use super::edge_label::EdgeLabel;
use super::label::AbstractLabel;
use super::types::Direction;
use super::vertex_label::VertexLabel;
use std::fmt;
use std::sync::Arc;

/// `(vertex label, edge label, direction)`
///
/// Not persisted on its own; it names the participation a removal targets.
#[derive(Debug, Clone)]
pub struct EdgeRole {
    vertex_label: Arc<VertexLabel>,
    edge_label: Arc<EdgeLabel>,
    direction: Direction,
    committed: bool,
}

impl EdgeRole {
    pub fn new(vertex_label: Arc<VertexLabel>, edge_label: Arc<EdgeLabel>, direction: Direction) -> Self {
        let committed = edge_label
            .vertex_map(direction)
            .read()
            .is_committed(&vertex_label.label_ref().qualified_name());
        Self {
            vertex_label,
            edge_label,
            direction,
            committed,
        }
    }

    pub fn vertex_label(&self) -> &Arc<VertexLabel> {
        &self.vertex_label
    }

    pub fn edge_label(&self) -> &Arc<EdgeLabel> {
        &self.edge_label
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the participation existed before the current transaction
    pub fn is_committed(&self) -> bool {
        self.committed
    }
}

impl fmt::Display for EdgeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} role of {} in {}",
            self.direction, self.vertex_label, self.edge_label
        )
    }
}
