// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Notification diff
//!
//! A [`TopologyDiff`] describes one committed transaction's catalog changes.
//! Sibling instances sharing the database apply it to their in-memory catalog
//! without re-reading database metadata.
//!
//! The wire format is versioned JSON. Every field has a default, so a receiver
//! accepts diffs that omit fields it knows and ignores fields it does not.
//!
//! ```json
//! {
//!   "version": 1,
//!   "origin": "5f0c…",
//!   "timestamp": "2025-01-01T00:00:00Z",
//!   "schemas": [{
//!     "name": "public",
//!     "vertexLabels": [{
//!       "label": "Person",
//!       "uncommitted": true,
//!       "uncommittedProperties": [{"name": "name", "type": "STRING"}],
//!       "initialProperties": ["name"]
//!     }]
//!   }]
//! }
//! ```

use super::edge_label::EdgeLabel;
use super::error::{TopologyError, TopologyResult};
use super::global_unique_index::GlobalUniqueIndex;
use super::label::AbstractLabel;
use super::lock::TopologyTx;
use super::property::{PropertyColumn, PropertyType};
use super::record::{IndexRecord, SchemaRecord};
use super::schema::Schema;
use super::staged::EntryState;
use super::types::{split_qualified, Direction, RemovalType};
use super::vertex_label::VertexLabel;
use super::Topology;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Current diff format version
pub const TOPOLOGY_DIFF_VERSION: u32 = 1;

/// Delivers committed diffs to sibling instances
///
/// The transport is up to the implementation; a failing publish is logged and
/// does not undo the commit.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, diff: &TopologyDiff) -> TopologyResult<()>;
}

impl<F> NotificationPublisher for F
where
    F: Fn(&TopologyDiff) -> TopologyResult<()> + Send + Sync,
{
    fn publish(&self, diff: &TopologyDiff) -> TopologyResult<()> {
        self(diff)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDiff {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
}

impl From<&PropertyColumn> for PropertyDiff {
    fn from(column: &PropertyColumn) -> Self {
        Self {
            name: column.name().to_string(),
            property_type: column.property_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedEdgeLabel {
    /// Qualified edge label name, `schema.label`
    pub name: String,
    pub removal_type: RemovalType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeLabelDiff {
    pub schema: String,
    pub label: String,
    /// The edge label itself is new
    pub uncommitted: bool,
    /// The enclosing vertex label's role came with the new edge table
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub initial_role: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_properties: Vec<PropertyDiff>,
    /// Entries of `uncommitted_properties` the new table was created with
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub initial_properties: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_removed_properties: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_indexes: Vec<IndexRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_removed_indexes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VertexLabelDiff {
    pub label: String,
    /// The vertex label itself is new
    pub uncommitted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_properties: Vec<PropertyDiff>,
    /// Entries of `uncommitted_properties` the new table was created with
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub initial_properties: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_removed_properties: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_indexes: Vec<IndexRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_removed_indexes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_out_edge_labels: Vec<EdgeLabelDiff>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_in_edge_labels: Vec<EdgeLabelDiff>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_removed_out_edge_labels: Vec<RemovedEdgeLabel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_removed_in_edge_labels: Vec<RemovedEdgeLabel>,
}

impl VertexLabelDiff {
    pub fn is_empty(&self) -> bool {
        !self.uncommitted
            && self.uncommitted_properties.is_empty()
            && self.uncommitted_removed_properties.is_empty()
            && self.uncommitted_indexes.is_empty()
            && self.uncommitted_removed_indexes.is_empty()
            && self.uncommitted_out_edge_labels.is_empty()
            && self.uncommitted_in_edge_labels.is_empty()
            && self.uncommitted_removed_out_edge_labels.is_empty()
            && self.uncommitted_removed_in_edge_labels.is_empty()
    }

    pub(crate) fn edge_labels(&self, direction: Direction) -> &[EdgeLabelDiff] {
        match direction {
            Direction::Out => &self.uncommitted_out_edge_labels,
            Direction::In => &self.uncommitted_in_edge_labels,
        }
    }

    fn edge_labels_mut(&mut self, direction: Direction) -> &mut Vec<EdgeLabelDiff> {
        match direction {
            Direction::Out => &mut self.uncommitted_out_edge_labels,
            Direction::In => &mut self.uncommitted_in_edge_labels,
        }
    }

    pub(crate) fn removed_edge_labels(&self, direction: Direction) -> &[RemovedEdgeLabel] {
        match direction {
            Direction::Out => &self.uncommitted_removed_out_edge_labels,
            Direction::In => &self.uncommitted_removed_in_edge_labels,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaDiff {
    pub name: String,
    /// The schema itself is new
    pub uncommitted: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vertex_labels: Vec<VertexLabelDiff>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_removed_vertex_labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_removed_edge_labels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_global_unique_indexes: Vec<GlobalUniqueIndex>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_removed_global_unique_indexes: Vec<String>,
}

impl SchemaDiff {
    fn new(name: &str, uncommitted: bool) -> Self {
        Self {
            name: name.to_string(),
            uncommitted,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.uncommitted
            && self.vertex_labels.is_empty()
            && self.uncommitted_removed_vertex_labels.is_empty()
            && self.uncommitted_removed_edge_labels.is_empty()
            && self.uncommitted_global_unique_indexes.is_empty()
            && self.uncommitted_removed_global_unique_indexes.is_empty()
    }

    pub fn vertex_label(&self, label: &str) -> Option<&VertexLabelDiff> {
        self.vertex_labels.iter().find(|v| v.label == label)
    }

    fn vertex_label_mut(&mut self, label: &str) -> &mut VertexLabelDiff {
        let position = match self.vertex_labels.iter().position(|v| v.label == label) {
            Some(position) => position,
            None => {
                self.vertex_labels.push(VertexLabelDiff {
                    label: label.to_string(),
                    uncommitted: true,
                    ..VertexLabelDiff::default()
                });
                self.vertex_labels.len() - 1
            }
        };
        &mut self.vertex_labels[position]
    }
}

/// One transaction's catalog changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopologyDiff {
    pub version: u32,
    /// Instance that committed the transaction
    pub origin: Uuid,
    pub timestamp: DateTime<Utc>,
    pub schemas: Vec<SchemaDiff>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uncommitted_removed_schemas: Vec<String>,
}

impl Default for TopologyDiff {
    fn default() -> Self {
        Self::new(Uuid::nil())
    }
}

impl TopologyDiff {
    pub fn new(origin: Uuid) -> Self {
        Self {
            version: TOPOLOGY_DIFF_VERSION,
            origin,
            timestamp: Utc::now(),
            schemas: Vec::new(),
            uncommitted_removed_schemas: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.uncommitted_removed_schemas.is_empty()
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaDiff> {
        self.schemas.iter().find(|s| s.name == name)
    }

    pub fn to_json(&self) -> TopologyResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> TopologyResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| TopologyError::Notification(format!("malformed diff: {}", e)))
    }

    /// Describe a whole committed catalog as one diff creating everything
    pub fn from_records(records: &[SchemaRecord]) -> Self {
        let mut schemas: BTreeMap<String, SchemaDiff> = BTreeMap::new();
        for record in records {
            let schema = schemas
                .entry(record.name.clone())
                .or_insert_with(|| SchemaDiff::new(&record.name, true));
            for vertex in &record.vertex_labels {
                let diff = schema.vertex_label_mut(&vertex.label);
                diff.uncommitted_properties = vertex
                    .properties
                    .iter()
                    .map(|(name, property_type)| PropertyDiff {
                        name: name.clone(),
                        property_type: *property_type,
                    })
                    .collect();
                diff.initial_properties = vertex.properties.keys().cloned().collect();
                diff.uncommitted_indexes = vertex.indexes.clone();
            }
            schema.uncommitted_global_unique_indexes = record.global_unique_indexes.clone();
        }

        for record in records {
            for edge in &record.edge_labels {
                let edge_diff = EdgeLabelDiff {
                    schema: record.name.clone(),
                    label: edge.label.clone(),
                    uncommitted: true,
                    initial_role: true,
                    uncommitted_properties: edge
                        .properties
                        .iter()
                        .map(|(name, property_type)| PropertyDiff {
                            name: name.clone(),
                            property_type: *property_type,
                        })
                        .collect(),
                    initial_properties: edge.properties.keys().cloned().collect(),
                    uncommitted_indexes: edge.indexes.clone(),
                    ..EdgeLabelDiff::default()
                };
                let sides = [
                    (Direction::Out, &edge.out_vertex_labels),
                    (Direction::In, &edge.in_vertex_labels),
                ];
                for (direction, vertices) in sides {
                    for qualified in vertices {
                        let Some((schema, label)) = split_qualified(qualified) else {
                            continue;
                        };
                        schemas
                            .entry(schema.to_string())
                            .or_insert_with(|| SchemaDiff::new(schema, true))
                            .vertex_label_mut(label)
                            .edge_labels_mut(direction)
                            .push(edge_diff.clone());
                    }
                }
            }
        }

        Self {
            schemas: schemas.into_values().collect(),
            ..Self::new(Uuid::nil())
        }
    }
}

fn edge_label_diff(edge: &EdgeLabel, vertex: &str, direction: Direction) -> EdgeLabelDiff {
    let core = edge.core();
    EdgeLabelDiff {
        schema: edge.schema_name().to_string(),
        label: edge.name().to_string(),
        uncommitted: !edge.vertex_map(Direction::Out).read().has_committed(),
        initial_role: edge.is_initial_role(direction, vertex),
        uncommitted_properties: core.uncommitted_properties().iter().map(PropertyDiff::from).collect(),
        initial_properties: core.initial_properties(),
        uncommitted_removed_properties: core.removed_properties(),
        uncommitted_indexes: core.uncommitted_indexes().iter().map(IndexRecord::from).collect(),
        uncommitted_removed_indexes: core.removed_indexes(),
    }
}

impl Topology {
    /// Describe the lock owner's uncommitted changes; call before reconciling
    pub(crate) fn build_diff(&self, tx: &TopologyTx) -> TopologyDiff {
        debug_assert!(self.services.is_locked_by(tx));
        let mut diff = TopologyDiff::new(self.instance_id);
        let schemas: Vec<(Arc<Schema>, bool)> = {
            let map = self.schemas.read();
            diff.uncommitted_removed_schemas = map.removed().map(|(name, _)| name.clone()).collect();
            map.visible(true)
                .map(|(name, schema)| {
                    (Arc::clone(schema), map.state(name) == Some(EntryState::Uncommitted))
                })
                .collect()
        };
        for (schema, is_new) in schemas {
            let schema_diff = self.schema_diff(&schema, is_new);
            if !schema_diff.is_empty() {
                diff.schemas.push(schema_diff);
            }
        }
        diff
    }

    fn schema_diff(&self, schema: &Schema, is_new: bool) -> SchemaDiff {
        let mut diff = SchemaDiff::new(schema.name(), is_new);
        diff.uncommitted_removed_vertex_labels = schema
            .vertex_labels
            .read()
            .removed()
            .map(|(name, _)| name.clone())
            .collect();
        diff.uncommitted_removed_edge_labels = schema
            .edge_labels
            .read()
            .removed()
            .map(|(name, _)| name.clone())
            .collect();
        {
            let indexes = schema.global_unique_indexes.read();
            diff.uncommitted_global_unique_indexes =
                indexes.uncommitted().map(|(_, index)| index.clone()).collect();
            diff.uncommitted_removed_global_unique_indexes =
                indexes.removed().map(|(name, _)| name.clone()).collect();
        }

        for (label, vertex) in schema.vertex_labels_for(true) {
            let is_new = schema.vertex_labels.read().state(&label) == Some(EntryState::Uncommitted);
            let vertex_diff = self.vertex_label_diff(&vertex, is_new);
            if !vertex_diff.is_empty() {
                diff.vertex_labels.push(vertex_diff);
            }
        }
        diff
    }

    fn vertex_label_diff(&self, vertex: &VertexLabel, is_new: bool) -> VertexLabelDiff {
        let core = vertex.core();
        let mut diff = VertexLabelDiff {
            label: vertex.name().to_string(),
            uncommitted: is_new,
            uncommitted_properties: core.uncommitted_properties().iter().map(PropertyDiff::from).collect(),
            initial_properties: core.initial_properties(),
            uncommitted_removed_properties: core.removed_properties(),
            uncommitted_indexes: core.uncommitted_indexes().iter().map(IndexRecord::from).collect(),
            uncommitted_removed_indexes: core.removed_indexes(),
            ..VertexLabelDiff::default()
        };

        let qualified = vertex.label_ref().qualified_name();
        for direction in [Direction::Out, Direction::In] {
            let map = vertex.edge_map(direction).read();
            let added: Vec<EdgeLabelDiff> = map
                .visible(true)
                .filter(|(name, edge)| {
                    map.state(name) == Some(EntryState::Uncommitted) || edge.core().has_pending()
                })
                .map(|(_, edge)| edge_label_diff(edge, &qualified, direction))
                .collect();
            let removed: Vec<RemovedEdgeLabel> = map
                .removed()
                .map(|(name, edge)| RemovedEdgeLabel {
                    name: name.clone(),
                    removal_type: if self.is_edge_label_live(edge) {
                        RemovalType::Role
                    } else {
                        RemovalType::Label
                    },
                })
                .collect();
            match direction {
                Direction::Out => {
                    diff.uncommitted_out_edge_labels = added;
                    diff.uncommitted_removed_out_edge_labels = removed;
                }
                Direction::In => {
                    diff.uncommitted_in_edge_labels = added;
                    diff.uncommitted_removed_in_edge_labels = removed;
                }
            }
        }
        diff
    }

    /// Whether `edge` is still the lock owner's edge label of its name
    fn is_edge_label_live(&self, edge: &Arc<EdgeLabel>) -> bool {
        self.schema_for(true, edge.schema_name())
            .and_then(|schema| schema.edge_label_for(true, edge.name()))
            .map_or(false, |live| Arc::ptr_eq(&live, edge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::record::{EdgeLabelRecord, VertexLabelRecord};

    #[test]
    fn test_missing_fields_default() {
        let diff = TopologyDiff::from_json(r#"{"schemas":[{"name":"public"}]}"#).unwrap();
        assert_eq!(diff.version, TOPOLOGY_DIFF_VERSION);
        assert_eq!(diff.schemas[0].name, "public");
        assert!(!diff.schemas[0].uncommitted);
        assert!(diff.uncommitted_removed_schemas.is_empty());
    }

    #[test]
    fn test_malformed_json_is_notification_error() {
        assert!(matches!(
            TopologyDiff::from_json("[1, 2"),
            Err(TopologyError::Notification(_))
        ));
    }

    #[test]
    fn test_vertex_label_wire_shape() {
        let diff = VertexLabelDiff {
            label: "Person".to_string(),
            uncommitted_properties: vec![PropertyDiff {
                name: "name".to_string(),
                property_type: PropertyType::String,
            }],
            ..VertexLabelDiff::default()
        };
        let json = serde_json::to_value(&diff).unwrap();
        assert_eq!(json["label"], "Person");
        assert_eq!(json["uncommittedProperties"][0]["name"], "name");
        assert_eq!(json["uncommittedProperties"][0]["type"], "STRING");
        assert!(json.get("uncommittedIndexes").is_none());
    }

    #[test]
    fn test_from_records_places_edges_under_both_sides() {
        let records = vec![SchemaRecord {
            name: "public".to_string(),
            vertex_labels: vec![
                VertexLabelRecord {
                    label: "Person".to_string(),
                    properties: BTreeMap::from([("name".to_string(), PropertyType::String)]),
                    indexes: vec![],
                },
                VertexLabelRecord {
                    label: "Dog".to_string(),
                    properties: BTreeMap::new(),
                    indexes: vec![],
                },
            ],
            edge_labels: vec![EdgeLabelRecord {
                label: "owns".to_string(),
                properties: BTreeMap::new(),
                indexes: vec![],
                out_vertex_labels: vec!["public.Person".to_string()],
                in_vertex_labels: vec!["public.Dog".to_string()],
            }],
            global_unique_indexes: vec![],
        }];

        let diff = TopologyDiff::from_records(&records);
        let schema = diff.schema("public").unwrap();
        assert!(schema.uncommitted);
        let person = schema.vertex_label("Person").unwrap();
        assert_eq!(person.uncommitted_properties.len(), 1);
        assert_eq!(person.initial_properties, vec!["name"]);
        assert_eq!(person.uncommitted_out_edge_labels[0].label, "owns");
        let dog = schema.vertex_label("Dog").unwrap();
        assert_eq!(dog.uncommitted_in_edge_labels[0].schema, "public");
    }
}
