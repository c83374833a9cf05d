// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog rows
//!
//! One [`SchemaRecord`] describes the committed state of one schema. Records
//! are what the catalog store persists, what a cold instance loads, and what
//! `Topology::snapshot` returns for comparing two instances.

use super::global_unique_index::GlobalUniqueIndex;
use super::index::{Index, IndexType};
use super::label::AbstractLabel;
use super::property::{PropertyColumn, PropertyType};
use super::schema::Schema;
use super::types::Direction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecord {
    pub name: String,
    pub index_type: IndexType,
    pub properties: Vec<String>,
}

impl From<&Index> for IndexRecord {
    fn from(index: &Index) -> Self {
        Self {
            name: index.name().to_string(),
            index_type: index.index_type().clone(),
            properties: index.property_names(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexLabelRecord {
    pub label: String,
    pub properties: BTreeMap<String, PropertyType>,
    pub indexes: Vec<IndexRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeLabelRecord {
    pub label: String,
    pub properties: BTreeMap<String, PropertyType>,
    pub indexes: Vec<IndexRecord>,
    /// Qualified names of out-vertex labels
    pub out_vertex_labels: Vec<String>,
    /// Qualified names of in-vertex labels
    pub in_vertex_labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaRecord {
    pub name: String,
    pub vertex_labels: Vec<VertexLabelRecord>,
    pub edge_labels: Vec<EdgeLabelRecord>,
    #[serde(default)]
    pub global_unique_indexes: Vec<GlobalUniqueIndex>,
}

fn property_map(properties: BTreeMap<String, PropertyColumn>) -> BTreeMap<String, PropertyType> {
    properties
        .into_iter()
        .map(|(name, column)| (name, column.property_type()))
        .collect()
}

fn index_records(indexes: BTreeMap<String, Index>) -> Vec<IndexRecord> {
    indexes.values().map(IndexRecord::from).collect()
}

impl Schema {
    /// Describe this schema as seen by the lock owner (`own`) or anyone else
    pub(crate) fn to_record(&self, own: bool) -> SchemaRecord {
        let vertex_labels = self
            .vertex_labels_for(own)
            .into_values()
            .map(|vertex| {
                let core = vertex.core();
                VertexLabelRecord {
                    label: vertex.name().to_string(),
                    properties: property_map(core.properties(own)),
                    indexes: index_records(core.indexes(own)),
                }
            })
            .collect();
        let edge_labels = self
            .edge_labels_for(own)
            .into_values()
            .map(|edge| {
                let core = edge.core();
                EdgeLabelRecord {
                    label: edge.name().to_string(),
                    properties: property_map(core.properties(own)),
                    indexes: index_records(core.indexes(own)),
                    out_vertex_labels: edge
                        .vertex_labels_for(own, Direction::Out)
                        .into_keys()
                        .collect(),
                    in_vertex_labels: edge
                        .vertex_labels_for(own, Direction::In)
                        .into_keys()
                        .collect(),
                }
            })
            .collect();
        SchemaRecord {
            name: self.name().to_string(),
            vertex_labels,
            edge_labels,
            global_unique_indexes: self.global_unique_indexes_for(own).into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_shape() {
        let record = SchemaRecord {
            name: "public".to_string(),
            vertex_labels: vec![VertexLabelRecord {
                label: "Person".to_string(),
                properties: BTreeMap::from([("name".to_string(), PropertyType::String)]),
                indexes: vec![IndexRecord {
                    name: "public_V_Person_name_idx".to_string(),
                    index_type: IndexType::Unique,
                    properties: vec!["name".to_string()],
                }],
            }],
            edge_labels: vec![],
            global_unique_indexes: vec![],
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["vertexLabels"][0]["properties"]["name"], "STRING");
        assert_eq!(json["vertexLabels"][0]["indexes"][0]["indexType"], "UNIQUE");

        let parsed: SchemaRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }
}
