// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared identifiers and naming constants for topology entities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Table prefix of vertex labels
pub const VERTEX_PREFIX: &str = "V_";
/// Table prefix of edge labels
pub const EDGE_PREFIX: &str = "E_";
/// Suffix of an edge table's foreign key column to an in-vertex table
pub const IN_VERTEX_COLUMN_END: &str = "__I";
/// Suffix of an edge table's foreign key column to an out-vertex table
pub const OUT_VERTEX_COLUMN_END: &str = "__O";
/// Surrogate key column present on every vertex and edge table
pub const ID: &str = "ID";
/// Marker separating a property name from its extra physical columns
pub const POSTFIX_MARKER: &str = "~~~";
/// Reserved schema holding global unique indexes
pub const GLOBAL_UNIQUE_INDEX_SCHEMA: &str = "gui_schema";

/// Whether a label describes vertices or edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabelKind {
    Vertex,
    Edge,
}

impl LabelKind {
    /// Physical table prefix for this kind
    pub fn prefix(&self) -> &'static str {
        match self {
            LabelKind::Vertex => VERTEX_PREFIX,
            LabelKind::Edge => EDGE_PREFIX,
        }
    }
}

/// Identity of a vertex or edge label: `(schema, label, kind)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabelRef {
    pub schema: String,
    pub label: String,
    pub kind: LabelKind,
}

impl LabelRef {
    pub fn vertex(schema: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            label: label.into(),
            kind: LabelKind::Vertex,
        }
    }

    pub fn edge(schema: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            label: label.into(),
            kind: LabelKind::Edge,
        }
    }

    /// Fully qualified name, `schema.label`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.label)
    }

    /// Physical table name, `V_label` or `E_label`
    pub fn table_name(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.label)
    }
}

impl fmt::Display for LabelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.schema, self.kind.prefix(), self.label)
    }
}

/// Side of an edge a vertex label participates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Out,
    In,
}

impl Direction {
    /// Foreign key column suffix for this side
    pub fn column_end(&self) -> &'static str {
        match self {
            Direction::Out => OUT_VERTEX_COLUMN_END,
            Direction::In => IN_VERTEX_COLUMN_END,
        }
    }

    /// Foreign key column name on an edge table for a participating vertex label
    pub fn foreign_key_column(&self, vertex: &LabelRef) -> String {
        format!("{}{}", vertex.qualified_name(), self.column_end())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Out => write!(f, "out"),
            Direction::In => write!(f, "in"),
        }
    }
}

/// What a removed incident edge entry means to a vertex label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemovalType {
    /// The whole edge label is gone
    Label,
    /// Only this vertex label's participation is gone
    Role,
}

/// Split `schema.label` into its parts
pub fn split_qualified(qualified: &str) -> Option<(&str, &str)> {
    qualified.split_once('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_ref_names() {
        let person = LabelRef::vertex("public", "Person");
        assert_eq!(person.qualified_name(), "public.Person");
        assert_eq!(person.table_name(), "V_Person");
        assert_eq!(person.to_string(), "public.V_Person");

        let knows = LabelRef::edge("public", "knows");
        assert_eq!(knows.table_name(), "E_knows");
    }

    #[test]
    fn test_foreign_key_column() {
        let person = LabelRef::vertex("public", "Person");
        assert_eq!(
            Direction::Out.foreign_key_column(&person),
            "public.Person__O"
        );
        assert_eq!(Direction::In.foreign_key_column(&person), "public.Person__I");
    }

    #[test]
    fn test_split_qualified() {
        assert_eq!(split_qualified("a.b"), Some(("a", "b")));
        assert_eq!(split_qualified("ab"), None);
    }

    #[test]
    fn test_removal_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&RemovalType::Label).unwrap(),
            "\"LABEL\""
        );
        assert_eq!(serde_json::to_string(&RemovalType::Role).unwrap(), "\"ROLE\"");
    }
}
