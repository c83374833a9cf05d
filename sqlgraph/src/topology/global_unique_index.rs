// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Global unique indexes
//!
//! A global unique index enforces uniqueness of values across properties of
//! several labels. It lives in the reserved `gui_schema` schema and is backed
//! by a table of `(value, recordId, property)` rows with a unique index on
//! `(value, property)`.

use super::index::IndexType;
use super::property::{PropertyColumn, PropertyType};
use super::types::{LabelRef, GLOBAL_UNIQUE_INDEX_SCHEMA, VERTEX_PREFIX};
use crate::sql::{Ddl, SqlDialect};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const VALUE_COLUMN: &str = "value";
pub const RECORD_ID_COLUMN: &str = "recordId";
pub const PROPERTY_COLUMN: &str = "property";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalUniqueIndex {
    name: String,
    properties: Vec<PropertyColumn>,
}

impl GlobalUniqueIndex {
    pub(crate) fn new(name: impl Into<String>, properties: Vec<PropertyColumn>) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &[PropertyColumn] {
        &self.properties
    }

    /// Shared type of the indexed properties
    pub fn property_type(&self) -> Option<PropertyType> {
        self.properties.first().map(|p| p.property_type())
    }

    /// Whether the index covers `property`
    pub fn references(&self, owner: &LabelRef, property: &str) -> bool {
        self.properties
            .iter()
            .any(|p| p.owner() == owner && p.name() == property)
    }

    /// Whether the index covers any property of `owner`
    pub fn references_label(&self, owner: &LabelRef) -> bool {
        self.properties.iter().any(|p| p.owner() == owner)
    }

    /// Whether the index covers exactly `properties`, in any order
    pub fn same_properties(&self, properties: &[PropertyColumn]) -> bool {
        self.properties.len() == properties.len()
            && properties.iter().all(|p| self.properties.contains(p))
    }

    pub fn table(&self) -> LabelRef {
        LabelRef::vertex(GLOBAL_UNIQUE_INDEX_SCHEMA, self.name.clone())
    }

    /// Statements creating the backing table and its unique index
    pub(crate) fn create_ddl(&self, unique_index_name: String) -> Vec<Ddl> {
        let table = self.table();
        let value_type = self.property_type().unwrap_or(PropertyType::String);
        vec![
            Ddl::CreateVertexTable {
                schema: GLOBAL_UNIQUE_INDEX_SCHEMA.to_string(),
                table: table.table_name(),
                columns: vec![
                    (VALUE_COLUMN.to_string(), value_type),
                    (RECORD_ID_COLUMN.to_string(), PropertyType::String),
                    (PROPERTY_COLUMN.to_string(), PropertyType::String),
                ],
            },
            Ddl::CreateIndex {
                schema: GLOBAL_UNIQUE_INDEX_SCHEMA.to_string(),
                table: table.table_name(),
                index: unique_index_name,
                index_type: IndexType::Unique,
                columns: value_type
                    .column_names(VALUE_COLUMN)
                    .into_iter()
                    .chain(std::iter::once(PROPERTY_COLUMN.to_string()))
                    .collect(),
            },
        ]
    }

    pub(crate) fn drop_ddl(&self) -> Ddl {
        Ddl::DropTable {
            schema: GLOBAL_UNIQUE_INDEX_SCHEMA.to_string(),
            table: self.table().table_name(),
        }
    }
}

/// Deterministic name, `<label>_<property>_..._<label>_<property>`
pub(crate) fn deterministic_name(properties: &[PropertyColumn]) -> String {
    properties
        .iter()
        .map(|p| format!("{}_{}", p.owner().label, p.name()))
        .collect::<Vec<_>>()
        .join("_")
}

/// Deterministic name of the backing unique index
pub(crate) fn unique_index_name(dialect: &dyn SqlDialect, name: &str) -> String {
    dialect.index_name(
        GLOBAL_UNIQUE_INDEX_SCHEMA,
        VERTEX_PREFIX,
        name,
        &[VALUE_COLUMN.to_string(), PROPERTY_COLUMN.to_string()],
    )
}

impl fmt::Display for GlobalUniqueIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let properties: Vec<String> = self
            .properties
            .iter()
            .map(|p| format!("{}.{}", p.owner(), p.name()))
            .collect();
        write!(f, "{} ({})", self.name, properties.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::PostgresDialect;

    fn properties() -> Vec<PropertyColumn> {
        vec![
            PropertyColumn::new(LabelRef::vertex("public", "Person"), "email", PropertyType::String),
            PropertyColumn::new(LabelRef::vertex("public", "Company"), "email", PropertyType::String),
        ]
    }

    #[test]
    fn test_deterministic_name() {
        assert_eq!(deterministic_name(&properties()), "Person_email_Company_email");
    }

    #[test]
    fn test_same_properties_ignores_order() {
        let mut reversed = properties();
        reversed.reverse();
        let index = GlobalUniqueIndex::new("gui", properties());
        assert!(index.same_properties(&reversed));
        assert!(!index.same_properties(&reversed[..1]));
        assert!(index.references(&LabelRef::vertex("public", "Person"), "email"));
        assert!(!index.references(&LabelRef::vertex("public", "Person"), "name"));
    }

    #[test]
    fn test_create_ddl() {
        let dialect = PostgresDialect::new();
        let index = GlobalUniqueIndex::new("gui", properties());
        let ddl = index.create_ddl(unique_index_name(&dialect, "gui"));
        assert_eq!(ddl.len(), 2);
        match &ddl[1] {
            Ddl::CreateIndex {
                schema,
                table,
                index_type,
                columns,
                ..
            } => {
                assert_eq!(schema, GLOBAL_UNIQUE_INDEX_SCHEMA);
                assert_eq!(table, "V_gui");
                assert_eq!(index_type, &IndexType::Unique);
                assert_eq!(columns, &vec!["value".to_string(), "property".to_string()]);
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }
}
