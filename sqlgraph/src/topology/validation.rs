// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Drift detection between the committed catalog and the live database

use super::error::TopologyResult;
use super::global_unique_index::{PROPERTY_COLUMN, RECORD_ID_COLUMN, VALUE_COLUMN};
use super::label::AbstractLabel;
use super::schema::Schema;
use super::types::Direction;
use super::Topology;
use crate::sql::DatabaseMetadata;
use log::warn;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftKind {
    MissingSchema,
    MissingTable,
    MissingColumn,
    MissingForeignKeyColumn,
    MissingIndex,
}

/// A catalog entry with no physical counterpart
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{message}")]
pub struct TopologyValidationError {
    pub kind: DriftKind,
    pub schema: String,
    pub table: Option<String>,
    /// The missing schema, table, column or index name
    pub object: String,
    pub message: String,
}

impl TopologyValidationError {
    fn new(kind: DriftKind, schema: &str, table: Option<&str>, object: &str) -> Self {
        let location = match table {
            Some(table) => format!("{}.{}", schema, table),
            None => schema.to_string(),
        };
        let message = match kind {
            DriftKind::MissingSchema => format!("schema {} does not exist", schema),
            DriftKind::MissingTable => format!("table {} does not exist", location),
            DriftKind::MissingColumn => format!("column {} does not exist on {}", object, location),
            DriftKind::MissingForeignKeyColumn => {
                format!("foreign key column {} does not exist on {}", object, location)
            }
            DriftKind::MissingIndex => format!("index {} does not exist on {}", object, location),
        };
        Self {
            kind,
            schema: schema.to_string(),
            table: table.map(str::to_string),
            object: object.to_string(),
            message,
        }
    }
}

struct DriftReport<'a> {
    metadata: &'a dyn DatabaseMetadata,
    drift: Vec<TopologyValidationError>,
}

impl DriftReport<'_> {
    /// Check a table and the given columns; false if the table is missing
    fn table(
        &mut self,
        schema: &str,
        table: &str,
        columns: impl IntoIterator<Item = (String, DriftKind)>,
    ) -> TopologyResult<bool> {
        if !self.metadata.table_exists(schema, table)? {
            self.drift.push(TopologyValidationError::new(DriftKind::MissingTable, schema, Some(table), table));
            return Ok(false);
        }
        let physical: BTreeSet<String> = self.metadata.column_names(schema, table)?.into_iter().collect();
        for (column, kind) in columns {
            if !physical.contains(&column) {
                self.drift.push(TopologyValidationError::new(kind, schema, Some(table), &column));
            }
        }
        Ok(true)
    }

    fn label<L: AbstractLabel + ?Sized>(
        &mut self,
        label: &L,
        foreign_keys: Vec<String>,
    ) -> TopologyResult<()> {
        let core = label.core();
        let schema = label.schema_name();
        let table = label.table_name();
        let columns = core
            .properties(false)
            .into_values()
            .flat_map(|column| column.column_names())
            .map(|column| (column, DriftKind::MissingColumn))
            .chain(
                foreign_keys
                    .into_iter()
                    .map(|column| (column, DriftKind::MissingForeignKeyColumn)),
            );
        if !self.table(schema, &table, columns)? {
            return Ok(());
        }
        for index in core.indexes(false).into_values() {
            if !self.metadata.index_exists(schema, &table, index.name())? {
                self.drift.push(TopologyValidationError::new(
                    DriftKind::MissingIndex,
                    schema,
                    Some(&table),
                    index.name(),
                ));
            }
        }
        Ok(())
    }

    fn schema(&mut self, schema: &Schema, check_schema: bool) -> TopologyResult<()> {
        if check_schema && !self.metadata.schema_exists(schema.name())? {
            self.drift.push(TopologyValidationError::new(
                DriftKind::MissingSchema,
                schema.name(),
                None,
                schema.name(),
            ));
            return Ok(());
        }
        for vertex in schema.vertex_labels_for(false).into_values() {
            self.label(vertex.as_ref(), Vec::new())?;
        }
        for edge in schema.edge_labels_for(false).into_values() {
            let foreign_keys = [Direction::Out, Direction::In]
                .into_iter()
                .flat_map(|direction| {
                    edge.vertex_labels_for(false, direction)
                        .into_values()
                        .map(move |vertex| direction.foreign_key_column(vertex.label_ref()))
                })
                .collect();
            self.label(edge.as_ref(), foreign_keys)?;
        }
        for index in schema.global_unique_indexes_for(false).into_values() {
            let table = index.table();
            let value_columns = index
                .property_type()
                .map(|t| t.column_names(VALUE_COLUMN))
                .unwrap_or_else(|| vec![VALUE_COLUMN.to_string()]);
            let columns = value_columns
                .into_iter()
                .chain([RECORD_ID_COLUMN.to_string(), PROPERTY_COLUMN.to_string()])
                .map(|column| (column, DriftKind::MissingColumn));
            self.table(schema.name(), &table.table_name(), columns)?;
        }
        Ok(())
    }
}

impl Topology {
    /// Report every committed catalog entry with no physical counterpart
    ///
    /// Covers schemas, label tables, property columns with all their
    /// physical parts, edge foreign key columns, indexes and global unique
    /// index tables. Nothing is changed; each finding is also logged.
    pub fn validate_against_database(
        &self,
        metadata: &dyn DatabaseMetadata,
    ) -> TopologyResult<Vec<TopologyValidationError>> {
        let schemas: Vec<Arc<Schema>> = self
            .schemas
            .read()
            .visible(false)
            .map(|(_, schema)| Arc::clone(schema))
            .collect();
        let mut report = DriftReport {
            metadata,
            drift: Vec::new(),
        };
        let check_schemas = self.services.dialect.supports_schemas();
        for schema in &schemas {
            report.schema(schema, check_schemas)?;
        }
        for drift in &report.drift {
            warn!("topology drift: {}", drift);
        }
        Ok(report.drift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{Ddl, MemoryDatabase, PostgresDialect, SqlExecutor};
    use crate::topology::property::PropertyType;
    use std::collections::BTreeMap;

    #[test]
    fn test_clean_catalog_has_no_drift() {
        let db = Arc::new(MemoryDatabase::new());
        let topology = Topology::builder(Arc::new(PostgresDialect::new()), db.clone())
            .open()
            .unwrap();
        let tx = topology.begin();
        let a = topology
            .ensure_vertex_label_exists(
                &tx,
                "public",
                "A",
                &BTreeMap::from([("at".to_string(), PropertyType::ZonedDateTime)]),
            )
            .unwrap();
        topology
            .ensure_edge_label_exists(&tx, "next", &a, &a, &BTreeMap::new())
            .unwrap();
        topology.commit(&tx).unwrap();

        assert!(topology.validate_against_database(db.as_ref()).unwrap().is_empty());
    }

    #[test]
    fn test_dropped_column_is_reported() {
        let db = Arc::new(MemoryDatabase::new());
        let topology = Topology::builder(Arc::new(PostgresDialect::new()), db.clone())
            .open()
            .unwrap();
        let tx = topology.begin();
        topology
            .ensure_vertex_label_exists(
                &tx,
                "public",
                "A",
                &BTreeMap::from([("name".to_string(), PropertyType::String)]),
            )
            .unwrap();
        topology.commit(&tx).unwrap();

        let drop = Ddl::DropColumn {
            schema: "public".to_string(),
            table: "V_A".to_string(),
            column: "name".to_string(),
            property_type: PropertyType::String,
        };
        db.execute(&drop, "").unwrap();

        let drift = topology.validate_against_database(db.as_ref()).unwrap();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].kind, DriftKind::MissingColumn);
        assert_eq!(drift[0].object, "name");
        assert_eq!(drift[0].table.as_deref(), Some("V_A"));
    }
}
