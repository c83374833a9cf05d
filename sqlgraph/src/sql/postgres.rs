// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! PostgreSQL dialect

use super::ddl::{Ddl, ForeignKey};
use super::dialect::SqlDialect;
use crate::topology::index::IndexType;
use crate::topology::property::PropertyType;
use crate::topology::types::ID;

/// PostgreSQL identifiers are truncated at 63 bytes (NAMEDATALEN - 1)
const POSTGRES_MAX_IDENTIFIER_LENGTH: usize = 63;

/// Dialect for PostgreSQL and wire-compatible backends
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    max_identifier_length: usize,
}

impl PostgresDialect {
    pub fn new() -> Self {
        Self {
            max_identifier_length: POSTGRES_MAX_IDENTIFIER_LENGTH,
        }
    }

    /// Dialect with a smaller identifier limit, e.g. for a proxy in front of PostgreSQL
    pub fn with_max_identifier_length(max_identifier_length: usize) -> Self {
        Self {
            max_identifier_length,
        }
    }

    fn column_defs(&self, name: &str, property_type: PropertyType) -> Vec<String> {
        property_type
            .column_names(name)
            .iter()
            .zip(self.property_type_sql(property_type))
            .map(|(column, sql_type)| format!("{} {}", self.quote(column), sql_type))
            .collect()
    }

    fn foreign_key_constraint(&self, foreign_key: &ForeignKey) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {} ({}) DEFERRABLE",
            self.quote(&foreign_key.column),
            self.qualified(&foreign_key.references_schema, &foreign_key.references_table),
            self.quote(ID)
        )
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn max_identifier_length(&self) -> usize {
        self.max_identifier_length
    }

    fn quote(&self, identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    fn property_type_sql(&self, property_type: PropertyType) -> Vec<&'static str> {
        match property_type {
            PropertyType::Boolean => vec!["BOOLEAN"],
            PropertyType::Byte | PropertyType::Short => vec!["SMALLINT"],
            PropertyType::Integer => vec!["INTEGER"],
            PropertyType::Long => vec!["BIGINT"],
            PropertyType::Float => vec!["REAL"],
            PropertyType::Double => vec!["DOUBLE PRECISION"],
            PropertyType::String => vec!["TEXT"],
            PropertyType::Uuid => vec!["UUID"],
            PropertyType::LocalDate => vec!["DATE"],
            PropertyType::LocalDateTime => vec!["TIMESTAMP"],
            PropertyType::LocalTime => vec!["TIME"],
            PropertyType::ZonedDateTime => vec!["TIMESTAMP WITH TIME ZONE", "TEXT"],
            PropertyType::Period => vec!["INTEGER", "INTEGER", "INTEGER"],
            PropertyType::Duration => vec!["BIGINT", "INTEGER"],
            PropertyType::Json => vec!["JSONB"],
            PropertyType::Point => vec!["geometry(POINT)"],
            PropertyType::LineString => vec!["geometry(LINESTRING)"],
            PropertyType::Polygon => vec!["geometry(POLYGON)"],
            PropertyType::GeographyPoint => vec!["geography(POINT, 4326)"],
            PropertyType::GeographyPolygon => vec!["geography(POLYGON, 4326)"],
            PropertyType::BooleanArray => vec!["BOOLEAN[]"],
            PropertyType::ByteArray => vec!["BYTEA"],
            PropertyType::ShortArray => vec!["SMALLINT[]"],
            PropertyType::IntegerArray => vec!["INTEGER[]"],
            PropertyType::LongArray => vec!["BIGINT[]"],
            PropertyType::FloatArray => vec!["REAL[]"],
            PropertyType::DoubleArray => vec!["DOUBLE PRECISION[]"],
            PropertyType::StringArray => vec!["TEXT[]"],
            PropertyType::LocalDateArray => vec!["DATE[]"],
            PropertyType::LocalDateTimeArray => vec!["TIMESTAMP[]"],
            PropertyType::LocalTimeArray => vec!["TIME[]"],
        }
    }

    fn id_type_sql(&self) -> &'static str {
        "BIGINT"
    }

    fn render(&self, ddl: &Ddl) -> String {
        match ddl {
            Ddl::CreateSchema { schema } => format!("CREATE SCHEMA {}", self.quote(schema)),
            Ddl::DropSchema { schema } => format!("DROP SCHEMA {} CASCADE", self.quote(schema)),
            Ddl::CreateVertexTable {
                schema,
                table,
                columns,
            } => {
                let mut defs = vec![format!("{} BIGSERIAL PRIMARY KEY", self.quote(ID))];
                for (name, property_type) in columns {
                    defs.extend(self.column_defs(name, *property_type));
                }
                format!(
                    "CREATE TABLE {} ({})",
                    self.qualified(schema, table),
                    defs.join(", ")
                )
            }
            Ddl::CreateEdgeTable {
                schema,
                table,
                columns,
                foreign_keys,
            } => {
                let mut defs = vec![format!("{} BIGSERIAL PRIMARY KEY", self.quote(ID))];
                for (name, property_type) in columns {
                    defs.extend(self.column_defs(name, *property_type));
                }
                for foreign_key in foreign_keys {
                    defs.push(format!(
                        "{} {}",
                        self.quote(&foreign_key.column),
                        self.id_type_sql()
                    ));
                }
                for foreign_key in foreign_keys.iter().filter(|fk| fk.constraint) {
                    defs.push(self.foreign_key_constraint(foreign_key));
                }
                format!(
                    "CREATE TABLE {} ({})",
                    self.qualified(schema, table),
                    defs.join(", ")
                )
            }
            Ddl::AddColumn {
                schema,
                table,
                column,
                property_type,
            } => {
                let adds: Vec<String> = self
                    .column_defs(column, *property_type)
                    .into_iter()
                    .map(|def| format!("ADD COLUMN {}", def))
                    .collect();
                format!(
                    "ALTER TABLE {} {}",
                    self.qualified(schema, table),
                    adds.join(", ")
                )
            }
            Ddl::DropColumn {
                schema,
                table,
                column,
                property_type,
            } => {
                let drops: Vec<String> = property_type
                    .column_names(column)
                    .iter()
                    .map(|c| format!("DROP COLUMN IF EXISTS {} CASCADE", self.quote(c)))
                    .collect();
                format!(
                    "ALTER TABLE {} {}",
                    self.qualified(schema, table),
                    drops.join(", ")
                )
            }
            Ddl::AddForeignKey {
                schema,
                table,
                foreign_key,
            } => {
                let mut sql = format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    self.qualified(schema, table),
                    self.quote(&foreign_key.column),
                    self.id_type_sql()
                );
                if foreign_key.constraint {
                    sql.push_str(", ADD ");
                    sql.push_str(&self.foreign_key_constraint(foreign_key));
                }
                sql
            }
            Ddl::DropForeignKey {
                schema,
                table,
                foreign_key,
            } => format!(
                "ALTER TABLE {} DROP COLUMN IF EXISTS {} CASCADE",
                self.qualified(schema, table),
                self.quote(&foreign_key.column)
            ),
            Ddl::CreateIndex {
                schema,
                table,
                index,
                index_type,
                columns,
            } => {
                let quoted: Vec<String> = columns.iter().map(|c| self.quote(c)).collect();
                let target = self.qualified(schema, table);
                match index_type {
                    IndexType::Unique => format!(
                        "CREATE UNIQUE INDEX {} ON {} ({})",
                        self.quote(index),
                        target,
                        quoted.join(", ")
                    ),
                    IndexType::NonUnique => format!(
                        "CREATE INDEX {} ON {} ({})",
                        self.quote(index),
                        target,
                        quoted.join(", ")
                    ),
                    IndexType::Gin => format!(
                        "CREATE INDEX {} ON {} USING GIN ({})",
                        self.quote(index),
                        target,
                        quoted.join(", ")
                    ),
                    IndexType::GinFullText { configuration } => format!(
                        "CREATE INDEX {} ON {} USING GIN (to_tsvector('{}', {}))",
                        self.quote(index),
                        target,
                        configuration.replace('\'', "''"),
                        quoted.join(" || ' ' || ")
                    ),
                }
            }
            Ddl::DropIndex { schema, index, .. } => {
                format!("DROP INDEX IF EXISTS {}", self.qualified(schema, index))
            }
            Ddl::DropTable { schema, table } => format!(
                "DROP TABLE IF EXISTS {} CASCADE",
                self.qualified(schema, table)
            ),
        }
    }
}
