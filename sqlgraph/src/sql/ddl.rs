// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Typed physical DDL statements issued by the topology catalog

use crate::topology::index::IndexType;
use crate::topology::property::PropertyType;
use std::fmt;

/// Foreign key column on an edge table pointing at a vertex table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Column on the edge table, e.g. `public.Person__O`
    pub column: String,
    /// Schema of the referenced vertex table
    pub references_schema: String,
    /// Referenced vertex table, e.g. `V_Person`
    pub references_table: String,
    /// Whether a physical constraint accompanies the column
    pub constraint: bool,
}

/// A physical schema change
///
/// Property columns are carried as `(name, type)` pairs; the dialect expands
/// multi-column property types into one physical column per postfix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ddl {
    CreateSchema {
        schema: String,
    },
    DropSchema {
        schema: String,
    },
    CreateVertexTable {
        schema: String,
        table: String,
        columns: Vec<(String, PropertyType)>,
    },
    CreateEdgeTable {
        schema: String,
        table: String,
        columns: Vec<(String, PropertyType)>,
        foreign_keys: Vec<ForeignKey>,
    },
    AddColumn {
        schema: String,
        table: String,
        column: String,
        property_type: PropertyType,
    },
    DropColumn {
        schema: String,
        table: String,
        column: String,
        property_type: PropertyType,
    },
    AddForeignKey {
        schema: String,
        table: String,
        foreign_key: ForeignKey,
    },
    DropForeignKey {
        schema: String,
        table: String,
        foreign_key: ForeignKey,
    },
    CreateIndex {
        schema: String,
        table: String,
        index: String,
        index_type: IndexType,
        columns: Vec<String>,
    },
    DropIndex {
        schema: String,
        table: String,
        index: String,
    },
    DropTable {
        schema: String,
        table: String,
    },
}

impl Ddl {
    /// Schema the statement applies to
    pub fn schema(&self) -> &str {
        match self {
            Ddl::CreateSchema { schema }
            | Ddl::DropSchema { schema }
            | Ddl::CreateVertexTable { schema, .. }
            | Ddl::CreateEdgeTable { schema, .. }
            | Ddl::AddColumn { schema, .. }
            | Ddl::DropColumn { schema, .. }
            | Ddl::AddForeignKey { schema, .. }
            | Ddl::DropForeignKey { schema, .. }
            | Ddl::CreateIndex { schema, .. }
            | Ddl::DropIndex { schema, .. }
            | Ddl::DropTable { schema, .. } => schema,
        }
    }

    /// Whether the statement removes a physical object
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Ddl::DropSchema { .. }
                | Ddl::DropColumn { .. }
                | Ddl::DropForeignKey { .. }
                | Ddl::DropIndex { .. }
                | Ddl::DropTable { .. }
        )
    }
}

impl fmt::Display for Ddl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ddl::CreateSchema { schema } => write!(f, "create schema {}", schema),
            Ddl::DropSchema { schema } => write!(f, "drop schema {}", schema),
            Ddl::CreateVertexTable { schema, table, .. }
            | Ddl::CreateEdgeTable { schema, table, .. } => {
                write!(f, "create table {}.{}", schema, table)
            }
            Ddl::AddColumn {
                schema,
                table,
                column,
                ..
            } => write!(f, "add column {}.{}.{}", schema, table, column),
            Ddl::DropColumn {
                schema,
                table,
                column,
                ..
            } => write!(f, "drop column {}.{}.{}", schema, table, column),
            Ddl::AddForeignKey {
                schema,
                table,
                foreign_key,
            } => write!(f, "add foreign key {}.{}.{}", schema, table, foreign_key.column),
            Ddl::DropForeignKey {
                schema,
                table,
                foreign_key,
            } => write!(
                f,
                "drop foreign key {}.{}.{}",
                schema, table, foreign_key.column
            ),
            Ddl::CreateIndex {
                schema,
                table,
                index,
                ..
            } => write!(f, "create index {} on {}.{}", index, schema, table),
            Ddl::DropIndex { schema, index, .. } => write!(f, "drop index {}.{}", schema, index),
            Ddl::DropTable { schema, table } => write!(f, "drop table {}.{}", schema, table),
        }
    }
}
