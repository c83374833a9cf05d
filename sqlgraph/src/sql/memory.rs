// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory relational backend for testing
//!
//! Applies typed [`Ddl`] to an in-memory physical model, keeps a log of every
//! executed statement, and answers [`DatabaseMetadata`] queries from the model.
//! Several `Topology` instances may share one `Arc<MemoryDatabase>` to act as
//! sibling engines over the same database.

use super::ddl::Ddl;
use super::{DatabaseMetadata, SqlExecutor};
use crate::topology::error::{TopologyError, TopologyResult};
use crate::topology::types::ID;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};

const DEFAULT_SCHEMA: &str = "public";

#[derive(Debug, Default)]
struct MemoryTable {
    columns: BTreeSet<String>,
    indexes: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default)]
struct PhysicalState {
    schemas: BTreeMap<String, BTreeMap<String, MemoryTable>>,
    executed: Vec<(Ddl, String)>,
    fail_next: Option<String>,
}

impl PhysicalState {
    fn schema_mut(&mut self, schema: &str) -> TopologyResult<&mut BTreeMap<String, MemoryTable>> {
        self.schemas
            .get_mut(schema)
            .ok_or_else(|| TopologyError::Dialect(format!("schema \"{}\" does not exist", schema)))
    }

    fn table_mut(&mut self, schema: &str, table: &str) -> TopologyResult<&mut MemoryTable> {
        self.schema_mut(schema)?.get_mut(table).ok_or_else(|| {
            TopologyError::Dialect(format!("relation \"{}.{}\" does not exist", schema, table))
        })
    }

    fn create_table(
        &mut self,
        schema: &str,
        table: &str,
        columns: BTreeSet<String>,
    ) -> TopologyResult<()> {
        let tables = self.schema_mut(schema)?;
        if tables.contains_key(table) {
            return Err(TopologyError::Dialect(format!(
                "relation \"{}.{}\" already exists",
                schema, table
            )));
        }
        tables.insert(
            table.to_string(),
            MemoryTable {
                columns,
                indexes: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn add_columns(&mut self, schema: &str, table: &str, columns: Vec<String>) -> TopologyResult<()> {
        let target = self.table_mut(schema, table)?;
        for column in &columns {
            if target.columns.contains(column) {
                return Err(TopologyError::Dialect(format!(
                    "column \"{}\" of relation \"{}.{}\" already exists",
                    column, schema, table
                )));
            }
        }
        target.columns.extend(columns);
        Ok(())
    }

    fn drop_columns(&mut self, schema: &str, table: &str, columns: &[String]) -> TopologyResult<()> {
        let target = self.table_mut(schema, table)?;
        for column in columns {
            target.columns.remove(column);
        }
        target
            .indexes
            .retain(|_, indexed| !indexed.iter().any(|c| columns.contains(c)));
        Ok(())
    }

    fn index_name_taken(&self, schema: &str, index: &str) -> bool {
        self.schemas
            .get(schema)
            .map(|tables| tables.values().any(|t| t.indexes.contains_key(index)))
            .unwrap_or(false)
    }

    fn apply(&mut self, ddl: &Ddl) -> TopologyResult<()> {
        match ddl {
            Ddl::CreateSchema { schema } => {
                if self.schemas.contains_key(schema) {
                    return Err(TopologyError::Dialect(format!(
                        "schema \"{}\" already exists",
                        schema
                    )));
                }
                self.schemas.insert(schema.clone(), BTreeMap::new());
                Ok(())
            }
            Ddl::DropSchema { schema } => {
                self.schemas.remove(schema).map(|_| ()).ok_or_else(|| {
                    TopologyError::Dialect(format!("schema \"{}\" does not exist", schema))
                })
            }
            Ddl::CreateVertexTable {
                schema,
                table,
                columns,
            } => {
                let mut physical: BTreeSet<String> = BTreeSet::from([ID.to_string()]);
                for (name, property_type) in columns {
                    physical.extend(property_type.column_names(name));
                }
                self.create_table(schema, table, physical)
            }
            Ddl::CreateEdgeTable {
                schema,
                table,
                columns,
                foreign_keys,
            } => {
                let mut physical: BTreeSet<String> = BTreeSet::from([ID.to_string()]);
                for (name, property_type) in columns {
                    physical.extend(property_type.column_names(name));
                }
                for foreign_key in foreign_keys {
                    self.table_mut(&foreign_key.references_schema, &foreign_key.references_table)?;
                    physical.insert(foreign_key.column.clone());
                }
                self.create_table(schema, table, physical)
            }
            Ddl::AddColumn {
                schema,
                table,
                column,
                property_type,
            } => self.add_columns(schema, table, property_type.column_names(column)),
            Ddl::DropColumn {
                schema,
                table,
                column,
                property_type,
            } => self.drop_columns(schema, table, &property_type.column_names(column)),
            Ddl::AddForeignKey {
                schema,
                table,
                foreign_key,
            } => {
                self.table_mut(&foreign_key.references_schema, &foreign_key.references_table)?;
                self.add_columns(schema, table, vec![foreign_key.column.clone()])
            }
            Ddl::DropForeignKey {
                schema,
                table,
                foreign_key,
            } => self.drop_columns(schema, table, &[foreign_key.column.clone()]),
            Ddl::CreateIndex {
                schema,
                table,
                index,
                columns,
                ..
            } => {
                if self.index_name_taken(schema, index) {
                    return Err(TopologyError::Dialect(format!(
                        "relation \"{}.{}\" already exists",
                        schema, index
                    )));
                }
                let target = self.table_mut(schema, table)?;
                if let Some(missing) = columns.iter().find(|c| !target.columns.contains(*c)) {
                    return Err(TopologyError::Dialect(format!(
                        "column \"{}\" does not exist",
                        missing
                    )));
                }
                target.indexes.insert(index.clone(), columns.clone());
                Ok(())
            }
            Ddl::DropIndex {
                schema,
                table,
                index,
            } => {
                if let Ok(target) = self.table_mut(schema, table) {
                    target.indexes.remove(index);
                }
                Ok(())
            }
            Ddl::DropTable { schema, table } => {
                if let Some(tables) = self.schemas.get_mut(schema) {
                    tables.remove(table);
                }
                Ok(())
            }
        }
    }
}

/// In-memory database implementing both [`SqlExecutor`] and [`DatabaseMetadata`]
#[derive(Debug)]
pub struct MemoryDatabase {
    state: Mutex<PhysicalState>,
}

impl MemoryDatabase {
    /// Create a database holding only the default `public` schema
    pub fn new() -> Self {
        let mut state = PhysicalState::default();
        state.schemas.insert(DEFAULT_SCHEMA.to_string(), BTreeMap::new());
        Self {
            state: Mutex::new(state),
        }
    }

    /// Every successfully executed statement, in order
    pub fn executed(&self) -> Vec<Ddl> {
        self.state.lock().executed.iter().map(|(ddl, _)| ddl.clone()).collect()
    }

    /// SQL text of every successfully executed statement, in order
    pub fn statements(&self) -> Vec<String> {
        self.state.lock().executed.iter().map(|(_, sql)| sql.clone()).collect()
    }

    /// Number of executed statements matching `predicate`
    pub fn count_executed<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Ddl) -> bool,
    {
        self.state
            .lock()
            .executed
            .iter()
            .filter(|(ddl, _)| predicate(ddl))
            .count()
    }

    /// Make the next `execute` call fail with `message`
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state.lock().fail_next = Some(message.into());
    }

    /// Table names of a schema
    pub fn tables(&self, schema: &str) -> Vec<String> {
        self.state
            .lock()
            .schemas
            .get(schema)
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlExecutor for MemoryDatabase {
    fn execute(&self, ddl: &Ddl, sql: &str) -> TopologyResult<()> {
        let mut state = self.state.lock();
        if let Some(message) = state.fail_next.take() {
            return Err(TopologyError::Dialect(message));
        }
        state.apply(ddl)?;
        state.executed.push((ddl.clone(), sql.to_string()));
        Ok(())
    }
}

impl DatabaseMetadata for MemoryDatabase {
    fn schema_exists(&self, schema: &str) -> TopologyResult<bool> {
        Ok(self.state.lock().schemas.contains_key(schema))
    }

    fn table_exists(&self, schema: &str, table: &str) -> TopologyResult<bool> {
        Ok(self
            .state
            .lock()
            .schemas
            .get(schema)
            .map(|tables| tables.contains_key(table))
            .unwrap_or(false))
    }

    fn column_names(&self, schema: &str, table: &str) -> TopologyResult<Vec<String>> {
        Ok(self
            .state
            .lock()
            .schemas
            .get(schema)
            .and_then(|tables| tables.get(table))
            .map(|t| t.columns.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn index_exists(&self, schema: &str, table: &str, index: &str) -> TopologyResult<bool> {
        Ok(self
            .state
            .lock()
            .schemas
            .get(schema)
            .and_then(|tables| tables.get(table))
            .map(|t| t.indexes.contains_key(index))
            .unwrap_or(false))
    }
}
