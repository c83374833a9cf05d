// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Relational collaborator boundary
//!
//! The topology catalog owns no SQL syntax. It builds typed [`Ddl`] statements,
//! hands them to a [`SqlDialect`] for rendering and to a [`SqlExecutor`] for
//! execution, and reads live physical metadata through [`DatabaseMetadata`].
//!
//! ```text
//! Topology / Schema / Label
//!     ↓ Ddl
//! SqlDialect::render  →  SQL text
//!     ↓
//! SqlExecutor::execute
//! ```

pub mod ddl;
pub mod dialect;
pub mod memory;
pub mod postgres;

pub use ddl::{Ddl, ForeignKey};
pub use dialect::SqlDialect;
pub use memory::MemoryDatabase;
pub use postgres::PostgresDialect;

use crate::topology::error::TopologyResult;

/// Executes rendered DDL against the backing database
///
/// Implementations receive both the typed statement and the dialect's text so
/// that test doubles can track physical state without parsing SQL.
pub trait SqlExecutor: Send + Sync {
    /// Execute one DDL statement
    fn execute(&self, ddl: &Ddl, sql: &str) -> TopologyResult<()>;
}

/// Live physical metadata of the backing database
///
/// Used by drift validation only; the catalog never mutates through it.
pub trait DatabaseMetadata: Send + Sync {
    /// Whether the schema exists physically
    fn schema_exists(&self, schema: &str) -> TopologyResult<bool>;

    /// Whether the table exists physically
    fn table_exists(&self, schema: &str, table: &str) -> TopologyResult<bool>;

    /// Column names of a table, empty if the table is absent
    fn column_names(&self, schema: &str, table: &str) -> TopologyResult<Vec<String>>;

    /// Whether an index with this name exists on the table
    fn index_exists(&self, schema: &str, table: &str, index: &str) -> TopologyResult<bool>;
}
