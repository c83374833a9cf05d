// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! sqlgraph - a property graph topology catalog over relational storage
//!
//! Vertex labels map to tables, edge labels to tables with foreign key
//! columns to the vertex tables they connect, and properties to columns.
//! The [`Topology`] keeps the in-memory catalog of that mapping consistent
//! with the physical database and with sibling instances sharing it.
//!
//! # Features
//!
//! - **Two-phase visibility**: a transaction sees its own uncommitted catalog
//!   edits, everyone else sees the committed catalog until it commits
//! - **Idempotent ensure operations**: concurrent callers converge on one
//!   label, property or index
//! - **Pluggable dialect**: the catalog owns no SQL text; a [`sql::SqlDialect`]
//!   renders typed DDL
//! - **Notification diffs**: each commit yields a versioned JSON diff that
//!   sibling instances apply without re-reading database metadata
//! - **Catalog store**: committed rows persist to sled or memory and reload
//!   on open
//! - **Drift validation**: compare the catalog with live database metadata
//!
//! # Usage
//!
//! ```ignore
//! use sqlgraph::sql::{MemoryDatabase, PostgresDialect};
//! use sqlgraph::{PropertyType, Topology};
//!
//! let db = Arc::new(MemoryDatabase::new());
//! let topology = Topology::builder(Arc::new(PostgresDialect::new()), db).open()?;
//!
//! let tx = topology.begin();
//! let props = BTreeMap::from([("name".to_string(), PropertyType::String)]);
//! topology.ensure_vertex_label_exists(&tx, "public", "Person", &props)?;
//! let diff = topology.commit(&tx)?;
//! ```

pub mod sql;
pub mod storage;
pub mod topology;

pub use storage::{CatalogStore, StorageType};
pub use topology::{
    AbstractLabel, Direction, DriftKind, EdgeLabel, EdgeRole, GlobalUniqueIndex, Index, IndexType,
    LabelKind, LabelRef, ListenerId, NotificationPublisher, PropertyColumn, PropertyType, Schema,
    SchemaRecord, Topology, TopologyBuilder, TopologyChangeAction, TopologyConfig, TopologyDiff,
    TopologyEntity, TopologyError, TopologyListener, TopologyResult, TopologyTx,
    TopologyValidationError, VertexLabel,
};

/// sqlgraph version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// sqlgraph crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
