// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the topology catalog

use crate::storage::persistent::types::StorageDriverError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TopologyError {
    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    #[error("Vertex label not found: {0}")]
    VertexLabelNotFound(String),

    #[error("Edge label not found: {0}")]
    EdgeLabelNotFound(String),

    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Structural conflict, e.g. a property that already exists with another type
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// The executor rejected a DDL statement
    #[error("Dialect error: {0}")]
    Dialect(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed or unsupported notification diff
    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TopologyError {
    fn from(err: serde_json::Error) -> Self {
        TopologyError::Serialization(err.to_string())
    }
}

impl From<StorageDriverError> for TopologyError {
    fn from(err: StorageDriverError) -> Self {
        TopologyError::Storage(err.to_string())
    }
}

pub type TopologyResult<T> = Result<T, TopologyError>;
