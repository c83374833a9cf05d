// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Label indexes

use super::property::PropertyColumn;
use super::types::LabelRef;
use serde::{Deserialize, Serialize};
use std::fmt;

const RANDOM_NAME_PREFIX: &str = "idx_";
const RANDOM_NAME_LENGTH: usize = 24;

/// Kind of physical index
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexType {
    Unique,
    NonUnique,
    /// Generalized inverted index, for arrays and documents
    Gin,
    /// Full-text index with a text search configuration
    GinFullText { configuration: String },
}

impl IndexType {
    pub fn is_unique(&self) -> bool {
        matches!(self, IndexType::Unique)
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexType::Unique => write!(f, "UNIQUE"),
            IndexType::NonUnique => write!(f, "NON_UNIQUE"),
            IndexType::Gin => write!(f, "GIN"),
            IndexType::GinFullText { configuration } => write!(f, "GIN_FULL_TEXT({})", configuration),
        }
    }
}

/// An ordered set of property columns of one label plus an index kind
///
/// Two indexes are interchangeable when owner and ordered property list
/// match; the name alone does not decide it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    owner: LabelRef,
    name: String,
    index_type: IndexType,
    properties: Vec<PropertyColumn>,
}

impl Index {
    pub(crate) fn new(
        owner: LabelRef,
        name: impl Into<String>,
        index_type: IndexType,
        properties: Vec<PropertyColumn>,
    ) -> Self {
        Self {
            owner,
            name: name.into(),
            index_type,
            properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_type(&self) -> &IndexType {
        &self.index_type
    }

    pub fn owner(&self) -> &LabelRef {
        &self.owner
    }

    /// Indexed columns in index order
    pub fn properties(&self) -> &[PropertyColumn] {
        &self.properties
    }

    pub fn property_names(&self) -> Vec<String> {
        self.properties.iter().map(|p| p.name().to_string()).collect()
    }

    /// Whether this index covers exactly `properties`, in order, on `owner`
    pub fn same_shape(&self, owner: &LabelRef, properties: &[PropertyColumn]) -> bool {
        &self.owner == owner
            && self.properties.len() == properties.len()
            && self
                .properties
                .iter()
                .zip(properties)
                .all(|(a, b)| a.name() == b.name() && a.property_type() == b.property_type())
    }

    pub fn references(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p.name() == property)
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} on {} ({})",
            self.index_type,
            self.name,
            self.owner,
            self.property_names().join(", ")
        )
    }
}

/// Random index name for labels whose deterministic name is too long
pub(crate) fn random_index_name(max_length: usize) -> String {
    let mut name = String::from(RANDOM_NAME_PREFIX);
    for _ in 0..RANDOM_NAME_LENGTH {
        name.push(fastrand::alphanumeric().to_ascii_lowercase());
    }
    name.truncate(max_length);
    name
}
