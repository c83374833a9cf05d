// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
// Topology configuration

use super::error::TopologyResult;
use serde::{Deserialize, Serialize};

/// Configuration for a topology instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Schema used when callers do not name one
    pub default_schema: String,

    /// Whether edge foreign key columns carry a physical constraint
    pub implement_foreign_keys: bool,

    /// Whether commits are published to sibling instances
    pub distributed: bool,

    /// Identifier length limit; `None` uses the dialect's limit
    pub max_identifier_length: Option<usize>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            default_schema: "public".to_string(),
            implement_foreign_keys: true,
            distributed: false,
            max_identifier_length: None,
        }
    }
}

impl TopologyConfig {
    /// A single process owns the database
    pub fn single_instance() -> Self {
        Self::default()
    }

    /// Several processes share the database and replicate through notifications
    pub fn distributed() -> Self {
        Self {
            distributed: true,
            ..Self::default()
        }
    }

    /// Parse a configuration; absent fields take their defaults
    pub fn from_json(json: &str) -> TopologyResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_max_identifier_length(mut self, length: usize) -> Self {
        self.max_identifier_length = Some(length);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let single = TopologyConfig::single_instance();
        assert!(!single.distributed);
        assert!(single.implement_foreign_keys);
        assert_eq!(single.default_schema, "public");

        assert!(TopologyConfig::distributed().distributed);
    }

    #[test]
    fn test_from_json_partial() {
        let config = TopologyConfig::from_json(r#"{"distributed": true, "max_identifier_length": 30}"#)
            .unwrap();
        assert!(config.distributed);
        assert_eq!(config.max_identifier_length, Some(30));
        assert_eq!(config.default_schema, "public");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(TopologyConfig::from_json("{not json").is_err());
    }
}
