// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Dialect trait: identifier rules and DDL rendering

use super::ddl::Ddl;
use crate::topology::property::PropertyType;

/// Backend-specific SQL spelling
///
/// The catalog treats every method here as an opaque string-producing service.
pub trait SqlDialect: Send + Sync {
    /// Short dialect name used in logs
    fn name(&self) -> &'static str;

    /// Longest identifier the backend accepts
    fn max_identifier_length(&self) -> usize;

    /// Longest index name the backend accepts
    fn max_index_name_length(&self) -> usize {
        self.max_identifier_length()
    }

    /// Whether `CREATE SCHEMA` is meaningful on this backend
    fn supports_schemas(&self) -> bool {
        true
    }

    /// Quote an identifier
    fn quote(&self, identifier: &str) -> String;

    /// Quote a schema-qualified object name
    fn qualified(&self, schema: &str, object: &str) -> String {
        format!("{}.{}", self.quote(schema), self.quote(object))
    }

    /// SQL column types for a property type, one per physical column
    fn property_type_sql(&self, property_type: PropertyType) -> Vec<&'static str>;

    /// SQL type of the surrogate key and of foreign key columns
    fn id_type_sql(&self) -> &'static str;

    /// Deterministic index name for `(schema, prefix, label, columns)`
    fn index_name(&self, schema: &str, prefix: &str, label: &str, columns: &[String]) -> String {
        let mut name = String::new();
        name.push_str(schema);
        name.push('_');
        name.push_str(prefix);
        name.push_str(label);
        name.push('_');
        for column in columns {
            name.push_str(column);
            name.push('_');
        }
        name.push_str("idx");
        name
    }

    /// Render a typed statement to SQL text
    fn render(&self, ddl: &Ddl) -> String;
}
