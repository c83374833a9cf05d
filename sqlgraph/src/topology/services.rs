// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Collaborators shared by every catalog entity of one topology

use super::config::TopologyConfig;
use super::error::{TopologyError, TopologyResult};
use super::listener::{ListenerRegistry, TopologyChangeAction, TopologyEntity};
use super::lock::{TopologyLock, TopologyTx};
use super::types::{LabelKind, IN_VERTEX_COLUMN_END, OUT_VERTEX_COLUMN_END, POSTFIX_MARKER};
use crate::sql::{Ddl, SqlDialect, SqlExecutor};
use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Dialect, executor, lock and listeners of one topology
///
/// Schemas and labels hold an `Arc` to this instead of a back reference to
/// the topology itself.
pub(crate) struct TopologyServices {
    pub(crate) config: TopologyConfig,
    pub(crate) dialect: Arc<dyn SqlDialect>,
    executor: Arc<dyn SqlExecutor>,
    lock: TopologyLock,
    pub(crate) listeners: ListenerRegistry,
    statements_in_tx: AtomicUsize,
}

impl TopologyServices {
    pub(crate) fn new(
        config: TopologyConfig,
        dialect: Arc<dyn SqlDialect>,
        executor: Arc<dyn SqlExecutor>,
    ) -> Self {
        Self {
            config,
            dialect,
            executor,
            lock: TopologyLock::new(),
            listeners: ListenerRegistry::default(),
            statements_in_tx: AtomicUsize::new(0),
        }
    }

    pub(crate) fn lock(&self, tx: &TopologyTx) {
        self.lock.acquire(tx);
    }

    pub(crate) fn unlock(&self, tx: &TopologyTx) -> bool {
        self.lock.release(tx)
    }

    /// Whether reads on behalf of `tx` include its own uncommitted edits
    pub(crate) fn is_locked_by(&self, tx: &TopologyTx) -> bool {
        self.lock.is_held_by(tx)
    }

    /// Render and run one statement; replay transactions skip it
    pub(crate) fn execute(&self, tx: &TopologyTx, ddl: Ddl) -> TopologyResult<()> {
        assert!(
            self.lock.is_held_by(tx),
            "DDL issued by {} without the topology lock",
            tx.id()
        );
        if tx.is_replay() {
            return Ok(());
        }
        let sql = self.dialect.render(&ddl);
        debug!("{} {}: {}", tx.id(), ddl, sql);
        self.executor.execute(&ddl, &sql)?;
        self.statements_in_tx.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Statements executed since the last call
    pub(crate) fn take_statement_count(&self) -> usize {
        self.statements_in_tx.swap(0, Ordering::Relaxed)
    }

    pub(crate) fn fire(&self, entity: TopologyEntity, action: TopologyChangeAction) {
        debug!("{} {}", action, entity);
        self.listeners.fire(&entity, action);
    }

    pub(crate) fn max_identifier_length(&self) -> usize {
        let dialect = self.dialect.max_identifier_length();
        self.config
            .max_identifier_length
            .map_or(dialect, |configured| configured.min(dialect))
    }

    pub(crate) fn max_index_name_length(&self) -> usize {
        self.dialect
            .max_index_name_length()
            .min(self.max_identifier_length())
    }

    /// Reject names the physical mapping cannot represent
    pub(crate) fn validate_name(&self, name: &str) -> TopologyResult<()> {
        if name.is_empty() {
            return Err(TopologyError::InvalidName("name may not be empty".to_string()));
        }
        if name.contains('.') {
            return Err(TopologyError::InvalidName(format!(
                "{} may not contain '.'",
                name
            )));
        }
        if name.contains(POSTFIX_MARKER) {
            return Err(TopologyError::InvalidName(format!(
                "{} may not contain {}",
                name, POSTFIX_MARKER
            )));
        }
        if name.ends_with(IN_VERTEX_COLUMN_END) || name.ends_with(OUT_VERTEX_COLUMN_END) {
            return Err(TopologyError::InvalidName(format!(
                "{} may not end with {} or {}",
                name, IN_VERTEX_COLUMN_END, OUT_VERTEX_COLUMN_END
            )));
        }
        let limit = self.max_identifier_length();
        if name.len() > limit {
            return Err(TopologyError::InvalidName(format!(
                "{} is longer than {} characters",
                name, limit
            )));
        }
        Ok(())
    }

    /// Validate a label name and the table name derived from it
    pub(crate) fn validate_label_name(&self, label: &str, kind: LabelKind) -> TopologyResult<()> {
        self.validate_name(label)?;
        self.validate_name(&format!("{}{}", kind.prefix(), label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{MemoryDatabase, PostgresDialect};

    fn services(config: TopologyConfig) -> TopologyServices {
        TopologyServices::new(
            config,
            Arc::new(PostgresDialect::new()),
            Arc::new(MemoryDatabase::new()),
        )
    }

    #[test]
    fn test_validate_name() {
        let services = services(TopologyConfig::default());
        assert!(services.validate_name("Person").is_ok());
        assert!(services.validate_name("").is_err());
        assert!(services.validate_name("a.b").is_err());
        assert!(services.validate_name("a~~~b").is_err());
        assert!(services.validate_name("a__I").is_err());
        assert!(services.validate_name("a__O").is_err());
        assert!(services.validate_name(&"x".repeat(64)).is_err());
    }

    #[test]
    fn test_configured_identifier_limit() {
        let services = services(TopologyConfig::default().with_max_identifier_length(10));
        assert_eq!(services.max_identifier_length(), 10);
        assert_eq!(services.max_index_name_length(), 10);
        assert!(services.validate_label_name("abcdefghi", LabelKind::Vertex).is_err());
        assert!(services.validate_label_name("abcdefgh", LabelKind::Vertex).is_ok());
    }

    #[test]
    #[should_panic(expected = "without the topology lock")]
    fn test_execute_requires_lock() {
        let services = services(TopologyConfig::default());
        let tx = TopologyTx::new();
        let _ = services.execute(
            &tx,
            Ddl::CreateSchema {
                schema: "s".to_string(),
            },
        );
    }
}
