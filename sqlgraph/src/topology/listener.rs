// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Change listeners
//!
//! Listeners are invoked synchronously for every catalog CREATE and DELETE.
//! A listener that fails or panics is logged and skipped; the remaining
//! listeners still run and the catalog mutation stands.

use super::index::Index;
use super::property::PropertyColumn;
use super::types::{Direction, LabelRef};
use log::error;
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Error a listener may return
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Catalog entity a change event is about
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyEntity {
    Schema {
        name: String,
    },
    VertexLabel(LabelRef),
    EdgeLabel(LabelRef),
    EdgeRole {
        vertex_label: LabelRef,
        edge_label: LabelRef,
        direction: Direction,
    },
    Property(PropertyColumn),
    Index(Index),
    GlobalUniqueIndex {
        name: String,
        properties: Vec<PropertyColumn>,
    },
}

impl TopologyEntity {
    /// Event name used in logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            TopologyEntity::Schema { .. } => "schema",
            TopologyEntity::VertexLabel(_) => "vertex label",
            TopologyEntity::EdgeLabel(_) => "edge label",
            TopologyEntity::EdgeRole { .. } => "edge role",
            TopologyEntity::Property(_) => "property",
            TopologyEntity::Index(_) => "index",
            TopologyEntity::GlobalUniqueIndex { .. } => "global unique index",
        }
    }
}

impl fmt::Display for TopologyEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyEntity::Schema { name } => write!(f, "schema {}", name),
            TopologyEntity::VertexLabel(label) => write!(f, "vertex label {}", label),
            TopologyEntity::EdgeLabel(label) => write!(f, "edge label {}", label),
            TopologyEntity::EdgeRole {
                vertex_label,
                edge_label,
                direction,
            } => write!(f, "{} role of {} in {}", direction, vertex_label, edge_label),
            TopologyEntity::Property(property) => write!(f, "property {}", property),
            TopologyEntity::Index(index) => write!(f, "index {}", index),
            TopologyEntity::GlobalUniqueIndex { name, .. } => {
                write!(f, "global unique index {}", name)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyChangeAction {
    Create,
    Delete,
}

impl fmt::Display for TopologyChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyChangeAction::Create => write!(f, "CREATE"),
            TopologyChangeAction::Delete => write!(f, "DELETE"),
        }
    }
}

/// Observer of catalog changes
pub trait TopologyListener: Send + Sync {
    fn change(
        &self,
        entity: &TopologyEntity,
        action: TopologyChangeAction,
    ) -> Result<(), ListenerError>;
}

/// Handle returned by `register_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn TopologyListener>)>>,
}

impl ListenerRegistry {
    pub(crate) fn register(&self, listener: Arc<dyn TopologyListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    pub(crate) fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Invoke every listener outside the registry lock
    pub(crate) fn fire(&self, entity: &TopologyEntity, action: TopologyChangeAction) {
        let listeners: Vec<_> = self
            .listeners
            .read()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();

        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.change(entity, action))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("listener {:?} failed on {} {}: {}", id, action, entity, e);
                }
                Err(_) => {
                    error!("listener {:?} panicked on {} {}", id, action, entity);
                }
            }
        }
    }
}
