// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction context and the topology mutation lock
//!
//! A [`TopologyTx`] is the explicit token a caller threads through every
//! catalog call. The [`TopologyLock`] records which transaction currently owns
//! structural mutation rights; that same record answers whether a read should
//! include the caller's own uncommitted edits.

use super::services::TopologyServices;
use super::SchemaMap;
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_TX_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a topology transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxId(u64);

impl TxId {
    fn next() -> Self {
        TxId(NEXT_TX_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the underlying ID value
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx_{}", self.0)
    }
}

/// Catalog state a transaction rolls back if it is dropped while locked
#[derive(Debug)]
struct TxOwner {
    services: Weak<TopologyServices>,
    schemas: Weak<SchemaMap>,
}

/// Catalog transaction context
///
/// Obtained from `Topology::begin` and ended by `Topology::commit` or
/// `Topology::rollback`. Dropping a transaction that still holds the lock
/// rolls it back.
#[derive(Debug)]
pub struct TopologyTx {
    id: TxId,
    replay: bool,
    owner: Option<TxOwner>,
}

impl TopologyTx {
    pub(crate) fn new() -> Self {
        Self {
            id: TxId::next(),
            replay: false,
            owner: None,
        }
    }

    /// Transaction bound to a topology's catalog for rollback on drop
    pub(crate) fn bound(services: &Arc<TopologyServices>, schemas: &Arc<SchemaMap>) -> Self {
        Self {
            id: TxId::next(),
            replay: false,
            owner: Some(TxOwner {
                services: Arc::downgrade(services),
                schemas: Arc::downgrade(schemas),
            }),
        }
    }

    /// Internal transaction that applies already-executed changes
    ///
    /// DDL is skipped and nothing is published on commit.
    pub(crate) fn replay() -> Self {
        Self {
            id: TxId::next(),
            replay: true,
            owner: None,
        }
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub(crate) fn is_replay(&self) -> bool {
        self.replay
    }
}

impl Drop for TopologyTx {
    fn drop(&mut self) {
        let Some(owner) = self.owner.take() else {
            return;
        };
        let (Some(services), Some(schemas)) = (owner.services.upgrade(), owner.schemas.upgrade())
        else {
            return;
        };
        if services.is_locked_by(self) {
            log::warn!("{} dropped while holding the topology lock, rolling back", self.id);
            super::rollback_locked(&services, &schemas, self);
        }
    }
}

/// Process-local mutation lock, reentrant per transaction
#[derive(Debug, Default)]
pub struct TopologyLock {
    owner: Mutex<Option<TxId>>,
    released: Condvar,
}

impl TopologyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until `tx` owns the lock; returns immediately if it already does
    pub fn acquire(&self, tx: &TopologyTx) {
        let mut owner = self.owner.lock();
        loop {
            match *owner {
                Some(current) if current == tx.id => return,
                Some(_) => self.released.wait(&mut owner),
                None => {
                    *owner = Some(tx.id);
                    log::debug!("topology lock acquired by {}", tx.id);
                    return;
                }
            }
        }
    }

    /// Release the lock if `tx` owns it; returns whether it did
    pub fn release(&self, tx: &TopologyTx) -> bool {
        let mut owner = self.owner.lock();
        if *owner == Some(tx.id) {
            *owner = None;
            self.released.notify_all();
            log::debug!("topology lock released by {}", tx.id);
            true
        } else {
            false
        }
    }

    /// Whether `tx` currently owns the lock
    pub fn is_held_by(&self, tx: &TopologyTx) -> bool {
        *self.owner.lock() == Some(tx.id)
    }

    pub fn is_locked(&self) -> bool {
        self.owner.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    #[test]
    fn test_reentrant_for_same_tx() {
        let lock = TopologyLock::new();
        let tx = TopologyTx::new();
        lock.acquire(&tx);
        lock.acquire(&tx);
        assert!(lock.is_held_by(&tx));
        assert!(lock.release(&tx));
        assert!(!lock.is_locked());
        assert!(!lock.release(&tx));
    }

    #[test]
    fn test_other_tx_blocks_until_release() {
        let lock = TopologyLock::new();
        let first = TopologyTx::new();
        let released = AtomicBool::new(false);
        lock.acquire(&first);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                let second = TopologyTx::new();
                lock.acquire(&second);
                assert!(released.load(Ordering::SeqCst));
                assert!(lock.is_held_by(&second));
                lock.release(&second);
            });
            std::thread::sleep(Duration::from_millis(50));
            assert!(!lock.is_held_by(&TopologyTx::new()));
            released.store(true, Ordering::SeqCst);
            lock.release(&first);
        });
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_tx_ids_are_unique() {
        let a = TopologyTx::new();
        let b = TopologyTx::new();
        assert_ne!(a.id(), b.id());
        assert!(a.id().to_string().starts_with("tx_"));
        assert!(TopologyTx::replay().is_replay());
    }
}
