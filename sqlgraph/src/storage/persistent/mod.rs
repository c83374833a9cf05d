// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Persistent storage backends
//!
//! Trait-based key-value storage under the catalog store, so sled or the
//! in-memory driver can be used interchangeably.
//!
//! ```text
//! CatalogStore (schema rows, notification log)
//!     ↓
//! StorageDriver / StorageTree (ordered key-value abstraction)
//!     ↓
//! Sled, Memory
//! ```

pub mod factory;
pub mod memory;
#[cfg(feature = "sled-backend")]
pub mod sled;
pub mod traits;
pub mod types;

pub use factory::{create_storage_driver, BoxedStorageDriver};
pub use traits::{StorageDriver, StorageTree};
pub use types::{StorageDriverError, StorageResult, StorageType};
