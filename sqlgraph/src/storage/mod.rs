// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Persistence of the committed catalog
//!
//! This module provides:
//! - Key-value storage drivers (sled, memory) behind one trait
//! - The catalog store: one row per committed schema and an ordered log of
//!   committed notification diffs

mod catalog_store;
pub mod persistent;

pub use catalog_store::CatalogStore;
pub use persistent::{StorageDriver, StorageTree, StorageType};
