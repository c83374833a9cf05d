// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Behavior shared by vertex and edge labels
//!
//! A label owns a staged map of property columns and a staged map of indexes.
//! [`LabelCore`] holds that state; the [`AbstractLabel`] trait provides the
//! property and index lifecycle on top of it for both label kinds.

use super::error::{TopologyError, TopologyResult};
use super::index::{random_index_name, Index, IndexType};
use super::listener::{TopologyChangeAction, TopologyEntity};
use super::lock::TopologyTx;
use super::property::{PropertyColumn, PropertyType};
use super::services::TopologyServices;
use super::staged::{EntryState, StagedMap};
use super::types::LabelRef;
use crate::sql::Ddl;
use log::debug;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Property and index state of one label
pub struct LabelCore {
    reference: LabelRef,
    pub(crate) services: Arc<TopologyServices>,
    properties: RwLock<StagedMap<PropertyColumn>>,
    indexes: RwLock<StagedMap<Index>>,
    /// Uncommitted columns the table was created with
    initial: RwLock<BTreeSet<String>>,
}

impl LabelCore {
    pub(crate) fn new(reference: LabelRef, services: Arc<TopologyServices>) -> Self {
        Self {
            reference,
            services,
            properties: RwLock::new(StagedMap::new()),
            indexes: RwLock::new(StagedMap::new()),
            initial: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn reference(&self) -> &LabelRef {
        &self.reference
    }

    pub(crate) fn own(&self, tx: &TopologyTx) -> bool {
        self.services.is_locked_by(tx)
    }

    pub(crate) fn property(&self, own: bool, name: &str) -> Option<PropertyColumn> {
        self.properties.read().get(name, own).cloned()
    }

    pub(crate) fn properties(&self, own: bool) -> BTreeMap<String, PropertyColumn> {
        self.properties.read().snapshot(own)
    }

    pub(crate) fn index(&self, own: bool, name: &str) -> Option<Index> {
        self.indexes.read().get(name, own).cloned()
    }

    pub(crate) fn indexes(&self, own: bool) -> BTreeMap<String, Index> {
        self.indexes.read().snapshot(own)
    }

    fn index_by_shape(&self, own: bool, properties: &[PropertyColumn]) -> Option<Index> {
        self.indexes
            .read()
            .visible(own)
            .map(|(_, index)| index)
            .find(|index| index.same_shape(&self.reference, properties))
            .cloned()
    }

    /// Record the columns a new label's table was created with
    ///
    /// The table DDL already carries them and the label's own CREATE event
    /// covers them, so nothing is executed or fired here.
    pub(crate) fn stage_initial_properties(&self, properties: &BTreeMap<String, PropertyType>) {
        let mut staged = self.properties.write();
        let mut initial = self.initial.write();
        for (name, property_type) in properties {
            staged.insert_uncommitted(
                name.clone(),
                PropertyColumn::new(self.reference.clone(), name.clone(), *property_type),
            );
            initial.insert(name.clone());
        }
    }

    /// Uncommitted columns staged by [`Self::stage_initial_properties`]
    pub(crate) fn initial_properties(&self) -> Vec<String> {
        let staged = self.properties.read();
        self.initial
            .read()
            .iter()
            .filter(|name| staged.state(name.as_str()) == Some(EntryState::Uncommitted))
            .cloned()
            .collect()
    }

    fn check_property_type(
        &self,
        existing: PropertyColumn,
        property_type: PropertyType,
    ) -> TopologyResult<PropertyColumn> {
        if existing.property_type() == property_type {
            Ok(existing)
        } else {
            Err(TopologyError::IllegalState(format!(
                "property {} already exists on {} with type {}, requested {}",
                existing.name(),
                self.reference,
                existing.property_type(),
                property_type
            )))
        }
    }

    fn check_index_type(&self, existing: Index, index_type: &IndexType) -> TopologyResult<Index> {
        if existing.index_type() == index_type {
            Ok(existing)
        } else {
            Err(TopologyError::IllegalState(format!(
                "index on {} ({}) already exists as {}, requested {}",
                self.reference,
                existing.property_names().join(", "),
                existing.index_type(),
                index_type
            )))
        }
    }

    pub(crate) fn ensure_property(
        &self,
        tx: &TopologyTx,
        name: &str,
        property_type: PropertyType,
    ) -> TopologyResult<PropertyColumn> {
        if let Some(existing) = self.property(self.own(tx), name) {
            return self.check_property_type(existing, property_type);
        }

        self.services.lock(tx);
        if let Some(existing) = self.property(true, name) {
            return self.check_property_type(existing, property_type);
        }
        self.services.validate_name(name)?;

        self.services.execute(
            tx,
            Ddl::AddColumn {
                schema: self.reference.schema.clone(),
                table: self.reference.table_name(),
                column: name.to_string(),
                property_type,
            },
        )?;
        let column = PropertyColumn::new(self.reference.clone(), name, property_type);
        self.properties
            .write()
            .insert_uncommitted(name, column.clone());
        self.initial.write().remove(name);
        self.services.fire(
            TopologyEntity::Property(column.clone()),
            TopologyChangeAction::Create,
        );
        Ok(column)
    }

    /// Resolve requested index columns against this label's visible properties
    fn resolve_columns(
        &self,
        own: bool,
        properties: &[PropertyColumn],
    ) -> TopologyResult<Vec<PropertyColumn>> {
        if properties.is_empty() {
            return Err(TopologyError::IllegalState(format!(
                "an index on {} needs at least one property",
                self.reference
            )));
        }
        properties
            .iter()
            .map(|requested| {
                if requested.owner() != &self.reference {
                    return Err(TopologyError::IllegalState(format!(
                        "property {} does not belong to {}",
                        requested, self.reference
                    )));
                }
                self.property(own, requested.name())
                    .filter(|column| column.property_type() == requested.property_type())
                    .ok_or_else(|| TopologyError::PropertyNotFound(requested.to_string()))
            })
            .collect()
    }

    pub(crate) fn ensure_index(
        &self,
        tx: &TopologyTx,
        index_type: IndexType,
        properties: &[PropertyColumn],
    ) -> TopologyResult<Index> {
        let columns = self.resolve_columns(self.own(tx), properties)?;
        if let Some(existing) = self.index_by_shape(self.own(tx), &columns) {
            return self.check_index_type(existing, &index_type);
        }

        self.services.lock(tx);
        let columns = self.resolve_columns(true, properties)?;
        if let Some(existing) = self.index_by_shape(true, &columns) {
            return self.check_index_type(existing, &index_type);
        }

        let names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
        let deterministic = self.services.dialect.index_name(
            &self.reference.schema,
            self.reference.kind.prefix(),
            &self.reference.label,
            &names,
        );
        let limit = self.services.max_index_name_length();
        let name = if deterministic.len() > limit || self.index_name_taken(&deterministic) {
            let mut random = random_index_name(limit);
            while self.index_name_taken(&random) {
                random = random_index_name(limit);
            }
            debug!(
                "index name {} exceeds {} characters or is taken, using {}",
                deterministic, limit, random
            );
            random
        } else {
            deterministic
        };
        self.create_index(tx, name, index_type, columns)
    }

    /// Get or create an index under a name chosen elsewhere
    pub(crate) fn ensure_named_index(
        &self,
        tx: &TopologyTx,
        name: &str,
        index_type: IndexType,
        properties: &[PropertyColumn],
    ) -> TopologyResult<Index> {
        self.services.lock(tx);
        if let Some(existing) = self.index(true, name) {
            return self.check_index_type(existing, &index_type);
        }
        let columns = self.resolve_columns(true, properties)?;
        self.create_index(tx, name.to_string(), index_type, columns)
    }

    fn index_name_taken(&self, name: &str) -> bool {
        self.indexes.read().state(name).is_some()
    }

    fn create_index(
        &self,
        tx: &TopologyTx,
        name: String,
        index_type: IndexType,
        columns: Vec<PropertyColumn>,
    ) -> TopologyResult<Index> {
        self.services.execute(
            tx,
            Ddl::CreateIndex {
                schema: self.reference.schema.clone(),
                table: self.reference.table_name(),
                index: name.clone(),
                index_type: index_type.clone(),
                columns: columns.iter().flat_map(|c| c.column_names()).collect(),
            },
        )?;
        let index = Index::new(self.reference.clone(), name.clone(), index_type, columns);
        self.indexes.write().insert_uncommitted(name, index.clone());
        self.services.fire(
            TopologyEntity::Index(index.clone()),
            TopologyChangeAction::Create,
        );
        Ok(index)
    }

    pub(crate) fn remove_index(
        &self,
        tx: &TopologyTx,
        name: &str,
        preserve_data: bool,
    ) -> TopologyResult<()> {
        self.services.lock(tx);
        let index = match self.index(true, name) {
            Some(index) => index,
            None => return Ok(()),
        };
        if !preserve_data {
            self.services.execute(
                tx,
                Ddl::DropIndex {
                    schema: self.reference.schema.clone(),
                    table: self.reference.table_name(),
                    index: name.to_string(),
                },
            )?;
        }
        self.indexes.write().mark_removed(name);
        self.services
            .fire(TopologyEntity::Index(index), TopologyChangeAction::Delete);
        Ok(())
    }

    /// Remove a property and every index of this label that covers it
    pub(crate) fn remove_property(
        &self,
        tx: &TopologyTx,
        name: &str,
        preserve_data: bool,
    ) -> TopologyResult<()> {
        self.services.lock(tx);
        let column = match self.property(true, name) {
            Some(column) => column,
            None => return Ok(()),
        };
        let covering: Vec<String> = self
            .indexes(true)
            .into_values()
            .filter(|index| index.references(name))
            .map(|index| index.name().to_string())
            .collect();
        for index in covering {
            self.remove_index(tx, &index, preserve_data)?;
        }
        if !preserve_data {
            self.services.execute(
                tx,
                Ddl::DropColumn {
                    schema: self.reference.schema.clone(),
                    table: self.reference.table_name(),
                    column: name.to_string(),
                    property_type: column.property_type(),
                },
            )?;
        }
        self.properties.write().mark_removed(name);
        self.services.fire(
            TopologyEntity::Property(column),
            TopologyChangeAction::Delete,
        );
        Ok(())
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.properties.read().has_pending() || self.indexes.read().has_pending()
    }

    pub(crate) fn uncommitted_properties(&self) -> Vec<PropertyColumn> {
        self.properties
            .read()
            .uncommitted()
            .map(|(_, column)| column.clone())
            .collect()
    }

    pub(crate) fn removed_properties(&self) -> Vec<String> {
        self.properties
            .read()
            .removed()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub(crate) fn uncommitted_indexes(&self) -> Vec<Index> {
        self.indexes
            .read()
            .uncommitted()
            .map(|(_, index)| index.clone())
            .collect()
    }

    pub(crate) fn removed_indexes(&self) -> Vec<String> {
        self.indexes
            .read()
            .removed()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub(crate) fn commit(&self, tx: &TopologyTx) {
        assert!(
            self.services.is_locked_by(tx),
            "{} reconciled by {} without the topology lock",
            self.reference,
            tx.id()
        );
        self.properties.write().commit();
        self.indexes.write().commit();
        self.initial.write().clear();
    }

    pub(crate) fn rollback(&self, tx: &TopologyTx) {
        assert!(
            self.services.is_locked_by(tx),
            "{} reconciled by {} without the topology lock",
            self.reference,
            tx.id()
        );
        self.properties.write().rollback();
        self.indexes.write().rollback();
        self.initial.write().clear();
    }
}

/// Common interface of vertex and edge labels
pub trait AbstractLabel {
    fn core(&self) -> &LabelCore;

    fn label_ref(&self) -> &LabelRef {
        self.core().reference()
    }

    fn name(&self) -> &str {
        &self.core().reference().label
    }

    fn schema_name(&self) -> &str {
        &self.core().reference().schema
    }

    /// Physical table name
    fn table_name(&self) -> String {
        self.core().reference().table_name()
    }

    /// Properties visible to `tx`
    fn properties(&self, tx: &TopologyTx) -> BTreeMap<String, PropertyColumn> {
        let core = self.core();
        core.properties(core.own(tx))
    }

    fn property(&self, tx: &TopologyTx, name: &str) -> Option<PropertyColumn> {
        let core = self.core();
        core.property(core.own(tx), name)
    }

    /// Indexes visible to `tx`
    fn indexes(&self, tx: &TopologyTx) -> BTreeMap<String, Index> {
        let core = self.core();
        core.indexes(core.own(tx))
    }

    fn index(&self, tx: &TopologyTx, name: &str) -> Option<Index> {
        let core = self.core();
        core.index(core.own(tx), name)
    }

    /// Get or create a property column
    ///
    /// # Arguments
    /// * `tx` - Calling transaction; takes the topology lock if a column is created
    /// * `name` - Property name, unique within the label
    /// * `property_type` - Requested type
    ///
    /// # Returns
    /// The existing or new column. An existing column of another type is an
    /// `IllegalState` error.
    fn ensure_property_exists(
        &self,
        tx: &TopologyTx,
        name: &str,
        property_type: PropertyType,
    ) -> TopologyResult<PropertyColumn> {
        self.core().ensure_property(tx, name, property_type)
    }

    fn ensure_properties_exist(
        &self,
        tx: &TopologyTx,
        properties: &BTreeMap<String, PropertyType>,
    ) -> TopologyResult<()> {
        for (name, property_type) in properties {
            self.ensure_property_exists(tx, name, *property_type)?;
        }
        Ok(())
    }

    /// Get or create an index over an ordered list of this label's properties
    ///
    /// An index with the same ordered property list is returned as is, so
    /// concurrent callers converge on one index. When the deterministic name
    /// exceeds the identifier limit a random name is used instead.
    fn ensure_index_exists(
        &self,
        tx: &TopologyTx,
        index_type: IndexType,
        properties: &[PropertyColumn],
    ) -> TopologyResult<Index> {
        self.core().ensure_index(tx, index_type, properties)
    }

    /// Remove a property; indexes covering it go with it
    fn remove_property(
        &self,
        tx: &TopologyTx,
        name: &str,
        preserve_data: bool,
    ) -> TopologyResult<()> {
        self.core().remove_property(tx, name, preserve_data)
    }

    fn remove_index(&self, tx: &TopologyTx, name: &str, preserve_data: bool) -> TopologyResult<()> {
        self.core().remove_index(tx, name, preserve_data)
    }

    /// Fold this label's uncommitted state into committed state
    ///
    /// # Panics
    /// If `tx` does not hold the topology lock.
    fn after_commit(&self, tx: &TopologyTx) {
        self.core().commit(tx);
    }

    /// Discard this label's uncommitted state
    ///
    /// # Panics
    /// If `tx` does not hold the topology lock.
    fn after_rollback(&self, tx: &TopologyTx) {
        self.core().rollback(tx);
    }
}
