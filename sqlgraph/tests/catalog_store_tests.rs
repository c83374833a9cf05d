// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog persistence across restarts and drift validation

#[path = "testutils/mod.rs"]
mod testutils;

use sqlgraph::sql::{Ddl, MemoryDatabase, PostgresDialect, SqlExecutor};
use sqlgraph::{
    AbstractLabel, CatalogStore, DriftKind, IndexType, PropertyType, StorageType, Topology,
    TopologyConfig,
};
use std::sync::Arc;
use testutils::test_fixture::{init_logging, no_props, props, TopologyFixture};

fn open_topology(
    db: &Arc<MemoryDatabase>,
    store: &Arc<CatalogStore>,
    config: TopologyConfig,
) -> Topology {
    Topology::builder(Arc::new(PostgresDialect::new()), db.clone())
        .config(config)
        .store(store.clone())
        .open()
        .expect("Failed to open topology")
}

#[cfg(feature = "sled-backend")]
#[test]
fn test_long_index_name_survives_restart() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog");
    let db = Arc::new(MemoryDatabase::new());
    let config = TopologyConfig::default().with_max_identifier_length(20);
    let customer_props = props(&[
        ("first_name", PropertyType::String),
        ("last_name", PropertyType::String),
    ]);

    let index_name = {
        let store = Arc::new(CatalogStore::open(StorageType::Sled, &path).unwrap());
        let topology = open_topology(&db, &store, config.clone());

        let tx = topology.begin();
        let customer = topology
            .ensure_vertex_label_exists(&tx, "public", "Customer", &customer_props)
            .unwrap();
        let columns = vec![
            customer.property(&tx, "first_name").unwrap(),
            customer.property(&tx, "last_name").unwrap(),
        ];
        let index = topology
            .ensure_index_exists(&tx, customer.as_ref(), IndexType::NonUnique, &columns)
            .unwrap();
        assert!(index.name().len() <= 20);
        assert_ne!(index.name(), "public_V_Customer_first_name_last_name_idx");
        let again = topology
            .ensure_index_exists(&tx, customer.as_ref(), IndexType::NonUnique, &columns)
            .unwrap();
        assert_eq!(index.name(), again.name());
        topology.commit(&tx).unwrap();
        index.name().to_string()
    };

    let store = Arc::new(CatalogStore::open(StorageType::Sled, &path).unwrap());
    let topology = open_topology(&db, &store, config);
    let tx = topology.begin();
    let customer = topology
        .get_vertex_label(&tx, "public", "Customer")
        .expect("Customer must be reloaded from the store");
    let columns = vec![
        customer.property(&tx, "first_name").unwrap(),
        customer.property(&tx, "last_name").unwrap(),
    ];
    let index = topology
        .ensure_index_exists(&tx, customer.as_ref(), IndexType::NonUnique, &columns)
        .unwrap();
    assert_eq!(index.name(), index_name);
    assert!(topology.commit(&tx).unwrap().is_none());
    assert_eq!(
        db.count_executed(|ddl| matches!(ddl, Ddl::CreateIndex { .. })),
        1
    );
}

#[test]
fn test_reopened_catalog_matches_committed_state() {
    init_logging();
    let db = Arc::new(MemoryDatabase::new());
    let store = Arc::new(CatalogStore::in_memory().unwrap());

    let first = open_topology(&db, &store, TopologyConfig::default());
    let tx = first.begin();
    let person = first
        .ensure_vertex_label_exists(&tx, "public", "Person", &props(&[("name", PropertyType::String)]))
        .unwrap();
    let order = first
        .ensure_vertex_label_exists(&tx, "sales", "Order", &no_props())
        .unwrap();
    first
        .ensure_edge_label_exists(&tx, "placed", &person, &order, &no_props())
        .unwrap();
    first.commit(&tx).unwrap();

    let tx = first.begin();
    first
        .ensure_vertex_label_exists(&tx, "public", "Draft", &no_props())
        .unwrap();
    first.rollback(&tx);

    let second = open_topology(&db, &store, TopologyConfig::default());
    assert_eq!(second.snapshot(), first.snapshot());
    assert!(second
        .get_vertex_label(&second.begin(), "public", "Draft")
        .is_none());

    let tx = first.begin();
    first.remove_schema(&tx, "sales", false).unwrap();
    first.commit(&tx).unwrap();
    assert!(store.load_schema("sales").unwrap().is_none());

    let third = open_topology(&db, &store, TopologyConfig::default());
    assert!(third.get_schema(&third.begin(), "sales").is_none());
    assert_eq!(third.snapshot(), first.snapshot());
}

#[test]
fn test_validation_reports_drift_without_changing_the_catalog() {
    let fixture = TopologyFixture::new();
    let topology = &fixture.topology;

    let tx = topology.begin();
    let person = topology
        .ensure_vertex_label_exists(&tx, "public", "Person", &props(&[("name", PropertyType::String)]))
        .unwrap();
    let company = topology
        .ensure_vertex_label_exists(&tx, "public", "Company", &no_props())
        .unwrap();
    topology
        .ensure_edge_label_exists(&tx, "works_at", &person, &company, &no_props())
        .unwrap();
    let name = person.property(&tx, "name").unwrap();
    let index = topology
        .ensure_index_exists(&tx, person.as_ref(), IndexType::NonUnique, &[name])
        .unwrap();
    topology.commit(&tx).unwrap();
    assert!(topology
        .validate_against_database(fixture.db.as_ref())
        .unwrap()
        .is_empty());

    fixture
        .db
        .execute(
            &Ddl::DropTable {
                schema: "public".to_string(),
                table: "V_Company".to_string(),
            },
            "",
        )
        .unwrap();
    fixture
        .db
        .execute(
            &Ddl::DropIndex {
                schema: "public".to_string(),
                table: "V_Person".to_string(),
                index: index.name().to_string(),
            },
            "",
        )
        .unwrap();

    let drift = topology
        .validate_against_database(fixture.db.as_ref())
        .unwrap();
    assert_eq!(drift.len(), 2);
    assert!(drift
        .iter()
        .any(|d| d.kind == DriftKind::MissingTable && d.object == "V_Company"));
    assert!(drift
        .iter()
        .any(|d| d.kind == DriftKind::MissingIndex && d.object == index.name()));

    let tx = topology.begin();
    assert!(topology.get_vertex_label(&tx, "public", "Company").is_some());
    assert_eq!(person.indexes(&tx).len(), 1);
}
