// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Visibility isolation and lock serialization across threads

#[path = "testutils/mod.rs"]
mod testutils;

use sqlgraph::sql::Ddl;
use sqlgraph::{AbstractLabel, IndexType, PropertyType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;
use testutils::test_fixture::{no_props, props, TopologyFixture};

#[test]
fn test_uncommitted_property_is_invisible_to_other_threads() {
    let fixture = TopologyFixture::new();
    let topology = Arc::clone(&fixture.topology);

    let tx = topology.begin();
    let person = topology
        .ensure_vertex_label_exists(&tx, "public", "Person", &props(&[("name", PropertyType::String)]))
        .unwrap();
    topology.commit(&tx).unwrap();

    let tx = topology.begin();
    topology
        .ensure_property_exists(&tx, person.as_ref(), "age", PropertyType::Integer)
        .unwrap();
    assert!(person.property(&tx, "age").is_some());

    let observe = |topology: Arc<sqlgraph::Topology>, person: Arc<sqlgraph::VertexLabel>| {
        thread::spawn(move || {
            let other = topology.begin();
            (
                person.property(&other, "age").is_some(),
                person.property(&other, "name").is_some(),
            )
        })
        .join()
        .expect("Observer thread panicked")
    };

    let (sees_age, sees_name) = observe(Arc::clone(&topology), Arc::clone(&person));
    assert!(!sees_age, "Other threads must not see uncommitted properties");
    assert!(sees_name, "Committed properties stay visible during the transaction");

    topology.commit(&tx).unwrap();
    let (sees_age, _) = observe(Arc::clone(&topology), Arc::clone(&person));
    assert!(sees_age);
}

#[test]
fn test_pending_removal_stays_visible_to_other_threads() {
    let fixture = TopologyFixture::new();
    let topology = Arc::clone(&fixture.topology);

    let tx = topology.begin();
    topology
        .ensure_vertex_label_exists(&tx, "public", "Person", &no_props())
        .unwrap();
    topology.commit(&tx).unwrap();

    let tx = topology.begin();
    let person = topology.get_vertex_label(&tx, "public", "Person").unwrap();
    topology.remove_vertex_label(&tx, &person, false).unwrap();
    assert!(topology.get_vertex_label(&tx, "public", "Person").is_none());

    let seen = {
        let topology = Arc::clone(&topology);
        thread::spawn(move || {
            let other = topology.begin();
            topology.get_vertex_label(&other, "public", "Person").is_some()
        })
        .join()
        .unwrap()
    };
    assert!(seen);

    topology.commit(&tx).unwrap();
    assert!(topology
        .get_vertex_label(&topology.begin(), "public", "Person")
        .is_none());
}

#[test]
fn test_second_writer_blocks_until_commit() {
    let fixture = TopologyFixture::new();
    let topology = Arc::clone(&fixture.topology);

    let holder = topology.begin();
    topology.lock(&holder);
    assert!(topology.is_write_lock_held_by(&holder));

    let acquired = Arc::new(AtomicBool::new(false));
    let writer = {
        let topology = Arc::clone(&topology);
        let acquired = Arc::clone(&acquired);
        thread::spawn(move || {
            let tx = topology.begin();
            topology
                .ensure_vertex_label_exists(&tx, "public", "Late", &no_props())
                .unwrap();
            acquired.store(true, Ordering::SeqCst);
            topology.commit(&tx).unwrap();
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert!(
        !acquired.load(Ordering::SeqCst),
        "The writer must wait for the lock holder"
    );

    assert!(topology.commit(&holder).unwrap().is_none());
    writer.join().expect("Writer thread panicked");
    assert!(acquired.load(Ordering::SeqCst));
    assert!(topology
        .get_vertex_label(&topology.begin(), "public", "Late")
        .is_some());
}

#[test]
fn test_lock_is_reentrant_for_its_holder() {
    let fixture = TopologyFixture::new();
    let topology = &fixture.topology;

    let tx = topology.begin();
    topology.lock(&tx);
    topology.lock(&tx);
    topology
        .ensure_vertex_label_exists(&tx, "public", "Person", &no_props())
        .unwrap();
    assert!(topology.is_write_lock_held_by(&tx));
    assert!(!topology.is_write_lock_held_by(&topology.begin()));
    topology.commit(&tx).unwrap();
    assert!(!topology.is_write_lock_held_by(&tx));
}

#[test]
fn test_dropped_transaction_releases_the_lock_and_its_edits() {
    let fixture = TopologyFixture::new();
    let topology = Arc::clone(&fixture.topology);

    {
        let tx = topology.begin();
        let person = topology
            .ensure_vertex_label_exists(&tx, "public", "Abandoned", &no_props())
            .unwrap();
        topology
            .ensure_property_exists(&tx, person.as_ref(), "name", PropertyType::String)
            .unwrap();
    }

    let (done, finished) = mpsc::channel();
    {
        let topology = Arc::clone(&topology);
        thread::spawn(move || {
            let tx = topology.begin();
            topology
                .ensure_vertex_label_exists(&tx, "public", "Person", &no_props())
                .unwrap();
            topology.commit(&tx).unwrap();
            done.send(()).unwrap();
        });
    }
    finished
        .recv_timeout(Duration::from_secs(5))
        .expect("A dropped transaction must not keep the topology lock");

    let reader = topology.begin();
    assert!(topology.get_vertex_label(&reader, "public", "Person").is_some());
    assert!(topology.get_vertex_label(&reader, "public", "Abandoned").is_none());
    assert!(topology
        .snapshot()
        .iter()
        .flat_map(|schema| &schema.vertex_labels)
        .all(|vertex| vertex.label != "Abandoned"));
}

#[test]
fn test_concurrent_ensure_converges_on_one_index() {
    let fixture = TopologyFixture::new();
    let topology = Arc::clone(&fixture.topology);

    let tx = topology.begin();
    let person = topology
        .ensure_vertex_label_exists(
            &tx,
            "public",
            "Person",
            &props(&[("first", PropertyType::String), ("last", PropertyType::String)]),
        )
        .unwrap();
    topology.commit(&tx).unwrap();

    let workers = 4;
    let barrier = Arc::new(Barrier::new(workers));
    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let topology = Arc::clone(&topology);
            let person = Arc::clone(&person);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let tx = topology.begin();
                let columns = vec![
                    person.property(&tx, "first").unwrap(),
                    person.property(&tx, "last").unwrap(),
                ];
                barrier.wait();
                let index = topology
                    .ensure_index_exists(&tx, person.as_ref(), IndexType::NonUnique, &columns)
                    .unwrap();
                topology.commit(&tx).unwrap();
                index.name().to_string()
            })
        })
        .collect();

    let names: Vec<String> = handles
        .into_iter()
        .map(|handle| handle.join().expect("Worker panicked"))
        .collect();
    assert!(names.iter().all(|name| name == &names[0]));
    assert_eq!(person.indexes(&topology.begin()).len(), 1);
    assert_eq!(
        fixture
            .db
            .count_executed(|ddl| matches!(ddl, Ddl::CreateIndex { .. })),
        1
    );
}
