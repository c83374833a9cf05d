// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Edge labels shared by several vertex labels, and removal of their roles

#[path = "testutils/mod.rs"]
mod testutils;

use sqlgraph::sql::DatabaseMetadata;
use sqlgraph::topology::types::RemovalType;
use sqlgraph::{AbstractLabel, Direction, EdgeRole, PropertyType};
use std::sync::Arc;
use testutils::test_fixture::{no_props, props, RecordingListener, TopologyFixture};

fn out_role(roles: Vec<EdgeRole>, edge: &str) -> EdgeRole {
    roles
        .into_iter()
        .find(|role| role.direction() == Direction::Out && role.edge_label().name() == edge)
        .expect("Missing out role")
}

#[test]
fn test_edge_label_gains_roles_for_new_vertex_pairs() {
    let fixture = TopologyFixture::new();
    let topology = &fixture.topology;
    let recorder = Arc::new(RecordingListener::default());

    let tx = topology.begin();
    let x = topology.ensure_vertex_label_exists(&tx, "public", "X", &no_props()).unwrap();
    let y = topology.ensure_vertex_label_exists(&tx, "public", "Y", &no_props()).unwrap();
    let z = topology.ensure_vertex_label_exists(&tx, "public", "Z", &no_props()).unwrap();
    let knows = topology
        .ensure_edge_label_exists(&tx, "knows", &x, &z, &props(&[("weight", PropertyType::Double)]))
        .unwrap();
    topology.commit(&tx).unwrap();

    topology.register_listener(recorder.clone());
    let tx = topology.begin();
    let again = topology
        .ensure_edge_label_exists(&tx, "knows", &y, &z, &no_props())
        .unwrap();
    assert!(Arc::ptr_eq(&knows, &again));
    let diff = topology.commit(&tx).unwrap().expect("Adding a role is a change");

    let out: Vec<String> = knows.out_vertex_labels(&topology.begin()).into_keys().collect();
    assert_eq!(out, vec!["public.X".to_string(), "public.Y".to_string()]);
    assert_eq!(knows.in_vertex_labels(&topology.begin()).len(), 1);
    assert_eq!(recorder.events(), vec!["CREATE out role of public.V_Y in public.E_knows".to_string()]);

    let y_diff = diff.schema("public").unwrap().vertex_label("Y").unwrap();
    assert!(!y_diff.uncommitted);
    assert_eq!(y_diff.uncommitted_out_edge_labels.len(), 1);
    assert!(!y_diff.uncommitted_out_edge_labels[0].uncommitted);

    let fk = Direction::Out.foreign_key_column(y.label_ref());
    assert!(fixture
        .db
        .column_names("public", "E_knows")
        .unwrap()
        .contains(&fk));
}

#[test]
fn test_removing_one_of_many_roles_keeps_the_edge_label() {
    let fixture = TopologyFixture::new();
    let topology = &fixture.topology;

    let tx = topology.begin();
    let x = topology.ensure_vertex_label_exists(&tx, "public", "X", &no_props()).unwrap();
    let y = topology.ensure_vertex_label_exists(&tx, "public", "Y", &no_props()).unwrap();
    let z = topology.ensure_vertex_label_exists(&tx, "public", "Z", &no_props()).unwrap();
    topology.ensure_edge_label_exists(&tx, "knows", &x, &z, &no_props()).unwrap();
    topology.ensure_edge_label_exists(&tx, "knows", &y, &z, &no_props()).unwrap();
    topology.commit(&tx).unwrap();

    let tx = topology.begin();
    let role = out_role(x.edge_roles(&tx), "knows");
    assert!(role.is_committed());
    topology.remove_edge_role(&tx, &role, false).unwrap();

    let knows = topology
        .get_edge_label(&tx, "public", "knows")
        .expect("The edge label must survive a role removal");
    let out: Vec<String> = knows.out_vertex_labels(&tx).into_keys().collect();
    assert_eq!(out, vec!["public.Y".to_string()]);
    assert!(x.out_edge_labels(&tx).is_empty());
    assert_eq!(y.out_edge_labels(&tx).len(), 1);

    let diff = topology.commit(&tx).unwrap().unwrap();
    let public = diff.schema("public").unwrap();
    assert!(public.uncommitted_removed_edge_labels.is_empty());
    let x_diff = public.vertex_label("X").unwrap();
    assert_eq!(x_diff.uncommitted_removed_out_edge_labels.len(), 1);
    assert_eq!(x_diff.uncommitted_removed_out_edge_labels[0].name, "public.knows");
    assert_eq!(
        x_diff.uncommitted_removed_out_edge_labels[0].removal_type,
        RemovalType::Role
    );

    let columns = fixture.db.column_names("public", "E_knows").unwrap();
    assert!(!columns.contains(&Direction::Out.foreign_key_column(x.label_ref())));
    assert!(columns.contains(&Direction::Out.foreign_key_column(y.label_ref())));
}

#[test]
fn test_removing_the_last_role_on_a_side_removes_the_edge_label() {
    let fixture = TopologyFixture::new();
    let topology = &fixture.topology;

    let tx = topology.begin();
    let y = topology.ensure_vertex_label_exists(&tx, "public", "Y", &no_props()).unwrap();
    let z = topology.ensure_vertex_label_exists(&tx, "public", "Z", &no_props()).unwrap();
    topology.ensure_edge_label_exists(&tx, "knows", &y, &z, &no_props()).unwrap();
    topology.commit(&tx).unwrap();

    let tx = topology.begin();
    let role = out_role(y.edge_roles(&tx), "knows");
    topology.remove_edge_role(&tx, &role, false).unwrap();
    assert!(topology.get_edge_label(&tx, "public", "knows").is_none());
    assert!(z.in_edge_labels(&tx).is_empty());

    let diff = topology.commit(&tx).unwrap().unwrap();
    let public = diff.schema("public").unwrap();
    assert_eq!(public.uncommitted_removed_edge_labels, vec!["knows".to_string()]);
    let y_diff = public.vertex_label("Y").unwrap();
    assert_eq!(
        y_diff.uncommitted_removed_out_edge_labels[0].removal_type,
        RemovalType::Label
    );
    let z_diff = public.vertex_label("Z").unwrap();
    assert_eq!(
        z_diff.uncommitted_removed_in_edge_labels[0].removal_type,
        RemovalType::Label
    );
    assert!(!fixture.db.table_exists("public", "E_knows").unwrap());
}

#[test]
fn test_edge_roles_list_both_directions() {
    let fixture = TopologyFixture::new();
    let topology = &fixture.topology;

    let tx = topology.begin();
    let person = topology
        .ensure_vertex_label_exists(&tx, "public", "Person", &no_props())
        .unwrap();
    let order = topology
        .ensure_vertex_label_exists(&tx, "sales", "Order", &no_props())
        .unwrap();
    let placed = topology
        .ensure_edge_label_exists(&tx, "placed", &person, &order, &no_props())
        .unwrap();
    topology.ensure_edge_label_exists(&tx, "knows", &person, &person, &no_props()).unwrap();
    topology.commit(&tx).unwrap();

    assert_eq!(placed.schema_name(), "public");
    let tx = topology.begin();
    let roles = person.edge_roles(&tx);
    assert_eq!(roles.len(), 3);
    let order_roles = order.edge_roles(&tx);
    assert_eq!(order_roles.len(), 1);
    assert_eq!(order_roles[0].direction(), Direction::In);
    assert_eq!(order_roles[0].edge_label().name(), "placed");
}

#[test]
fn test_self_loop_edge_label_removal() {
    let fixture = TopologyFixture::new();
    let topology = &fixture.topology;

    let tx = topology.begin();
    let person = topology
        .ensure_vertex_label_exists(&tx, "public", "Person", &no_props())
        .unwrap();
    topology.ensure_edge_label_exists(&tx, "knows", &person, &person, &no_props()).unwrap();
    topology.commit(&tx).unwrap();

    let tx = topology.begin();
    topology.remove_vertex_label(&tx, &person, false).unwrap();
    topology.commit(&tx).unwrap();

    let tx = topology.begin();
    assert!(topology.get_edge_label(&tx, "public", "knows").is_none());
    assert!(topology.get_vertex_label(&tx, "public", "Person").is_none());
    assert!(fixture.db.tables("public").is_empty());
}
