//! Integration tests for the dungeon graph arena and its invariant checker.

use std::f32::consts::PI;
use std::sync::Arc;

use delve_geometry::{Obb, Pose};
use delve_graph::{
    ConnectorRef, DungeonGraph, EntityId, GraphError, RoomCategory, RoomEntity, RoomTemplate,
    TemplateCategory,
};

// =========================================================================
// Helpers
// =========================================================================

fn template(category: TemplateCategory, connectors: &[Pose]) -> Arc<RoomTemplate> {
    let mut t = RoomTemplate::new(category.to_string(), category).with_bounds(Obb::rect(0.0, 0.0, 1.0, 1.0));
    for c in connectors {
        t = t.with_connector(*c);
    }
    Arc::new(t)
}

fn spawn_template() -> Arc<RoomTemplate> {
    template(
        TemplateCategory::Spawn,
        &[Pose::at(5.0, 0.0, 0.0), Pose::at(-5.0, 0.0, PI)],
    )
}

fn hallway_template() -> Arc<RoomTemplate> {
    template(
        TemplateCategory::Hallway,
        &[Pose::at(-2.0, 0.0, PI), Pose::at(2.0, 0.0, 0.0)],
    )
}

fn room_template() -> Arc<RoomTemplate> {
    template(TemplateCategory::Room, &[Pose::at(-3.0, 0.0, PI)])
}

/// Inserts `template` attached to `parent` using its connector 0, reserving
/// both sides the way the placement engine does.
fn attach(graph: &mut DungeonGraph, parent: ConnectorRef, template: Arc<RoomTemplate>) -> EntityId {
    let id = graph.allocate_id();
    let mut entity = RoomEntity::instantiate(id, template);
    graph.reserve(parent).unwrap();
    entity.connector_mut(0).unwrap().state.reserve();
    entity.attach(parent, 0);
    graph.insert(entity).unwrap()
}

fn graph_with_spawn() -> (DungeonGraph, EntityId) {
    let mut graph = DungeonGraph::new();
    let id = graph.allocate_id();
    let spawn = graph
        .insert(RoomEntity::instantiate(id, spawn_template()))
        .unwrap();
    (graph, spawn)
}

// =========================================================================
// Arena basics
// =========================================================================

#[test]
fn test_ids_are_unique_and_increasing() {
    let mut graph = DungeonGraph::new();
    let a = graph.allocate_id();
    let b = graph.allocate_id();
    assert!(b > a);
}

#[test]
fn test_insert_tracks_spawn() {
    let (graph, spawn) = graph_with_spawn();
    assert_eq!(graph.spawn(), Some(spawn));
    assert_eq!(graph.len(), 1);
    assert_eq!(graph.count(RoomCategory::Spawn), 1);
}

#[test]
fn test_second_spawn_rejected() {
    let (mut graph, _) = graph_with_spawn();
    let id = graph.allocate_id();
    let err = graph
        .insert(RoomEntity::instantiate(id, spawn_template()))
        .unwrap_err();
    assert!(matches!(err, GraphError::Invariant(_)));
    assert_eq!(graph.len(), 1);
}

#[test]
fn test_duplicate_id_rejected() {
    let (mut graph, spawn) = graph_with_spawn();
    let err = graph
        .insert(RoomEntity::instantiate(spawn, room_template()))
        .unwrap_err();
    assert!(matches!(err, GraphError::DuplicateEntity(id) if id == spawn));
}

#[test]
fn test_reserve_and_release_through_graph() {
    let (mut graph, spawn) = graph_with_spawn();
    let east = ConnectorRef::new(spawn, 0);
    let west = ConnectorRef::new(spawn, 1);

    assert!(graph.reserve(east).unwrap());
    assert!(!graph.reserve(east).unwrap());
    assert!(graph.is_reserved(east));

    // Releasing a free connector leaves its neighbor alone.
    graph.release(west).unwrap();
    assert!(graph.is_reserved(east));
    assert!(!graph.is_reserved(west));

    graph.release(east).unwrap();
    graph.release(east).unwrap();
    assert!(!graph.is_reserved(east));
}

#[test]
fn test_reserve_unknown_connector_errors() {
    let (mut graph, spawn) = graph_with_spawn();
    assert!(matches!(
        graph.reserve(ConnectorRef::new(spawn, 9)),
        Err(GraphError::UnknownConnector(_))
    ));
    assert!(matches!(
        graph.reserve(ConnectorRef::new(EntityId(999), 0)),
        Err(GraphError::UnknownEntity(_))
    ));
}

#[test]
fn test_children_lookup() {
    let (mut graph, spawn) = graph_with_spawn();
    let hall = attach(&mut graph, ConnectorRef::new(spawn, 0), hallway_template());
    let room = attach(&mut graph, ConnectorRef::new(hall, 1), room_template());

    assert_eq!(graph.children_of(spawn), vec![hall]);
    assert_eq!(graph.children_of(hall), vec![room]);
    assert_eq!(graph.child_at(ConnectorRef::new(hall, 1)), Some(room));
    assert_eq!(graph.child_at(ConnectorRef::new(spawn, 1)), None);
}

// =========================================================================
// Invariants
// =========================================================================

#[test]
fn test_well_formed_chain_passes() {
    let (mut graph, spawn) = graph_with_spawn();
    let hall = attach(&mut graph, ConnectorRef::new(spawn, 0), hallway_template());
    attach(&mut graph, ConnectorRef::new(hall, 1), room_template());
    graph.check_invariants().unwrap();
}

#[test]
fn test_orphan_reservation_detected() {
    let (mut graph, spawn) = graph_with_spawn();
    graph.reserve(ConnectorRef::new(spawn, 1)).unwrap();
    assert!(matches!(graph.check_invariants(), Err(GraphError::Invariant(_))));
}

#[test]
fn test_room_directly_on_spawn_detected() {
    let (mut graph, spawn) = graph_with_spawn();
    attach(&mut graph, ConnectorRef::new(spawn, 0), room_template());
    assert!(matches!(graph.check_invariants(), Err(GraphError::Invariant(_))));
}

#[test]
fn test_dangling_parent_detected() {
    let (mut graph, spawn) = graph_with_spawn();
    let hall = attach(&mut graph, ConnectorRef::new(spawn, 0), hallway_template());
    attach(&mut graph, ConnectorRef::new(hall, 1), room_template());
    graph.remove(hall);
    assert!(matches!(graph.check_invariants(), Err(GraphError::Invariant(_))));
}

#[test]
fn test_free_parent_connector_detected() {
    let (mut graph, spawn) = graph_with_spawn();
    attach(&mut graph, ConnectorRef::new(spawn, 0), hallway_template());
    graph.release(ConnectorRef::new(spawn, 0)).unwrap();
    assert!(matches!(graph.check_invariants(), Err(GraphError::Invariant(_))));
}
