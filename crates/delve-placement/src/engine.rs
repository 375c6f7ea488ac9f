//! The placement engine: the authoritative mutator of the dungeon graph.

use std::collections::HashSet;
use std::sync::Arc;

use delve_geometry::Pose;
use delve_graph::{
    ConnectorRef, DungeonGraph, EntityId, RoomCategory, RoomEntity, RoomTemplate, TaskSlotRef,
};
use rand::Rng;

use crate::{first_overlap, PlacementConfig, PlacementError};

// ---------------------------------------------------------------------------
// Removal
// ---------------------------------------------------------------------------

/// What a removal did to the graph.
///
/// `task_slots` lists every slot that lived in a destroyed room, so the
/// layer hosting mini-games can tear down whatever it attached to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removal {
    /// Destroyed entities, in the order they were taken out.
    pub removed: Vec<EntityId>,
    /// Parent-side connectors freed by the removal.
    pub released: Vec<ConnectorRef>,
    pub task_slots: Vec<TaskSlotRef>,
}

impl Removal {
    pub fn contains(&self, id: EntityId) -> bool {
        self.removed.contains(&id)
    }

    fn merge(&mut self, other: Removal) {
        self.removed.extend(other.removed);
        self.released.extend(other.released);
        self.task_slots.extend(other.task_slots);
    }
}

// ---------------------------------------------------------------------------
// PlacementEngine
// ---------------------------------------------------------------------------

/// Creates, aligns, validates and removes dungeon entities.
///
/// ## Connector ownership
///
/// The connector a new entity attaches to (the *parent connection*) is
/// reserved by the caller before [`try_place_room`](Self::try_place_room)
/// and stays the caller's to release if placement fails, with one
/// exception: a `NoConnector` failure hands it back already released. The
/// connector the new entity picks on *its own* side is owned by this call
/// and is released on every failure path.
///
/// ```text
///   caller: reserve(parent) ─▶ try_place_room ─┬─ Ok(id)      parent stays Reserved
///                                              ├─ NoConnector  parent released here
///                                              └─ Collision    parent still Reserved
/// ```
#[derive(Debug)]
pub struct PlacementEngine {
    graph: DungeonGraph,
    config: PlacementConfig,
}

impl PlacementEngine {
    /// An empty engine. `config` is clamped with
    /// [`PlacementConfig::validated`] before it is stored.
    pub fn new(config: PlacementConfig) -> Self {
        Self {
            graph: DungeonGraph::new(),
            config: config.validated(),
        }
    }

    /// Read access to the arena. Everything a caller needs for queries
    /// (counts, lookups, connector states) lives on [`DungeonGraph`].
    pub fn graph(&self) -> &DungeonGraph {
        &self.graph
    }

    /// Mutable access for connector reservations and task-slot updates.
    ///
    /// Structural changes (insert/remove) should go through the engine so
    /// connectors stay consistent.
    pub fn graph_mut(&mut self) -> &mut DungeonGraph {
        &mut self.graph
    }

    /// The validated config. Callers drawing connectors on the engine's
    /// behalf should read `connector_draws` from here.
    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// The spawn room, once [`place_spawn`](Self::place_spawn) succeeded.
    pub fn spawn(&self) -> Option<EntityId> {
        self.graph.spawn()
    }

    // -----------------------------------------------------------------------
    // Growth
    // -----------------------------------------------------------------------

    /// Places the session's single Spawn entity at `pose`.
    pub fn place_spawn(
        &mut self,
        template: Arc<RoomTemplate>,
        pose: Pose,
    ) -> Result<EntityId, PlacementError> {
        if template.room_category() != RoomCategory::Spawn {
            return Err(PlacementError::GraphInconsistency(format!(
                "template '{}' is a {}, not a spawn",
                template.name,
                template.category
            )));
        }
        if let Some(existing) = self.graph.spawn() {
            return Err(PlacementError::GraphInconsistency(format!(
                "spawn {existing} already placed"
            )));
        }

        let mut entity = RoomEntity::instantiate(self.graph.allocate_id(), template);
        entity.set_pose(pose);
        let id = self.graph.insert(entity)?;
        tracing::info!(spawn = %id, %pose, "spawn placed");
        Ok(id)
    }

    /// Instantiates `template` and attaches it to `parent_connection`.
    ///
    /// The caller must already hold the reservation on `parent_connection`.
    /// Only Hallways attach to a Spawn or Room, and only Rooms attach to a
    /// Hallway.
    ///
    /// # Errors
    /// - [`PlacementError::NoConnector`] — the new entity has no free
    ///   connector; `parent_connection` has been released.
    /// - [`PlacementError::Collision`] — the aligned entity overlaps
    ///   another; nothing was inserted.
    /// - [`PlacementError::GraphInconsistency`] — bad parent, wrong
    ///   category pairing, or an unreserved parent connector.
    pub fn try_place_room<R: Rng + ?Sized>(
        &mut self,
        parent_connection: ConnectorRef,
        template: Arc<RoomTemplate>,
        rng: &mut R,
    ) -> Result<EntityId, PlacementError> {
        let parent_world = self.validate_parent(parent_connection, &template)?;

        let mut entity = RoomEntity::instantiate(self.graph.allocate_id(), template);
        let id = entity.id();
        let template_name = entity.template().name.clone();

        let Some(own) = entity.available_connector(rng, self.config.connector_draws) else {
            self.graph.release(parent_connection)?;
            tracing::debug!(
                template = %template_name,
                parent = %parent_connection,
                "placement failed: no free connector on new entity"
            );
            return Err(PlacementError::NoConnector {
                template: template_name,
            });
        };

        // Own side of the joint. Released again below if the placement fails.
        if let Some(point) = entity.connector_mut(own) {
            point.state.reserve();
        }
        entity.align(own, parent_world)?;

        if let Some(with) = first_overlap(&self.graph, &entity, self.config.collision_margin) {
            if let Some(point) = entity.connector_mut(own) {
                point.state.release();
            }
            tracing::debug!(
                template = %template_name,
                parent = %parent_connection,
                %with,
                "placement failed: collision"
            );
            return Err(PlacementError::Collision {
                template: template_name,
                with,
            });
        }

        entity.attach(parent_connection, own);
        let category = entity.category();
        let pose = entity.pose();
        self.graph.insert(entity)?;
        tracing::debug!(
            entity = %id,
            %category,
            template = %template_name,
            parent = %parent_connection,
            %pose,
            "entity placed"
        );
        Ok(id)
    }

    /// Checks that `parent_connection` can take an entity built from
    /// `template`, returning its world pose.
    fn validate_parent(
        &self,
        parent_connection: ConnectorRef,
        template: &RoomTemplate,
    ) -> Result<Pose, PlacementError> {
        let parent = self.graph.get(parent_connection.entity).ok_or_else(|| {
            PlacementError::GraphInconsistency(format!(
                "parent {} not in graph",
                parent_connection.entity
            ))
        })?;
        let parent_world = self
            .graph
            .connector_pose(parent_connection)
            .ok_or_else(|| {
                PlacementError::GraphInconsistency(format!(
                    "connector {parent_connection} does not exist"
                ))
            })?;
        if !self.graph.is_reserved(parent_connection) {
            return Err(PlacementError::GraphInconsistency(format!(
                "connector {parent_connection} must be reserved before placement"
            )));
        }

        let child = template.room_category();
        let allowed = matches!(
            (parent.category(), child),
            (RoomCategory::Spawn | RoomCategory::Room, RoomCategory::Hallway)
                | (RoomCategory::Hallway, RoomCategory::Room)
        );
        if !allowed {
            return Err(PlacementError::GraphInconsistency(format!(
                "a {child} cannot attach to {} {}",
                parent.category(),
                parent.id()
            )));
        }
        Ok(parent_world)
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Removes an entity and everything that depends on it.
    ///
    /// - The connector it was attached to (on its parent) is released.
    /// - A Room takes the Hallway it hangs off with it; the Hallway's own
    ///   parent connector is released too.
    /// - Anything attached to a removed entity's connectors is removed
    ///   first, so no survivor's parent chain contains a removed node.
    /// - Every task-slot of a removed room is drained into the report.
    ///
    /// A Hallway removed on its own (e.g. its room was never placed) is a
    /// plain single-entity removal.
    ///
    /// # Errors
    /// [`PlacementError::GraphInconsistency`] if `id` is not in the graph or
    /// is the Spawn. Nothing is changed in that case.
    pub fn remove_room(&mut self, id: EntityId) -> Result<Removal, PlacementError> {
        let Some(entity) = self.graph.get(id) else {
            tracing::warn!(entity = %id, "remove requested for entity not in graph");
            return Err(PlacementError::GraphInconsistency(format!("{id} not in graph")));
        };
        if entity.category() == RoomCategory::Spawn {
            tracing::warn!(entity = %id, "refusing to remove spawn");
            return Err(PlacementError::GraphInconsistency(format!(
                "{id} is the spawn and cannot be removed"
            )));
        }

        let mut roots = vec![id];
        if entity.category() == RoomCategory::Room {
            if let Some(hallway) = entity
                .parent_connection()
                .and_then(|p| self.graph.get(p.entity))
                .filter(|p| p.category() == RoomCategory::Hallway)
            {
                roots.push(hallway.id());
            }
        }

        let mut removal = Removal::default();
        for victim in self.removal_order(&roots) {
            removal.merge(self.detach_and_destroy(victim));
        }
        tracing::info!(
            entity = %id,
            removed = removal.removed.len(),
            released = removal.released.len(),
            "room removed"
        );
        Ok(removal)
    }

    /// Removes every entity except the Spawn and frees all Spawn connectors.
    pub fn teardown(&mut self) -> Removal {
        let roots: Vec<EntityId> = self
            .graph
            .iter()
            .filter(|e| e.category() != RoomCategory::Spawn)
            .map(|e| e.id())
            .collect();

        let mut removal = Removal::default();
        for victim in self.removal_order(&roots) {
            removal.merge(self.detach_and_destroy(victim));
        }
        // Reservations left on the spawn at this point have no owner.
        let spawn_refs: Vec<ConnectorRef> = self
            .graph
            .spawn()
            .and_then(|id| self.graph.get(id))
            .map(|spawn| spawn.connector_refs().collect())
            .unwrap_or_default();
        for r in spawn_refs {
            let _ = self.graph.release(r);
        }
        tracing::info!(removed = removal.removed.len(), "dungeon torn down");
        removal
    }

    /// Dependents first: each entity comes after everything attached to it.
    fn removal_order(&self, roots: &[EntityId]) -> Vec<EntityId> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        for &root in roots {
            self.collect_subtree(root, &mut seen, &mut order);
        }
        order
    }

    fn collect_subtree(&self, id: EntityId, seen: &mut HashSet<EntityId>, order: &mut Vec<EntityId>) {
        let is_spawn = self
            .graph
            .get(id)
            .is_none_or(|e| e.category() == RoomCategory::Spawn);
        if is_spawn || !seen.insert(id) {
            return;
        }
        for child in self.graph.children_of(id) {
            self.collect_subtree(child, seen, order);
        }
        order.push(id);
    }

    fn detach_and_destroy(&mut self, id: EntityId) -> Removal {
        let mut removal = Removal::default();
        let Some(mut entity) = self.graph.remove(id) else {
            return removal;
        };

        if let Some(parent) = entity.parent_connection() {
            if self.graph.release(parent).is_ok() {
                removal.released.push(parent);
            }
        }
        removal.task_slots.extend(
            entity
                .drain_task_slots()
                .into_iter()
                .map(|slot| TaskSlotRef { room: id, slot: slot.id }),
        );
        tracing::debug!(entity = %id, category = %entity.category(), "entity destroyed");
        removal.removed.push(id);
        removal
    }
}

impl Default for PlacementEngine {
    fn default() -> Self {
        Self::new(PlacementConfig::default())
    }
}
