//! The dungeon graph: an arena of live entities.

use std::collections::{BTreeMap, HashSet};

use delve_geometry::Pose;

use crate::{ConnectorRef, ConnectorState, EntityId, GraphError, RoomCategory, RoomEntity};

/// Every live [`RoomEntity`], keyed by id.
///
/// The graph is a plain arena: it stores entities and answers lookups, and
/// it hands out ids. Deciding *what* goes in or out is the placement
/// engine's job. Iteration order is by id, i.e. creation order.
///
/// # Invariants
///
/// [`check_invariants`](Self::check_invariants) verifies, for any state
/// reachable once no placement call is in flight:
///
/// - at most one Spawn;
/// - every non-Spawn entity has a parent connection, pointing at a live
///   entity's connector that is Reserved;
/// - a Room's parent is always a Hallway;
/// - every Reserved connector is either some live entity's parent
///   connection or the connector an entity uses to attach to its parent.
#[derive(Debug, Default)]
pub struct DungeonGraph {
    entities: BTreeMap<EntityId, RoomEntity>,
    next_id: u64,
    spawn: Option<EntityId>,
}

impl DungeonGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a fresh id. Ids are never reused by this graph.
    pub fn allocate_id(&mut self) -> EntityId {
        self.next_id += 1;
        EntityId(self.next_id)
    }

    /// Inserts an entity built with an id from [`allocate_id`](Self::allocate_id).
    ///
    /// # Errors
    /// - [`GraphError::DuplicateEntity`] if the id is taken.
    /// - [`GraphError::Invariant`] if this would be a second Spawn.
    pub fn insert(&mut self, entity: RoomEntity) -> Result<EntityId, GraphError> {
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(GraphError::DuplicateEntity(id));
        }
        if entity.category() == RoomCategory::Spawn {
            if let Some(existing) = self.spawn {
                return Err(GraphError::Invariant(format!(
                    "spawn {existing} already present, refusing {id}"
                )));
            }
            self.spawn = Some(id);
        }
        self.entities.insert(id, entity);
        Ok(id)
    }

    /// Takes an entity out of the arena. Does not touch any connector.
    pub fn remove(&mut self, id: EntityId) -> Option<RoomEntity> {
        let entity = self.entities.remove(&id)?;
        if self.spawn == Some(id) {
            self.spawn = None;
        }
        Some(entity)
    }

    pub fn get(&self, id: EntityId) -> Option<&RoomEntity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut RoomEntity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoomEntity> {
        self.entities.values()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    pub fn spawn(&self) -> Option<EntityId> {
        self.spawn
    }

    pub fn count(&self, category: RoomCategory) -> usize {
        self.entities
            .values()
            .filter(|e| e.category() == category)
            .count()
    }

    // -----------------------------------------------------------------------
    // Connectors
    // -----------------------------------------------------------------------

    pub fn connector(&self, r: ConnectorRef) -> Option<&ConnectorState> {
        self.entities
            .get(&r.entity)?
            .connector(r.index)
            .map(|c| &c.state)
    }

    /// World pose of a connector.
    pub fn connector_pose(&self, r: ConnectorRef) -> Option<Pose> {
        self.entities.get(&r.entity)?.connector_pose(r.index)
    }

    fn connector_state_mut(&mut self, r: ConnectorRef) -> Result<&mut ConnectorState, GraphError> {
        let entity = self
            .entities
            .get_mut(&r.entity)
            .ok_or(GraphError::UnknownEntity(r.entity))?;
        entity
            .connector_mut(r.index)
            .map(|c| &mut c.state)
            .ok_or(GraphError::UnknownConnector(r))
    }

    /// Reserves a connector. `Ok(false)` if it already was.
    pub fn reserve(&mut self, r: ConnectorRef) -> Result<bool, GraphError> {
        let reserved = self.connector_state_mut(r)?.reserve();
        tracing::trace!(connector = %r, reserved, "reserve");
        Ok(reserved)
    }

    /// Releases a connector. Releasing a Free connector is a no-op.
    pub fn release(&mut self, r: ConnectorRef) -> Result<(), GraphError> {
        self.connector_state_mut(r)?.release();
        tracing::trace!(connector = %r, "release");
        Ok(())
    }

    pub fn is_reserved(&self, r: ConnectorRef) -> bool {
        self.connector(r).is_some_and(|c| c.is_reserved())
    }

    /// Every Reserved connector in the graph.
    pub fn reserved_connectors(&self) -> Vec<ConnectorRef> {
        self.entities
            .values()
            .flat_map(|e| e.connector_refs())
            .filter(|r| self.is_reserved(*r))
            .collect()
    }

    /// Entities attached to one of `id`'s connectors.
    pub fn children_of(&self, id: EntityId) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.parent_connection().is_some_and(|p| p.entity == id))
            .map(|e| e.id())
            .collect()
    }

    /// The entity attached to connector `r`, if any.
    pub fn child_at(&self, r: ConnectorRef) -> Option<EntityId> {
        self.entities
            .values()
            .find(|e| e.parent_connection() == Some(r))
            .map(|e| e.id())
    }

    // -----------------------------------------------------------------------
    // Invariants
    // -----------------------------------------------------------------------

    /// Checks the structural invariants listed on [`DungeonGraph`].
    pub fn check_invariants(&self) -> Result<(), GraphError> {
        let spawns = self.count(RoomCategory::Spawn);
        if spawns > 1 {
            return Err(GraphError::Invariant(format!("{spawns} spawn entities")));
        }

        let mut accounted: HashSet<ConnectorRef> = HashSet::new();
        for entity in self.entities.values() {
            let id = entity.id();
            if entity.category() == RoomCategory::Spawn {
                continue;
            }

            let parent_ref = entity.parent_connection().ok_or_else(|| {
                GraphError::Invariant(format!("{id} has no parent connection"))
            })?;
            let parent = self.entities.get(&parent_ref.entity).ok_or_else(|| {
                GraphError::Invariant(format!("{id} hangs off removed entity {}", parent_ref.entity))
            })?;
            if !self.is_reserved(parent_ref) {
                return Err(GraphError::Invariant(format!(
                    "{id} attached to free connector {parent_ref}"
                )));
            }
            if entity.category() == RoomCategory::Room && parent.category() != RoomCategory::Hallway {
                return Err(GraphError::Invariant(format!(
                    "room {id} attached to {} {}, expected a hallway",
                    parent.category(),
                    parent.id()
                )));
            }
            accounted.insert(parent_ref);
            if let Some(own) = entity.attach_connector() {
                accounted.insert(ConnectorRef::new(id, own));
            }
        }

        if let Some(orphan) = self
            .reserved_connectors()
            .into_iter()
            .find(|r| !accounted.contains(r))
        {
            return Err(GraphError::Invariant(format!(
                "connector {orphan} reserved with no attached entity"
            )));
        }
        Ok(())
    }
}
