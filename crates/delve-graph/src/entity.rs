//! Placed entities: spawn, hallways and rooms.

use std::sync::Arc;

use delve_geometry::{align_to, Obb, Pose};
use rand::Rng;

use crate::{
    ConnectionPoint, ConnectorRef, EntityId, GraphError, RoomCategory, RoomTemplate, TaskProgress,
    TaskSlot, TaskSlotId, TaskSlotState,
};

/// Default number of random draws when looking for a free connector.
pub const CONNECTOR_DRAWS: usize = 5;

/// A spawn, hallway or room that has been instantiated from a template.
///
/// An entity owns its connection points and task-slots. The only thing it
/// knows about other entities is `parent_connection`, an edge to the
/// connector (owned by someone else) it was attached to.
#[derive(Debug, Clone)]
pub struct RoomEntity {
    id: EntityId,
    category: RoomCategory,
    template: Arc<RoomTemplate>,
    pose: Pose,
    connectors: Vec<ConnectionPoint>,
    /// The connector on the parent entity this one is joined to.
    parent_connection: Option<ConnectorRef>,
    /// Which of our own connectors is joined to the parent.
    attach_connector: Option<usize>,
    task_slots: Vec<TaskSlot>,
    /// One-shot: set once the completion signal has fired.
    completion_fired: bool,
}

impl RoomEntity {
    /// Creates an entity from `template` at the identity pose.
    ///
    /// The caller is expected to align it with [`align`](Self::align)
    /// before it is checked for collisions or inserted into a graph.
    pub fn instantiate(id: EntityId, template: Arc<RoomTemplate>) -> Self {
        let connectors = template
            .connectors
            .iter()
            .map(|pose| ConnectionPoint::new(*pose))
            .collect();
        let task_slots = template
            .task_slots
            .iter()
            .enumerate()
            .map(|(i, kind)| TaskSlot::new(TaskSlotId(i as u32), kind.clone()))
            .collect();

        Self {
            id,
            category: template.room_category(),
            template,
            pose: Pose::IDENTITY,
            connectors,
            parent_connection: None,
            attach_connector: None,
            task_slots,
            completion_fired: false,
        }
    }

    /// Graph key, unique for the lifetime of the graph that allocated it.
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn category(&self) -> RoomCategory {
        self.category
    }

    /// The template this entity was stamped from. Shared with every other
    /// instance of it.
    pub fn template(&self) -> &RoomTemplate {
        &self.template
    }

    /// World pose. Identity until [`align`](Self::align) or
    /// [`set_pose`](Self::set_pose) moves it.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Moves the entity to an explicit pose (used for the spawn room).
    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    // -----------------------------------------------------------------------
    // Connectors
    // -----------------------------------------------------------------------

    /// Every connection point, indexed the same way as the template's
    /// connector list. [`ConnectorRef::index`] points into this slice.
    pub fn connectors(&self) -> &[ConnectionPoint] {
        &self.connectors
    }

    pub fn connector(&self, index: usize) -> Option<&ConnectionPoint> {
        self.connectors.get(index)
    }

    pub fn connector_mut(&mut self, index: usize) -> Option<&mut ConnectionPoint> {
        self.connectors.get_mut(index)
    }

    /// World pose of connector `index`.
    pub fn connector_pose(&self, index: usize) -> Option<Pose> {
        self.connectors
            .get(index)
            .map(|c| self.pose.compose(c.local))
    }

    /// Typed edges to every connector this entity owns.
    pub fn connector_refs(&self) -> impl Iterator<Item = ConnectorRef> + '_ {
        (0..self.connectors.len()).map(|i| ConnectorRef::new(self.id, i))
    }

    /// Connection points nothing holds right now.
    pub fn free_connector_count(&self) -> usize {
        self.connectors
            .iter()
            .filter(|c| !c.state.is_reserved())
            .count()
    }

    /// Picks a usable (unreserved) connection point.
    ///
    /// With a single connector it is tested directly. Otherwise up to
    /// `draws` uniform random picks are made over *all* connectors and the
    /// first free one wins. Under high occupancy this can return `None`
    /// even though a free connector exists; that trade is accepted to avoid
    /// always growing out of the same connector index.
    pub fn available_connector<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        draws: usize,
    ) -> Option<usize> {
        match self.connectors.len() {
            0 => None,
            1 => (!self.connectors[0].state.is_reserved()).then_some(0),
            n => (0..draws)
                .map(|_| rng.random_range(0..n))
                .find(|&i| !self.connectors[i].state.is_reserved()),
        }
    }

    /// Rotates and translates the entity so its connector `index` sits on
    /// `parent_world`, facing it.
    pub fn align(&mut self, index: usize, parent_world: Pose) -> Result<(), GraphError> {
        let local = self
            .connectors
            .get(index)
            .ok_or(GraphError::UnknownConnector(ConnectorRef::new(self.id, index)))?
            .local;
        self.pose = align_to(parent_world, local);
        Ok(())
    }

    /// The connector on the parent this entity hangs off. `None` for the
    /// spawn and for entities not yet attached.
    ///
    /// Removing the entity releases exactly this connector.
    pub fn parent_connection(&self) -> Option<ConnectorRef> {
        self.parent_connection
    }

    pub fn attach_connector(&self) -> Option<usize> {
        self.attach_connector
    }

    /// Records the edge to the parent connector and which of our own
    /// connectors is joined to it.
    pub fn attach(&mut self, parent: ConnectorRef, own_index: usize) {
        self.parent_connection = Some(parent);
        self.attach_connector = Some(own_index);
    }

    // -----------------------------------------------------------------------
    // Geometry
    // -----------------------------------------------------------------------

    /// Bounding parts in world space.
    pub fn bounds(&self) -> impl Iterator<Item = Obb> + '_ {
        self.template
            .bounds
            .iter()
            .map(|part| part.transformed(self.pose))
    }

    /// Returns `true` if `point` lies inside any bounding part.
    pub fn contains_point(&self, point: delve_geometry::Vec2) -> bool {
        self.bounds().any(|b| b.contains_point(point))
    }

    // -----------------------------------------------------------------------
    // Task-slots
    // -----------------------------------------------------------------------

    /// All task-slots, dormant, active and completed alike.
    pub fn task_slots(&self) -> &[TaskSlot] {
        &self.task_slots
    }

    pub fn task_slot_ids(&self) -> Vec<TaskSlotId> {
        self.task_slots.iter().map(|s| s.id).collect()
    }

    /// Activates the given dormant slots. Unknown or already active ids are
    /// skipped. Returns how many were activated.
    pub fn activate_tasks(&mut self, ids: &[TaskSlotId]) -> usize {
        let mut activated = 0;
        for id in ids {
            if let Some(slot) = self.task_slots.iter_mut().find(|s| s.id == *id) {
                if slot.state == TaskSlotState::Dormant {
                    slot.state = TaskSlotState::Active;
                    activated += 1;
                }
            }
        }
        activated
    }

    pub fn active_task_count(&self) -> usize {
        self.task_slots
            .iter()
            .filter(|s| s.state == TaskSlotState::Active)
            .count()
    }

    /// Marks an active slot completed.
    ///
    /// When the last active slot completes the room's completion signal
    /// fires: [`TaskProgress::RoomCompleted`] is returned, once.
    pub fn complete_task(&mut self, id: TaskSlotId) -> Result<TaskProgress, GraphError> {
        let room = self.id;
        let slot = self
            .task_slots
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(GraphError::UnknownTaskSlot(room, id))?;
        if slot.state != TaskSlotState::Active {
            return Err(GraphError::TaskNotActive(room, id));
        }
        slot.state = TaskSlotState::Completed;

        let remaining = self.active_task_count();
        if remaining == 0 && !self.completion_fired {
            self.completion_fired = true;
            Ok(TaskProgress::RoomCompleted)
        } else {
            Ok(TaskProgress::Pending { remaining })
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completion_fired
    }

    /// Removes every task-slot from the room and hands them to the caller
    /// so whatever hosts them can be torn down.
    pub fn drain_task_slots(&mut self) -> Vec<TaskSlot> {
        std::mem::take(&mut self.task_slots)
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use delve_geometry::Vec2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::TemplateCategory;

    fn hallway() -> Arc<RoomTemplate> {
        Arc::new(
            RoomTemplate::new("hall", TemplateCategory::Hallway)
                .with_connector(Pose::at(-2.0, 0.0, PI))
                .with_connector(Pose::at(2.0, 0.0, 0.0))
                .with_bounds(Obb::rect(0.0, 0.0, 2.0, 1.0)),
        )
    }

    fn hub(connectors: usize) -> Arc<RoomTemplate> {
        let mut t = RoomTemplate::new("hub", TemplateCategory::Room)
            .with_bounds(Obb::rect(0.0, 0.0, 5.0, 5.0))
            .with_task("sweep")
            .with_task("dishes")
            .with_task("cables");
        for i in 0..connectors {
            let angle = i as f32 * PI / 2.0;
            t = t.with_connector(Pose::new(Vec2::from_angle(angle) * 5.0, angle));
        }
        Arc::new(t)
    }

    #[test]
    fn test_instantiate_copies_template_layout() {
        let e = RoomEntity::instantiate(EntityId(1), hub(4));
        assert_eq!(e.category(), RoomCategory::Room);
        assert_eq!(e.connectors().len(), 4);
        assert_eq!(e.free_connector_count(), 4);
        assert_eq!(e.task_slots().len(), 3);
        assert_eq!(e.pose(), Pose::IDENTITY);
        assert!(e.parent_connection().is_none());
    }

    #[test]
    fn test_single_connector_tested_directly() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut e = RoomEntity::instantiate(EntityId(1), hub(1));
        assert_eq!(e.available_connector(&mut rng, CONNECTOR_DRAWS), Some(0));
        e.connector_mut(0).unwrap().state.reserve();
        assert_eq!(e.available_connector(&mut rng, CONNECTOR_DRAWS), None);
    }

    #[test]
    fn test_no_connectors_means_none() {
        let mut rng = StdRng::seed_from_u64(1);
        let e = RoomEntity::instantiate(EntityId(1), hub(0));
        assert_eq!(e.available_connector(&mut rng, CONNECTOR_DRAWS), None);
    }

    #[test]
    fn test_all_reserved_never_returns_a_connector() {
        let mut e = RoomEntity::instantiate(EntityId(1), hub(4));
        for i in 0..4 {
            e.connector_mut(i).unwrap().state.reserve();
        }
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(e.available_connector(&mut rng, CONNECTOR_DRAWS), None);
        }
    }

    #[test]
    fn test_random_draw_only_returns_free_connectors() {
        let mut e = RoomEntity::instantiate(EntityId(1), hub(4));
        for i in [0, 1, 3] {
            e.connector_mut(i).unwrap().state.reserve();
        }
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            if let Some(i) = e.available_connector(&mut rng, CONNECTOR_DRAWS) {
                assert_eq!(i, 2);
            }
        }
    }

    #[test]
    fn test_zero_draws_gives_up_immediately() {
        let mut rng = StdRng::seed_from_u64(9);
        let e = RoomEntity::instantiate(EntityId(1), hub(4));
        assert_eq!(e.available_connector(&mut rng, 0), None);
    }

    #[test]
    fn test_random_draw_spreads_over_connectors() {
        let e = RoomEntity::instantiate(EntityId(1), hub(4));
        let mut seen = [false; 4];
        let mut rng = StdRng::seed_from_u64(123);
        for _ in 0..200 {
            let i = e.available_connector(&mut rng, CONNECTOR_DRAWS).unwrap();
            seen[i] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_align_puts_connector_on_parent() {
        let mut e = RoomEntity::instantiate(EntityId(2), hallway());
        let parent = Pose::at(5.0, 0.0, 0.0);
        e.align(0, parent).unwrap();
        let joined = e.connector_pose(0).unwrap();
        assert!(joined.position.distance(parent.position) < 1e-4);
        assert!(joined.faces(&parent));
        assert!(e.pose().position.distance(Vec2::new(7.0, 0.0)) < 1e-4);
    }

    #[test]
    fn test_align_unknown_connector_errors() {
        let mut e = RoomEntity::instantiate(EntityId(2), hallway());
        let err = e.align(5, Pose::IDENTITY).unwrap_err();
        assert!(matches!(err, GraphError::UnknownConnector(_)));
    }

    #[test]
    fn test_completion_fires_once_after_last_active_slot() {
        let mut e = RoomEntity::instantiate(EntityId(3), hub(1));
        assert_eq!(e.activate_tasks(&[TaskSlotId(0), TaskSlotId(2)]), 2);

        assert_eq!(
            e.complete_task(TaskSlotId(0)).unwrap(),
            TaskProgress::Pending { remaining: 1 }
        );
        assert!(!e.is_completed());
        assert_eq!(e.complete_task(TaskSlotId(2)).unwrap(), TaskProgress::RoomCompleted);
        assert!(e.is_completed());

        // Dormant slot can't be completed, and nothing fires twice.
        assert!(matches!(
            e.complete_task(TaskSlotId(1)),
            Err(GraphError::TaskNotActive(_, _))
        ));
        assert!(matches!(
            e.complete_task(TaskSlotId(2)),
            Err(GraphError::TaskNotActive(_, _))
        ));
    }

    #[test]
    fn test_activate_skips_unknown_and_repeated_ids() {
        let mut e = RoomEntity::instantiate(EntityId(3), hub(1));
        assert_eq!(e.activate_tasks(&[TaskSlotId(1), TaskSlotId(1), TaskSlotId(9)]), 1);
        assert_eq!(e.active_task_count(), 1);
    }

    #[test]
    fn test_drain_task_slots_empties_room() {
        let mut e = RoomEntity::instantiate(EntityId(3), hub(1));
        let drained = e.drain_task_slots();
        assert_eq!(drained.len(), 3);
        assert!(e.task_slots().is_empty());
    }
}
