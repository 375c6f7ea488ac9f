//! Task assignment: which task-slots of a new room get activated.

use delve_graph::{EntityId, TaskSlot, TaskSlotId};
use rand::RngCore;
use rand::seq::IndexedRandom;

/// Chooses the task-slots to activate in a freshly placed room.
///
/// This is the hook for whatever prioritization the game wants (favor
/// tasks the player hasn't seen, balance difficulty, ...). The orchestrator
/// treats the answer as opaque, only truncating it to `max`.
pub trait TaskAssigner {
    fn assign(
        &mut self,
        room: EntityId,
        slots: &[TaskSlot],
        max: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<TaskSlotId>;
}

/// Fallback policy: `max` distinct slots drawn uniformly at random.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformTaskAssigner;

impl TaskAssigner for UniformTaskAssigner {
    fn assign(
        &mut self,
        _room: EntityId,
        slots: &[TaskSlot],
        max: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<TaskSlotId> {
        slots
            .choose_multiple(rng, max.min(slots.len()))
            .map(|slot| slot.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn slots(n: u32) -> Vec<TaskSlot> {
        (0..n).map(|i| TaskSlot::new(TaskSlotId(i), "chore")).collect()
    }

    #[test]
    fn test_uniform_picks_distinct_slots() {
        let mut rng = StdRng::seed_from_u64(11);
        let picked = UniformTaskAssigner.assign(EntityId(1), &slots(5), 3, &mut rng);
        assert_eq!(picked.len(), 3);
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 3);
        assert!(picked.iter().all(|id| id.0 < 5));
    }

    #[test]
    fn test_uniform_caps_at_available_slots() {
        let mut rng = StdRng::seed_from_u64(12);
        assert_eq!(UniformTaskAssigner.assign(EntityId(1), &slots(2), 10, &mut rng).len(), 2);
        assert!(UniformTaskAssigner.assign(EntityId(1), &[], 3, &mut rng).is_empty());
    }

    #[test]
    fn test_uniform_covers_every_slot_over_many_rooms() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut seen = HashSet::new();
        for _ in 0..100 {
            seen.extend(UniformTaskAssigner.assign(EntityId(1), &slots(4), 1, &mut rng));
        }
        assert_eq!(seen.len(), 4);
    }
}
