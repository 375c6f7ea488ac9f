//! A running dungeon: engine, orchestrator and the outside collaborators.

use std::collections::VecDeque;

use delve_geometry::{Obb, Pose};
use delve_graph::{
    ConnectorRef, DungeonGraph, EntityId, GraphError, RoomCategory, TaskProgress, TaskSlotId,
};
use delve_placement::{PlacementEngine, Removal};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    BatchReport, DelveError, GenerationConfig, GenerationOrchestrator, GrowthPhase, StepOutcome,
    TaskAssigner, TemplateSource,
};

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Where the player is. The session never owns player state; it only asks
/// before removing a room and moves the player out if needed.
pub trait PlayerLocator {
    fn is_player_inside(&self, bounds: &Obb) -> bool;
    fn relocate_player(&mut self, spawn: Pose);
}

/// For sessions without a player (tools, tests, headless growth).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlayer;

impl PlayerLocator for NoPlayer {
    fn is_player_inside(&self, _bounds: &Obb) -> bool {
        false
    }

    fn relocate_player(&mut self, _spawn: Pose) {}
}

// ---------------------------------------------------------------------------
// Session types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionOutcome {
    Won,
    Lost,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Running,
    Ended(SessionOutcome),
}

/// A completed room that has been taken out of the dungeon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomCleared {
    pub room: EntityId,
    pub removal: Removal,
    /// The player was inside and got moved to the spawn first.
    pub player_relocated: bool,
}

/// Summary of a session for HUDs and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub phase: GrowthPhase,
    pub spawn: Option<EntityId>,
    pub hallways: usize,
    pub rooms: usize,
    pub free_spawn_connectors: usize,
    pub subscribed_rooms: usize,
    pub pending_completions: usize,
    pub rooms_cleared: u64,
}

// ---------------------------------------------------------------------------
// DungeonSession
// ---------------------------------------------------------------------------

/// One play session of a growing dungeon.
///
/// Growth is driven from outside: call [`on_growth_tick`](Self::on_growth_tick)
/// when the clock fires and then [`step_growth`](Self::step_growth) until it
/// reports the batch is done. Task completions come in through
/// [`report_task_completed`](Self::report_task_completed); completed rooms
/// are removed by [`process_completions`](Self::process_completions).
pub struct DungeonSession<S, P> {
    config: GenerationConfig,
    engine: PlacementEngine,
    orchestrator: GenerationOrchestrator,
    templates: S,
    player: P,
    spawn: EntityId,
    state: SessionState,
    completed: VecDeque<EntityId>,
    rooms_cleared: u64,
}

impl<S: TemplateSource, P: PlayerLocator> DungeonSession<S, P> {
    /// Places the spawn and returns a session ready to grow.
    ///
    /// # Errors
    /// Fails if the template source has no spawn template.
    pub fn start(config: GenerationConfig, mut templates: S, player: P) -> Result<Self, DelveError> {
        let config = config.validated();
        let mut engine = PlacementEngine::new(config.placement.clone());
        let mut orchestrator = GenerationOrchestrator::new(&config);
        let spawn = orchestrator.place_spawn(&mut engine, &mut templates, config.spawn_pose)?;
        info!(%spawn, chains_per_batch = config.chains_per_batch, "dungeon session started");

        Ok(Self {
            config,
            engine,
            orchestrator,
            templates,
            player,
            spawn,
            state: SessionState::Running,
            completed: VecDeque::new(),
            rooms_cleared: 0,
        })
    }

    /// Replaces the uniform task fallback.
    pub fn with_task_assigner(mut self, assigner: impl TaskAssigner + Send + 'static) -> Self {
        self.orchestrator.set_task_assigner(Box::new(assigner));
        self
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    // -----------------------------------------------------------------------
    // Growth
    // -----------------------------------------------------------------------

    /// The clock fired: start a batch. Returns `false` if the session has
    /// ended or a batch is still running.
    pub fn on_growth_tick(&mut self) -> bool {
        self.is_running() && self.orchestrator.begin_batch()
    }

    /// Places at most one chain of the running batch.
    pub fn step_growth(&mut self) -> StepOutcome {
        if !self.is_running() {
            return StepOutcome::Idle;
        }
        self.orchestrator.step(&mut self.engine, &mut self.templates)
    }

    /// Runs a whole batch right now, outside the clock.
    pub fn grow_now(&mut self) -> Result<BatchReport, DelveError> {
        if !self.is_running() {
            return Err(DelveError::SessionEnded);
        }
        Ok(self.orchestrator.run_batch(&mut self.engine, &mut self.templates))
    }

    pub fn is_growing(&self) -> bool {
        self.orchestrator.phase() == GrowthPhase::Growing
    }

    // -----------------------------------------------------------------------
    // Task completion
    // -----------------------------------------------------------------------

    /// Marks a task-slot completed. When this completes the room, the room
    /// is queued for [`process_completions`](Self::process_completions).
    pub fn report_task_completed(
        &mut self,
        room: EntityId,
        slot: TaskSlotId,
    ) -> Result<TaskProgress, DelveError> {
        if !self.is_running() {
            return Err(DelveError::SessionEnded);
        }
        let entity = self
            .engine
            .graph_mut()
            .get_mut(room)
            .ok_or(GraphError::UnknownEntity(room))?;
        let progress = entity.complete_task(slot)?;

        if progress == TaskProgress::RoomCompleted {
            if self.orchestrator.is_subscribed(room) {
                info!(%room, "room completed");
                self.completed.push_back(room);
            } else {
                debug!(%room, "room completed with no subscriber");
            }
        }
        Ok(progress)
    }

    /// Removes every room whose completion fired since the last call.
    ///
    /// For each room: stop listening, move the player to the spawn if they
    /// stand in the room or its hallway, then cascade the removal.
    pub fn process_completions(&mut self) -> Vec<RoomCleared> {
        let mut cleared = Vec::new();
        while let Some(room) = self.completed.pop_front() {
            self.orchestrator.unsubscribe(room);

            let player_relocated = self.player_in_chain(room);
            if player_relocated {
                let spawn_pose = self
                    .engine
                    .graph()
                    .get(self.spawn)
                    .map(|s| s.pose())
                    .unwrap_or(self.config.spawn_pose);
                debug!(%room, %spawn_pose, "moving player out of completed room");
                self.player.relocate_player(spawn_pose);
            }

            match self.engine.remove_room(room) {
                Ok(removal) => {
                    self.forget(&removal);
                    self.rooms_cleared += 1;
                    cleared.push(RoomCleared {
                        room,
                        removal,
                        player_relocated,
                    });
                }
                Err(err) => warn!(%room, error = %err, "completed room could not be removed"),
            }
        }
        cleared
    }

    /// Removes `id` outside the completion flow, e.g. a room the game
    /// collapses itself. Removing a hallway takes its room with it.
    ///
    /// Every removed room stops being listened to, and any completion it
    /// had queued is dropped.
    pub fn remove_room(&mut self, id: EntityId) -> Result<Removal, DelveError> {
        if !self.is_running() {
            return Err(DelveError::SessionEnded);
        }
        let removal = self.engine.remove_room(id)?;
        self.forget(&removal);
        info!(%id, removed = removal.removed.len(), "room removed by caller");
        Ok(removal)
    }

    /// Holds a connector so growth skips it until it is released.
    ///
    /// Returns `false` if it was already reserved.
    pub fn reserve_connector(&mut self, connector: ConnectorRef) -> Result<bool, DelveError> {
        Ok(self.engine.graph_mut().reserve(connector)?)
    }

    pub fn release_connector(&mut self, connector: ConnectorRef) -> Result<(), DelveError> {
        Ok(self.engine.graph_mut().release(connector)?)
    }

    /// Drops subscriptions and queued completions for removed entities.
    fn forget(&mut self, removal: &Removal) {
        for &id in &removal.removed {
            self.orchestrator.unsubscribe(id);
        }
        self.completed.retain(|room| !removal.contains(*room));
    }

    /// Whether the player stands in `room` or the hallway leading to it.
    fn player_in_chain(&self, room: EntityId) -> bool {
        let graph = self.engine.graph();
        let Some(entity) = graph.get(room) else {
            return false;
        };
        let hallway = entity
            .parent_connection()
            .and_then(|p| graph.get(p.entity))
            .filter(|h| h.category() == RoomCategory::Hallway);

        entity
            .bounds()
            .chain(hallway.into_iter().flat_map(|h| h.bounds()))
            .any(|b| self.player.is_player_inside(&b))
    }

    // -----------------------------------------------------------------------
    // End
    // -----------------------------------------------------------------------

    /// Ends the session: stops growth and removes everything but the spawn.
    ///
    /// # Errors
    /// [`DelveError::SessionEnded`] if it already ended.
    pub fn end(&mut self, outcome: SessionOutcome) -> Result<Removal, DelveError> {
        if !self.is_running() {
            return Err(DelveError::SessionEnded);
        }
        self.orchestrator.abort_batch();
        self.orchestrator.clear_subscriptions();
        self.completed.clear();
        let removal = self.engine.teardown();
        self.state = SessionState::Ended(outcome);
        info!(
            ?outcome,
            removed = removal.removed.len(),
            rooms_cleared = self.rooms_cleared,
            "dungeon session ended"
        );
        Ok(removal)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        let graph = self.engine.graph();
        SessionSnapshot {
            state: self.state,
            phase: self.orchestrator.phase(),
            spawn: graph.spawn(),
            hallways: graph.count(RoomCategory::Hallway),
            rooms: graph.count(RoomCategory::Room),
            free_spawn_connectors: graph
                .spawn()
                .and_then(|id| graph.get(id))
                .map(|s| s.free_connector_count())
                .unwrap_or(0),
            subscribed_rooms: self.orchestrator.subscribed_rooms(),
            pending_completions: self.completed.len(),
            rooms_cleared: self.rooms_cleared,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn spawn(&self) -> EntityId {
        self.spawn
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn graph(&self) -> &DungeonGraph {
        self.engine.graph()
    }

    pub fn engine(&self) -> &PlacementEngine {
        &self.engine
    }

    pub fn orchestrator(&self) -> &GenerationOrchestrator {
        &self.orchestrator
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn templates_mut(&mut self) -> &mut S {
        &mut self.templates
    }
}
