//! Growth batches: attaching hallway + room chains to the spawn.
//!
//! A batch is requested by a clock tick and drained one chain per
//! [`GenerationOrchestrator::step`], so a caller can spread it across
//! frames or yield to other work between chains.
//!
//! ```text
//!          begin_batch                 step() ... step()
//!   Idle ──────────────▶ Growing ──────────────────────────▶ Idle
//!                          │  one chain per step               ▲
//!                          └── placed == requested ────────────┤
//!                          └── no usable spawn connector ──────┤
//!                          └── template missing ───────────────┘
//! ```

use std::collections::HashSet;

use delve_geometry::Pose;
use delve_graph::{
    ConnectorRef, EntityId, RoomCategory, TaskSlotId, TaskSlotState, TemplateCategory,
};
use delve_placement::{PlacementEngine, PlacementError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{GenerationConfig, TaskAssigner, TemplateSource, UniformTaskAssigner};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GrowthPhase {
    Idle,
    Growing,
}

/// A hallway and room that were placed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedChain {
    /// The spawn connector the hallway hangs off.
    pub spawn_connector: ConnectorRef,
    pub hallway: EntityId,
    pub room: EntityId,
    /// The room's task-slots that were activated.
    pub active_tasks: Vec<TaskSlotId>,
}

/// Why a batch stopped before placing everything it asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEnd {
    /// Every spawn connector is taken or failed its retries. The dungeon is
    /// full for now; this is not an error.
    NoConnector,
    /// The template source had nothing for this category.
    TemplateMissing(TemplateCategory),
    /// No spawn has been placed yet.
    NoSpawn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub requested: usize,
    pub placed: usize,
    pub ended_early: Option<BatchEnd>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.ended_early.is_none()
    }
}

/// What one call to [`GenerationOrchestrator::step`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// No batch is running.
    Idle,
    Placed(PlacedChain),
    /// The batch is over; the orchestrator is idle again.
    BatchDone(BatchReport),
}

/// Progress of the running batch.
#[derive(Debug)]
struct Batch {
    requested: usize,
    placed: usize,
    /// Spawn connectors that used up their retries in this batch.
    exhausted: HashSet<ConnectorRef>,
}

// ---------------------------------------------------------------------------
// GenerationOrchestrator
// ---------------------------------------------------------------------------

/// Decides when and where the dungeon grows.
///
/// Owns the generation RNG, the running batch and the set of rooms whose
/// completion signal is being listened to. The graph itself lives in the
/// [`PlacementEngine`] passed to each call.
pub struct GenerationOrchestrator {
    chains_per_batch: usize,
    chain_retries: u32,
    max_active_tasks: usize,
    rng: StdRng,
    batch: Option<Batch>,
    assigner: Option<Box<dyn TaskAssigner + Send>>,
    fallback: UniformTaskAssigner,
    subscriptions: HashSet<EntityId>,
}

impl GenerationOrchestrator {
    pub fn new(config: &GenerationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            chains_per_batch: config.chains_per_batch,
            chain_retries: config.chain_retries.max(1),
            max_active_tasks: config.max_active_tasks,
            rng,
            batch: None,
            assigner: None,
            fallback: UniformTaskAssigner,
            subscriptions: HashSet::new(),
        }
    }

    /// Replaces the uniform task fallback with a game-supplied policy.
    pub fn set_task_assigner(&mut self, assigner: Box<dyn TaskAssigner + Send>) {
        self.assigner = Some(assigner);
    }

    pub fn phase(&self) -> GrowthPhase {
        if self.batch.is_some() {
            GrowthPhase::Growing
        } else {
            GrowthPhase::Idle
        }
    }

    /// Asks the template source for a spawn and places it at `pose`.
    pub fn place_spawn<S: TemplateSource + ?Sized>(
        &mut self,
        engine: &mut PlacementEngine,
        templates: &mut S,
        pose: Pose,
    ) -> Result<EntityId, PlacementError> {
        let Some(template) = templates.select(RoomCategory::Spawn, &mut self.rng) else {
            error!("template source has no spawn template");
            return Err(PlacementError::TemplateMissing(TemplateCategory::Spawn));
        };
        engine.place_spawn(template, pose)
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    /// Idle → Growing. Returns `false` if a batch is already running.
    pub fn begin_batch(&mut self) -> bool {
        if self.batch.is_some() {
            debug!("growth tick while a batch is still running; ignored");
            return false;
        }
        self.batch = Some(Batch {
            requested: self.chains_per_batch,
            placed: 0,
            exhausted: HashSet::new(),
        });
        debug!(requested = self.chains_per_batch, "growth batch started");
        true
    }

    /// Drops the running batch, if any, and reports how far it got.
    pub fn abort_batch(&mut self) -> Option<BatchReport> {
        self.batch.take().map(|batch| BatchReport {
            requested: batch.requested,
            placed: batch.placed,
            ended_early: None,
        })
    }

    /// Places at most one chain of the running batch.
    pub fn step<S: TemplateSource + ?Sized>(
        &mut self,
        engine: &mut PlacementEngine,
        templates: &mut S,
    ) -> StepOutcome {
        let Some(mut batch) = self.batch.take() else {
            return StepOutcome::Idle;
        };
        if batch.placed >= batch.requested {
            return StepOutcome::BatchDone(finish(batch, None));
        }

        match self.grow_chain(engine, templates, &mut batch) {
            Ok(Some(chain)) => {
                batch.placed += 1;
                self.batch = Some(batch);
                StepOutcome::Placed(chain)
            }
            Ok(None) => StepOutcome::BatchDone(finish(batch, Some(BatchEnd::NoConnector))),
            Err(end) => StepOutcome::BatchDone(finish(batch, Some(end))),
        }
    }

    /// Starts a batch if none is running and drains it in one go.
    pub fn run_batch<S: TemplateSource + ?Sized>(
        &mut self,
        engine: &mut PlacementEngine,
        templates: &mut S,
    ) -> BatchReport {
        self.begin_batch();
        loop {
            match self.step(engine, templates) {
                StepOutcome::Placed(_) => continue,
                StepOutcome::BatchDone(report) => return report,
                // begin_batch above guarantees a batch exists.
                StepOutcome::Idle => {
                    return BatchReport {
                        requested: 0,
                        placed: 0,
                        ended_early: None,
                    };
                }
            }
        }
    }

    /// Scans spawn connectors in index order and tries to grow one chain.
    ///
    /// `Ok(None)` means no connector produced a chain.
    fn grow_chain<S: TemplateSource + ?Sized>(
        &mut self,
        engine: &mut PlacementEngine,
        templates: &mut S,
        batch: &mut Batch,
    ) -> Result<Option<PlacedChain>, BatchEnd> {
        let Some(spawn) = engine.spawn() else {
            warn!("growth requested before a spawn was placed");
            return Err(BatchEnd::NoSpawn);
        };
        let candidates: Vec<ConnectorRef> = engine
            .graph()
            .get(spawn)
            .map(|s| s.connector_refs().collect())
            .unwrap_or_default();

        for connector in candidates {
            if batch.exhausted.contains(&connector) || engine.graph().is_reserved(connector) {
                continue;
            }
            for attempt in 1..=self.chain_retries {
                match self.attempt_chain(engine, templates, connector) {
                    Ok(chain) => return Ok(Some(chain)),
                    Err(PlacementError::TemplateMissing(category)) => {
                        error!(%category, "template source returned nothing; aborting batch");
                        return Err(BatchEnd::TemplateMissing(category));
                    }
                    Err(err) if err.is_recoverable() => {
                        debug!(%connector, attempt, error = %err, "chain attempt failed");
                    }
                    Err(err) => {
                        warn!(%connector, error = %err, "chain attempt hit an inconsistency");
                        break;
                    }
                }
            }
            // Rollback already freed it; the release keeps the scan safe if
            // an inconsistency broke out early.
            let _ = engine.graph_mut().release(connector);
            batch.exhausted.insert(connector);
            debug!(%connector, retries = self.chain_retries, "spawn connector exhausted for this batch");
        }
        Ok(None)
    }

    /// One full try at `spawn_connector`: hallway, then room.
    ///
    /// Every failure leaves the graph as it was before the call.
    fn attempt_chain<S: TemplateSource + ?Sized>(
        &mut self,
        engine: &mut PlacementEngine,
        templates: &mut S,
        spawn_connector: ConnectorRef,
    ) -> Result<PlacedChain, PlacementError> {
        if !engine.graph_mut().reserve(spawn_connector)? {
            return Err(PlacementError::GraphInconsistency(format!(
                "{spawn_connector} already reserved"
            )));
        }

        let Some(hallway_template) = templates.select(RoomCategory::Hallway, &mut self.rng) else {
            engine.graph_mut().release(spawn_connector)?;
            return Err(PlacementError::TemplateMissing(TemplateCategory::Hallway));
        };
        let hallway = match engine.try_place_room(spawn_connector, hallway_template, &mut self.rng)
        {
            Ok(id) => id,
            Err(err) => {
                engine.graph_mut().release(spawn_connector)?;
                return Err(err);
            }
        };

        let room = match self.attach_room(engine, templates, hallway) {
            Ok(room) => room,
            Err(err) => {
                // Takes the spawn connector reservation with it.
                engine.remove_room(hallway)?;
                return Err(err);
            }
        };

        let active_tasks = self.activate_tasks(engine, room);
        self.subscribe(room);
        info!(
            hallway = %hallway,
            room = %room,
            spawn_connector = %spawn_connector,
            active_tasks = active_tasks.len(),
            "chain placed"
        );
        Ok(PlacedChain {
            spawn_connector,
            hallway,
            room,
            active_tasks,
        })
    }

    /// Places a room on a free connector of `hallway`. On failure the
    /// hallway's connector is free again.
    fn attach_room<S: TemplateSource + ?Sized>(
        &mut self,
        engine: &mut PlacementEngine,
        templates: &mut S,
        hallway: EntityId,
    ) -> Result<EntityId, PlacementError> {
        let hallway_entity = engine
            .graph()
            .get(hallway)
            .ok_or_else(|| PlacementError::GraphInconsistency(format!("{hallway} vanished")))?;
        let draws = engine.config().connector_draws;
        let Some(index) = hallway_entity.available_connector(&mut self.rng, draws) else {
            return Err(PlacementError::NoConnector {
                template: hallway_entity.template().name.clone(),
            });
        };
        let end = ConnectorRef::new(hallway, index);
        engine.graph_mut().reserve(end)?;

        let Some(room_template) = templates.select(RoomCategory::Room, &mut self.rng) else {
            engine.graph_mut().release(end)?;
            return Err(PlacementError::TemplateMissing(TemplateCategory::Room));
        };
        engine
            .try_place_room(end, room_template, &mut self.rng)
            .inspect_err(|_| {
                let _ = engine.graph_mut().release(end);
            })
    }

    fn activate_tasks(&mut self, engine: &mut PlacementEngine, room: EntityId) -> Vec<TaskSlotId> {
        let Some(entity) = engine.graph_mut().get_mut(room) else {
            return Vec::new();
        };
        let assigner: &mut dyn TaskAssigner = match self.assigner.as_mut() {
            Some(assigner) => assigner.as_mut(),
            None => &mut self.fallback,
        };
        let mut picked =
            assigner.assign(room, entity.task_slots(), self.max_active_tasks, &mut self.rng);
        picked.truncate(self.max_active_tasks);
        entity.activate_tasks(&picked);
        entity
            .task_slots()
            .iter()
            .filter(|slot| slot.state == TaskSlotState::Active)
            .map(|slot| slot.id)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Completion subscriptions
    // -----------------------------------------------------------------------

    pub fn subscribe(&mut self, room: EntityId) {
        self.subscriptions.insert(room);
    }

    /// Returns `true` if `room` was subscribed.
    pub fn unsubscribe(&mut self, room: EntityId) -> bool {
        self.subscriptions.remove(&room)
    }

    pub fn is_subscribed(&self, room: EntityId) -> bool {
        self.subscriptions.contains(&room)
    }

    pub fn subscribed_rooms(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn clear_subscriptions(&mut self) {
        self.subscriptions.clear();
    }
}

fn finish(batch: Batch, ended_early: Option<BatchEnd>) -> BatchReport {
    let report = BatchReport {
        requested: batch.requested,
        placed: batch.placed,
        ended_early,
    };
    match ended_early {
        None => debug!(placed = report.placed, "growth batch complete"),
        Some(end) => debug!(
            placed = report.placed,
            requested = report.requested,
            reason = ?end,
            "growth batch ended early"
        ),
    }
    report
}
