use std::time::Duration;

use delve::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

const CATALOG: &str = include_str!("../catalog.json");

/// Rooms to clear before the run counts as won.
const ROOMS_TO_WIN: u64 = 6;

/// Tasks the "player" finishes after each growth batch.
const TASKS_PER_BATCH: usize = 3;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A player who never moves on their own.
struct Idler {
    position: Vec2,
}

impl PlayerLocator for Idler {
    fn is_player_inside(&self, bounds: &Obb) -> bool {
        bounds.contains_point(self.position)
    }

    fn relocate_player(&mut self, spawn: Pose) {
        info!(from = ?self.position, to = %spawn, "player pulled back to spawn");
        self.position = spawn.position;
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let catalog = TemplateCatalog::from_json(CATALOG)?;
    let config = GenerationConfig {
        clock: ClockConfig::with_interval(Duration::from_millis(300)),
        seed: Some(2024),
        ..GenerationConfig::default()
    };
    let clock = GrowthClock::new(config.clock.clone());
    // Standing where the first eastern room usually lands.
    let player = Idler {
        position: Vec2::new(12.0, 0.0),
    };
    let session = DungeonSession::start(config, catalog, player)?;
    let (handle, mut events) = spawn_session(session, clock, 32);

    let mut rng = StdRng::seed_from_u64(7);
    let mut open: Vec<(EntityId, TaskSlotId)> = Vec::new();
    let mut cleared = 0u64;

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::ChainPlaced(chain) => {
                open.extend(chain.active_tasks.iter().map(|&slot| (chain.room, slot)));
            }
            SessionEvent::BatchFinished(report) => {
                info!(placed = report.placed, reason = ?report.ended_early, "batch finished");
                for _ in 0..TASKS_PER_BATCH {
                    if open.is_empty() {
                        break;
                    }
                    let (room, slot) = open.swap_remove(rng.random_range(0..open.len()));
                    match handle.task_completed(room, slot).await {
                        Ok(progress) => info!(%room, %slot, ?progress, "task done"),
                        // Won while this batch's events were still queued.
                        Err(DelveError::SessionEnded) => break,
                        Err(err) => return Err(err.into()),
                    }
                }
            }
            SessionEvent::RoomCleared(room) => {
                cleared += 1;
                info!(
                    room = %room.room,
                    removed = room.removal.removed.len(),
                    cleared,
                    "room cleared"
                );
                if cleared == ROOMS_TO_WIN {
                    handle.end(SessionOutcome::Won).await?;
                }
            }
            SessionEvent::Ended { outcome, removal } => {
                info!(?outcome, removed = removal.removed.len(), "run over");
                break;
            }
        }
    }

    let snapshot = handle.snapshot().await?;
    info!(
        state = ?snapshot.state,
        rooms_cleared = snapshot.rooms_cleared,
        free_spawn_connectors = snapshot.free_spawn_connectors,
        "final dungeon"
    );
    Ok(())
}
