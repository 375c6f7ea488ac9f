//! # Delve
//!
//! A dungeon that grows while you play it.
//!
//! Delve starts from a single spawn room and, every growth tick, attaches
//! new hallway + room chains to the spawn's free connectors. Each chain is
//! snapped into place, checked for collisions and rolled back if anything
//! goes wrong. When all activated tasks in a room are done, the room and
//! its hallway are removed and the spawn connector becomes free to grow
//! again.
//!
//! The work is split over a few crates, re-exported through [`prelude`]:
//!
//! - `delve-geometry`: poses, oriented boxes, connector alignment
//! - `delve-graph`: templates, entities, connectors, the dungeon arena
//! - `delve-placement`: placing and removing entities
//! - `delve-clock`: the growth timer
//!
//! This crate adds the orchestration on top.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use delve::prelude::*;
//!
//! # async fn run(catalog: TemplateCatalog) -> Result<(), DelveError> {
//! let config = GenerationConfig::default();
//! let clock = GrowthClock::new(config.clock.clone());
//! let session = DungeonSession::start(config, catalog, NoPlayer)?;
//! let (handle, mut events) = spawn_session(session, clock, 32);
//!
//! while let Some(event) = events.recv().await {
//!     if let SessionEvent::ChainPlaced(chain) = event {
//!         println!("new room {}", chain.room);
//!     }
//! }
//! handle.end(SessionOutcome::Won).await?;
//! # Ok(())
//! # }
//! ```

mod actor;
mod catalog;
mod config;
mod error;
mod orchestrator;
mod session;
mod tasks;

pub use actor::{spawn_session, SessionEvent, SessionHandle};
pub use catalog::{CatalogConfig, TemplateCatalog, TemplateSource};
pub use config::GenerationConfig;
pub use error::{ConfigError, DelveError};
pub use orchestrator::{
    BatchEnd, BatchReport, GenerationOrchestrator, GrowthPhase, PlacedChain, StepOutcome,
};
pub use session::{
    DungeonSession, NoPlayer, PlayerLocator, RoomCleared, SessionOutcome, SessionSnapshot,
    SessionState,
};
pub use tasks::{TaskAssigner, UniformTaskAssigner};

/// Everything needed to run a session, in one import.
pub mod prelude {
    pub use crate::{
        spawn_session, BatchEnd, BatchReport, CatalogConfig, DelveError, DungeonSession,
        GenerationConfig, GenerationOrchestrator, GrowthPhase, NoPlayer, PlacedChain,
        PlayerLocator, RoomCleared, SessionEvent, SessionHandle, SessionOutcome,
        SessionSnapshot, SessionState, StepOutcome, TaskAssigner, TemplateCatalog,
        TemplateSource, UniformTaskAssigner,
    };
    pub use delve_clock::{ClockConfig, GrowthClock, TickPolicy};
    pub use delve_geometry::{Obb, Pose, Vec2};
    pub use delve_graph::{
        ConnectorRef, DungeonGraph, EntityId, RoomCategory, RoomTemplate, TaskProgress,
        TaskSlotId, TemplateCategory,
    };
    pub use delve_placement::{PlacementConfig, PlacementEngine, PlacementError, Removal};
}
