//! Room placement and lifecycle for Delve.
//!
//! [`PlacementEngine`] is the only component that mutates the
//! [`DungeonGraph`](delve_graph::DungeonGraph). It instantiates entities
//! from templates, snaps them onto a parent connector, rejects placements
//! that collide with existing geometry, and tears entities down again
//! (a room always takes its hallway with it).
//!
//! # Key types
//!
//! - [`PlacementEngine`] — place, remove, tear down
//! - [`PlacementConfig`] — connector draw count, collision margin
//! - [`PlacementError`] — why a placement failed
//! - [`Removal`] — what a removal released and destroyed

mod collision;
mod config;
mod engine;
mod error;

pub use collision::first_overlap;
pub use config::PlacementConfig;
pub use engine::{PlacementEngine, Removal};
pub use error::PlacementError;
