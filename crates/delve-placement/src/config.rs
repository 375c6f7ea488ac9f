//! Placement configuration.

use serde::{Deserialize, Serialize};

/// Tunables for [`PlacementEngine`](crate::PlacementEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Random draws made when picking a free connector on a new entity
    /// with more than one connector.
    pub connector_draws: usize,

    /// Fraction the candidate's bounds are shrunk by before the overlap
    /// query, so neighbors that touch at a shared connector don't count.
    pub collision_margin: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            connector_draws: delve_graph::CONNECTOR_DRAWS,
            collision_margin: 0.10,
        }
    }
}

impl PlacementConfig {
    /// Largest accepted collision margin.
    pub const MAX_COLLISION_MARGIN: f32 = 0.9;

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// - `connector_draws` raised to at least 1.
    /// - `collision_margin` clamped to `0.0..=MAX_COLLISION_MARGIN`.
    pub fn validated(mut self) -> Self {
        if self.connector_draws == 0 {
            tracing::warn!("connector_draws is 0 — raising to 1");
            self.connector_draws = 1;
        }
        if !(0.0..=Self::MAX_COLLISION_MARGIN).contains(&self.collision_margin) {
            let clamped = if self.collision_margin.is_nan() {
                0.0
            } else {
                self.collision_margin.clamp(0.0, Self::MAX_COLLISION_MARGIN)
            };
            tracing::warn!(
                margin = self.collision_margin,
                clamped,
                "collision_margin out of range — clamping"
            );
            self.collision_margin = clamped;
        }
        self
    }
}
