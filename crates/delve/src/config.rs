//! Generation configuration.

use delve_clock::ClockConfig;
use delve_geometry::Pose;
use delve_placement::PlacementConfig;
use serde::{Deserialize, Serialize};

/// Settings for a dungeon session.
///
/// Every field has a default, so a JSON document only needs the values it
/// wants to change:
///
/// ```
/// # #[cfg(feature = "json")] {
/// let config = delve::GenerationConfig::from_json(r#"{ "chains_per_batch": 4 }"#).unwrap();
/// assert_eq!(config.chains_per_batch, 4);
/// assert_eq!(config.chain_retries, 3);
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// When growth batches fire.
    pub clock: ClockConfig,

    /// Chains (hallway + room) requested per growth batch.
    pub chains_per_batch: usize,

    /// Attempts at one spawn connector before moving on to the next.
    pub chain_retries: u32,

    /// Upper bound on task-slots activated in a new room.
    pub max_active_tasks: usize,

    /// Where the spawn room is placed.
    pub spawn_pose: Pose,

    /// Seed for all generation randomness. `None` seeds from the OS.
    pub seed: Option<u64>,

    pub placement: PlacementConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            clock: ClockConfig::default(),
            chains_per_batch: 2,
            chain_retries: 3,
            max_active_tasks: 2,
            spawn_pose: Pose::IDENTITY,
            seed: None,
            placement: PlacementConfig::default(),
        }
    }
}

impl GenerationConfig {
    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// - `chain_retries` raised to at least 1.
    /// - nested clock and placement configs validated.
    pub fn validated(mut self) -> Self {
        if self.chain_retries == 0 {
            tracing::warn!("chain_retries is 0 — raising to 1");
            self.chain_retries = 1;
        }
        if self.chains_per_batch == 0 {
            tracing::warn!("chains_per_batch is 0 — the dungeon will never grow");
        }
        self.clock = self.clock.validated();
        self.placement = self.placement.validated();
        self
    }

    /// Parses a JSON document; missing fields take their defaults.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, crate::ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }
}
