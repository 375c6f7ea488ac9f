//! Template sources: where room prefabs come from.

use std::collections::HashMap;
use std::sync::Arc;

use delve_graph::{RoomCategory, RoomTemplate, TemplateCategory};
use rand::seq::IndexedRandom;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TemplateSource
// ---------------------------------------------------------------------------

/// Supplies the template for each placement attempt.
///
/// The orchestrator calls [`select`](Self::select) exactly once per
/// placement attempt with the category it needs. Which concrete variant
/// comes back (a plain room or a special one, the usual spawn or an
/// alternate) is the source's decision. Returning `None` aborts the
/// current growth batch with `TemplateMissing`.
pub trait TemplateSource {
    fn select(&mut self, category: RoomCategory, rng: &mut dyn RngCore) -> Option<Arc<RoomTemplate>>;
}

// ---------------------------------------------------------------------------
// TemplateCatalog
// ---------------------------------------------------------------------------

/// Variant odds for a [`TemplateCatalog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Chance a room placement uses a `SpecialRoom` template.
    pub special_room_chance: f64,
    /// Chance the spawn uses an `AlternateSpawn` template.
    pub alternate_spawn_chance: f64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            special_room_chance: 0.10,
            alternate_spawn_chance: 0.0,
        }
    }
}

impl CatalogConfig {
    /// Clamps both chances into `0.0..=1.0` (NaN becomes 0).
    pub fn validated(mut self) -> Self {
        self.special_room_chance = clamp_chance(self.special_room_chance);
        self.alternate_spawn_chance = clamp_chance(self.alternate_spawn_chance);
        self
    }
}

fn clamp_chance(p: f64) -> f64 {
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

/// On-disk shape of a catalog.
#[cfg(feature = "json")]
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    config: CatalogConfig,
    templates: Vec<RoomTemplate>,
}

/// An in-memory set of templates, grouped by category.
///
/// Picks uniformly among templates of the chosen category. Rooms roll
/// `special_room_chance` for a special variant, spawns roll
/// `alternate_spawn_chance`; when the rolled variant has no templates the
/// other variant is used.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: HashMap<TemplateCategory, Vec<Arc<RoomTemplate>>>,
    config: CatalogConfig,
}

impl TemplateCatalog {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            templates: HashMap::new(),
            config: config.validated(),
        }
    }

    pub fn with_template(mut self, template: RoomTemplate) -> Self {
        self.insert(template);
        self
    }

    pub fn insert(&mut self, template: RoomTemplate) {
        self.templates
            .entry(template.category)
            .or_default()
            .push(Arc::new(template));
    }

    /// Loads a catalog from JSON:
    ///
    /// ```json
    /// { "config": { "special_room_chance": 0.1 }, "templates": [ ... ] }
    /// ```
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self, crate::ConfigError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        if file.templates.is_empty() {
            return Err(crate::ConfigError::Invalid("catalog has no templates".into()));
        }
        let mut catalog = Self::new(file.config);
        for template in file.templates {
            catalog.insert(template);
        }
        tracing::debug!(templates = catalog.len(), "template catalog loaded");
        Ok(catalog)
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.templates.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A random template of exactly this category.
    pub fn template<R: Rng + ?Sized>(
        &self,
        category: TemplateCategory,
        rng: &mut R,
    ) -> Option<Arc<RoomTemplate>> {
        self.templates.get(&category)?.choose(rng).cloned()
    }

    fn variant<R: Rng + ?Sized>(
        &self,
        usual: TemplateCategory,
        rare: TemplateCategory,
        chance: f64,
        rng: &mut R,
    ) -> Option<Arc<RoomTemplate>> {
        let (first, second) = if rng.random_bool(chance) {
            (rare, usual)
        } else {
            (usual, rare)
        };
        self.template(first, rng)
            .or_else(|| self.template(second, rng))
    }
}

impl TemplateSource for TemplateCatalog {
    fn select(&mut self, category: RoomCategory, rng: &mut dyn RngCore) -> Option<Arc<RoomTemplate>> {
        match category {
            RoomCategory::Hallway => self.template(TemplateCategory::Hallway, rng),
            RoomCategory::Room => self.variant(
                TemplateCategory::Room,
                TemplateCategory::SpecialRoom,
                self.config.special_room_chance,
                rng,
            ),
            RoomCategory::Spawn => self.variant(
                TemplateCategory::Spawn,
                TemplateCategory::AlternateSpawn,
                self.config.alternate_spawn_chance,
                rng,
            ),
        }
    }
}
