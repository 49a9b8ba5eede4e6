use crate::brush_engine::dab::DEFAULT_SPACING;
use crate::canvas::history::DEFAULT_HISTORY_MEMORY;
use crate::render::tile_cache::DEFAULT_CACHE_CAPACITY;

/// Tunables shared by the engine components.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// Undo memory budget in bytes.
    pub history_memory_limit: usize,
    /// Dab spacing as a fraction of brush diameter.
    pub dab_spacing: f32,
    /// Maximum number of tile textures kept by the cache.
    pub tile_cache_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            history_memory_limit: DEFAULT_HISTORY_MEMORY,
            dab_spacing: DEFAULT_SPACING,
            tile_cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl EngineSettings {
    /// Defaults overridden by `RUSTY_CANVAS_HISTORY_MB`, `RUSTY_CANVAS_DAB_SPACING`
    /// and `RUSTY_CANVAS_TILE_CACHE`. Unparseable or non-positive values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        if let Some(mb) = lookup("RUSTY_CANVAS_HISTORY_MB")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            settings.history_memory_limit = mb.saturating_mul(1024 * 1024);
        }
        if let Some(spacing) = lookup("RUSTY_CANVAS_DAB_SPACING")
            .and_then(|v| v.parse::<f32>().ok())
            .filter(|s| s.is_finite() && *s > 0.0)
        {
            settings.dab_spacing = spacing;
        }
        if let Some(capacity) = lookup("RUSTY_CANVAS_TILE_CACHE")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            settings.tile_cache_capacity = capacity;
        }
        log::debug!("engine settings: {settings:?}");
        settings
    }
}
