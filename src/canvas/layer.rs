use super::tile_manager::TileManager;

/// Stable layer identity, unique within a document's lifetime.
pub type LayerId = u64;

/// Per-layer rule for combining its pixels with the layers beneath it.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Normal = 0,
    Multiply = 1,
    Screen = 2,
    Overlay = 3,
}

impl BlendMode {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Decode a persisted mode; unknown values fall back to `Normal`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => BlendMode::Multiply,
            2 => BlendMode::Screen,
            3 => BlendMode::Overlay,
            _ => BlendMode::Normal,
        }
    }
}

/// Single painting layer with its own display properties and tile storage.
#[derive(Clone, Debug)]
pub struct Layer {
    id: LayerId,
    pub name: String,
    opacity: f32,
    pub visible: bool,
    pub locked: bool,
    pub blend_mode: BlendMode,
    tiles: TileManager,
}

impl Layer {
    /// Create an empty layer. An empty `name` becomes "Layer {id}".
    pub fn new(id: LayerId, name: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.is_empty() {
            format!("Layer {id}")
        } else {
            name
        };
        Self {
            id,
            name,
            opacity: 1.0,
            visible: true,
            locked: false,
            blend_mode: BlendMode::Normal,
            tiles: TileManager::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Set opacity, clamped to [0, 1].
    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = if opacity.is_nan() {
            0.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
    }

    pub fn tiles(&self) -> &TileManager {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut TileManager {
        &mut self.tiles
    }

    /// Drop all pixel content.
    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    /// Deep copy under a new id. Only allocated tiles are copied.
    pub fn duplicate(&self, new_id: LayerId) -> Self {
        let mut tiles = TileManager::new();
        for tile in self.tiles.all_tiles().filter(|t| !t.is_empty()) {
            tiles.insert_tile(tile.clone());
        }
        Self {
            id: new_id,
            name: format!("{} copy", self.name),
            opacity: self.opacity,
            visible: self.visible,
            locked: self.locked,
            blend_mode: self.blend_mode,
            tiles,
        }
    }
}
