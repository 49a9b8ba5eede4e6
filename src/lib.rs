pub mod brush_engine;
pub mod canvas;
pub mod format;
pub mod render;
pub mod session;
pub mod settings;
pub mod utils;

pub use brush_engine::{BrushEngine, BrushOptions, CanvasPoint, Stroke, ToolType};
pub use canvas::{BlendMode, Document, History, Layer, LayerId, LayerStack, Tile, TileCoord};
pub use format::CmcError;
pub use render::{Compositor, TileCache};
pub use session::PaintSession;
pub use settings::EngineSettings;
