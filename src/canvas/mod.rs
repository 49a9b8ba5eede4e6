pub mod document;
pub mod history;
pub mod layer;
pub mod layer_stack;
pub mod tile;
pub mod tile_manager;

pub use document::Document;
pub use history::{History, HistoryCommand, StrokeCommand, TileStates};
pub use layer::{BlendMode, Layer, LayerId};
pub use layer_stack::LayerStack;
pub use tile::{pixel_to_tile, tile_to_pixel, Pixel, Tile, TileCoord, TILE_BYTES, TILE_PIXELS, TILE_SIZE};
pub use tile_manager::{TileManager, TileSnapshot};
