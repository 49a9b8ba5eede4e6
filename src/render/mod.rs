pub mod compositor;
pub mod tile_cache;

pub use compositor::{blend_pixels, Compositor};
pub use tile_cache::{TextureHandle, TextureUploader, TileCache};
