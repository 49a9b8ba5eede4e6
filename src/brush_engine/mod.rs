pub mod brush;
pub mod brush_options;
pub mod dab;
pub mod hardness;
pub mod stroke;

pub use brush::{blend_pixel, BrushEngine};
pub use brush_options::BrushOptions;
pub use dab::{BrushDab, DabPlacer};
pub use stroke::{CanvasPoint, Stroke, ToolType};
