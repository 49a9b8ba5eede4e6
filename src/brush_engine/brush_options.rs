use super::stroke::{Stroke, ToolType, MAX_BRUSH_SIZE, MIN_BRUSH_SIZE};
use crate::canvas::layer::LayerId;
use crate::utils::color::Color;

/// Current tool settings, used to stamp out new strokes.
#[derive(Clone, Debug, PartialEq)]
pub struct BrushOptions {
    pub tool: ToolType,
    pub color: Color,
    size: f32,
    hardness: f32,
}

impl Default for BrushOptions {
    fn default() -> Self {
        Self {
            tool: ToolType::Pen,
            color: Color::black(),
            size: 10.0,
            hardness: 0.8,
        }
    }
}

impl BrushOptions {
    /// Brush diameter in pixels.
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Clamped to [1, 500].
    pub fn set_size(&mut self, size: f32) {
        self.size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    pub fn hardness(&self) -> f32 {
        self.hardness
    }

    /// Clamped to [0, 1].
    pub fn set_hardness(&mut self, hardness: f32) {
        self.hardness = hardness.clamp(0.0, 1.0);
    }

    /// A fresh stroke targeting `layer_id` with these settings.
    pub fn stroke_for(&self, layer_id: LayerId) -> Stroke {
        let mut stroke = Stroke::new(self.tool, self.color, self.size, self.hardness);
        stroke.target_layer_id = layer_id;
        stroke
    }
}
