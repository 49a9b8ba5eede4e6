use crate::canvas::layer::LayerId;
use crate::utils::color::Color;
use crate::utils::rect::Rect;
use crate::utils::vector::Vec2;

pub const MIN_BRUSH_SIZE: f32 = 1.0;
pub const MAX_BRUSH_SIZE: f32 = 500.0;

/// Tool that produced a stroke. Only `Pen` and `Eraser` drive the brush engine.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ToolType {
    #[default]
    Pen,
    Eraser,
    Fill,
    Select,
    Move,
}

impl ToolType {
    pub fn uses_brush(self) -> bool {
        matches!(self, ToolType::Pen | ToolType::Eraser)
    }
}

/// One pointer sample in canvas space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasPoint {
    pub x: f32,
    pub y: f32,
    /// Normalized to [0, 1].
    pub pressure: f32,
    pub tilt_x: f32,
    pub tilt_y: f32,
    pub timestamp: f64,
}

impl CanvasPoint {
    pub fn new(x: f32, y: f32, pressure: f32) -> Self {
        Self {
            x,
            y,
            pressure,
            ..Self::default()
        }
    }

    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl Default for CanvasPoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            pressure: 1.0,
            tilt_x: 0.0,
            tilt_y: 0.0,
            timestamp: 0.0,
        }
    }
}

/// Parameters and samples of one pointer-down-to-pointer-up gesture.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    pub tool: ToolType,
    pub color: Color,
    brush_size: f32,
    hardness: f32,
    pub target_layer_id: LayerId,
    points: Vec<CanvasPoint>,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            tool: ToolType::Pen,
            color: Color::black(),
            brush_size: 3.0,
            hardness: 1.0,
            target_layer_id: 0,
            points: Vec::new(),
        }
    }
}

impl Stroke {
    pub fn new(tool: ToolType, color: Color, brush_size: f32, hardness: f32) -> Self {
        let mut stroke = Self {
            tool,
            color,
            ..Self::default()
        };
        stroke.set_brush_size(brush_size);
        stroke.set_hardness(hardness);
        stroke
    }

    /// Diameter in pixels.
    pub fn brush_size(&self) -> f32 {
        self.brush_size
    }

    pub fn set_brush_size(&mut self, size: f32) {
        self.brush_size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
    }

    pub fn hardness(&self) -> f32 {
        self.hardness
    }

    pub fn set_hardness(&mut self, hardness: f32) {
        self.hardness = hardness.clamp(0.0, 1.0);
    }

    pub fn add_point(&mut self, point: CanvasPoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[CanvasPoint] {
        &self.points
    }

    pub(crate) fn clear_points(&mut self) {
        self.points.clear();
    }

    /// Point hull expanded by the brush radius; empty without points.
    pub fn bounding_rect(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::default();
        };
        let (min, max) = self.points.iter().fold((first.pos(), first.pos()), |(min, max), p| {
            (
                Vec2::new(min.x.min(p.x), min.y.min(p.y)),
                Vec2::new(max.x.max(p.x), max.y.max(p.y)),
            )
        });
        let r = self.brush_size * 0.5;
        Rect::from_min_max(Vec2::new(min.x - r, min.y - r), Vec2::new(max.x + r, max.y + r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_and_hardness_are_clamped() {
        let stroke = Stroke::new(ToolType::Pen, Color::black(), 9000.0, -3.0);
        assert_eq!(stroke.brush_size(), MAX_BRUSH_SIZE);
        assert_eq!(stroke.hardness(), 0.0);
        let stroke = Stroke::new(ToolType::Pen, Color::black(), 0.0, 2.0);
        assert_eq!(stroke.brush_size(), MIN_BRUSH_SIZE);
        assert_eq!(stroke.hardness(), 1.0);
    }

    #[test]
    fn bounding_rect_includes_radius() {
        let mut stroke = Stroke::new(ToolType::Pen, Color::black(), 10.0, 1.0);
        assert!(stroke.bounding_rect().is_empty());
        stroke.add_point(CanvasPoint::new(0.0, 0.0, 1.0));
        stroke.add_point(CanvasPoint::new(100.0, 20.0, 1.0));
        let rect = stroke.bounding_rect();
        assert_eq!(rect, Rect::new(-5.0, -5.0, 110.0, 30.0));
        assert!(rect.contains(Vec2::new(104.0, 24.0)));
    }

    #[test]
    fn only_pen_and_eraser_use_the_brush() {
        assert!(ToolType::Pen.uses_brush());
        assert!(ToolType::Eraser.uses_brush());
        assert!(!ToolType::Fill.uses_brush());
        assert!(!ToolType::Move.uses_brush());
    }
}
