use super::stroke::CanvasPoint;
use crate::utils::color::Color;
use crate::utils::vector::distance;

/// Default spacing between dabs, as a fraction of the brush diameter.
pub const DEFAULT_SPACING: f32 = 0.15;
/// Lower bound on the spacing distance so short segments cannot loop forever.
const MIN_STEP: f32 = 0.5;
/// Segments shorter than this are treated as a single position.
const DEGENERATE_DISTANCE: f32 = 0.001;

/// One circular brush impression.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrushDab {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub opacity: f32,
    pub hardness: f32,
    pub color: Color,
}

/// Places dabs along a stroke path at a fixed spacing.
///
/// The only state is the distance accumulator, which carries the leftover
/// distance from one segment into the next.
#[derive(Clone, Debug)]
pub struct DabPlacer {
    spacing: f32,
    accum_distance: f32,
}

impl Default for DabPlacer {
    fn default() -> Self {
        Self::new(DEFAULT_SPACING)
    }
}

impl DabPlacer {
    pub fn new(spacing: f32) -> Self {
        Self {
            spacing,
            accum_distance: 0.0,
        }
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn set_spacing(&mut self, spacing: f32) {
        self.spacing = spacing;
    }

    /// Forget the accumulator for a new stroke.
    pub fn reset(&mut self) {
        self.accum_distance = 0.0;
    }

    /// Dabs between two consecutive samples. Position and pressure are
    /// interpolated linearly; radius and opacity scale with pressure.
    pub fn place_dabs(
        &mut self,
        from: &CanvasPoint,
        to: &CanvasPoint,
        brush_size: f32,
        hardness: f32,
        color: Color,
    ) -> Vec<BrushDab> {
        let radius = brush_size * 0.5;
        let step = (brush_size * self.spacing).max(MIN_STEP);
        let make_dab = |x: f32, y: f32, pressure: f32| BrushDab {
            x,
            y,
            radius: radius * pressure,
            opacity: pressure,
            hardness,
            color,
        };

        let dist = distance(from.pos(), to.pos());
        if dist < DEGENERATE_DISTANCE {
            if self.accum_distance <= 0.0 {
                self.accum_distance = step;
                return vec![make_dab(to.x, to.y, to.pressure)];
            }
            return Vec::new();
        }

        let mut dabs = Vec::new();
        let dt = step / dist;
        let mut t = (step - self.accum_distance) / dist;
        while t <= 1.0 {
            let pos = from.pos().lerp(to.pos(), t);
            let pressure = from.pressure + (to.pressure - from.pressure) * t;
            dabs.push(make_dab(pos.x, pos.y, pressure));
            t += dt;
        }

        // Distance travelled past the last placed dab (or since the previous
        // one, when this segment placed none).
        self.accum_distance = dist * (1.0 - (t - dt));
        dabs
    }
}
