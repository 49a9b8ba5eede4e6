use std::collections::HashSet;

use super::dab::{BrushDab, DabPlacer, DEFAULT_SPACING};
use super::hardness::falloff;
use super::stroke::{CanvasPoint, Stroke, ToolType};
use crate::canvas::history::TileStates;
use crate::canvas::layer::{Layer, LayerId};
use crate::canvas::layer_stack::LayerStack;
use crate::canvas::tile::{Pixel, TileCoord, TILE_SIZE};
use crate::utils::color::Color;

/// Smallest radius a dab is rasterized with.
const MIN_DAB_RADIUS: f32 = 0.5;

/// Turns pointer samples into pixels on a layer's tiles.
///
/// Lifecycle: `begin_stroke` -> `add_point`* -> `end_stroke` | `cancel_stroke`.
/// Only one stroke can be active; a second `begin_stroke` is rejected.
pub struct BrushEngine {
    target: Option<LayerId>,
    stroke: Stroke,
    placer: DabPlacer,
    affected: Vec<TileCoord>,
    affected_set: HashSet<TileCoord>,
    before: TileStates,
}

impl Default for BrushEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BrushEngine {
    pub fn new() -> Self {
        Self::with_spacing(DEFAULT_SPACING)
    }

    /// Engine whose dab spacing is `spacing` times the brush diameter.
    pub fn with_spacing(spacing: f32) -> Self {
        Self {
            target: None,
            stroke: Stroke::default(),
            placer: DabPlacer::new(spacing),
            affected: Vec::new(),
            affected_set: HashSet::new(),
            before: TileStates::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }

    /// Layer the active stroke paints on.
    pub fn target_layer_id(&self) -> Option<LayerId> {
        self.target
    }

    /// Parameters and samples of the current (or last) stroke.
    pub fn stroke(&self) -> &Stroke {
        &self.stroke
    }

    /// Start a stroke on `layer`. Returns `false` (and changes nothing) when
    /// the layer is locked or another stroke is still active.
    pub fn begin_stroke(&mut self, layer: &Layer, mut stroke: Stroke) -> bool {
        if self.is_active() {
            log::warn!(
                "begin_stroke on layer {} rejected: a stroke on layer {:?} is active",
                layer.id(),
                self.target
            );
            return false;
        }
        if layer.locked {
            log::debug!("begin_stroke rejected: layer {} is locked", layer.id());
            return false;
        }

        stroke.target_layer_id = layer.id();
        stroke.clear_points();
        self.stroke = stroke;
        self.target = Some(layer.id());
        self.placer.reset();
        self.affected.clear();
        self.affected_set.clear();
        self.before.clear();
        true
    }

    /// Append a sample and rasterize the dabs it produces. The target layer is
    /// resolved by id; if it has disappeared the stroke is cancelled.
    pub fn add_point(&mut self, layers: &mut LayerStack, point: CanvasPoint) {
        let Some(layer_id) = self.target else {
            return;
        };
        let Some(layer) = layers.layer_by_id_mut(layer_id) else {
            log::warn!("stroke target layer {layer_id} vanished, cancelling stroke");
            self.cancel_stroke();
            return;
        };

        self.stroke.add_point(point);
        let points = self.stroke.points();
        let (from, to) = match points {
            [.., prev, curr] => (*prev, *curr),
            _ => (point, point),
        };

        let dabs = self.placer.place_dabs(
            &from,
            &to,
            self.stroke.brush_size(),
            self.stroke.hardness(),
            self.stroke.color,
        );
        for dab in &dabs {
            self.render_dab(layer, dab);
        }
    }

    /// Finish the stroke and hand back the touched tiles in first-touch order.
    /// The before-snapshots stay available through [`Self::take_before_snapshots`].
    pub fn end_stroke(&mut self) -> Vec<TileCoord> {
        if self.target.take().is_none() {
            return Vec::new();
        }
        self.affected_set.clear();
        std::mem::take(&mut self.affected)
    }

    /// Abandon the stroke. Pixels already painted stay; nothing is kept for undo.
    pub fn cancel_stroke(&mut self) {
        self.target = None;
        self.affected.clear();
        self.affected_set.clear();
        self.before.clear();
    }

    /// Move out the per-tile state captured before the stroke touched each tile.
    pub fn take_before_snapshots(&mut self) -> TileStates {
        std::mem::take(&mut self.before)
    }

    /// Rasterize one dab into `layer`.
    fn render_dab(&mut self, layer: &mut Layer, dab: &BrushDab) {
        let r = dab.radius.max(MIN_DAB_RADIUS);
        let min_x = (dab.x - r).floor() as i32;
        let min_y = (dab.y - r).floor() as i32;
        let max_x = (dab.x + r).ceil() as i32;
        let max_y = (dab.y + r).ceil() as i32;

        let tc_min = TileCoord::from_pixel(min_x, min_y);
        let tc_max = TileCoord::from_pixel(max_x, max_y);

        // First touch wins: later dabs must not overwrite the captured state.
        let tiles = layer.tiles_mut();
        for ty in tc_min.ty..=tc_max.ty {
            for tx in tc_min.tx..=tc_max.tx {
                let coord = TileCoord::new(tx, ty);
                self.before.entry(coord).or_insert_with(|| {
                    tiles.tile_at(coord).filter(|t| !t.is_empty()).cloned()
                });
            }
        }

        let tool = self.stroke.tool;
        // (first hit row, first hit column, tile) for tiles new to this stroke
        let mut newly_touched: Vec<(i32, i32, TileCoord)> = Vec::new();
        // (byte offset, alpha) of covered pixels in the current tile
        let mut hits: Vec<(usize, f32)> = Vec::new();

        for ty in tc_min.ty..=tc_max.ty {
            for tx in tc_min.tx..=tc_max.tx {
                let coord = TileCoord::new(tx, ty);
                let (ox, oy) = coord.origin();
                let x0 = min_x.max(ox);
                let x1 = max_x.min(ox + TILE_SIZE - 1);
                let y0 = min_y.max(oy);
                let y1 = max_y.min(oy + TILE_SIZE - 1);

                hits.clear();
                let mut first_hit: Option<(i32, i32)> = None;
                for py in y0..=y1 {
                    let dy = py as f32 + 0.5 - dab.y;
                    for px in x0..=x1 {
                        let dx = px as f32 + 0.5 - dab.x;
                        let dist = (dx * dx + dy * dy).sqrt();
                        if dist > r {
                            continue;
                        }
                        let alpha = falloff(dist / r, dab.hardness) * dab.opacity;
                        let offset = (((py - oy) * TILE_SIZE + (px - ox)) * 4) as usize;
                        hits.push((offset, alpha));
                        first_hit.get_or_insert((py, px));
                    }
                }
                let Some((py, px)) = first_hit else {
                    continue;
                };

                let tile = tiles.get_or_create_tile(coord);
                let data = tile.ensure_allocated();
                for &(offset, alpha) in &hits {
                    let dst = Pixel::from_slice(&data[offset..offset + 4]);
                    let out = blend_pixel(tool, dst, dab.color, alpha);
                    data[offset..offset + 4].copy_from_slice(&out.to_array());
                }
                tile.set_dirty(true);

                if !self.affected_set.contains(&coord) {
                    newly_touched.push((py, px, coord));
                }
            }
        }

        // Row-major scan order over the dab's bounding box.
        newly_touched.sort_by_key(|&(py, px, _)| (py, px));
        for (_, _, coord) in newly_touched {
            self.affected_set.insert(coord);
            self.affected.push(coord);
        }
    }
}

/// Blend one dab sample into a stored (straight alpha) pixel.
///
/// The eraser scales destination alpha by `1 - alpha` and keeps color; every
/// other tool composites `color` over the destination.
pub fn blend_pixel(tool: ToolType, dst: Pixel, color: Color, alpha: f32) -> Pixel {
    let alpha = alpha.clamp(0.0, 1.0);
    let to_byte = |v: f32| (v * 255.0).clamp(0.0, 255.0) as u8;

    if tool == ToolType::Eraser {
        let new_a = (dst.a as f32 / 255.0) * (1.0 - alpha);
        return Pixel { a: to_byte(new_a), ..dst };
    }

    let sa = alpha;
    let da = dst.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Pixel::TRANSPARENT;
    }

    let channel = |s: f32, d: u8| (s * sa + (d as f32 / 255.0) * (1.0 - sa)) / out_a;
    Pixel::new(
        to_byte(channel(color.r, dst.r)),
        to_byte(channel(color.g, dst.g)),
        to_byte(channel(color.b, dst.b)),
        to_byte(out_a),
    )
}
