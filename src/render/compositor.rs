use image::RgbaImage;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use wide::f32x4;

use crate::canvas::layer::BlendMode;
use crate::canvas::layer_stack::LayerStack;
use crate::canvas::tile::{Pixel, TileCoord, TILE_BYTES, TILE_SIZE};
use crate::utils::profiler::ScopeTimer;
use crate::utils::rect::Rect;

/// Flattens the visible layers of a stack into plain RGBA8 pixels.
///
/// Reads only; safe to share across threads while no stroke is mutating the
/// same stack.
#[derive(Clone, Copy, Debug, Default)]
pub struct Compositor;

impl Compositor {
    pub fn new() -> Self {
        Self
    }

    /// Composite every visible layer at `coord` bottom-to-top into one
    /// `TILE_BYTES` buffer. Starts fully transparent.
    pub fn composite_tile(&self, layers: &LayerStack, coord: TileCoord) -> Vec<u8> {
        let mut result = vec![0u8; TILE_BYTES];

        for layer in layers.iter() {
            if !layer.visible || layer.opacity() <= 0.0 {
                continue;
            }
            let Some(src) = layer.tiles().tile_at(coord).and_then(|t| t.data()) else {
                continue;
            };

            let opacity = layer.opacity();
            let mode = layer.blend_mode;
            for (out, src) in result.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                let blended = blend_pixels(Pixel::from_slice(out), Pixel::from_slice(src), mode, opacity);
                out.copy_from_slice(&blended.to_array());
            }
        }

        result
    }

    /// Composite the pixel region `region` into an image of
    /// `ceil(width) x ceil(height)` pixels whose top-left is `floor(x), floor(y)`.
    pub fn composite_region(&self, layers: &LayerStack, region: Rect) -> RgbaImage {
        let _timer = ScopeTimer::new("composite_region");

        let width = region.width.max(0.0).ceil() as u32;
        let height = region.height.max(0.0).ceil() as u32;
        let mut image = RgbaImage::new(width, height);
        if width == 0 || height == 0 {
            return image;
        }

        let x0 = region.x.floor() as i32;
        let y0 = region.y.floor() as i32;
        let x1 = x0 + width as i32 - 1;
        let y1 = y0 + height as i32 - 1;
        let tc_min = TileCoord::from_pixel(x0, y0);
        let tc_max = TileCoord::from_pixel(x1, y1);

        let coords: Vec<TileCoord> = (tc_min.ty..=tc_max.ty)
            .flat_map(|ty| (tc_min.tx..=tc_max.tx).map(move |tx| TileCoord::new(tx, ty)))
            .collect();

        let composited: Vec<(TileCoord, Vec<u8>)> = coords
            .par_iter()
            .map(|&coord| (coord, self.composite_tile(layers, coord)))
            .collect();

        for (coord, pixels) in composited {
            let (ox, oy) = coord.origin();
            let sx0 = x0.max(ox);
            let sx1 = x1.min(ox + TILE_SIZE - 1);
            let sy0 = y0.max(oy);
            let sy1 = y1.min(oy + TILE_SIZE - 1);
            if sx0 > sx1 || sy0 > sy1 {
                continue;
            }

            let row_bytes = ((sx1 - sx0 + 1) * 4) as usize;
            let out_stride = (width * 4) as usize;
            let raw: &mut [u8] = &mut image;
            for py in sy0..=sy1 {
                let src_off = (((py - oy) * TILE_SIZE + (sx0 - ox)) * 4) as usize;
                let dst_off = (py - y0) as usize * out_stride + ((sx0 - x0) * 4) as usize;
                raw[dst_off..dst_off + row_bytes].copy_from_slice(&pixels[src_off..src_off + row_bytes]);
            }
        }

        image
    }

    /// Whole canvas, origin at (0, 0).
    pub fn flatten(&self, layers: &LayerStack, canvas_size: (u32, u32)) -> RgbaImage {
        let (w, h) = canvas_size;
        self.composite_region(layers, Rect::new(0.0, 0.0, w as f32, h as f32))
    }
}

/// Composite `src` over `dst` with `mode`, after scaling the source alpha by
/// the layer `opacity`.
///
/// Uses the separable blend formulation: the blended color is mixed with the
/// plain source color by the backdrop alpha, then composited source-over.
/// With `Normal` this reduces to plain straight-alpha source-over.
pub fn blend_pixels(dst: Pixel, src: Pixel, mode: BlendMode, opacity: f32) -> Pixel {
    let src_a = (src.a as f32 * opacity.clamp(0.0, 1.0)) as u8;
    if src_a == 0 {
        return dst;
    }
    if mode == BlendMode::Normal && src_a == 255 {
        return src;
    }

    let sa = src_a as f32 / 255.0;
    let da = dst.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Pixel::TRANSPARENT;
    }

    let max = f32x4::splat(255.0);
    let cs = f32x4::from([src.r as f32, src.g as f32, src.b as f32, 0.0]) / max;
    let cb = f32x4::from([dst.r as f32, dst.g as f32, dst.b as f32, 0.0]) / max;

    let mixed = match mode {
        BlendMode::Normal => cs,
        BlendMode::Multiply => cs * cb,
        BlendMode::Screen => cs + cb - cs * cb,
        BlendMode::Overlay => {
            let s = cs.to_array();
            let b = cb.to_array();
            f32x4::from([overlay(s[0], b[0]), overlay(s[1], b[1]), overlay(s[2], b[2]), 0.0])
        }
    };

    let sa4 = f32x4::splat(sa);
    let da4 = f32x4::splat(da);
    let one = f32x4::splat(1.0);
    let cs_prime = cs * (one - da4) + mixed * da4;
    let co = cs_prime * sa4 + cb * da4 * (one - sa4);
    let out = (co / f32x4::splat(out_a)).to_array();

    let to_byte = |v: f32| (v * 255.0).clamp(0.0, 255.0) as u8;
    Pixel::new(to_byte(out[0]), to_byte(out[1]), to_byte(out[2]), to_byte(out_a))
}

#[inline]
fn overlay(cs: f32, cb: f32) -> f32 {
    if cb <= 0.5 {
        2.0 * cs * cb
    } else {
        1.0 - 2.0 * (1.0 - cs) * (1.0 - cb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::layer::Layer;

    fn fill_tile(layer: &mut Layer, coord: TileCoord, px: Pixel) {
        let tile = layer.tiles_mut().get_or_create_tile(coord);
        let data = tile.ensure_allocated();
        for chunk in data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px.to_array());
        }
    }

    fn stack_with(px: Pixel) -> LayerStack {
        let mut stack = LayerStack::new();
        let layer = stack.add_layer("base");
        fill_tile(layer, TileCoord::new(0, 0), px);
        stack
    }

    #[test]
    fn empty_stack_is_transparent() {
        let mut stack = LayerStack::new();
        stack.add_layer("empty");
        let out = Compositor::new().composite_tile(&stack, TileCoord::new(0, 0));
        assert_eq!(out.len(), TILE_BYTES);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn single_opaque_layer_is_copied() {
        let stack = stack_with(Pixel::new(200, 10, 30, 255));
        let out = Compositor::new().composite_tile(&stack, TileCoord::new(0, 0));
        assert_eq!(Pixel::from_slice(&out[..4]), Pixel::new(200, 10, 30, 255));
    }

    #[test]
    fn hidden_and_zero_opacity_layers_are_skipped() {
        let mut stack = stack_with(Pixel::new(0, 0, 255, 255));
        let top = stack.add_layer("top");
        fill_tile(top, TileCoord::new(0, 0), Pixel::new(255, 0, 0, 255));
        top.visible = false;
        let faded = stack.add_layer("faded");
        fill_tile(faded, TileCoord::new(0, 0), Pixel::new(0, 255, 0, 255));
        faded.set_opacity(0.0);

        let out = Compositor::new().composite_tile(&stack, TileCoord::new(0, 0));
        assert_eq!(Pixel::from_slice(&out[..4]), Pixel::new(0, 0, 255, 255));
    }

    #[test]
    fn layer_opacity_scales_source_alpha() {
        let mut stack = LayerStack::new();
        let layer = stack.add_layer("half");
        fill_tile(layer, TileCoord::new(0, 0), Pixel::new(255, 255, 255, 255));
        layer.set_opacity(0.5);
        let out = Compositor::new().composite_tile(&stack, TileCoord::new(0, 0));
        let px = Pixel::from_slice(&out[..4]);
        assert!((126..=127).contains(&px.a));
        assert!(px.r >= 254);
    }

    #[test]
    fn blend_modes_over_opaque_backdrop() {
        let dst = Pixel::new(128, 128, 128, 255);
        let src = Pixel::new(255, 0, 128, 255);

        let normal = blend_pixels(dst, src, BlendMode::Normal, 1.0);
        assert_eq!(normal, Pixel::new(255, 0, 128, 255));

        let multiply = blend_pixels(dst, src, BlendMode::Multiply, 1.0);
        assert!((127..=128).contains(&multiply.r));
        assert_eq!(multiply.g, 0);
        assert!((63..=64).contains(&multiply.b));

        let screen = blend_pixels(dst, src, BlendMode::Screen, 1.0);
        assert!(screen.r >= 254);
        assert!((127..=128).contains(&screen.g));

        let overlay = blend_pixels(
            Pixel::new(255, 0, 64, 255),
            Pixel::new(128, 128, 128, 255),
            BlendMode::Overlay,
            1.0,
        );
        assert!(overlay.r >= 254);
        assert_eq!(overlay.g, 0);
        assert!((63..=65).contains(&overlay.b));
    }

    #[test]
    fn blend_modes_over_transparent_backdrop_act_like_normal() {
        let src = Pixel::new(40, 80, 120, 255);
        for mode in [BlendMode::Multiply, BlendMode::Screen, BlendMode::Overlay] {
            let out = blend_pixels(Pixel::TRANSPARENT, src, mode, 1.0);
            let diff = |a: u8, b: u8| (a as i16 - b as i16).abs();
            assert!(diff(out.r, src.r) <= 1 && diff(out.g, src.g) <= 1 && diff(out.b, src.b) <= 1);
            assert_eq!(out.a, 255);
        }
    }

    #[test]
    fn transparent_source_keeps_destination() {
        let dst = Pixel::new(9, 8, 7, 6);
        assert_eq!(blend_pixels(dst, Pixel::new(1, 2, 3, 0), BlendMode::Normal, 1.0), dst);
        assert_eq!(blend_pixels(Pixel::TRANSPARENT, Pixel::TRANSPARENT, BlendMode::Screen, 1.0), Pixel::TRANSPARENT);
    }

    #[test]
    fn region_spans_tiles_and_negative_origin() {
        let mut stack = LayerStack::new();
        let layer = stack.add_layer("paint");
        fill_tile(layer, TileCoord::new(-1, -1), Pixel::new(255, 0, 0, 255));
        fill_tile(layer, TileCoord::new(0, 0), Pixel::new(0, 0, 255, 255));

        let img = Compositor::new().composite_region(&stack, Rect::new(-2.0, -2.0, 4.0, 4.0));
        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(3, 3).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(3, 0).0, [0, 0, 0, 0]);
    }

    #[test]
    fn flatten_matches_canvas_size() {
        let stack = stack_with(Pixel::new(1, 2, 3, 255));
        let img = Compositor::new().flatten(&stack, (300, 10));
        assert_eq!(img.dimensions(), (300, 10));
        assert_eq!(img.get_pixel(255, 9).0, [1, 2, 3, 255]);
        assert_eq!(img.get_pixel(256, 0).0, [0, 0, 0, 0]);
    }
}
