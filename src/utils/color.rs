use crate::canvas::tile::Pixel;

/// Simple RGBA color stored as straight (non-premultiplied) floats in 0..1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Construct from 0-255 channel values.
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: a as f32 / 255.0,
        }
    }

    /// Solid black, the default ink.
    pub fn black() -> Self {
        Self::rgba(0, 0, 0, 255)
    }

    /// Solid white convenience color.
    pub fn white() -> Self {
        Self::rgba(255, 255, 255, 255)
    }

    /// Quantize to an 8-bit pixel, truncating like the rasterizer does.
    pub fn to_pixel(&self) -> Pixel {
        let q = |v: f32| (v * 255.0).clamp(0.0, 255.0) as u8;
        Pixel::new(q(self.r), q(self.g), q(self.b), q(self.a))
    }

    pub fn from_pixel(p: Pixel) -> Self {
        Self::rgba(p.r, p.g, p.b, p.a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::black()
    }
}
