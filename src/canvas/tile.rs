use std::fmt;

use image::RgbaImage;

/// Edge length of a tile in pixels.
pub const TILE_SIZE: i32 = 256;
/// Pixels per tile.
pub const TILE_PIXELS: usize = (TILE_SIZE * TILE_SIZE) as usize;
/// Bytes per tile buffer (RGBA8).
pub const TILE_BYTES: usize = TILE_PIXELS * 4;

/// One RGBA8 pixel with straight alpha.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    pub const TRANSPARENT: Pixel = Pixel::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Integer coordinate of a tile in the sparse grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub tx: i32,
    pub ty: i32,
}

impl TileCoord {
    pub const fn new(tx: i32, ty: i32) -> Self {
        Self { tx, ty }
    }

    /// Tile containing the canvas pixel `(px, py)`. Uses floor division so
    /// that `-1` maps to tile `-1`, not `0`.
    pub fn from_pixel(px: i32, py: i32) -> Self {
        Self {
            tx: px.div_euclid(TILE_SIZE),
            ty: py.div_euclid(TILE_SIZE),
        }
    }

    /// Top-left pixel of this tile.
    pub fn origin(self) -> (i32, i32) {
        (self.tx * TILE_SIZE, self.ty * TILE_SIZE)
    }

    /// Pack both axes into a single 64-bit map key.
    pub fn pack(self) -> u64 {
        ((self.tx as u32 as u64) << 32) | self.ty as u32 as u64
    }

    pub fn unpack(key: u64) -> Self {
        Self {
            tx: (key >> 32) as u32 as i32,
            ty: key as u32 as i32,
        }
    }
}

impl PartialOrd for TileCoord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Row-major: by `ty`, then `tx`.
impl Ord for TileCoord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.ty, self.tx).cmp(&(other.ty, other.tx))
    }
}

/// Tile containing the canvas pixel `(px, py)`.
pub fn pixel_to_tile(px: i32, py: i32) -> TileCoord {
    TileCoord::from_pixel(px, py)
}

/// Top-left canvas pixel of a tile.
pub fn tile_to_pixel(coord: TileCoord) -> (i32, i32) {
    coord.origin()
}

/// A `TILE_SIZE` x `TILE_SIZE` block of RGBA8 pixels.
///
/// The buffer is allocated lazily: a tile without data is fully transparent.
#[derive(Clone, Default)]
pub struct Tile {
    coord: TileCoord,
    data: Option<Vec<u8>>,
    dirty: bool,
}

impl Tile {
    pub fn new(coord: TileCoord) -> Self {
        Self {
            coord,
            data: None,
            dirty: false,
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    /// True when no pixel buffer has been allocated.
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Allocate a zeroed buffer if none exists yet.
    pub fn ensure_allocated(&mut self) -> &mut [u8] {
        self.data.get_or_insert_with(|| vec![0; TILE_BYTES])
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn data_mut(&mut self) -> Option<&mut [u8]> {
        self.data.as_deref_mut()
    }

    /// Replace the whole buffer. Returns `false` and leaves the tile untouched
    /// if `bytes` is not exactly `TILE_BYTES` long.
    pub fn set_data(&mut self, bytes: Vec<u8>) -> bool {
        if bytes.len() != TILE_BYTES {
            return false;
        }
        self.data = Some(bytes);
        self.dirty = true;
        true
    }

    /// Pixel at tile-local coordinates; transparent when out of range or unallocated.
    pub fn pixel_at(&self, local_x: i32, local_y: i32) -> Pixel {
        match (&self.data, pixel_offset(local_x, local_y)) {
            (Some(data), Some(offset)) => Pixel::from_slice(&data[offset..offset + 4]),
            _ => Pixel::TRANSPARENT,
        }
    }

    /// Write a pixel at tile-local coordinates. Out-of-range writes are ignored.
    pub fn set_pixel_at(&mut self, local_x: i32, local_y: i32, pixel: Pixel) {
        let Some(offset) = pixel_offset(local_x, local_y) else {
            return;
        };
        let data = self.ensure_allocated();
        data[offset..offset + 4].copy_from_slice(&pixel.to_array());
        self.dirty = true;
    }

    /// Zero every pixel of an allocated tile.
    pub fn clear(&mut self) {
        if let Some(data) = self.data.as_mut() {
            data.fill(0);
            self.dirty = true;
        }
    }

    /// Copy the tile into an owned image (transparent if unallocated).
    pub fn to_image(&self) -> RgbaImage {
        let size = TILE_SIZE as u32;
        match &self.data {
            Some(data) => RgbaImage::from_raw(size, size, data.clone())
                .unwrap_or_else(|| RgbaImage::new(size, size)),
            None => RgbaImage::new(size, size),
        }
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("coord", &self.coord)
            .field("allocated", &self.data.is_some())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl PartialEq for Tile {
    fn eq(&self, other: &Self) -> bool {
        self.coord == other.coord && self.data == other.data
    }
}

fn pixel_offset(local_x: i32, local_y: i32) -> Option<usize> {
    if !(0..TILE_SIZE).contains(&local_x) || !(0..TILE_SIZE).contains(&local_y) {
        return None;
    }
    Some(((local_y * TILE_SIZE + local_x) * 4) as usize)
}
