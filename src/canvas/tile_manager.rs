use std::collections::HashMap;

use super::tile::{Tile, TileCoord, TILE_SIZE};
use crate::utils::rect::Rect;

/// Snapshot of whole tiles keyed by coordinate.
pub type TileSnapshot = HashMap<TileCoord, Tile>;

/// Sparse grid of tiles for a single layer.
///
/// Only coordinates that were written to have an entry; everything else is
/// implicitly transparent. Entries are keyed by the packed 64-bit coordinate.
#[derive(Clone, Debug, Default)]
pub struct TileManager {
    tiles: HashMap<u64, Tile>,
}

impl TileManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tile_at(&self, coord: TileCoord) -> Option<&Tile> {
        self.tiles.get(&coord.pack())
    }

    pub fn tile_at_mut(&mut self, coord: TileCoord) -> Option<&mut Tile> {
        self.tiles.get_mut(&coord.pack())
    }

    /// Entry for `coord`, inserting an unallocated tile if absent.
    pub fn get_or_create_tile(&mut self, coord: TileCoord) -> &mut Tile {
        self.tiles
            .entry(coord.pack())
            .or_insert_with(|| Tile::new(coord))
    }

    pub fn has_tile(&self, coord: TileCoord) -> bool {
        self.tiles.contains_key(&coord.pack())
    }

    pub fn remove_tile(&mut self, coord: TileCoord) -> Option<Tile> {
        self.tiles.remove(&coord.pack())
    }

    /// Install `tile` at its own coordinate, replacing any existing entry.
    pub fn insert_tile(&mut self, tile: Tile) {
        self.tiles.insert(tile.coord().pack(), tile);
    }

    pub fn all_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn all_tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.values_mut()
    }

    /// Coordinates of all entries in row-major order.
    pub fn sorted_coords(&self) -> Vec<TileCoord> {
        let mut coords: Vec<TileCoord> = self.tiles.values().map(Tile::coord).collect();
        coords.sort_unstable();
        coords
    }

    /// Tiles overlapping the pixel rectangle, in row-major order.
    pub fn tiles_in_rect(&self, rect: Rect) -> Vec<&Tile> {
        if rect.is_empty() {
            return Vec::new();
        }
        let (min, max) = tile_range(rect);
        let mut result = Vec::new();
        for ty in min.ty..=max.ty {
            for tx in min.tx..=max.tx {
                if let Some(tile) = self.tile_at(TileCoord::new(tx, ty)) {
                    result.push(tile);
                }
            }
        }
        result
    }

    pub fn dirty_tiles(&self) -> Vec<&Tile> {
        self.tiles.values().filter(|t| t.is_dirty()).collect()
    }

    pub fn clear_dirty_flags(&mut self) {
        for tile in self.tiles.values_mut() {
            tile.set_dirty(false);
        }
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Union of every tile cell in pixel space, or an empty rect with no tiles.
    pub fn bounding_rect(&self) -> Rect {
        let mut coords = self.tiles.values().map(Tile::coord);
        let Some(first) = coords.next() else {
            return Rect::default();
        };
        let (min, max) = coords.fold((first, first), |(min, max), c| {
            (
                TileCoord::new(min.tx.min(c.tx), min.ty.min(c.ty)),
                TileCoord::new(max.tx.max(c.tx), max.ty.max(c.ty)),
            )
        });
        let size = TILE_SIZE as f32;
        Rect::new(
            min.tx as f32 * size,
            min.ty as f32 * size,
            (max.tx - min.tx + 1) as f32 * size,
            (max.ty - min.ty + 1) as f32 * size,
        )
    }

    /// Clone every dirty tile.
    pub fn snapshot_dirty_tiles(&self) -> TileSnapshot {
        self.tiles
            .values()
            .filter(|t| t.is_dirty())
            .map(|t| (t.coord(), t.clone()))
            .collect()
    }

    /// Replace or create tiles from a snapshot, marking each one dirty.
    pub fn restore_snapshot(&mut self, snapshot: &TileSnapshot) {
        for (coord, tile) in snapshot {
            let mut restored = tile.clone();
            restored.set_dirty(true);
            self.tiles.insert(coord.pack(), restored);
        }
    }
}

/// Inclusive tile range covering a pixel rectangle.
fn tile_range(rect: Rect) -> (TileCoord, TileCoord) {
    let min = TileCoord::from_pixel(rect.x.floor() as i32, rect.y.floor() as i32);
    let max = TileCoord::from_pixel(
        rect.right().ceil() as i32 - 1,
        rect.bottom().ceil() as i32 - 1,
    );
    (min, max)
}
