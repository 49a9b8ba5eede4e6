use std::collections::{HashMap, VecDeque};

use crate::canvas::tile::{Tile, TileCoord};

/// Default number of tiles kept resident.
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Opaque reference to a texture owned by the rendering backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(u64);

impl TextureHandle {
    pub const INVALID: TextureHandle = TextureHandle(0);

    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Rendering backend seam: receives tile pixels and frees textures.
pub trait TextureUploader {
    /// Upload (or re-upload) `pixels` for `coord` into `handle`.
    /// `None` means the tile has no allocated pixels.
    fn upload(&mut self, handle: TextureHandle, coord: TileCoord, pixels: Option<&[u8]>);

    fn release(&mut self, handle: TextureHandle);
}

/// Bookkeeping only; nothing is uploaded.
impl TextureUploader for () {
    fn upload(&mut self, _handle: TextureHandle, _coord: TileCoord, _pixels: Option<&[u8]>) {}

    fn release(&mut self, _handle: TextureHandle) {}
}

#[derive(Clone, Copy, Debug)]
struct CacheEntry {
    handle: TextureHandle,
    stale: bool,
}

/// LRU map from tile coordinates to backend texture handles.
///
/// `lru` front is the most recently used coordinate; eviction pops the back.
/// Not thread-safe, the owner serializes access.
pub struct TileCache {
    entries: HashMap<TileCoord, CacheEntry>,
    lru: VecDeque<TileCoord>,
    capacity: usize,
    next_handle: u64,
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl TileCache {
    /// A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: VecDeque::new(),
            capacity: capacity.max(1),
            next_handle: 1,
        }
    }

    /// Handle for `tile`, uploading it on a miss or when it was invalidated.
    pub fn get_or_upload<U: TextureUploader + ?Sized>(
        &mut self,
        tile: &Tile,
        uploader: &mut U,
    ) -> TextureHandle {
        let coord = tile.coord();

        if let Some(entry) = self.entries.get_mut(&coord) {
            if entry.stale {
                uploader.upload(entry.handle, coord, tile.data());
                entry.stale = false;
            }
            let handle = entry.handle;
            self.touch(coord);
            return handle;
        }

        while self.entries.len() >= self.capacity {
            if !self.evict_lru(uploader) {
                break;
            }
        }

        let handle = TextureHandle(self.next_handle);
        self.next_handle += 1;
        uploader.upload(handle, coord, tile.data());
        self.entries.insert(coord, CacheEntry { handle, stale: false });
        self.lru.push_front(coord);
        handle
    }

    /// Handle for `coord` if it is cached and not stale, marking it as used.
    /// Callers can skip producing pixels when this hits.
    pub fn fresh_handle(&mut self, coord: TileCoord) -> Option<TextureHandle> {
        let entry = self.entries.get(&coord).filter(|e| !e.stale)?;
        let handle = entry.handle;
        self.touch(coord);
        Some(handle)
    }

    /// Mark `coord` for re-upload on its next lookup.
    pub fn invalidate(&mut self, coord: TileCoord) {
        if let Some(entry) = self.entries.get_mut(&coord) {
            entry.stale = true;
        }
    }

    pub fn invalidate_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.stale = true;
        }
    }

    /// Drop `coord` and release its texture. Returns whether it was cached.
    pub fn remove<U: TextureUploader + ?Sized>(&mut self, coord: TileCoord, uploader: &mut U) -> bool {
        let Some(entry) = self.entries.remove(&coord) else {
            return false;
        };
        if let Some(pos) = self.lru.iter().position(|c| *c == coord) {
            self.lru.remove(pos);
        }
        uploader.release(entry.handle);
        true
    }

    /// Release every texture.
    pub fn clear<U: TextureUploader + ?Sized>(&mut self, uploader: &mut U) {
        for (_, entry) in self.entries.drain() {
            uploader.release(entry.handle);
        }
        self.lru.clear();
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        self.entries.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn touch(&mut self, coord: TileCoord) {
        if let Some(pos) = self.lru.iter().position(|c| *c == coord) {
            self.lru.remove(pos);
        }
        self.lru.push_front(coord);
    }

    fn evict_lru<U: TextureUploader + ?Sized>(&mut self, uploader: &mut U) -> bool {
        let Some(coord) = self.lru.pop_back() else {
            return false;
        };
        if let Some(entry) = self.entries.remove(&coord) {
            log::trace!("evicting texture {:?} for tile {:?}", entry.handle, coord);
            uploader.release(entry.handle);
        }
        true
    }
}
