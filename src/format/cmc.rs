//! `.cmc` document persistence.
//!
//! Layout (little-endian):
//!
//! ```text
//! "CMC\x01"
//! chunk*   tag[4] size:u32 data[size]
//! "END\0"  0:u32
//! ```
//!
//! Chunks: `CANV` {width:u32, height:u32, dpi:u32}; `LYRS` {count:u32,
//! active:u64, next_id:u64, then per layer id:u64, name:(len:u32, utf8),
//! opacity:f32, visible:u8, locked:u8, blend:u8}; one `TILE` per allocated tile
//! {layer:u64, tx:i32, ty:i32, len:u32, zlib bytes}. Unknown tags are skipped.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::error::CmcError;
use crate::canvas::document::Document;
use crate::canvas::layer::{BlendMode, Layer, LayerId};
use crate::canvas::tile::{TileCoord, TILE_BYTES};
use crate::utils::profiler::ScopeTimer;

pub const MAGIC: [u8; 4] = *b"CMC\x01";
pub const TAG_CANV: [u8; 4] = *b"CANV";
pub const TAG_LYRS: [u8; 4] = *b"LYRS";
pub const TAG_TILE: [u8; 4] = *b"TILE";
pub const TAG_END: [u8; 4] = *b"END\0";

/// Write `doc` to `path` atomically: the bytes go to a sibling temporary file
/// which replaces `path` only once fully written and synced.
pub fn save(doc: &Document, path: impl AsRef<Path>) -> Result<(), CmcError> {
    let _timer = ScopeTimer::new("cmc_save");
    let path = path.as_ref();
    let bytes = encode(doc)?;

    let tmp = temp_sibling(path);
    let written = (|| -> Result<(), CmcError> {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)?;
        Ok(())
    })();

    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }
    log::debug!("saved {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Read a document from `path`. The result is clean and remembers `path`.
pub fn load(path: impl AsRef<Path>) -> Result<Document, CmcError> {
    let _timer = ScopeTimer::new("cmc_load");
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let mut doc = decode(&bytes)?;
    doc.set_file_path(Some(path.to_path_buf()));
    Ok(doc)
}

/// Serialize `doc` into an in-memory `.cmc` stream.
pub fn encode(doc: &Document) -> Result<Vec<u8>, CmcError> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);

    let (width, height) = doc.canvas_size();
    let mut canv = Vec::with_capacity(12);
    put_u32(&mut canv, width);
    put_u32(&mut canv, height);
    put_u32(&mut canv, doc.dpi());
    write_chunk(&mut out, TAG_CANV, &canv);

    let stack = doc.layers();
    let mut lyrs = Vec::new();
    put_u32(&mut lyrs, stack.count() as u32);
    put_u64(&mut lyrs, stack.active_layer_id());
    put_u64(&mut lyrs, stack.peek_next_id());
    for layer in stack.iter() {
        put_u64(&mut lyrs, layer.id());
        put_u32(&mut lyrs, layer.name.len() as u32);
        lyrs.extend_from_slice(layer.name.as_bytes());
        lyrs.extend_from_slice(&layer.opacity().to_le_bytes());
        lyrs.push(layer.visible as u8);
        lyrs.push(layer.locked as u8);
        lyrs.push(layer.blend_mode.to_u8());
    }
    write_chunk(&mut out, TAG_LYRS, &lyrs);

    for layer in stack.iter() {
        let tiles = layer.tiles();
        for coord in tiles.sorted_coords() {
            let Some(pixels) = tiles.tile_at(coord).and_then(|t| t.data()) else {
                continue;
            };
            let compressed = compress(pixels)?;
            let mut tile = Vec::with_capacity(20 + compressed.len());
            put_u64(&mut tile, layer.id());
            tile.extend_from_slice(&coord.tx.to_le_bytes());
            tile.extend_from_slice(&coord.ty.to_le_bytes());
            put_u32(&mut tile, compressed.len() as u32);
            tile.extend_from_slice(&compressed);
            write_chunk(&mut out, TAG_TILE, &tile);
        }
    }

    write_chunk(&mut out, TAG_END, &[]);
    Ok(out)
}

struct LayerRecord {
    id: LayerId,
    name: String,
    opacity: f32,
    visible: bool,
    locked: bool,
    blend: u8,
}

struct TileRecord {
    layer_id: LayerId,
    coord: TileCoord,
    pixels: Vec<u8>,
}

/// Parse an in-memory `.cmc` stream. Any corruption fails the whole load.
pub fn decode(bytes: &[u8]) -> Result<Document, CmcError> {
    let mut reader = ByteReader::new(bytes);
    if reader.bytes(4).map_err(|_| CmcError::BadMagic)? != MAGIC {
        return Err(CmcError::BadMagic);
    }

    let mut canvas: Option<(u32, u32, u32)> = None;
    let mut layer_records = Vec::new();
    let mut active_id: LayerId = 0;
    let mut next_id: LayerId = 1;
    let mut tile_records = Vec::new();

    while !reader.is_empty() {
        let tag: [u8; 4] = reader.array()?;
        let size = reader.u32()? as usize;
        if tag == TAG_END {
            break;
        }
        let mut chunk = ByteReader::new(reader.bytes(size)?);

        match tag {
            TAG_CANV => {
                canvas = Some((chunk.u32()?, chunk.u32()?, chunk.u32()?));
            }
            TAG_LYRS => {
                let count = chunk.u32()?;
                active_id = chunk.u64()?;
                next_id = chunk.u64()?;
                layer_records.clear();
                for _ in 0..count {
                    layer_records.push(LayerRecord {
                        id: chunk.u64()?,
                        name: chunk.string()?,
                        opacity: chunk.f32()?,
                        visible: chunk.u8()? != 0,
                        locked: chunk.u8()? != 0,
                        blend: chunk.u8()?,
                    });
                }
            }
            TAG_TILE => {
                let layer_id = chunk.u64()?;
                let coord = TileCoord::new(chunk.i32()?, chunk.i32()?);
                let len = chunk.u32()? as usize;
                let pixels = decompress(chunk.bytes(len)?)?;
                tile_records.push(TileRecord {
                    layer_id,
                    coord,
                    pixels,
                });
            }
            other => {
                log::debug!(
                    "skipping unknown chunk {:?} ({} bytes)",
                    String::from_utf8_lossy(&other),
                    size
                );
            }
        }
    }

    let (width, height, dpi) = canvas.ok_or(CmcError::MissingCanvas)?;
    let mut doc = Document::with_canvas_size(width, height);
    doc.set_dpi(dpi);

    let stack = doc.layers_mut();
    stack.take_layers();
    for record in layer_records {
        let id = record.id;
        // Stored names are kept verbatim, empty ones included.
        let mut layer = Layer::new(id, "");
        layer.name = record.name;
        layer.set_opacity(record.opacity);
        layer.visible = record.visible;
        layer.locked = record.locked;
        layer.blend_mode = BlendMode::from_u8(record.blend);
        let at = stack.count();
        if stack.restore_layer(at, layer).is_none() {
            log::warn!("duplicate layer id {id} in cmc data, skipped");
        }
    }
    stack.set_next_id(next_id);
    if stack.is_empty() {
        log::warn!("cmc data has no layers, adding a default layer");
        stack.add_layer("");
    }
    if !stack.set_active_layer_id(active_id) {
        if let Some(top) = stack.layers().last().map(|l| l.id()) {
            stack.set_active_layer_id(top);
        }
    }

    for record in tile_records {
        let Some(layer) = stack.layer_by_id_mut(record.layer_id) else {
            log::warn!(
                "tile {:?} references unknown layer {}, skipped",
                record.coord,
                record.layer_id
            );
            continue;
        };
        let tile = layer.tiles_mut().get_or_create_tile(record.coord);
        tile.set_data(record.pixels);
    }

    doc.set_dirty(false);
    Ok(doc)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_owned());
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

fn write_chunk(out: &mut Vec<u8>, tag: [u8; 4], payload: &[u8]) {
    out.extend_from_slice(&tag);
    put_u32(out, payload.len() as u32);
    out.extend_from_slice(payload);
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn compress(pixels: &[u8]) -> Result<Vec<u8>, CmcError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(pixels)?;
    Ok(encoder.finish()?)
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, CmcError> {
    let mut out = Vec::with_capacity(TILE_BYTES);
    // One byte past the tile size is enough to detect oversized payloads.
    ZlibDecoder::new(data)
        .take(TILE_BYTES as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|_| CmcError::Decompress)?;
    if out.len() != TILE_BYTES {
        return Err(CmcError::TileSize {
            expected: TILE_BYTES,
            actual: out.len(),
        });
    }
    Ok(out)
}

/// Little-endian cursor over a byte slice.
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], CmcError> {
        let end = self.pos.checked_add(len).ok_or(CmcError::Truncated)?;
        let slice = self.data.get(self.pos..end).ok_or(CmcError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CmcError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, CmcError> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, CmcError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32, CmcError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, CmcError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> Result<f32, CmcError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    fn string(&mut self) -> Result<String, CmcError> {
        let len = self.u32()? as usize;
        let raw = self.bytes(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| CmcError::InvalidString)
    }
}
