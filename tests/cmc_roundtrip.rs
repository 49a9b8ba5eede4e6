use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use rusty_canvas::canvas::{BlendMode, Document, Pixel, TileCoord, TILE_BYTES};
use rusty_canvas::format::{self, CmcError};

fn temp_path(tag: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("rusty_canvas_{}_{}_{}.cmc", tag, std::process::id(), n))
}

fn fill(doc: &mut Document, coord: TileCoord, px: Pixel) {
    let layer = doc.layers_mut().active_layer_mut().expect("active layer");
    let tile = layer.tiles_mut().get_or_create_tile(coord);
    for chunk in tile.ensure_allocated().chunks_exact_mut(4) {
        chunk.copy_from_slice(&px.to_array());
    }
}

#[test]
fn red_tile_survives_save_and_load() {
    let _ = env_logger::builder().is_test(true).try_init();
    let path = temp_path("red");
    let mut doc = Document::with_canvas_size(256, 256);
    fill(&mut doc, TileCoord::new(0, 0), Pixel::new(255, 0, 0, 255));

    format::save(&doc, &path).expect("save");
    let loaded = format::load(&path).expect("load");
    let _ = std::fs::remove_file(&path);

    let layer = loaded.layers().active_layer().expect("active layer");
    let tile = layer.tiles().tile_at(TileCoord::new(0, 0)).expect("tile");
    assert_eq!(tile.pixel_at(0, 0), Pixel::new(255, 0, 0, 255));
    assert_eq!(tile.pixel_at(255, 255), Pixel::new(255, 0, 0, 255));
    assert_eq!(loaded.file_path(), Some(path.as_path()));
    assert!(!loaded.is_dirty());
}

#[test]
fn full_document_round_trip() {
    let path = temp_path("full");
    let mut doc = Document::with_canvas_size(1200, 900);
    doc.set_dpi(144);
    fill(&mut doc, TileCoord::new(-2, 3), Pixel::new(1, 2, 3, 4));
    {
        let top = doc.layers_mut().add_layer("inks");
        top.set_opacity(0.6);
        top.blend_mode = BlendMode::Multiply;
        top.visible = false;
        top.tiles_mut()
            .get_or_create_tile(TileCoord::new(4, 0))
            .set_pixel_at(17, 200, Pixel::new(90, 80, 70, 60));
    }
    let removed = doc.layers_mut().add_layer("gone").id();
    doc.layers_mut().remove_layer(removed);
    let first = doc.layers().layer_at(0).expect("bottom").id();
    doc.layers_mut().set_active_layer_id(first);

    format::save(&doc, &path).expect("save");
    let loaded = format::load(&path).expect("load");
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.canvas_size(), (1200, 900));
    assert_eq!(loaded.dpi(), 144);
    assert_eq!(loaded.layers().count(), 2);
    assert_eq!(loaded.layers().active_layer_id(), first);
    assert_eq!(loaded.layers().peek_next_id(), doc.layers().peek_next_id());

    for (orig, back) in doc.layers().iter().zip(loaded.layers().iter()) {
        assert_eq!(orig.id(), back.id());
        assert_eq!(orig.name, back.name);
        assert_eq!(orig.opacity(), back.opacity());
        assert_eq!(orig.visible, back.visible);
        assert_eq!(orig.locked, back.locked);
        assert_eq!(orig.blend_mode, back.blend_mode);
        assert_eq!(orig.tiles().sorted_coords(), back.tiles().sorted_coords());
        for coord in orig.tiles().sorted_coords() {
            let a = orig.tiles().tile_at(coord).and_then(|t| t.data());
            let b = back.tiles().tile_at(coord).and_then(|t| t.data());
            assert_eq!(a, b);
        }
    }
}

#[test]
fn ids_are_not_reused_after_reload() {
    let mut doc = Document::with_canvas_size(64, 64);
    let a = doc.layers_mut().add_layer("a").id();
    let b = doc.layers_mut().add_layer("b").id();
    doc.layers_mut().remove_layer(b);

    let mut loaded = format::decode(&format::encode(&doc).expect("encode")).expect("decode");
    let fresh = loaded.layers_mut().add_layer("fresh").id();
    assert!(fresh > b);
    assert!(fresh > a);
}

#[test]
fn unknown_chunks_are_skipped() {
    let doc = Document::with_canvas_size(32, 16);
    let bytes = format::encode(&doc).expect("encode");

    // Insert a foreign chunk right after the magic.
    let mut patched = bytes[..4].to_vec();
    patched.extend_from_slice(b"XTRA");
    patched.extend_from_slice(&5u32.to_le_bytes());
    patched.extend_from_slice(&[9, 9, 9, 9, 9]);
    patched.extend_from_slice(&bytes[4..]);

    let loaded = format::decode(&patched).expect("decode");
    assert_eq!(loaded.canvas_size(), (32, 16));
    assert_eq!(loaded.layers().count(), 1);
}

#[test]
fn corrupt_files_do_not_load() {
    let doc = Document::with_canvas_size(32, 16);
    let bytes = format::encode(&doc).expect("encode");

    let mut bad_magic = bytes.clone();
    bad_magic[3] = 2;
    assert!(matches!(format::decode(&bad_magic), Err(CmcError::BadMagic)));

    let cut = &bytes[..bytes.len() - 20];
    assert!(format::decode(cut).is_err());

    let missing = temp_path("missing");
    assert!(matches!(format::load(&missing), Err(CmcError::Io(_))));
}

#[test]
fn save_replaces_existing_file_and_leaves_no_temp() {
    let path = temp_path("replace");
    let mut doc = Document::with_canvas_size(256, 256);
    format::save(&doc, &path).expect("first save");

    fill(&mut doc, TileCoord::new(0, 0), Pixel::new(0, 255, 0, 255));
    format::save(&doc, &path).expect("second save");

    let loaded = format::load(&path).expect("load");
    let tile = loaded
        .layers()
        .active_layer()
        .and_then(|l| l.tiles().tile_at(TileCoord::new(0, 0)))
        .expect("tile");
    assert_eq!(tile.data().map(|d| d.len()), Some(TILE_BYTES));
    assert_eq!(tile.pixel_at(9, 9), Pixel::new(0, 255, 0, 255));

    let dir = path.parent().expect("temp dir");
    let name = path.file_name().and_then(|n| n.to_str()).expect("name").to_owned();
    let leftovers = std::fs::read_dir(dir)
        .expect("read dir")
        .filter_map(|e| e.ok())
        .filter(|e| {
            let n = e.file_name().to_string_lossy().into_owned();
            n.starts_with(&format!(".{name}")) && n.ends_with(".tmp")
        })
        .count();
    let _ = std::fs::remove_file(&path);
    assert_eq!(leftovers, 0);
}
