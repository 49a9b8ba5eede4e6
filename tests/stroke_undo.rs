use rusty_canvas::brush_engine::{BrushEngine, CanvasPoint, Stroke, ToolType};
use rusty_canvas::canvas::{Document, Pixel, StrokeCommand, TileCoord, TILE_BYTES};
use rusty_canvas::settings::EngineSettings;
use rusty_canvas::utils::color::Color;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn paint(doc: &mut Document, engine: &mut BrushEngine, tool: ToolType, points: &[(f32, f32)]) -> usize {
    let layer = doc.layers().active_layer().cloned().expect("active layer");
    let layer_id = layer.id();
    assert!(engine.begin_stroke(&layer, Stroke::new(tool, Color::black(), 10.0, 1.0)));
    for &(x, y) in points {
        engine.add_point(doc.layers_mut(), CanvasPoint::new(x, y, 1.0));
    }
    let affected = engine.end_stroke();
    let before = engine.take_before_snapshots();
    let count = affected.len();
    let command = StrokeCommand::new(doc.layers(), layer_id, affected, before);
    doc.push_command(Box::new(command));
    count
}

fn pixel(doc: &Document, x: i32, y: i32) -> Option<Pixel> {
    let coord = TileCoord::from_pixel(x, y);
    let (ox, oy) = coord.origin();
    let tile = doc.layers().active_layer()?.tiles().tile_at(coord)?;
    Some(tile.pixel_at(x - ox, y - oy))
}

fn tile_bytes(doc: &Document, coord: TileCoord) -> Option<Vec<u8>> {
    let tile = doc.layers().active_layer()?.tiles().tile_at(coord)?;
    tile.data().map(|d| d.to_vec())
}

#[test]
fn horizontal_stroke_paints_a_band_and_undo_clears_it() {
    init_logging();
    let mut doc = Document::with_canvas_size(800, 600);
    let mut engine = BrushEngine::new();

    paint(&mut doc, &mut engine, ToolType::Pen, &[(0.0, 0.0), (100.0, 0.0)]);

    assert_eq!(pixel(&doc, 50, 2), Some(Pixel::new(0, 0, 0, 255)));
    assert_eq!(pixel(&doc, 50, 20), Some(Pixel::TRANSPARENT));
    assert!(doc.is_dirty());
    assert!(doc.history().can_undo());

    doc.undo();
    let layer = doc.layers().active_layer().expect("active layer");
    assert!(layer.tiles().tile_at(TileCoord::new(0, 0)).is_none());
    assert!(doc.history().can_redo());
}

#[test]
fn undo_and_redo_restore_exact_bytes() {
    let mut doc = Document::with_canvas_size(800, 600);
    let mut engine = BrushEngine::new();
    let seam = TileCoord::new(1, 0);

    paint(&mut doc, &mut engine, ToolType::Pen, &[(240.0, 40.0), (300.0, 60.0)]);
    let after_first = tile_bytes(&doc, seam).expect("first stroke allocated the tile");

    paint(&mut doc, &mut engine, ToolType::Eraser, &[(250.0, 30.0), (290.0, 70.0)]);
    let after_second = tile_bytes(&doc, seam).expect("tile still allocated");
    assert_ne!(after_first, after_second);

    doc.undo();
    assert_eq!(tile_bytes(&doc, seam), Some(after_first.clone()));
    doc.undo();
    assert_eq!(tile_bytes(&doc, seam), None);

    doc.redo();
    assert_eq!(tile_bytes(&doc, seam), Some(after_first));
    doc.redo();
    assert_eq!(tile_bytes(&doc, seam), Some(after_second));
    assert!(!doc.history().can_redo());
}

#[test]
fn new_stroke_discards_redo_branch() {
    let mut doc = Document::with_canvas_size(800, 600);
    let mut engine = BrushEngine::new();
    paint(&mut doc, &mut engine, ToolType::Pen, &[(20.0, 20.0), (40.0, 20.0)]);
    doc.undo();
    assert!(doc.history().can_redo());

    paint(&mut doc, &mut engine, ToolType::Pen, &[(20.0, 80.0), (40.0, 80.0)]);
    assert!(!doc.history().can_redo());
    assert_eq!(doc.history().undo_count(), 1);
}

#[test]
fn history_memory_stays_within_budget() {
    let settings = EngineSettings {
        history_memory_limit: 2 * TILE_BYTES,
        ..EngineSettings::default()
    };
    let mut doc = Document::with_settings(2048, 2048, &settings);
    let mut engine = BrushEngine::new();

    // Each stroke stays inside a fresh tile: one "after" snapshot each.
    for i in 0..4 {
        let x = 128.0 + 256.0 * i as f32;
        assert_eq!(paint(&mut doc, &mut engine, ToolType::Pen, &[(x, 128.0), (x + 10.0, 128.0)]), 1);
        assert!(doc.history().memory_usage() <= doc.history().memory_limit());
    }
    assert_eq!(doc.history().undo_count(), 2);

    // The two newest strokes are undoable; the oldest ones stay painted.
    doc.undo();
    doc.undo();
    assert!(!doc.history().can_undo());
    assert!(pixel(&doc, 128, 128).is_some());
    assert!(pixel(&doc, 384, 128).is_some());
    assert!(pixel(&doc, 640, 128).is_none());
    assert!(pixel(&doc, 896, 128).is_none());
}

#[test]
fn undo_after_layer_removal_is_a_no_op() {
    let mut doc = Document::with_canvas_size(512, 512);
    doc.layers_mut().add_layer("scratch");
    let mut engine = BrushEngine::new();
    paint(&mut doc, &mut engine, ToolType::Pen, &[(10.0, 10.0), (30.0, 10.0)]);

    let scratch = doc.layers().active_layer_id();
    doc.layers_mut().remove_layer(scratch);
    doc.undo();
    doc.redo();
    assert_eq!(doc.layers().count(), 1);
}
