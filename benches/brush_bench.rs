use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rusty_canvas::{
    brush_engine::{BrushEngine, CanvasPoint, Stroke, ToolType},
    canvas::Document,
    utils::color::Color,
};

fn bench_soft_dab(c: &mut Criterion) {
    let mut doc = Document::with_canvas_size(512, 512);
    let layer = doc.layers().active_layer().cloned().expect("default layer");
    let mut engine = BrushEngine::new();

    c.bench_function("soft_stroke_48px", |b| {
        b.iter(|| {
            let stroke = Stroke::new(ToolType::Pen, Color::rgba(0, 0, 0, 255), 48.0, 0.5);
            engine.begin_stroke(&layer, stroke);
            engine.add_point(doc.layers_mut(), CanvasPoint::new(256.0, 256.0, 1.0));
            engine.add_point(doc.layers_mut(), CanvasPoint::new(280.0, 256.0, 0.8));
            black_box(engine.end_stroke());
            black_box(engine.take_before_snapshots());
        });
    });
}

fn bench_eraser_across_tiles(c: &mut Criterion) {
    let mut doc = Document::with_canvas_size(1024, 1024);
    let layer = doc.layers().active_layer().cloned().expect("default layer");
    let mut engine = BrushEngine::new();

    c.bench_function("eraser_stroke_tile_seam", |b| {
        b.iter(|| {
            let stroke = Stroke::new(ToolType::Eraser, Color::black(), 32.0, 1.0);
            engine.begin_stroke(&layer, stroke);
            engine.add_point(doc.layers_mut(), CanvasPoint::new(200.0, 250.0, 1.0));
            engine.add_point(doc.layers_mut(), CanvasPoint::new(320.0, 262.0, 1.0));
            black_box(engine.end_stroke());
            engine.take_before_snapshots();
        });
    });
}

criterion_group!(benches, bench_soft_dab, bench_eraser_across_tiles);
criterion_main!(benches);
