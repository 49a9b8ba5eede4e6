use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rusty_canvas::{
    canvas::{BlendMode, LayerStack, Pixel, TileCoord},
    render::{blend_pixels, Compositor},
    utils::rect::Rect,
};

fn filled_stack(layers: usize) -> LayerStack {
    let mut stack = LayerStack::new();
    for i in 0..layers {
        let layer = stack.add_layer(&format!("layer {i}"));
        layer.set_opacity(0.8);
        for ty in 0..2 {
            for tx in 0..2 {
                let tile = layer.tiles_mut().get_or_create_tile(TileCoord::new(tx, ty));
                for (n, px) in tile.ensure_allocated().chunks_exact_mut(4).enumerate() {
                    px.copy_from_slice(&[(n % 256) as u8, (i * 40 % 256) as u8, 90, 200]);
                }
            }
        }
    }
    stack
}

fn bench_blend_pixels(c: &mut Criterion) {
    let src = Pixel::new(255, 128, 64, 200);
    let dst = Pixel::new(64, 128, 255, 150);

    let mut group = c.benchmark_group("blend_pixels");
    for mode in [BlendMode::Normal, BlendMode::Multiply, BlendMode::Screen, BlendMode::Overlay] {
        group.bench_function(format!("{mode:?}"), |b| {
            b.iter(|| black_box(blend_pixels(black_box(dst), black_box(src), mode, 0.75)))
        });
    }
    group.finish();
}

fn bench_composite_region(c: &mut Criterion) {
    let compositor = Compositor::new();
    let mut group = c.benchmark_group("composite_region");

    for layers in [1usize, 4, 8] {
        let stack = filled_stack(layers);
        group.throughput(Throughput::Elements(512 * 512));
        group.bench_with_input(BenchmarkId::from_parameter(layers), &stack, |b, stack| {
            b.iter(|| black_box(compositor.composite_region(stack, Rect::new(0.0, 0.0, 512.0, 512.0))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_blend_pixels, bench_composite_region);
criterion_main!(benches);
