use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sable::compositor::{KernelKey, Rop};
use sable::{Argb, Circle, Color, Context, Format, LinearGradient, Render, Renderer, Surface};

fn circle_fill(c: &mut Criterion) {
    let ctx = Context::new();
    let mut surface = Surface::new(256, 256).unwrap();
    let mut circle = Circle::new(128.0, 128.0, 100.0);
    circle.shape_mut().set_fill_color(Argb(0xffff_0000));
    let mut r = Renderer::new(circle);

    c.bench_function("circle_fill_256", |b| {
        b.iter(|| {
            r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
            black_box(surface.pixel(128, 128));
        })
    });
}

fn gradient_fill(c: &mut Criterion) {
    let ctx = Context::new();
    let mut surface = Surface::new(256, 256).unwrap();
    let mut g = LinearGradient::new(0.0, 0.0, 256.0, 256.0);
    g.add_stop(0.0, Argb(0xffff_0000));
    g.add_stop(1.0, Argb(0xff00_00ff));
    let mut r = Renderer::new(g);

    c.bench_function("linear_gradient_256", |b| {
        b.iter(|| {
            r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
            black_box(surface.pixel(128, 128));
        })
    });
}

fn blend_span(c: &mut Criterion) {
    let ctx = Context::new();
    let key = KernelKey::new(Rop::Blend, Format::Argb8888Pre).with_src(Format::Argb8888Pre);
    let kernel = ctx.compositor().span_for(key).unwrap();
    let src = vec![0x8080_4020u32; 1024];
    let mut dst = vec![0xff10_2030u32; 1024];

    c.bench_function("blend_src_span_1024", |b| {
        b.iter(|| {
            kernel(&mut dst, Some(&src), Color::WHITE, None);
            black_box(dst[0]);
        })
    });
}

fn stroke_regenerate(c: &mut Criterion) {
    let ctx = Context::new();
    let mut surface = Surface::new(256, 256).unwrap();
    let mut circle = Circle::new(128.0, 128.0, 100.0);
    circle.shape_mut().set_mode(sable::DrawMode::Stroke);
    circle.shape_mut().set_stroke_color(Argb(0xff00_ff00));
    circle.shape_mut().set_stroke_weight(6.0);
    let mut r = Renderer::new(circle);
    let mut radius = 100.0;

    c.bench_function("stroked_circle_regenerate", |b| {
        b.iter(|| {
            // Nudging the geometry defeats the generator memo, so every
            // iteration pays for flatten + offset + raster.
            radius = if radius > 100.0 { 100.0 } else { 100.25 };
            r.kind_mut().set_radius(radius);
            r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
            black_box(surface.pixel(128, 28));
        })
    });
}

criterion_group!(benches, circle_fill, gradient_fill, blend_span, stroke_regenerate);
criterion_main!(benches);
