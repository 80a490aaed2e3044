use sable::{Argb, Context, FillRule, Path, PathKind, Render, Renderer, Rop, Surface};

const RED: Argb = Argb(0xffff_0000);

fn rect_path(x: f64, y: f64, w: f64, h: f64) -> Path {
    let mut path = Path::new();
    path.move_to(x, y);
    path.line_to(x + w, y);
    path.line_to(x + w, y + h);
    path.line_to(x, y + h);
    path.close();
    path
}

fn filled(path: Path) -> Renderer<PathKind> {
    let mut kind = PathKind::new(path.into_shared());
    kind.shape_mut().set_fill_color(RED);
    Renderer::new(kind)
}

fn total_alpha(surface: &Surface) -> i64 {
    let mut sum = 0i64;
    for y in 0..16 {
        for x in 0..16 {
            sum += (surface.pixel(x, y).0 >> 24) as i64;
        }
    }
    sum
}

#[test]
fn subpixel_square_conserves_total_coverage() {
    let ctx = Context::new();
    let mut surface = Surface::new(16, 16).unwrap();
    let mut r = filled(rect_path(0.5, 0.5, 10.0, 10.0));
    r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();

    // 100 square pixels of geometry, alpha-summed over the raster.
    let total = total_alpha(&surface);
    assert!(
        (total - 100 * 255).abs() <= 300,
        "total coverage {total} strays from {}",
        100 * 255
    );

    // A strictly interior pixel is solid, the half-covered edge is not.
    assert_eq!(surface.pixel(5, 5).0 >> 24, 255);
    let edge = surface.pixel(0, 5).0 >> 24;
    assert!(edge > 100 && edge < 156, "half pixel edge, got {edge}");
}

#[test]
fn translation_by_a_fraction_moves_coverage_without_losing_it() {
    let ctx = Context::new();
    let mut at_zero = Surface::new(16, 16).unwrap();
    let mut r = filled(rect_path(2.0, 2.0, 10.0, 10.0));
    r.draw(&ctx, &mut at_zero, Rop::Fill, None).unwrap();

    let mut shifted = Surface::new(16, 16).unwrap();
    let mut r = filled(rect_path(2.0, 2.0, 10.0, 10.0));
    r.set_matrix(sable::Matrix::translate(0.25, 0.0));
    r.draw(&ctx, &mut shifted, Rop::Fill, None).unwrap();

    let a = total_alpha(&at_zero);
    let b = total_alpha(&shifted);
    assert!((a - b).abs() <= 60, "coverage changed {a} -> {b}");

    // The moved left edge is now partial where it was empty.
    assert_eq!(at_zero.pixel(12, 5).0 >> 24, 0);
    let lead = shifted.pixel(12, 5).0 >> 24;
    assert!(lead > 40 && lead < 90, "quarter pixel lead, got {lead}");
}

#[test]
fn even_odd_holes_what_nonzero_fills() {
    // Outer and inner ring wound the same way.
    let mut path = rect_path(2.0, 2.0, 12.0, 12.0);
    path.move_to(5.0, 5.0);
    path.line_to(11.0, 5.0);
    path.line_to(11.0, 11.0);
    path.line_to(5.0, 11.0);
    path.close();

    let ctx = Context::new();
    let mut nonzero = Surface::new(16, 16).unwrap();
    let mut r = filled(path.clone());
    r.draw(&ctx, &mut nonzero, Rop::Fill, None).unwrap();
    assert_eq!(nonzero.pixel(8, 8).0 >> 24, 255, "nonzero keeps the center");

    let mut evenodd = Surface::new(16, 16).unwrap();
    let mut r = filled(path);
    r.kind_mut().shape_mut().set_fill_rule(FillRule::EvenOdd);
    r.draw(&ctx, &mut evenodd, Rop::Fill, None).unwrap();
    assert_eq!(evenodd.pixel(8, 8).0 >> 24, 0, "even-odd opens a hole");
    assert_eq!(evenodd.pixel(3, 8).0 >> 24, 255, "ring stays filled");
}

#[test]
fn reversed_inner_ring_cancels_under_nonzero() {
    let mut path = rect_path(2.0, 2.0, 12.0, 12.0);
    // Inner ring wound the opposite way.
    path.move_to(5.0, 5.0);
    path.line_to(5.0, 11.0);
    path.line_to(11.0, 11.0);
    path.line_to(11.0, 5.0);
    path.close();

    let ctx = Context::new();
    let mut surface = Surface::new(16, 16).unwrap();
    let mut r = filled(path);
    r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();
    assert_eq!(surface.pixel(8, 8).0 >> 24, 0, "windings cancel");
    assert_eq!(surface.pixel(3, 8).0 >> 24, 255);
}

#[test]
fn overlapping_subpaths_saturate_instead_of_overflowing() {
    let mut path = rect_path(2.0, 2.0, 8.0, 8.0);
    path.move_to(6.0, 6.0);
    path.line_to(14.0, 6.0);
    path.line_to(14.0, 14.0);
    path.line_to(6.0, 14.0);
    path.close();

    let ctx = Context::new();
    let mut surface = Surface::new(16, 16).unwrap();
    let mut r = filled(path);
    r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();

    // Doubled winding in the overlap still reads as plain full coverage.
    assert_eq!(surface.pixel(8, 8).0, 0xffff_0000);
    assert_eq!(surface.pixel(3, 3).0, 0xffff_0000);
    assert_eq!(surface.pixel(12, 12).0, 0xffff_0000);
}
