use sable::{
    Argb, Cap, Context, Dash, DrawMode, Join, Path, PathKind, Render, Renderer, Rop, Surface,
};

const BLUE: Argb = Argb(0xff00_00ff);

fn alpha(px: u32) -> u32 {
    px >> 24
}

fn stroked(path: Path, weight: f64) -> Renderer<PathKind> {
    let mut kind = PathKind::new(path.into_shared());
    kind.shape_mut().set_mode(DrawMode::Stroke);
    kind.shape_mut().set_stroke_color(BLUE);
    kind.shape_mut().set_stroke_weight(weight);
    Renderer::new(kind)
}

#[test]
fn horizontal_stroke_is_a_band() {
    let ctx = Context::new();
    let mut surface = Surface::new(32, 32).unwrap();
    let mut path = Path::new();
    path.move_to(4.0, 16.0);
    path.line_to(28.0, 16.0);
    let mut r = stroked(path, 4.0);
    r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();

    // Weight 4 centered on y = 16: rows 14..18 solid, outside empty.
    assert_eq!(alpha(surface.pixel(16, 14).0), 255);
    assert_eq!(alpha(surface.pixel(16, 17).0), 255);
    assert_eq!(alpha(surface.pixel(16, 12).0), 0);
    assert_eq!(alpha(surface.pixel(16, 19).0), 0);
}

#[test]
fn square_cap_extends_past_the_endpoint() {
    let ctx = Context::new();
    let mut butt_surface = Surface::new(32, 32).unwrap();
    let mut square_surface = Surface::new(32, 32).unwrap();

    let mut path = Path::new();
    path.move_to(8.0, 16.0);
    path.line_to(24.0, 16.0);
    let mut butt = stroked(path.clone(), 4.0);
    butt.kind_mut().shape_mut().set_stroke_cap(Cap::Butt);
    butt.draw(&ctx, &mut butt_surface, Rop::Fill, None).unwrap();

    let mut square = stroked(path, 4.0);
    square.kind_mut().shape_mut().set_stroke_cap(Cap::Square);
    square
        .draw(&ctx, &mut square_surface, Rop::Fill, None)
        .unwrap();

    // Half the weight sticks out beyond x = 24 with a square cap.
    assert_eq!(alpha(butt_surface.pixel(25, 16).0), 0);
    assert_eq!(alpha(square_surface.pixel(25, 16).0), 255);
    assert_eq!(alpha(square_surface.pixel(27, 16).0), 0);
}

#[test]
fn miter_fills_the_corner_bevel_cuts_it() {
    let ctx = Context::new();
    let mut miter_surface = Surface::new(32, 32).unwrap();
    let mut bevel_surface = Surface::new(32, 32).unwrap();

    let mut path = Path::new();
    path.move_to(2.0, 10.0);
    path.line_to(10.0, 10.0);
    path.line_to(10.0, 18.0);

    let mut miter = stroked(path.clone(), 4.0);
    miter.kind_mut().shape_mut().set_stroke_join(Join::Miter);
    miter.kind_mut().shape_mut().set_stroke_miter_limit(4.0);
    miter
        .draw(&ctx, &mut miter_surface, Rop::Fill, None)
        .unwrap();

    let mut bevel = stroked(path, 4.0);
    bevel.kind_mut().shape_mut().set_stroke_join(Join::Bevel);
    bevel
        .draw(&ctx, &mut bevel_surface, Rop::Fill, None)
        .unwrap();

    // The outer corner of the right-angle turn is the square
    // [10,12]x[8,10]; only the miter join covers all of it.
    assert_eq!(alpha(miter_surface.pixel(11, 8).0), 255);
    assert_eq!(alpha(bevel_surface.pixel(11, 8).0), 0);
    // Both joins cover the band cores.
    assert_eq!(alpha(miter_surface.pixel(6, 9).0), 255);
    assert_eq!(alpha(bevel_surface.pixel(6, 9).0), 255);
}

#[test]
fn dashes_leave_gaps() {
    let ctx = Context::new();
    let mut surface = Surface::new(40, 16).unwrap();
    let mut path = Path::new();
    path.move_to(2.0, 8.0);
    path.line_to(38.0, 8.0);
    let mut r = stroked(path, 4.0);
    r.kind_mut().shape_mut().set_dashes(&[Dash {
        length: 6.0,
        gap: 6.0,
    }]);
    r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();

    // Dash runs start at x = 2: [2,8) on, [8,14) off, [14,20) on, ...
    assert_eq!(alpha(surface.pixel(4, 8).0), 255);
    assert_eq!(alpha(surface.pixel(10, 8).0), 0);
    assert_eq!(alpha(surface.pixel(16, 8).0), 255);
    assert_eq!(alpha(surface.pixel(22, 8).0), 0);
}

#[test]
fn hairline_weight_dims_the_line() {
    let ctx = Context::new();
    let mut surface = Surface::new(32, 8).unwrap();
    let mut path = Path::new();
    // Centered on y = 4.5 the unit-wide band lands exactly on row 4.
    path.move_to(2.0, 4.5);
    path.line_to(30.0, 4.5);
    let mut r = stroked(path, 0.5);
    r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();

    // A half-weight line renders as a unit-wide line at half coverage.
    let a = alpha(surface.pixel(16, 4).0);
    assert!(a >= 120 && a <= 136, "expected ~50% coverage, got {a}");
    assert_eq!(alpha(surface.pixel(16, 6).0), 0);
}

#[test]
fn closed_stroke_rings_the_interior() {
    let ctx = Context::new();
    let mut surface = Surface::new(32, 32).unwrap();
    let mut path = Path::new();
    path.move_to(8.0, 8.0);
    path.line_to(24.0, 8.0);
    path.line_to(24.0, 24.0);
    path.line_to(8.0, 24.0);
    path.close();
    let mut r = stroked(path, 2.0);
    r.draw(&ctx, &mut surface, Rop::Fill, None).unwrap();

    assert_eq!(alpha(surface.pixel(16, 8).0), 255, "top edge");
    assert_eq!(alpha(surface.pixel(8, 16).0), 255, "left edge");
    assert_eq!(alpha(surface.pixel(16, 16).0), 0, "interior open");
    assert_eq!(alpha(surface.pixel(8, 8).0), 255, "corner joined");
}
