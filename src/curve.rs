//! Curve flattening and arc conversion
//!
//! Beziers are flattened by recursive midpoint subdivision in device space,
//! so the tolerances are in device units no matter what transform produced
//! the coordinates. Elliptical arcs convert to cubic runs of at most a
//! quarter turn each before flattening.

/// Maximum deviation of the emitted polyline from a cubic, in device units.
pub const CUBIC_TOLERANCE: f64 = 1.0 / 64.0;
/// Maximum deviation for quadratics, slightly tighter to match their lower
/// degree.
pub const QUAD_TOLERANCE: f64 = 1.0 / 92.0;

const MAX_DEPTH: u32 = 32;

/// Flatten a quadratic from `(x0, y0)`; emits interior points and the end
/// point, never the start point.
pub fn flatten_quad(
    x0: f64,
    y0: f64,
    cx: f64,
    cy: f64,
    x1: f64,
    y1: f64,
    out: &mut impl FnMut(f64, f64),
) {
    quad_rec(x0, y0, cx, cy, x1, y1, 0, out);
}

fn quad_rec(
    x0: f64,
    y0: f64,
    cx: f64,
    cy: f64,
    x1: f64,
    y1: f64,
    depth: u32,
    out: &mut impl FnMut(f64, f64),
) {
    if depth >= MAX_DEPTH || quad_flat(x0, y0, cx, cy, x1, y1) {
        out(x1, y1);
        return;
    }
    let ax = (x0 + cx) * 0.5;
    let ay = (y0 + cy) * 0.5;
    let bx = (cx + x1) * 0.5;
    let by = (cy + y1) * 0.5;
    let mx = (ax + bx) * 0.5;
    let my = (ay + by) * 0.5;
    quad_rec(x0, y0, ax, ay, mx, my, depth + 1, out);
    quad_rec(mx, my, bx, by, x1, y1, depth + 1, out);
}

fn quad_flat(x0: f64, y0: f64, cx: f64, cy: f64, x1: f64, y1: f64) -> bool {
    let dx = x1 - x0;
    let dy = y1 - y0;
    let len2 = dx * dx + dy * dy;
    let cross = (cx - x0) * dy - (cy - y0) * dx;
    if len2 < 1e-12 {
        let px = cx - x0;
        let py = cy - y0;
        return px * px + py * py <= QUAD_TOLERANCE * QUAD_TOLERANCE;
    }
    cross * cross <= QUAD_TOLERANCE * QUAD_TOLERANCE * len2
}

/// Flatten a cubic from `(x0, y0)`; same emission contract as
/// [`flatten_quad`].
#[allow(clippy::too_many_arguments)]
pub fn flatten_cubic(
    x0: f64,
    y0: f64,
    c1x: f64,
    c1y: f64,
    c2x: f64,
    c2y: f64,
    x1: f64,
    y1: f64,
    out: &mut impl FnMut(f64, f64),
) {
    cubic_rec(x0, y0, c1x, c1y, c2x, c2y, x1, y1, 0, out);
}

#[allow(clippy::too_many_arguments)]
fn cubic_rec(
    x0: f64,
    y0: f64,
    c1x: f64,
    c1y: f64,
    c2x: f64,
    c2y: f64,
    x1: f64,
    y1: f64,
    depth: u32,
    out: &mut impl FnMut(f64, f64),
) {
    if depth >= MAX_DEPTH || cubic_flat(x0, y0, c1x, c1y, c2x, c2y, x1, y1) {
        out(x1, y1);
        return;
    }
    let ax = (x0 + c1x) * 0.5;
    let ay = (y0 + c1y) * 0.5;
    let bx = (c1x + c2x) * 0.5;
    let by = (c1y + c2y) * 0.5;
    let cx = (c2x + x1) * 0.5;
    let cy = (c2y + y1) * 0.5;
    let abx = (ax + bx) * 0.5;
    let aby = (ay + by) * 0.5;
    let bcx = (bx + cx) * 0.5;
    let bcy = (by + cy) * 0.5;
    let mx = (abx + bcx) * 0.5;
    let my = (aby + bcy) * 0.5;
    cubic_rec(x0, y0, ax, ay, abx, aby, mx, my, depth + 1, out);
    cubic_rec(mx, my, bcx, bcy, cx, cy, x1, y1, depth + 1, out);
}

#[allow(clippy::too_many_arguments)]
fn cubic_flat(x0: f64, y0: f64, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x1: f64, y1: f64) -> bool {
    let dx = x1 - x0;
    let dy = y1 - y0;
    let len2 = dx * dx + dy * dy;
    let tol2 = CUBIC_TOLERANCE * CUBIC_TOLERANCE;
    if len2 < 1e-12 {
        let d1 = (c1x - x0) * (c1x - x0) + (c1y - y0) * (c1y - y0);
        let d2 = (c2x - x0) * (c2x - x0) + (c2y - y0) * (c2y - y0);
        return d1.max(d2) <= tol2;
    }
    // control point distance to the chord, squared
    let cr1 = (c1x - x0) * dy - (c1y - y0) * dx;
    let cr2 = (c2x - x0) * dy - (c2y - y0) * dx;
    let d = cr1.abs().max(cr2.abs());
    d * d <= tol2 * len2
}

/// Convert an SVG endpoint arc into cubic segments of at most a quarter
/// turn, emitted through `out` as `(c1x, c1y, c2x, c2y, x, y)`.
///
/// Returns `false` when the arc is degenerate (zero radius or coincident
/// endpoints); the caller should draw a straight line instead.
#[allow(clippy::too_many_arguments)]
pub fn arc_to_cubics(
    x0: f64,
    y0: f64,
    rx: f64,
    ry: f64,
    rotation: f64,
    large: bool,
    sweep: bool,
    x1: f64,
    y1: f64,
    out: &mut impl FnMut(f64, f64, f64, f64, f64, f64),
) -> bool {
    let mut rx = rx.abs();
    let mut ry = ry.abs();
    if rx < 1e-12 || ry < 1e-12 {
        return false;
    }
    if (x0 - x1).abs() < 1e-12 && (y0 - y1).abs() < 1e-12 {
        return false;
    }

    let (sin_p, cos_p) = rotation.sin_cos();

    // endpoint to center parameterization, SVG style
    let mx = (x0 - x1) * 0.5;
    let my = (y0 - y1) * 0.5;
    let xp = cos_p * mx + sin_p * my;
    let yp = -sin_p * mx + cos_p * my;

    // radii too small to span the endpoints scale up uniformly
    let lambda = (xp * xp) / (rx * rx) + (yp * yp) / (ry * ry);
    if lambda > 1.0 {
        let s = lambda.sqrt();
        rx *= s;
        ry *= s;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let num = rx2 * ry2 - rx2 * yp * yp - ry2 * xp * xp;
    let den = rx2 * yp * yp + ry2 * xp * xp;
    let mut coef = (num / den).max(0.0).sqrt();
    if large == sweep {
        coef = -coef;
    }
    let cxp = coef * rx * yp / ry;
    let cyp = -coef * ry * xp / rx;
    let cx = cos_p * cxp - sin_p * cyp + (x0 + x1) * 0.5;
    let cy = sin_p * cxp + cos_p * cyp + (y0 + y1) * 0.5;

    let theta1 = ((yp - cyp) / ry).atan2((xp - cxp) / rx);
    let theta2 = ((-yp - cyp) / ry).atan2((-xp - cxp) / rx);
    let mut delta = theta2 - theta1;
    if !sweep && delta > 0.0 {
        delta -= 2.0 * std::f64::consts::PI;
    } else if sweep && delta < 0.0 {
        delta += 2.0 * std::f64::consts::PI;
    }

    let segments = (delta.abs() / std::f64::consts::FRAC_PI_2).ceil().max(1.0) as usize;
    let step = delta / segments as f64;
    let k = 4.0 / 3.0 * (step * 0.25).tan();

    let point = |t: f64| -> (f64, f64) {
        let (st, ct) = t.sin_cos();
        (
            cx + cos_p * rx * ct - sin_p * ry * st,
            cy + sin_p * rx * ct + cos_p * ry * st,
        )
    };
    let tangent = |t: f64| -> (f64, f64) {
        let (st, ct) = t.sin_cos();
        (
            -cos_p * rx * st - sin_p * ry * ct,
            -sin_p * rx * st + cos_p * ry * ct,
        )
    };

    let mut t = theta1;
    let (mut px, mut py) = point(t);
    for i in 0..segments {
        let tn = theta1 + step * (i + 1) as f64;
        let (nx, ny) = if i + 1 == segments { (x1, y1) } else { point(tn) };
        let (t1x, t1y) = tangent(t);
        let (t2x, t2y) = tangent(tn);
        out(
            px + k * t1x,
            py + k * t1y,
            nx - k * t2x,
            ny - k * t2y,
            nx,
            ny,
        );
        t = tn;
        px = nx;
        py = ny;
    }
    true
}
