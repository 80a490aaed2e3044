//! Path to figure generation.
//!
//! A [`Generator`] turns a command list into flattened device-space figures
//! and remembers what it produced. The memo key covers the path version, the
//! full transform and the stroke parameters; while none of them move, a
//! second call is a no-op and the cached figures stay where they are.
//!
//! Control points are mapped through the transform first and the curves are
//! flattened in device space, so the flatness tolerance is a device-pixel
//! quantity and zooming in never exposes segment edges.

use smallvec::SmallVec;

use crate::curve::{arc_to_cubics, flatten_cubic, flatten_quad};
use crate::figure::{Figure, Polygon};
use crate::matrix::Matrix;
use crate::path::{Path, PathCommand};
use crate::stroker::{apply_dashes, Cap, Dash, Join, Stroker};

/// Everything that shapes a stroke outline.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeParams {
    pub weight: f64,
    pub cap: Cap,
    pub join: Join,
    pub miter_limit: f64,
    pub dashes: SmallVec<[Dash; 4]>,
}

impl Default for StrokeParams {
    fn default() -> Self {
        StrokeParams {
            weight: 1.0,
            cap: Cap::default(),
            join: Join::default(),
            miter_limit: 4.0,
            dashes: SmallVec::new(),
        }
    }
}

#[derive(Clone, PartialEq)]
struct MemoKey {
    version: u64,
    matrix: Matrix,
    stroke: Option<StrokeParams>,
}

/// Cached figure producer for one renderer.
#[derive(Default)]
pub struct Generator {
    memo: Option<MemoKey>,
    base: Figure,
    stroke: Figure,
    stroke_coverage: u8,
}

impl Generator {
    pub fn new() -> Generator {
        Generator::default()
    }

    /// The flattened path itself. Fills rasterize this directly.
    pub fn base(&self) -> &Figure {
        &self.base
    }

    /// The stroke outline, empty unless the last generation asked for one.
    pub fn stroke(&self) -> &Figure {
        &self.stroke
    }

    /// Coverage scale for the stroke. 255 for full-width strokes; weights
    /// under one device pixel render at unit width with coverage scaled
    /// down instead, which keeps thin strokes visible and antialiased.
    pub fn stroke_coverage(&self) -> u8 {
        self.stroke_coverage
    }

    /// Drop the memo so the next call regenerates unconditionally.
    pub fn invalidate(&mut self) {
        self.memo = None;
    }

    /// Regenerate the figures if the inputs moved since the last call.
    /// Returns whether anything was rebuilt.
    pub fn generate(&mut self, path: &Path, matrix: &Matrix, stroke: Option<&StrokeParams>) -> bool {
        let key = MemoKey {
            version: path.version(),
            matrix: *matrix,
            stroke: stroke.cloned(),
        };
        if self.memo.as_ref() == Some(&key) {
            return false;
        }

        self.base.clear();
        flatten_path(path, matrix, &mut self.base);

        self.stroke.clear();
        self.stroke_coverage = 0;
        if let Some(params) = stroke {
            if params.weight > 0.0 {
                let width = params.weight.max(1.0);
                self.stroke_coverage = if params.weight < 1.0 {
                    ((params.weight * 255.0).round() as u8).max(1)
                } else {
                    255
                };
                let stroker = Stroker::new(width, params.cap, params.join, params.miter_limit);
                self.stroke = if params.dashes.is_empty() {
                    stroker.stroke(&self.base)
                } else {
                    stroker.stroke(&apply_dashes(&self.base, &params.dashes))
                };
            }
        }

        self.memo = Some(key);
        true
    }
}

/// Flatten every command into device-space polygons.
///
/// Smooth curve variants reflect the previous control point across the
/// current point; after any other command the reflection collapses onto the
/// current point, matching the SVG rules. Arcs are converted to cubics in
/// user space so their radii and rotation survive the transform, then the
/// cubics are mapped and flattened like any others.
fn flatten_path(path: &Path, matrix: &Matrix, out: &mut Figure) {
    let mut poly = Polygon::new();
    // Current point in both spaces. Arcs need the user-space one.
    let mut cur_user = (0.0f64, 0.0f64);
    let mut cur_dev = matrix.transform(0.0, 0.0);
    let mut start_user = cur_user;
    let mut start_dev = cur_dev;
    // Reflection anchors for the smooth variants, in user space.
    let mut quad_ctrl: Option<(f64, f64)> = None;
    let mut cubic_ctrl: Option<(f64, f64)> = None;

    for cmd in path.commands() {
        match *cmd {
            PathCommand::MoveTo { x, y } => {
                flush(out, &mut poly);
                cur_user = (x, y);
                cur_dev = matrix.transform(x, y);
                start_user = cur_user;
                start_dev = cur_dev;
                poly.push(cur_dev.0, cur_dev.1);
            }
            PathCommand::LineTo { x, y } => {
                open_at(&mut poly, cur_dev);
                cur_user = (x, y);
                cur_dev = matrix.transform(x, y);
                poly.push(cur_dev.0, cur_dev.1);
            }
            PathCommand::QuadTo { cx, cy, x, y } => {
                open_at(&mut poly, cur_dev);
                let c = matrix.transform(cx, cy);
                let p = matrix.transform(x, y);
                let mut emit = |px: f64, py: f64| poly.push(px, py);
                flatten_quad(cur_dev.0, cur_dev.1, c.0, c.1, p.0, p.1, &mut emit);
                quad_ctrl = Some((cx, cy));
                cur_user = (x, y);
                cur_dev = p;
            }
            PathCommand::SmoothQuadTo { x, y } => {
                open_at(&mut poly, cur_dev);
                let (cx, cy) = reflect(quad_ctrl, cur_user);
                let c = matrix.transform(cx, cy);
                let p = matrix.transform(x, y);
                let mut emit = |px: f64, py: f64| poly.push(px, py);
                flatten_quad(cur_dev.0, cur_dev.1, c.0, c.1, p.0, p.1, &mut emit);
                quad_ctrl = Some((cx, cy));
                cur_user = (x, y);
                cur_dev = p;
            }
            PathCommand::CubicTo {
                c1x,
                c1y,
                c2x,
                c2y,
                x,
                y,
            } => {
                open_at(&mut poly, cur_dev);
                cur_dev = push_cubic(&mut poly, matrix, cur_dev, (c1x, c1y), (c2x, c2y), (x, y));
                cubic_ctrl = Some((c2x, c2y));
                cur_user = (x, y);
            }
            PathCommand::SmoothCubicTo { c2x, c2y, x, y } => {
                open_at(&mut poly, cur_dev);
                let c1 = reflect(cubic_ctrl, cur_user);
                cur_dev = push_cubic(&mut poly, matrix, cur_dev, c1, (c2x, c2y), (x, y));
                cubic_ctrl = Some((c2x, c2y));
                cur_user = (x, y);
            }
            PathCommand::ArcTo {
                rx,
                ry,
                rotation,
                large,
                sweep,
                x,
                y,
            } => {
                open_at(&mut poly, cur_dev);
                let mut dev = cur_dev;
                let mut emit = |c1x: f64, c1y: f64, c2x: f64, c2y: f64, ex: f64, ey: f64| {
                    dev = push_cubic(&mut poly, matrix, dev, (c1x, c1y), (c2x, c2y), (ex, ey));
                };
                let drawn = arc_to_cubics(
                    cur_user.0, cur_user.1, rx, ry, rotation, large, sweep, x, y, &mut emit,
                );
                cur_dev = if drawn {
                    dev
                } else {
                    // Degenerate radii collapse the arc to a line.
                    let p = matrix.transform(x, y);
                    poly.push(p.0, p.1);
                    p
                };
                cur_user = (x, y);
            }
            PathCommand::Close => {
                poly.close();
                flush(out, &mut poly);
                cur_user = start_user;
                cur_dev = start_dev;
            }
        }
        if !matches!(cmd, PathCommand::QuadTo { .. } | PathCommand::SmoothQuadTo { .. }) {
            quad_ctrl = None;
        }
        if !matches!(cmd, PathCommand::CubicTo { .. } | PathCommand::SmoothCubicTo { .. }) {
            cubic_ctrl = None;
        }
    }
    flush(out, &mut poly);
}

fn push_cubic(
    poly: &mut Polygon,
    matrix: &Matrix,
    from_dev: (f64, f64),
    c1: (f64, f64),
    c2: (f64, f64),
    to: (f64, f64),
) -> (f64, f64) {
    let c1 = matrix.transform(c1.0, c1.1);
    let c2 = matrix.transform(c2.0, c2.1);
    let p = matrix.transform(to.0, to.1);
    let mut emit = |px: f64, py: f64| poly.push(px, py);
    flatten_cubic(
        from_dev.0, from_dev.1, c1.0, c1.1, c2.0, c2.1, p.0, p.1, &mut emit,
    );
    p
}

fn reflect(ctrl: Option<(f64, f64)>, cur: (f64, f64)) -> (f64, f64) {
    match ctrl {
        Some((cx, cy)) => (2.0 * cur.0 - cx, 2.0 * cur.1 - cy),
        None => cur,
    }
}

/// A drawing command on an implicitly started subpath begins at the
/// current point.
fn open_at(poly: &mut Polygon, dev: (f64, f64)) {
    if poly.points.is_empty() {
        poly.push(dev.0, dev.1);
    }
}

fn flush(out: &mut Figure, poly: &mut Polygon) {
    if !poly.is_empty() {
        out.polygons.push(std::mem::take(poly));
    } else {
        poly.points.clear();
        poly.closed = false;
    }
}
