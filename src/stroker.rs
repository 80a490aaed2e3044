//! Stroke outline generation
//!
//! Turns flattened polylines into closed outline polygons that fill with
//! the nonzero rule. Open polylines become one outline with caps; closed
//! ones become an outer and a reversed inner ring so the middle drops out.

use crate::figure::{Figure, Point, Polygon};
use std::f64::consts::PI;

/// Line end style for open subpaths.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Cap {
    #[default]
    Butt,
    Round,
    Square,
}

/// Corner style where two segments meet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// One on/off pair of a dash pattern, in device units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dash {
    pub length: f64,
    pub gap: f64,
}

/// Offsets figures by half the stroke weight on each side.
#[derive(Debug, Clone)]
pub struct Stroker {
    half: f64,
    eps: f64,
    miter_limit: f64,
    inner_miter_limit: f64,
    cap: Cap,
    join: Join,
}

impl Stroker {
    pub fn new(width: f64, cap: Cap, join: Join, miter_limit: f64) -> Stroker {
        let half = width.abs() / 2.0;
        Stroker {
            half,
            eps: half / 1024.0,
            miter_limit: miter_limit.max(1.0),
            inner_miter_limit: 1.01,
            cap,
            join,
        }
    }

    /// Build the outline figure for `figure`; the result fills with the
    /// nonzero rule.
    pub fn stroke(&self, figure: &Figure) -> Figure {
        let mut out = Figure::new();
        if self.half <= 0.0 {
            return out;
        }
        for poly in &figure.polygons {
            let v = clean(&poly.points, poly.closed);
            if v.len() < 2 {
                continue;
            }
            if poly.closed && v.len() >= 3 {
                self.stroke_closed(&v, &mut out);
            } else {
                self.stroke_open(&v, &mut out);
            }
        }
        out
    }

    fn stroke_open(&self, v: &[Point], out: &mut Figure) {
        let n = v.len();
        let mut pts = Vec::new();
        self.calc_cap(&mut pts, v[0], v[1]);
        for i in 1..n - 1 {
            self.calc_join(&mut pts, v[i - 1], v[i], v[i + 1]);
        }
        self.calc_cap(&mut pts, v[n - 1], v[n - 2]);
        for i in (1..n - 1).rev() {
            self.calc_join(&mut pts, v[i + 1], v[i], v[i - 1]);
        }
        out.polygons.push(Polygon { points: pts, closed: true });
    }

    fn stroke_closed(&self, v: &[Point], out: &mut Figure) {
        let n = v.len();
        let mut fwd = Vec::new();
        for i in 0..n {
            self.calc_join(&mut fwd, v[(i + n - 1) % n], v[i], v[(i + 1) % n]);
        }
        let mut bwd = Vec::new();
        for i in (0..n).rev() {
            self.calc_join(&mut bwd, v[(i + 1) % n], v[i], v[(i + n - 1) % n]);
        }
        out.polygons.push(Polygon { points: fwd, closed: true });
        out.polygons.push(Polygon { points: bwd, closed: true });
    }

    fn calc_cap(&self, out: &mut Vec<Point>, v0: Point, v1: Point) {
        let dx = v1.x - v0.x;
        let dy = v1.y - v0.y;
        let len = (dx * dx + dy * dy).sqrt();
        let dx1 = self.half * dy / len;
        let dy1 = self.half * dx / len;

        match self.cap {
            Cap::Butt => {
                out.push(Point::new(v0.x - dx1, v0.y + dy1));
                out.push(Point::new(v0.x + dx1, v0.y - dy1));
            }
            Cap::Square => {
                out.push(Point::new(v0.x - dx1 - dy1, v0.y + dy1 - dx1));
                out.push(Point::new(v0.x + dx1 - dy1, v0.y - dy1 - dx1));
            }
            Cap::Round => {
                let da = 2.0 * (self.half / (self.half + 0.125)).acos();
                let n = (PI / da).round() as usize;
                let da = PI / (n + 1) as f64;
                out.push(Point::new(v0.x - dx1, v0.y + dy1));
                let mut a1 = dy1.atan2(-dx1) + da;
                for _ in 0..n {
                    out.push(Point::new(
                        v0.x + a1.cos() * self.half,
                        v0.y + a1.sin() * self.half,
                    ));
                    a1 += da;
                }
                out.push(Point::new(v0.x + dx1, v0.y - dy1));
            }
        }
    }

    fn calc_arc(&self, out: &mut Vec<Point>, x: f64, y: f64, dx1: f64, dy1: f64, dx2: f64, dy2: f64) {
        let a1 = dy1.atan2(dx1);
        let mut a2 = dy2.atan2(dx2);
        if a1 > a2 {
            a2 += 2.0 * PI;
        }
        let mut da = 2.0 * (self.half / (self.half + 0.125)).acos();
        out.push(Point::new(x + dx1, y + dy1));
        let n = ((a2 - a1) / da) as i64;
        da = (a2 - a1) / (n + 1) as f64;
        let mut a = a1 + da;
        for _ in 0..n {
            out.push(Point::new(x + a.cos() * self.half, y + a.sin() * self.half));
            a += da;
        }
        out.push(Point::new(x + dx2, y + dy2));
    }

    #[allow(clippy::too_many_arguments)]
    fn calc_miter(
        &self,
        out: &mut Vec<Point>,
        p0: Point,
        p1: Point,
        p2: Point,
        dx1: f64,
        dy1: f64,
        dx2: f64,
        dy2: f64,
        round_fallback: bool,
        mlimit: f64,
    ) {
        let lim = self.half * mlimit;
        let mut exceeded = true;
        if let Some((xi, yi)) = intersect(
            p0.x + dx1,
            p0.y - dy1,
            p1.x + dx1,
            p1.y - dy1,
            p1.x + dx2,
            p1.y - dy2,
            p2.x + dx2,
            p2.y - dy2,
        ) {
            if p1.distance(Point::new(xi, yi)) <= lim {
                out.push(Point::new(xi, yi));
                exceeded = false;
            }
        } else {
            // parallel offsets: the segments continue straight or double
            // back; only the straight case takes a single point
            let z = Point::new(p1.x + dx1, p1.y - dy1);
            if (cross3(p0, p1, z) < 0.0) == (cross3(p1, p2, z) < 0.0) {
                out.push(z);
                exceeded = false;
            }
        }
        if exceeded {
            if round_fallback {
                self.calc_arc(out, p1.x, p1.y, dx1, -dy1, dx2, -dy2);
            } else {
                out.push(Point::new(p1.x + dx1, p1.y - dy1));
                out.push(Point::new(p1.x + dx2, p1.y - dy2));
            }
        }
    }

    fn calc_join(&self, out: &mut Vec<Point>, p0: Point, p1: Point, p2: Point) {
        let len1 = p1.distance(p0);
        let len2 = p2.distance(p1);
        debug_assert!(len1 > 0.0 && len2 > 0.0, "stroker fed repeated points");

        let dx1 = self.half * (p1.y - p0.y) / len1;
        let dy1 = self.half * (p1.x - p0.x) / len1;
        let dx2 = self.half * (p2.y - p1.y) / len2;
        let dy2 = self.half * (p2.x - p1.x) / len2;
        let cp = cross3(p0, p1, p2);

        if cp > 0.0 {
            // inner side of the turn
            let limit = (len1.min(len2) / self.half).max(self.inner_miter_limit);
            self.calc_miter(out, p0, p1, p2, dx1, dy1, dx2, dy2, false, limit);
        } else {
            let dx = (dx1 + dx2) / 2.0;
            let dy = (dy1 + dy2) / 2.0;
            let dbevel = (dx * dx + dy * dy).sqrt();
            if self.join != Join::Miter && self.half - dbevel < self.eps {
                // nearly collinear, a single intersection point is
                // indistinguishable from the bevel pair
                if let Some((xi, yi)) = intersect(
                    p0.x + dx1,
                    p0.y - dy1,
                    p1.x + dx1,
                    p1.y - dy1,
                    p1.x + dx2,
                    p1.y - dy2,
                    p2.x + dx2,
                    p2.y - dy2,
                ) {
                    out.push(Point::new(xi, yi));
                } else {
                    out.push(Point::new(p1.x + dx1, p1.y - dy1));
                }
                return;
            }
            match self.join {
                Join::Miter => {
                    self.calc_miter(out, p0, p1, p2, dx1, dy1, dx2, dy2, false, self.miter_limit);
                }
                Join::Round => self.calc_arc(out, p1.x, p1.y, dx1, -dy1, dx2, -dy2),
                Join::Bevel => {
                    out.push(Point::new(p1.x + dx1, p1.y - dy1));
                    out.push(Point::new(p1.x + dx2, p1.y - dy2));
                }
            }
        }
    }
}

/// Split a figure along a dash pattern into open runs. Pattern entries
/// with nonpositive total length leave the figure untouched.
pub fn apply_dashes(figure: &Figure, dashes: &[Dash]) -> Figure {
    let total: f64 = dashes.iter().map(|d| d.length.max(0.0) + d.gap.max(0.0)).sum();
    if dashes.is_empty() || total <= 0.0 {
        return figure.clone();
    }
    let phases: Vec<f64> = dashes
        .iter()
        .flat_map(|d| [d.length.max(0.0), d.gap.max(0.0)])
        .collect();

    let mut out = Figure::new();
    for poly in &figure.polygons {
        if poly.points.len() < 2 {
            continue;
        }
        let mut pts = poly.points.clone();
        if poly.closed {
            pts.push(poly.points[0]);
        }

        let mut pi = 0;
        let mut rem = phases[0];
        let mut run: Vec<Point> = Vec::new();
        for w in pts.windows(2) {
            let (a, b) = (w[0], w[1]);
            let len = a.distance(b);
            if len <= 1e-12 {
                continue;
            }
            let mut done = 0.0;
            while len - done > 1e-12 {
                let take = (len - done).min(rem);
                let t0 = done / len;
                let t1 = (done + take) / len;
                if pi % 2 == 0 {
                    if run.is_empty() {
                        run.push(lerp(a, b, t0));
                    }
                    run.push(lerp(a, b, t1));
                }
                done += take;
                rem -= take;
                while rem <= 1e-12 {
                    if pi % 2 == 0 && run.len() >= 2 {
                        out.polygons.push(Polygon {
                            points: std::mem::take(&mut run),
                            closed: false,
                        });
                    }
                    run.clear();
                    pi = (pi + 1) % phases.len();
                    rem = phases[pi];
                }
            }
        }
        if run.len() >= 2 {
            out.polygons.push(Polygon { points: run, closed: false });
        }
    }
    out
}

fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

fn intersect(
    ax: f64,
    ay: f64,
    bx: f64,
    by: f64,
    cx: f64,
    cy: f64,
    dx: f64,
    dy: f64,
) -> Option<(f64, f64)> {
    let num = (ay - cy) * (dx - cx) - (ax - cx) * (dy - cy);
    let den = (bx - ax) * (dy - cy) - (by - ay) * (dx - cx);
    if den.abs() < 1.0e-30 {
        return None;
    }
    let r = num / den;
    Some((ax + r * (bx - ax), ay + r * (by - ay)))
}

fn cross3(a: Point, b: Point, c: Point) -> f64 {
    (c.x - b.x) * (b.y - a.y) - (c.y - b.y) * (b.x - a.x)
}

/// Drop repeated points, and for closed polylines the trailing points that
/// land back on the first one.
fn clean(points: &[Point], closed: bool) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().map_or(true, |q| q.distance(p) >= 1e-6) {
            out.push(p);
        }
    }
    if closed {
        while out.len() > 1 && out[0].distance(out[out.len() - 1]) < 1e-6 {
            out.pop();
        }
    }
    out
}
