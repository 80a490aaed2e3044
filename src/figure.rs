//! Flattened geometry
//!
//! A figure is the device-space polygon set produced from a path by the
//! generator. Rasterization and stroking both walk figures, never the
//! source path.

use crate::rect::Rect;

/// A point in device space.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }
    pub fn distance(&self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One polyline, closed or open.
#[derive(Debug, Default, Clone)]
pub struct Polygon {
    pub points: Vec<Point>,
    pub closed: bool,
}

impl Polygon {
    pub fn new() -> Polygon {
        Polygon::default()
    }

    pub fn push(&mut self, x: f64, y: f64) {
        self.points.push(Point::new(x, y));
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_empty(&self) -> bool {
        self.points.len() < 2
    }

    /// Twice the signed area; positive when the points wind clockwise in a
    /// y-down device space.
    pub fn signed_area2(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        sum
    }
}

/// A set of polygons forming one shape outline.
#[derive(Debug, Default, Clone)]
pub struct Figure {
    pub polygons: Vec<Polygon>,
}

impl Figure {
    pub fn new() -> Figure {
        Figure::default()
    }

    pub fn clear(&mut self) {
        self.polygons.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.iter().all(|p| p.is_empty())
    }

    /// Start a new polygon and return it for point insertion.
    pub fn begin(&mut self) -> &mut Polygon {
        self.polygons.push(Polygon::new());
        self.polygons.last_mut().unwrap()
    }

    /// Tight bounds over every polygon, empty when there are no points.
    pub fn bounds(&self) -> Rect {
        let mut x0 = f64::INFINITY;
        let mut y0 = f64::INFINITY;
        let mut x1 = f64::NEG_INFINITY;
        let mut y1 = f64::NEG_INFINITY;
        for poly in &self.polygons {
            for p in &poly.points {
                x0 = x0.min(p.x);
                y0 = y0.min(p.y);
                x1 = x1.max(p.x);
                y1 = y1.max(p.y);
            }
        }
        if x0 > x1 {
            return Rect::empty();
        }
        Rect::from_extrema(x0, y0, x1, y1)
    }

    /// Winding number of `(x, y)` over every polygon, treating open ones as
    /// closed. Nonzero means inside for the nonzero rule; odd means inside
    /// for even-odd.
    pub fn winding(&self, x: f64, y: f64) -> i32 {
        let mut w = 0;
        for poly in &self.polygons {
            let n = poly.points.len();
            if n < 3 {
                continue;
            }
            for i in 0..n {
                let a = poly.points[i];
                let b = poly.points[(i + 1) % n];
                if a.y <= y {
                    if b.y > y && cross(a, b, x, y) > 0.0 {
                        w += 1;
                    }
                } else if b.y <= y && cross(a, b, x, y) < 0.0 {
                    w -= 1;
                }
            }
        }
        w
    }
}

fn cross(a: Point, b: Point, x: f64, y: f64) -> f64 {
    (b.x - a.x) * (y - a.y) - (x - a.x) * (b.y - a.y)
}
