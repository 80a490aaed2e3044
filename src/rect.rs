//! Axis-aligned rectangles in geometry and pixel space

/// Rectangle with `f64` sides, used for renderer bounds in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }
    /// Zero-sized rectangle at the origin.
    pub fn empty() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
    /// Practically unbounded area; paints that cover any clip report this.
    /// Stays well inside `i32` so `to_outer` keeps working.
    pub fn infinite() -> Self {
        Self::new(-1.0e9, -1.0e9, 2.0e9, 2.0e9)
    }
    /// Smallest rectangle covering both corner points, in any order.
    pub fn from_extrema(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        let (xa, xb) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (ya, yb) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self::new(xa, ya, xb - xa, yb - ya)
    }
    pub fn is_empty(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }
    pub fn right(&self) -> f64 {
        self.x + self.w
    }
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
    /// Grow every side outwards by `m`.
    pub fn expand(&self, m: f64) -> Self {
        Self::new(self.x - m, self.y - m, self.w + 2.0 * m, self.h + 2.0 * m)
    }
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_extrema(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            Rect::empty()
        } else {
            Rect::new(x0, y0, x1 - x0, y1 - y0)
        }
    }
    /// Pixel rectangle covering this one: floor the origin, ceil the far edge.
    pub fn to_outer(&self) -> IRect {
        if self.is_empty() {
            return IRect::empty();
        }
        let x0 = self.x.floor() as i32;
        let y0 = self.y.floor() as i32;
        let x1 = self.right().ceil() as i32;
        let y1 = self.bottom().ceil() as i32;
        IRect::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// Rectangle with integer pixel sides, used for clips and damage areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl IRect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
    pub fn empty() -> Self {
        Self::new(0, 0, 0, 0)
    }
    /// Full extent of a surface of the given size.
    pub fn of_surface(w: usize, h: usize) -> Self {
        Self::new(0, 0, w as i32, h as i32)
    }
    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }
    pub fn right(&self) -> i32 {
        self.x + self.w
    }
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
    pub fn union(&self, other: &IRect) -> IRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x.min(other.x);
        let y0 = self.y.min(other.y);
        let x1 = self.right().max(other.right());
        let y1 = self.bottom().max(other.bottom());
        IRect::new(x0, y0, x1 - x0, y1 - y0)
    }
    pub fn intersection(&self, other: &IRect) -> IRect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            IRect::empty()
        } else {
            IRect::new(x0, y0, x1 - x0, y1 - y0)
        }
    }
}
