//! Scanline rasterizer
//!
//! Figures are scan converted through a cell accumulator: every edge
//! deposits signed cover and area into the pixel cells it crosses, at 8
//! bits of subpixel precision. Sweeping a row walks its cells left to
//! right and turns the running cover into 8 bit antialiased coverage.

use crate::figure::Figure;
use crate::rect::IRect;

pub const SUBPIXEL_SHIFT: i64 = 8;
pub const SUBPIXEL_SCALE: i64 = 1 << SUBPIXEL_SHIFT;
pub const SUBPIXEL_MASK: i64 = SUBPIXEL_SCALE - 1;

/// How the winding number of overlapping geometry turns into coverage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Cell {
    x: i64,
    y: i64,
    cover: i64,
    area: i64,
}

impl Cell {
    fn at(x: i64, y: i64) -> Cell {
        Cell { x, y, cover: 0, area: 0 }
    }
    fn is_empty(&self) -> bool {
        self.cover == 0 && self.area == 0
    }
}

/// Cell accumulator; coordinates come in as 24.8 fixed point.
#[derive(Debug, Default)]
struct Cells {
    cells: Vec<Cell>,
    min_x: i64,
    max_x: i64,
    min_y: i64,
    max_y: i64,
}

impl Cells {
    fn new() -> Cells {
        Cells {
            cells: Vec::new(),
            min_x: i64::MAX,
            max_x: i64::MIN,
            min_y: i64::MAX,
            max_y: i64::MIN,
        }
    }

    fn reset(&mut self) {
        self.cells.clear();
        self.min_x = i64::MAX;
        self.max_x = i64::MIN;
        self.min_y = i64::MAX;
        self.max_y = i64::MIN;
    }

    fn curr(&mut self) -> &mut Cell {
        let n = self.cells.len();
        &mut self.cells[n - 1]
    }

    fn pop_if_empty(&mut self) {
        if self.cells.last().is_some_and(Cell::is_empty) {
            self.cells.pop();
        }
    }

    fn set_curr(&mut self, x: i64, y: i64) {
        let moved = match self.cells.last() {
            None => true,
            Some(c) => c.x != x || c.y != y,
        };
        if moved {
            self.pop_if_empty();
            self.cells.push(Cell::at(x, y));
        }
    }

    /// Accumulate one edge crossing a single pixel row; `y1` and `y2` are
    /// subpixel offsets within the row.
    fn hline(&mut self, ey: i64, x1: i64, y1: i64, x2: i64, y2: i64) {
        let ex1 = x1 >> SUBPIXEL_SHIFT;
        let ex2 = x2 >> SUBPIXEL_SHIFT;
        let fx1 = x1 & SUBPIXEL_MASK;
        let fx2 = x2 & SUBPIXEL_MASK;

        if y1 == y2 {
            self.set_curr(ex2, ey);
            return;
        }

        if ex1 == ex2 {
            let c = self.curr();
            c.cover += y2 - y1;
            c.area += (fx1 + fx2) * (y2 - y1);
            return;
        }

        // the edge spans several cells of this row
        let (p, first, incr, dx) = if x2 - x1 < 0 {
            (fx1 * (y2 - y1), 0, -1, x1 - x2)
        } else {
            ((SUBPIXEL_SCALE - fx1) * (y2 - y1), SUBPIXEL_SCALE, 1, x2 - x1)
        };
        let mut delta = p / dx;
        let mut xmod = p % dx;
        if xmod < 0 {
            delta -= 1;
            xmod += dx;
        }
        {
            let c = self.curr();
            c.cover += delta;
            c.area += (fx1 + first) * delta;
        }

        let mut ex1 = ex1 + incr;
        self.set_curr(ex1, ey);
        let mut y1 = y1 + delta;

        if ex1 != ex2 {
            let p = SUBPIXEL_SCALE * (y2 - y1 + delta);
            let mut lift = p / dx;
            let mut rem = p % dx;
            if rem < 0 {
                lift -= 1;
                rem += dx;
            }
            xmod -= dx;

            while ex1 != ex2 {
                delta = lift;
                xmod += rem;
                if xmod >= 0 {
                    xmod -= dx;
                    delta += 1;
                }
                {
                    let c = self.curr();
                    c.cover += delta;
                    c.area += SUBPIXEL_SCALE * delta;
                }
                y1 += delta;
                ex1 += incr;
                self.set_curr(ex1, ey);
            }
        }
        let delta = y2 - y1;
        let c = self.curr();
        c.cover += delta;
        c.area += (fx2 + SUBPIXEL_SCALE - first) * delta;
    }

    fn line(&mut self, x1: i64, y1: i64, x2: i64, y2: i64) {
        let dx_limit = 16384 << SUBPIXEL_SHIFT;
        let dx = x2 - x1;
        if dx >= dx_limit || dx <= -dx_limit {
            let cx = (x1 + x2) / 2;
            let cy = (y1 + y2) / 2;
            self.line(x1, y1, cx, cy);
            self.line(cx, cy, x2, y2);
            return;
        }
        let dy = y2 - y1;
        let ex1 = x1 >> SUBPIXEL_SHIFT;
        let ex2 = x2 >> SUBPIXEL_SHIFT;
        let ey1 = y1 >> SUBPIXEL_SHIFT;
        let ey2 = y2 >> SUBPIXEL_SHIFT;
        let fy1 = y1 & SUBPIXEL_MASK;
        let fy2 = y2 & SUBPIXEL_MASK;

        self.min_x = self.min_x.min(ex1.min(ex2));
        self.min_y = self.min_y.min(ey1.min(ey2));
        self.max_x = self.max_x.max(ex1.max(ex2));
        self.max_y = self.max_y.max(ey1.max(ey2));

        self.set_curr(ex1, ey1);

        if ey1 == ey2 {
            self.hline(ey1, x1, fy1, x2, fy2);
            self.pop_if_empty();
            return;
        }

        if dx == 0 {
            // vertical edges touch one cell column per row
            let ex = x1 >> SUBPIXEL_SHIFT;
            let two_fx = (x1 - (ex << SUBPIXEL_SHIFT)) << 1;
            let (first, incr) = if dy < 0 { (0, -1) } else { (SUBPIXEL_SCALE, 1) };

            let delta = first - fy1;
            {
                let c = self.curr();
                c.cover += delta;
                c.area += two_fx * delta;
            }
            let mut ey1 = ey1 + incr;
            self.set_curr(ex, ey1);
            let delta = first + first - SUBPIXEL_SCALE;
            let area = two_fx * delta;
            while ey1 != ey2 {
                {
                    let c = self.curr();
                    c.cover = delta;
                    c.area = area;
                }
                ey1 += incr;
                self.set_curr(ex, ey1);
            }
            let delta = fy2 - SUBPIXEL_SCALE + first;
            let c = self.curr();
            c.cover += delta;
            c.area += two_fx * delta;
            return;
        }

        let (p, first, incr, dy) = if dy < 0 {
            (fy1 * dx, 0, -1, -dy)
        } else {
            ((SUBPIXEL_SCALE - fy1) * dx, SUBPIXEL_SCALE, 1, dy)
        };
        let mut delta = p / dy;
        let mut xmod = p % dy;
        if xmod < 0 {
            delta -= 1;
            xmod += dy;
        }
        let mut x_from = x1 + delta;
        self.hline(ey1, x1, fy1, x_from, first);
        let mut ey1 = ey1 + incr;
        self.set_curr(x_from >> SUBPIXEL_SHIFT, ey1);
        if ey1 != ey2 {
            let p = SUBPIXEL_SCALE * dx;
            let mut lift = p / dy;
            let mut rem = p % dy;
            if rem < 0 {
                lift -= 1;
                rem += dy;
            }
            xmod -= dy;
            while ey1 != ey2 {
                delta = lift;
                xmod += rem;
                if xmod >= 0 {
                    xmod -= dy;
                    delta += 1;
                }
                let x_to = x_from + delta;
                self.hline(ey1, x_from, SUBPIXEL_SCALE - first, x_to, first);
                x_from = x_to;
                ey1 += incr;
                self.set_curr(x_from >> SUBPIXEL_SHIFT, ey1);
            }
        }
        self.hline(ey1, x_from, SUBPIXEL_SCALE - first, x2, fy2);
        self.pop_if_empty();
    }
}

const CLIP_LEFT: u8 = 0b0001;
const CLIP_RIGHT: u8 = 0b0010;
const CLIP_BOTTOM: u8 = 0b0100;
const CLIP_TOP: u8 = 0b1000;

fn clip_flags(x: i64, y: i64, b: &ClipBox) -> u8 {
    let mut f = 0;
    if x < b.x1 {
        f |= CLIP_LEFT;
    }
    if x > b.x2 {
        f |= CLIP_RIGHT;
    }
    if y < b.y1 {
        f |= CLIP_BOTTOM;
    }
    if y > b.y2 {
        f |= CLIP_TOP;
    }
    f
}

fn mul_div(a: i64, b: i64, c: i64) -> i64 {
    (a as f64 * b as f64 / c as f64).round() as i64
}

#[derive(Debug, Clone, Copy)]
struct ClipBox {
    x1: i64,
    y1: i64,
    x2: i64,
    y2: i64,
}

/// Liang-Barsky style segment clipper feeding the cell accumulator.
#[derive(Debug, Default)]
struct Clip {
    x1: i64,
    y1: i64,
    clip_box: Option<ClipBox>,
    flag: u8,
}

impl Clip {
    fn set_box(&mut self, x1: i64, y1: i64, x2: i64, y2: i64) {
        self.clip_box = Some(ClipBox { x1, y1, x2, y2 });
    }

    fn move_to(&mut self, x: i64, y: i64) {
        self.x1 = x;
        self.y1 = y;
        if let Some(ref b) = self.clip_box {
            self.flag = clip_flags(x, y, b);
        }
    }

    fn line_clip_y(&self, cells: &mut Cells, x1: i64, y1: i64, x2: i64, y2: i64, f1: u8, f2: u8) {
        let b = match self.clip_box {
            None => return,
            Some(ref b) => b,
        };
        let f1 = f1 & (CLIP_TOP | CLIP_BOTTOM);
        let f2 = f2 & (CLIP_TOP | CLIP_BOTTOM);
        if f1 == 0 && f2 == 0 {
            cells.line(x1, y1, x2, y2);
            return;
        }
        if f1 == f2 {
            // fully above or below
            return;
        }
        let (mut tx1, mut ty1, mut tx2, mut ty2) = (x1, y1, x2, y2);
        if f1 == CLIP_BOTTOM {
            tx1 = x1 + mul_div(b.y1 - y1, x2 - x1, y2 - y1);
            ty1 = b.y1;
        }
        if f1 == CLIP_TOP {
            tx1 = x1 + mul_div(b.y2 - y1, x2 - x1, y2 - y1);
            ty1 = b.y2;
        }
        if f2 == CLIP_BOTTOM {
            tx2 = x1 + mul_div(b.y1 - y1, x2 - x1, y2 - y1);
            ty2 = b.y1;
        }
        if f2 == CLIP_TOP {
            tx2 = x1 + mul_div(b.y2 - y1, x2 - x1, y2 - y1);
            ty2 = b.y2;
        }
        cells.line(tx1, ty1, tx2, ty2);
    }

    fn line_to(&mut self, cells: &mut Cells, x2: i64, y2: i64) {
        if let Some(b) = self.clip_box {
            let f2 = clip_flags(x2, y2, &b);
            let fy1 = (CLIP_TOP | CLIP_BOTTOM) & self.flag;
            let fy2 = (CLIP_TOP | CLIP_BOTTOM) & f2;
            if fy1 != 0 && fy1 == fy2 {
                // entirely above or below the box
                self.x1 = x2;
                self.y1 = y2;
                self.flag = f2;
                return;
            }
            let (x1, y1, f1) = (self.x1, self.y1, self.flag);
            match (f1 & (CLIP_LEFT | CLIP_RIGHT), f2 & (CLIP_LEFT | CLIP_RIGHT)) {
                (0, 0) => self.line_clip_y(cells, x1, y1, x2, y2, f1, f2),
                (0, CLIP_RIGHT) => {
                    let y3 = y1 + mul_div(b.x2 - x1, y2 - y1, x2 - x1);
                    let f3 = clip_flags(b.x2, y3, &b);
                    self.line_clip_y(cells, x1, y1, b.x2, y3, f1, f3);
                    self.line_clip_y(cells, b.x2, y3, b.x2, y2, f3, f2);
                }
                (CLIP_RIGHT, 0) => {
                    let y3 = y1 + mul_div(b.x2 - x1, y2 - y1, x2 - x1);
                    let f3 = clip_flags(b.x2, y3, &b);
                    self.line_clip_y(cells, b.x2, y1, b.x2, y3, f1, f3);
                    self.line_clip_y(cells, b.x2, y3, x2, y2, f3, f2);
                }
                (0, CLIP_LEFT) => {
                    let y3 = y1 + mul_div(b.x1 - x1, y2 - y1, x2 - x1);
                    let f3 = clip_flags(b.x1, y3, &b);
                    self.line_clip_y(cells, x1, y1, b.x1, y3, f1, f3);
                    self.line_clip_y(cells, b.x1, y3, b.x1, y2, f3, f2);
                }
                (CLIP_RIGHT, CLIP_LEFT) => {
                    let y3 = y1 + mul_div(b.x2 - x1, y2 - y1, x2 - x1);
                    let y4 = y1 + mul_div(b.x1 - x1, y2 - y1, x2 - x1);
                    let f3 = clip_flags(b.x2, y3, &b);
                    let f4 = clip_flags(b.x1, y4, &b);
                    self.line_clip_y(cells, b.x2, y1, b.x2, y3, f1, f3);
                    self.line_clip_y(cells, b.x2, y3, b.x1, y4, f3, f4);
                    self.line_clip_y(cells, b.x1, y4, b.x1, y2, f4, f2);
                }
                (CLIP_LEFT, 0) => {
                    let y3 = y1 + mul_div(b.x1 - x1, y2 - y1, x2 - x1);
                    let f3 = clip_flags(b.x1, y3, &b);
                    self.line_clip_y(cells, b.x1, y1, b.x1, y3, f1, f3);
                    self.line_clip_y(cells, b.x1, y3, x2, y2, f3, f2);
                }
                (CLIP_LEFT, CLIP_RIGHT) => {
                    let y3 = y1 + mul_div(b.x1 - x1, y2 - y1, x2 - x1);
                    let y4 = y1 + mul_div(b.x2 - x1, y2 - y1, x2 - x1);
                    let f3 = clip_flags(b.x1, y3, &b);
                    let f4 = clip_flags(b.x2, y4, &b);
                    self.line_clip_y(cells, b.x1, y1, b.x1, y3, f1, f3);
                    self.line_clip_y(cells, b.x1, y3, b.x2, y4, f3, f4);
                    self.line_clip_y(cells, b.x2, y4, b.x2, y2, f4, f2);
                }
                (CLIP_LEFT, CLIP_LEFT) => self.line_clip_y(cells, b.x1, y1, b.x1, y2, f1, f2),
                (CLIP_RIGHT, CLIP_RIGHT) => self.line_clip_y(cells, b.x2, y1, b.x2, y2, f1, f2),
                _ => unreachable!("clip flags {f1:x} {f2:x}"),
            }
            self.flag = f2;
        } else {
            cells.line(self.x1, self.y1, x2, y2);
        }
        self.x1 = x2;
        self.y1 = y2;
    }
}

fn upscale(v: f64) -> i64 {
    (v * SUBPIXEL_SCALE as f64).round() as i64
}

/// Scan converts figures and sweeps out per row coverage.
#[derive(Debug, Default)]
pub struct Rasterizer {
    clip: Clip,
    cells: Cells,
    rows: Vec<Vec<Cell>>,
    row0: i64,
    sorted: bool,
    rule: FillRule,
}

impl Rasterizer {
    pub fn new() -> Rasterizer {
        Rasterizer {
            clip: Clip::default(),
            cells: Cells::new(),
            rows: Vec::new(),
            row0: 0,
            sorted: false,
            rule: FillRule::NonZero,
        }
    }

    pub fn reset(&mut self) {
        self.cells.reset();
        self.rows.clear();
        self.sorted = false;
    }

    pub fn set_rule(&mut self, rule: FillRule) {
        self.rule = rule;
    }

    /// Restrict scan conversion to `area`, in whole pixels.
    pub fn set_clip(&mut self, area: &IRect) {
        self.clip.set_box(
            i64::from(area.x) << SUBPIXEL_SHIFT,
            i64::from(area.y) << SUBPIXEL_SHIFT,
            i64::from(area.right()) << SUBPIXEL_SHIFT,
            i64::from(area.bottom()) << SUBPIXEL_SHIFT,
        );
    }

    /// Scan convert `figure`; open polygons are filled as if closed.
    pub fn add_figure(&mut self, figure: &Figure) {
        debug_assert!(!self.sorted, "add_figure after finish");
        for poly in &figure.polygons {
            if poly.points.len() < 3 {
                continue;
            }
            let first = poly.points[0];
            self.clip.move_to(upscale(first.x), upscale(first.y));
            for p in &poly.points[1..] {
                self.clip.line_to(&mut self.cells, upscale(p.x), upscale(p.y));
            }
            self.clip.line_to(&mut self.cells, upscale(first.x), upscale(first.y));
        }
        self.cells.pop_if_empty();
    }

    /// Sort accumulated cells into rows; `false` when nothing was added.
    pub fn finish(&mut self) -> bool {
        if self.sorted {
            return !self.rows.is_empty();
        }
        self.sorted = true;
        self.cells.pop_if_empty();
        if self.cells.cells.is_empty() {
            return false;
        }
        self.row0 = self.cells.min_y;
        let nrows = (self.cells.max_y - self.cells.min_y + 1) as usize;
        self.rows = vec![Vec::new(); nrows];
        for c in &self.cells.cells {
            self.rows[(c.y - self.row0) as usize].push(*c);
        }
        for row in &mut self.rows {
            row.sort_by_key(|c| c.x);
        }
        true
    }

    /// Pixel bounds touched by the accumulated cells.
    pub fn bounds(&self) -> IRect {
        if self.cells.cells.is_empty() {
            return IRect::empty();
        }
        IRect::new(
            self.cells.min_x as i32,
            self.cells.min_y as i32,
            (self.cells.max_x - self.cells.min_x + 1) as i32,
            (self.cells.max_y - self.cells.min_y + 1) as i32,
        )
    }

    /// Fill `row` with coverage for pixel row `y`, where `row[i]` covers
    /// pixel `x0 + i`. Returns `true` when any pixel got nonzero coverage.
    pub fn sweep_row(&self, y: i32, x0: i32, row: &mut [u8]) -> bool {
        row.fill(0);
        debug_assert!(self.sorted, "sweep_row before finish");
        let iy = i64::from(y) - self.row0;
        if iy < 0 || iy >= self.rows.len() as i64 {
            return false;
        }
        let cells = &self.rows[iy as usize];
        let rule = self.rule;

        let mut any = false;
        let mut put = |xa: i64, xb: i64, a: u8| {
            let lo = (xa - i64::from(x0)).max(0);
            let hi = (xb - i64::from(x0)).min(row.len() as i64);
            if a == 0 || lo >= hi {
                return;
            }
            row[lo as usize..hi as usize].fill(a);
            any = true;
        };

        let mut cover: i64 = 0;
        let mut i = 0;
        while i < cells.len() {
            let x = cells[i].x;
            let mut area = cells[i].area;
            cover += cells[i].cover;
            i += 1;
            while i < cells.len() && cells[i].x == x {
                area += cells[i].area;
                cover += cells[i].cover;
                i += 1;
            }
            let mut sx = x;
            if area != 0 {
                put(x, x + 1, coverage_alpha(rule, (cover << (SUBPIXEL_SHIFT + 1)) - area));
                sx = x + 1;
            }
            if i < cells.len() && cells[i].x > sx {
                put(sx, cells[i].x, coverage_alpha(rule, cover << (SUBPIXEL_SHIFT + 1)));
            }
        }
        any
    }
}

/// Map a scaled cover value to 8 bit coverage under the fill rule.
fn coverage_alpha(rule: FillRule, scaled: i64) -> u8 {
    let mut cover = scaled >> (SUBPIXEL_SHIFT * 2 + 1 - 8);
    cover = cover.abs();
    if rule == FillRule::EvenOdd {
        cover &= 511;
        if cover > 256 {
            cover = 512 - cover;
        }
    }
    cover.min(255) as u8
}
