//! Path command storage
//!
//! A [`Path`] is an ordered command list in user space plus a version
//! counter. Every mutation bumps the version; the figure generator keys its
//! memoization on it, so an untouched path never regenerates and a touched
//! one always does.

use std::cell::RefCell;
use std::rc::Rc;

/// One command. Curves carry absolute control points; arcs use the SVG
/// endpoint parameterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo {
        x: f64,
        y: f64,
    },
    LineTo {
        x: f64,
        y: f64,
    },
    QuadTo {
        cx: f64,
        cy: f64,
        x: f64,
        y: f64,
    },
    /// Quadratic whose control point mirrors the previous quadratic's
    /// control point across the current point.
    SmoothQuadTo {
        x: f64,
        y: f64,
    },
    CubicTo {
        c1x: f64,
        c1y: f64,
        c2x: f64,
        c2y: f64,
        x: f64,
        y: f64,
    },
    /// Cubic whose first control point mirrors the previous cubic's second
    /// control point across the current point.
    SmoothCubicTo {
        c2x: f64,
        c2y: f64,
        x: f64,
        y: f64,
    },
    /// Elliptical arc from the current point to `(x, y)`.
    ArcTo {
        rx: f64,
        ry: f64,
        rotation: f64,
        large: bool,
        sweep: bool,
        x: f64,
        y: f64,
    },
    Close,
}

/// Paths are shared between renderers by reference count.
pub type SharedPath = Rc<RefCell<Path>>;

#[derive(Debug, Clone)]
pub struct Path {
    cmds: Vec<PathCommand>,
    version: u64,
}

impl Default for Path {
    fn default() -> Self {
        Path::new()
    }
}

impl Path {
    pub fn new() -> Path {
        Path {
            cmds: Vec::new(),
            version: 1,
        }
    }

    pub fn into_shared(self) -> SharedPath {
        Rc::new(RefCell::new(self))
    }

    /// Monotonically increasing change counter, never zero.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.cmds
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }

    fn push(&mut self, cmd: PathCommand) {
        self.cmds.push(cmd);
        self.version += 1;
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.push(PathCommand::MoveTo { x, y });
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.push(PathCommand::LineTo { x, y });
    }

    pub fn quad_to(&mut self, cx: f64, cy: f64, x: f64, y: f64) {
        self.push(PathCommand::QuadTo { cx, cy, x, y });
    }

    pub fn smooth_quad_to(&mut self, x: f64, y: f64) {
        self.push(PathCommand::SmoothQuadTo { x, y });
    }

    pub fn cubic_to(&mut self, c1x: f64, c1y: f64, c2x: f64, c2y: f64, x: f64, y: f64) {
        self.push(PathCommand::CubicTo {
            c1x,
            c1y,
            c2x,
            c2y,
            x,
            y,
        });
    }

    pub fn smooth_cubic_to(&mut self, c2x: f64, c2y: f64, x: f64, y: f64) {
        self.push(PathCommand::SmoothCubicTo { c2x, c2y, x, y });
    }

    pub fn arc_to(&mut self, rx: f64, ry: f64, rotation: f64, large: bool, sweep: bool, x: f64, y: f64) {
        self.push(PathCommand::ArcTo {
            rx,
            ry,
            rotation,
            large,
            sweep,
            x,
            y,
        });
    }

    pub fn close(&mut self) {
        self.push(PathCommand::Close);
    }

    pub fn clear(&mut self) {
        self.cmds.clear();
        self.version += 1;
    }
}
