//! 3x3 transformation matrices
//!
//! Row-major, applied to column vectors: `p' = M * (x, y, 1)`. The bottom
//! row distinguishes affine matrices from projective ones; most of the
//! engine only ever sees the affine case and the samplers pick a cheaper
//! stepping strategy from [`MatrixKind`].

const EPS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixKind {
    Identity,
    Affine,
    Projective,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub xx: f64,
    pub xy: f64,
    pub xz: f64,
    pub yx: f64,
    pub yy: f64,
    pub yz: f64,
    pub zx: f64,
    pub zy: f64,
    pub zz: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::identity()
    }
}

impl Matrix {
    pub fn identity() -> Self {
        Matrix {
            xx: 1.0, xy: 0.0, xz: 0.0,
            yx: 0.0, yy: 1.0, yz: 0.0,
            zx: 0.0, zy: 0.0, zz: 1.0,
        }
    }

    /// Affine matrix from the six free coefficients.
    pub fn affine(xx: f64, xy: f64, xz: f64, yx: f64, yy: f64, yz: f64) -> Self {
        Matrix {
            xx, xy, xz,
            yx, yy, yz,
            zx: 0.0, zy: 0.0, zz: 1.0,
        }
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Matrix::affine(1.0, 0.0, tx, 0.0, 1.0, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Matrix::affine(sx, 0.0, 0.0, 0.0, sy, 0.0)
    }

    /// Rotation by `rad` radians, counterclockwise in the y-down raster
    /// convention.
    pub fn rotate(rad: f64) -> Self {
        let (s, c) = rad.sin_cos();
        Matrix::affine(c, -s, 0.0, s, c, 0.0)
    }

    pub fn kind(&self) -> MatrixKind {
        if self.zx.abs() > EPS || self.zy.abs() > EPS || (self.zz - 1.0).abs() > EPS {
            return MatrixKind::Projective;
        }
        if (self.xx - 1.0).abs() > EPS
            || self.xy.abs() > EPS
            || self.xz.abs() > EPS
            || self.yx.abs() > EPS
            || (self.yy - 1.0).abs() > EPS
            || self.yz.abs() > EPS
        {
            return MatrixKind::Affine;
        }
        MatrixKind::Identity
    }

    pub fn is_identity(&self) -> bool {
        self.kind() == MatrixKind::Identity
    }

    /// `self * other`: `other` is applied first.
    pub fn compose(&self, other: &Matrix) -> Matrix {
        let a = self;
        let b = other;
        Matrix {
            xx: a.xx * b.xx + a.xy * b.yx + a.xz * b.zx,
            xy: a.xx * b.xy + a.xy * b.yy + a.xz * b.zy,
            xz: a.xx * b.xz + a.xy * b.yz + a.xz * b.zz,
            yx: a.yx * b.xx + a.yy * b.yx + a.yz * b.zx,
            yy: a.yx * b.xy + a.yy * b.yy + a.yz * b.zy,
            yz: a.yx * b.xz + a.yy * b.yz + a.yz * b.zz,
            zx: a.zx * b.xx + a.zy * b.yx + a.zz * b.zx,
            zy: a.zx * b.xy + a.zy * b.yy + a.zz * b.zy,
            zz: a.zx * b.xz + a.zy * b.yz + a.zz * b.zz,
        }
    }

    pub fn determinant(&self) -> f64 {
        self.xx * (self.yy * self.zz - self.yz * self.zy)
            - self.xy * (self.yx * self.zz - self.yz * self.zx)
            + self.xz * (self.yx * self.zy - self.yy * self.zx)
    }

    /// Inverse by the adjugate. `None` when singular.
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det.abs() < EPS {
            return None;
        }
        let inv = 1.0 / det;
        Some(Matrix {
            xx: (self.yy * self.zz - self.yz * self.zy) * inv,
            xy: (self.xz * self.zy - self.xy * self.zz) * inv,
            xz: (self.xy * self.yz - self.xz * self.yy) * inv,
            yx: (self.yz * self.zx - self.yx * self.zz) * inv,
            yy: (self.xx * self.zz - self.xz * self.zx) * inv,
            yz: (self.xz * self.yx - self.xx * self.yz) * inv,
            zx: (self.yx * self.zy - self.yy * self.zx) * inv,
            zy: (self.xy * self.zx - self.xx * self.zy) * inv,
            zz: (self.xx * self.yy - self.xy * self.yx) * inv,
        })
    }

    /// Axis-aligned box covering the transformed rectangle corners.
    pub fn map_rect(&self, r: &crate::rect::Rect) -> crate::rect::Rect {
        if self.is_identity() {
            return *r;
        }
        let corners = [
            self.transform(r.x, r.y),
            self.transform(r.right(), r.y),
            self.transform(r.right(), r.bottom()),
            self.transform(r.x, r.bottom()),
        ];
        let mut x0 = f64::INFINITY;
        let mut y0 = f64::INFINITY;
        let mut x1 = f64::NEG_INFINITY;
        let mut y1 = f64::NEG_INFINITY;
        for &(x, y) in &corners {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        crate::rect::Rect::from_extrema(x0, y0, x1, y1)
    }

    /// Transform a point, dividing through by the homogeneous coordinate.
    /// A vanishing `z` is clamped away from zero instead of dividing by it.
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        let tx = self.xx * x + self.xy * y + self.xz;
        let ty = self.yx * x + self.yy * y + self.yz;
        let mut tz = self.zx * x + self.zy * y + self.zz;
        if (tz - 1.0).abs() < EPS {
            return (tx, ty);
        }
        if tz.abs() < EPS {
            tz = if tz < 0.0 { -EPS } else { EPS };
        }
        (tx / tz, ty / tz)
    }
}

impl std::ops::Mul for Matrix {
    type Output = Matrix;
    fn mul(self, rhs: Matrix) -> Matrix {
        self.compose(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_detection() {
        assert_eq!(Matrix::identity().kind(), MatrixKind::Identity);
        assert_eq!(Matrix::translate(3.0, -1.0).kind(), MatrixKind::Affine);
        assert_eq!(Matrix::rotate(0.3).kind(), MatrixKind::Affine);
        let mut m = Matrix::identity();
        m.zx = 0.001;
        assert_eq!(m.kind(), MatrixKind::Projective);
    }

    #[test]
    fn invert_round_trip() {
        let m = Matrix::translate(10.0, -4.0) * Matrix::rotate(0.7) * Matrix::scale(2.0, 0.5);
        let inv = m.invert().unwrap();
        let id = m * inv;
        assert!((id.xx - 1.0).abs() < 1e-9);
        assert!((id.yy - 1.0).abs() < 1e-9);
        assert!(id.xy.abs() < 1e-9 && id.yx.abs() < 1e-9);
        assert!(id.xz.abs() < 1e-9 && id.yz.abs() < 1e-9);
    }

    #[test]
    fn singular_has_no_inverse() {
        let m = Matrix::scale(0.0, 1.0);
        assert!(m.invert().is_none());
    }

    #[test]
    fn transform_applies_translation_last() {
        let m = Matrix::translate(5.0, 0.0) * Matrix::scale(2.0, 2.0);
        assert_eq!(m.transform(1.0, 1.0), (7.0, 2.0));
    }

    #[test]
    fn projective_divides_by_z() {
        let mut m = Matrix::identity();
        m.zy = 1.0; // z = y + 1
        let (x, y) = m.transform(4.0, 1.0);
        assert!((x - 2.0).abs() < 1e-12);
        assert!((y - 0.5).abs() < 1e-12);
    }
}
