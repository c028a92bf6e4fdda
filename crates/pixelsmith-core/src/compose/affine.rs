//! Ordered affine steps, composed the way a 2D canvas context composes them.
//!
//! Each step post-multiplies the current transform, so for the sequence
//! `[Translate, Rotate, Scale]` a drawn point `p` lands at `T · R · S · p`:
//! the mirror is applied in the image's own frame first, then the rotation,
//! then the translation. Swapping `Rotate` and `Scale` mirrors across the
//! rotated axes instead, which is a visibly different image for any angle
//! that is not a multiple of 180 degrees.

/// One step of a drawing transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AffineStep {
    /// Move the origin by `(dx, dy)`.
    Translate(f64, f64),
    /// Rotate by an angle in radians (positive = clockwise, y down).
    Rotate(f64),
    /// Scale the axes; `-1.0` mirrors.
    Scale(f64, f64),
}

/// A 2D affine transform `(x, y) -> (a*x + c*y + e, b*x + d*y + f)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Compose `steps` in order.
    pub fn from_steps(steps: &[AffineStep]) -> Affine {
        steps
            .iter()
            .fold(Affine::IDENTITY, |acc, step| acc.then(*step))
    }

    /// Append a step, as `ctx.translate/rotate/scale` would.
    pub fn then(self, step: AffineStep) -> Affine {
        self.multiply(&Affine::from(step))
    }

    /// Map a point through the transform.
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// The inverse transform, or `None` if the transform is singular.
    pub fn inverse(&self) -> Option<Affine> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < f64::EPSILON {
            return None;
        }
        Some(Affine {
            a: self.d / det,
            b: -self.b / det,
            c: -self.c / det,
            d: self.a / det,
            e: (self.c * self.f - self.d * self.e) / det,
            f: (self.b * self.e - self.a * self.f) / det,
        })
    }

    fn multiply(&self, n: &Affine) -> Affine {
        Affine {
            a: self.a * n.a + self.c * n.b,
            b: self.b * n.a + self.d * n.b,
            c: self.a * n.c + self.c * n.d,
            d: self.b * n.c + self.d * n.d,
            e: self.a * n.e + self.c * n.f + self.e,
            f: self.b * n.e + self.d * n.f + self.f,
        }
    }
}

impl From<AffineStep> for Affine {
    fn from(step: AffineStep) -> Self {
        match step {
            AffineStep::Translate(dx, dy) => Affine {
                e: dx,
                f: dy,
                ..Affine::IDENTITY
            },
            AffineStep::Rotate(radians) => {
                // Exact values for quarter turns keep lossless rotations lossless
                let sin = crate::geometry::snap(radians.sin());
                let cos = crate::geometry::snap(radians.cos());
                Affine {
                    a: cos,
                    b: sin,
                    c: -sin,
                    d: cos,
                    e: 0.0,
                    f: 0.0,
                }
            }
            AffineStep::Scale(sx, sy) => Affine {
                a: sx,
                d: sy,
                ..Affine::IDENTITY
            },
        }
    }
}
