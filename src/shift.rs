//! Spatial translation as zero-pad followed by a complementary crop.
use crate::AceFloat;
use ndarray::{s, Array4};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A signed 2-D translation in pixels. Positive `dx` moves content right,
/// positive `dy` moves it down; vacated borders are zero-filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shift {
    pub dx: isize,
    pub dy: isize,
}

impl Shift {
    pub const ZERO: Self = Self { dx: 0, dy: 0 };

    pub const fn new(dx: isize, dy: isize) -> Self {
        Self { dx, dy }
    }

    pub const fn inverse(self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
        }
    }

    /// Decomposes the signed offset into the four non-negative pad amounts
    /// `(left, right, up, down)`.
    pub fn pad_amounts(self) -> (usize, usize, usize, usize) {
        let left = self.dx.max(0) as usize;
        let right = (-self.dx).max(0) as usize;
        let up = self.dy.max(0) as usize;
        let down = (-self.dy).max(0) as usize;
        (left, right, up, down)
    }

    /// Translates an `[N, C, H, W]` batch by `(dx, dy)`, preserving shape.
    /// The image is zero-padded by the decomposed amounts, then cropped back
    /// to the original size from the opposite sides, so the crop window is
    /// the complement of the pad.
    pub fn apply(self, x: &Array4<AceFloat>) -> Array4<AceFloat> {
        let (left, right, up, down) = self.pad_amounts();
        if left == 0 && right == 0 && up == 0 && down == 0 {
            return x.clone();
        }
        let (n, c, h, w) = x.dim();
        let mut padded = Array4::zeros((n, c, h + up + down, w + left + right));
        padded
            .slice_mut(s![.., .., up..up + h, left..left + w])
            .assign(x);
        padded
            .slice(s![.., .., down..down + h, right..right + w])
            .to_owned()
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.dx, self.dy)
    }
}
