//! Scale/bias UV transforms between tile extents.

use super::Extent;

/// Affine transform mapping normalized [0,1] UV coordinates in one tile
/// into the UV range of an ancestor tile: `u' = u * scale + bias`.
///
/// `v` runs south to north, matching the extent math: `v = 0` is the
/// extent's `ymin` edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBias {
    pub scale: [f64; 2],
    pub bias: [f64; 2],
}

impl ScaleBias {
    /// The identity transform.
    pub const IDENTITY: ScaleBias = ScaleBias {
        scale: [1.0, 1.0],
        bias: [0.0, 0.0],
    };

    /// Derives the transform mapping `child` UV space into `ancestor`
    /// UV space from the two geographic extents.
    ///
    /// When `child` lies inside `ancestor`, scale is in (0, 1] and the
    /// bias is the normalized offset of the child's origin within the
    /// ancestor.
    pub fn between(child: &Extent, ancestor: &Extent) -> ScaleBias {
        ScaleBias {
            scale: [
                child.width() / ancestor.width(),
                child.height() / ancestor.height(),
            ],
            bias: [
                (child.xmin - ancestor.xmin) / ancestor.width(),
                (child.ymin - ancestor.ymin) / ancestor.height(),
            ],
        }
    }

    /// Applies the transform to a UV pair.
    #[inline]
    pub fn apply(&self, u: f64, v: f64) -> (f64, f64) {
        (
            u * self.scale[0] + self.bias[0],
            v * self.scale[1] + self.bias[1],
        )
    }

    /// Composes two transforms: the result applies `self` first, then
    /// `next`.
    ///
    /// Multi-level fallback accumulates one parent-relative transform
    /// per hop through this method rather than re-deriving from the
    /// final extents, so a corner UV maps into the exact sub-rectangle
    /// of whichever ancestor supplied data.
    pub fn post_mul(&self, next: &ScaleBias) -> ScaleBias {
        ScaleBias {
            scale: [
                self.scale[0] * next.scale[0],
                self.scale[1] * next.scale[1],
            ],
            bias: [
                self.bias[0] * next.scale[0] + next.bias[0],
                self.bias[1] * next.scale[1] + next.bias[1],
            ],
        }
    }

    /// Returns true if this is the identity transform.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for ScaleBias {
    fn default() -> Self {
        Self::IDENTITY
    }
}
