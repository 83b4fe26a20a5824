//! Geometric primitives for image extents and 2D transformations.

use bytemuck::{Pod, Zeroable};
use glam::{Affine2, Vec2 as GlamVec2};
use serde::{Deserialize, Serialize};

/// 2D vector.
pub type Vec2 = GlamVec2;

/// Axis-aligned rectangle in pixel space (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at the origin covering `width` x `height` pixels.
    #[inline]
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    /// Create a rectangle from two corners.
    pub fn from_corners(min: Vec2, max: Vec2) -> Self {
        Self {
            x: min.x,
            y: min.y,
            width: max.x - min.x,
            height: max.y - min.y,
        }
    }

    /// Minimum corner (top-left).
    #[inline]
    pub fn min(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Maximum corner (bottom-right).
    #[inline]
    pub fn max(self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub fn contains(self, point: Vec2) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    /// Compute union with another rectangle (bounding box).
    pub fn union(self, other: Self) -> Self {
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = (self.x + self.width).max(other.x + other.width);
        let y2 = (self.y + self.height).max(other.y + other.height);
        Self::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Compute intersection with another rectangle.
    pub fn intersection(self, other: Self) -> Option<Self> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x1 < x2 && y1 < y2 {
            Some(Self::new(x1, y1, x2 - x1, y2 - y1))
        } else {
            None
        }
    }
}

/// 2D affine transformation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 6]", into = "[f32; 6]")]
pub struct Transform2D {
    inner: Affine2,
}

impl Transform2D {
    /// Identity transform.
    pub const IDENTITY: Self = Self {
        inner: Affine2::IDENTITY,
    };

    /// Create a translation transform.
    #[inline]
    pub fn translate(x: f32, y: f32) -> Self {
        Self {
            inner: Affine2::from_translation(Vec2::new(x, y)),
        }
    }

    /// Create a scale transform.
    #[inline]
    pub fn scale(x: f32, y: f32) -> Self {
        Self {
            inner: Affine2::from_scale(Vec2::new(x, y)),
        }
    }

    /// Create a uniform scale transform.
    #[inline]
    pub fn scale_uniform(s: f32) -> Self {
        Self::scale(s, s)
    }

    /// Create a rotation transform (radians, about the origin).
    #[inline]
    pub fn rotate(angle: f32) -> Self {
        Self {
            inner: Affine2::from_angle(angle),
        }
    }

    /// Apply `self` first, then `next`.
    #[inline]
    pub fn then(self, next: Self) -> Self {
        Self {
            inner: next.inner * self.inner,
        }
    }

    /// Transform a point.
    #[inline]
    pub fn transform_point(self, point: Vec2) -> Vec2 {
        self.inner.transform_point2(point)
    }

    /// Axis-aligned bounding box of a transformed rectangle.
    pub fn transform_rect(self, rect: Rect) -> Rect {
        let corners = [
            rect.min(),
            Vec2::new(rect.x + rect.width, rect.y),
            Vec2::new(rect.x, rect.y + rect.height),
            rect.max(),
        ]
        .map(|p| self.transform_point(p));

        let min = corners.iter().fold(Vec2::splat(f32::INFINITY), |a, &p| a.min(p));
        let max = corners
            .iter()
            .fold(Vec2::splat(f32::NEG_INFINITY), |a, &p| a.max(p));
        Rect::from_corners(min, max)
    }

    /// Whether the transform has a finite inverse.
    ///
    /// Any non-zero determinant counts, however small the scale.
    #[inline]
    pub fn is_invertible(self) -> bool {
        let det = self.inner.matrix2.determinant();
        det != 0.0 && det.is_finite() && self.inner.inverse().is_finite()
    }

    /// Get the inverse transform.
    #[inline]
    pub fn inverse(self) -> Self {
        Self {
            inner: self.inner.inverse(),
        }
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[f32; 6]> for Transform2D {
    fn from(cols: [f32; 6]) -> Self {
        Self {
            inner: Affine2::from_cols_array(&cols),
        }
    }
}

impl From<Transform2D> for [f32; 6] {
    fn from(t: Transform2D) -> Self {
        t.inner.to_cols_array()
    }
}
