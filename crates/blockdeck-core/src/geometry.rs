//! Geometry and transform math for blocks.
//!
//! All operations are pure value transforms: they return a new [`Geometry`]
//! and never mutate in place. Resize is always applied in the block's
//! unrotated local frame; the existing rotation is carried over untouched,
//! so resize does not commute with rotate (move and rotate do commute).

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Minimum width/height for a block kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinSize {
    pub width: f64,
    pub height: f64,
}

impl MinSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Corner handles used for resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Position, size and rotation of a block on the board surface.
///
/// Rotation is in degrees, normalized to `[0, 360)`, applied around the
/// center of the unrotated rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Top-left x of the unrotated frame.
    pub x: f64,
    /// Top-left y of the unrotated frame.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees, `[0, 360)`.
    #[serde(default)]
    pub rotation: f64,
}

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    // rem_euclid(360.0) can return 360.0 for inputs like -1e-14
    if a >= 360.0 { 0.0 } else { a }
}

impl Geometry {
    /// Create a geometry at a position with the given size and no rotation.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            x: position.x,
            y: position.y,
            width,
            height,
            rotation: 0.0,
        }
    }

    /// Axis-aligned bounds of the unrotated frame.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Center of the block (rotation pivot).
    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    /// Translate by a delta.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Resize to the given size, clamped to the kind minimum.
    ///
    /// Zero and negative inputs clamp to the minimum as well. The top-left
    /// corner of the local frame stays fixed and rotation is unchanged.
    pub fn resized(&self, width: f64, height: f64, min: MinSize) -> Self {
        Self {
            width: width.max(min.width),
            height: height.max(min.height),
            ..*self
        }
    }

    /// Rotate by a delta in degrees, re-normalizing into `[0, 360)`.
    pub fn rotated(&self, delta_deg: f64) -> Self {
        Self {
            rotation: normalize_degrees(self.rotation + delta_deg),
            ..*self
        }
    }

    /// Resize by dragging a corner handle, keeping the opposite corner fixed.
    ///
    /// The delta is interpreted in the block's local (unrotated) frame.
    /// Width and height are clamped to the kind minimum while the anchored
    /// corner stays put.
    pub fn resize_by_handle(&self, corner: Corner, delta: Vec2, min: MinSize) -> Self {
        let b = self.bounds();
        let (x0, y0, x1, y1) = match corner {
            Corner::TopLeft => (b.x0 + delta.x, b.y0 + delta.y, b.x1, b.y1),
            Corner::TopRight => (b.x0, b.y0 + delta.y, b.x1 + delta.x, b.y1),
            Corner::BottomLeft => (b.x0 + delta.x, b.y0, b.x1, b.y1 + delta.y),
            Corner::BottomRight => (b.x0, b.y0, b.x1 + delta.x, b.y1 + delta.y),
        };

        let width = (x1 - x0).max(min.width);
        let height = (y1 - y0).max(min.height);

        // Re-anchor so the opposite corner does not move once clamped.
        let (x, y) = match corner {
            Corner::TopLeft => (b.x1 - width, b.y1 - height),
            Corner::TopRight => (b.x0, b.y1 - height),
            Corner::BottomLeft => (b.x1 - width, b.y0),
            Corner::BottomRight => (b.x0, b.y0),
        };

        Self {
            x,
            y,
            width,
            height,
            rotation: self.rotation,
        }
    }

    /// World-space positions of the four corner handles, rotation applied.
    pub fn handle_positions(&self) -> [(Corner, Point); 4] {
        let c = self.center();
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        let rad = self.rotation.to_radians();
        let (sin_r, cos_r) = rad.sin_cos();
        let rotate = |dx: f64, dy: f64| -> Point {
            Point::new(c.x + dx * cos_r - dy * sin_r, c.y + dx * sin_r + dy * cos_r)
        };
        [
            (Corner::TopLeft, rotate(-half_w, -half_h)),
            (Corner::TopRight, rotate(half_w, -half_h)),
            (Corner::BottomLeft, rotate(-half_w, half_h)),
            (Corner::BottomRight, rotate(half_w, half_h)),
        ]
    }

    /// Hit test a world-space point against the rotated rectangle.
    ///
    /// The point is mapped into the local frame before testing, so hits are
    /// correct at any rotation.
    pub fn contains(&self, point: Point, tolerance: f64) -> bool {
        let c = self.center();
        let rad = -self.rotation.to_radians();
        let (sin_r, cos_r) = rad.sin_cos();
        let dx = point.x - c.x;
        let dy = point.y - c.y;
        let local = Point::new(c.x + dx * cos_r - dy * sin_r, c.y + dx * sin_r + dy * cos_r);
        self.bounds().inflate(tolerance, tolerance).contains(local)
    }
}
