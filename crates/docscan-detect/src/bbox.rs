use serde::{Deserialize, Serialize};

/// A 2D point in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

/// Axis-aligned rectangle with `x1 <= x2`, `y1 <= y2`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Rect {
    /// Build a rectangle from two opposite corners in any order.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    #[inline]
    pub fn center(&self) -> PointF {
        PointF {
            x: (self.x1 + self.x2) / 2.0,
            y: (self.y1 + self.y2) / 2.0,
        }
    }

    /// Clamp into `[0, w] x [0, h]`.
    pub fn clamp_to(&self, w: u32, h: u32) -> Rect {
        Rect {
            x1: self.x1.clamp(0.0, w as f32),
            y1: self.y1.clamp(0.0, h as f32),
            x2: self.x2.clamp(0.0, w as f32),
            y2: self.y2.clamp(0.0, h as f32),
        }
    }

    /// Intersection-over-union. Zero for disjoint or degenerate boxes.
    pub fn iou(&self, other: &Rect) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        if ix2 <= ix1 || iy2 <= iy1 {
            return 0.0;
        }

        let intersection = (ix2 - ix1) * (iy2 - iy1);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// Detector output geometry.
///
/// Some recognizer backends report flat rectangles, others report the four
/// corners of a (possibly rotated) quadrilateral. The variants are
/// explicit so nothing downstream inspects shapes at runtime; everything
/// funnels through [`BBox::to_rect`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BBox {
    Rect(Rect),
    Polygon { points: [PointF; 4] },
}

impl BBox {
    /// Canonical axis-aligned rectangle: the polygon variant collapses to
    /// its bounding envelope.
    pub fn to_rect(&self) -> Rect {
        match self {
            BBox::Rect(r) => *r,
            BBox::Polygon { points } => {
                let mut x1 = f32::INFINITY;
                let mut y1 = f32::INFINITY;
                let mut x2 = f32::NEG_INFINITY;
                let mut y2 = f32::NEG_INFINITY;
                for p in points {
                    x1 = x1.min(p.x);
                    y1 = y1.min(p.y);
                    x2 = x2.max(p.x);
                    y2 = y2.max(p.y);
                }
                Rect { x1, y1, x2, y2 }
            }
        }
    }
}
