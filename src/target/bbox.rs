use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// How box extents are measured.
///
/// - `Pixel` (default): width = x2 - x1 + 1 (x2/y2 are inclusive pixel indices)
/// - `Continuous`: width = x2 - x1 (boxes are real-valued regions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxConvention {
    #[default]
    Pixel,
    Continuous,
}

impl BoxConvention {
    /// Amount added to `x2 - x1` (and `y2 - y1`) to get the box extent.
    #[inline]
    pub fn extent_offset(self) -> f32 {
        match self {
            BoxConvention::Continuous => 0.0,
            BoxConvention::Pixel => 1.0,
        }
    }
}

/// Image dimensions in pixels, used for the inside-image filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub height: u32,
    pub width: u32,
}

impl ImageSize {
    #[inline]
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }
}

/// Axis-aligned box in corner (x1, y1, x2, y2) format.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BBox {
    /// Top-left x coordinate
    pub x1: f32,
    /// Top-left y coordinate
    pub y1: f32,
    /// Bottom-right x coordinate
    pub x2: f32,
    /// Bottom-right y coordinate
    pub y2: f32,
}

impl BBox {
    #[inline]
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Read the first four values of a row as (x1, y1, x2, y2).
    #[inline]
    pub fn from_row(row: ArrayView1<f32>) -> Self {
        Self::new(row[0], row[1], row[2], row[3])
    }

    #[inline]
    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    #[inline]
    pub fn width(&self, convention: BoxConvention) -> f32 {
        self.x2 - self.x1 + convention.extent_offset()
    }

    #[inline]
    pub fn height(&self, convention: BoxConvention) -> f32 {
        self.y2 - self.y1 + convention.extent_offset()
    }

    /// Center point (cx, cy) under the given convention.
    #[inline]
    pub fn center(&self, convention: BoxConvention) -> (f32, f32) {
        (
            self.x1 + 0.5 * self.width(convention),
            self.y1 + 0.5 * self.height(convention),
        )
    }

    #[inline]
    pub fn area(&self, convention: BoxConvention) -> f32 {
        self.width(convention) * self.height(convention)
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    pub fn is_inverted(&self) -> bool {
        self.x2 < self.x1 || self.y2 < self.y1
    }

    /// True when the box lies fully inside the image:
    /// `x1 >= 0`, `y1 >= 0`, `x2 < width`, `y2 < height`.
    pub fn is_inside(&self, image: ImageSize) -> bool {
        self.x1 >= 0.0
            && self.y1 >= 0.0
            && self.x2 < image.width as f32
            && self.y2 < image.height as f32
    }

    /// Intersection over Union with another box.
    ///
    /// Returns 0 when the union is empty, so degenerate boxes never match.
    pub fn iou(&self, other: &BBox, convention: BoxConvention) -> f32 {
        let offset = convention.extent_offset();
        let inter_width = (self.x2.min(other.x2) - self.x1.max(other.x1) + offset).max(0.0);
        let inter_height = (self.y2.min(other.y2) - self.y1.max(other.y1) + offset).max(0.0);
        let inter_area = inter_width * inter_height;

        let union_area = self.area(convention) + other.area(convention) - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }
}
