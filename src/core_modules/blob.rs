// THEORY:
// A `Blob` is a single connected region of foreground pixels in a single frame. It
// is a "dumb" data container built from the labeler's raw statistics: label,
// bounding box, area and raw moments. Everything else (centroid, orientation) is
// derived from those numbers on demand.
//
// Key architectural principles:
// 1.  **Frame Scoped**: A blob exists only for the frame it was labeled in. It has
//     no memory of earlier frames; the tracker holds identity over time and copies
//     the few plain values it needs, never the blob itself.
// 2.  **Immutable Once Built**: The `BlobSet` owns every blob and hands out shared
//     references only. The boundary contour and its polygon are computed lazily and
//     cached in place, which does not change what the blob describes.

use crate::core_modules::contour::ChainCode;
use crate::core_modules::labeler::RawStats;
use crate::core_modules::polygon::Polygon;
use std::cell::OnceCell;

/// A blob label. 0 is the background and is never assigned to a blob.
pub type Label = u32;

/// A pixel coordinate on the raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle with inclusive pixel bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Length of the box diagonal, measured over pixel extents.
    pub fn diagonal(&self) -> f64 {
        let w = self.width() as f64;
        let h = self.height() as f64;
        (w * w + h * h).sqrt()
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Raw spatial moments accumulated over a blob's pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m11: f64,
    pub m20: f64,
    pub m02: f64,
}

impl Moments {
    /// Second order central moments `(u11, u20, u02)`.
    pub fn central(&self) -> (f64, f64, f64) {
        if self.m00 == 0.0 {
            return (0.0, 0.0, 0.0);
        }
        let u11 = self.m11 - self.m10 * self.m01 / self.m00;
        let u20 = self.m20 - self.m10 * self.m10 / self.m00;
        let u02 = self.m02 - self.m01 * self.m01 / self.m00;
        (u11, u20, u02)
    }
}

/// One connected region in one frame.
#[derive(Debug, Clone)]
pub struct Blob {
    /// The region's label in the frame's label raster.
    pub label: Label,
    /// Tight box around every pixel of the region.
    pub bounding_box: BoundingBox,
    /// Number of pixels in the region. Always equal to `moments.m00`.
    pub area: u64,
    /// Raw moments from the labeling scan.
    pub moments: Moments,
    /// The topmost-leftmost pixel, where boundary tracing starts.
    pub start: Point,
    contour: OnceCell<ChainCode>,
    polygon: OnceCell<Polygon>,
}

impl Blob {
    pub(crate) fn from_stats(label: Label, stats: &RawStats) -> Self {
        Self {
            label,
            bounding_box: BoundingBox {
                min_x: stats.min_x,
                min_y: stats.min_y,
                max_x: stats.max_x,
                max_y: stats.max_y,
            },
            area: stats.area,
            moments: Moments {
                m00: stats.area as f64,
                m10: stats.m10,
                m01: stats.m01,
                m11: stats.m11,
                m20: stats.m20,
                m02: stats.m02,
            },
            start: stats.start,
            contour: OnceCell::new(),
            polygon: OnceCell::new(),
        }
    }

    /// First-moment center of the region, `(m10/m00, m01/m00)`.
    pub fn centroid(&self) -> (f64, f64) {
        (
            self.moments.m10 / self.moments.m00,
            self.moments.m01 / self.moments.m00,
        )
    }

    /// Orientation of the region's major axis in radians, from central moments.
    pub fn angle(&self) -> f64 {
        let (u11, u20, u02) = self.moments.central();
        0.5 * (2.0 * u11).atan2(u20 - u02)
    }

    pub(crate) fn contour_cell(&self) -> &OnceCell<ChainCode> {
        &self.contour
    }

    pub(crate) fn polygon_cell(&self) -> &OnceCell<Polygon> {
        &self.polygon
    }
}
