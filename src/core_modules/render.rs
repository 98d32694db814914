// THEORY:
// The render module paints a `BlobSet` on top of a colour frame so a person can see
// what the labeler and tracker see. It writes straight into an `RgbImage` the
// caller owns; encoding and display stay outside the crate.
//
// Key architectural principles:
// 1.  **Explicit Toggles**: Each overlay element (fill, centroid, bounding box,
//     orientation) is its own boolean in `RenderOptions`, next to the blend factor.
// 2.  **Only The Fill Blends**: Blob pixels are alpha-blended with a per-label
//     colour. Markers are drawn opaque on top so they stay visible at any alpha.
// 3.  **Stable Colours**: A label or track id always maps to the same hue, spread
//     around the colour wheel by the golden ratio.
// 4.  **Clipped Geometry**: Tracks, contours and polygons may come from another
//     frame than `image`; whatever falls outside it is skipped.

use crate::core_modules::blob::{Blob, BoundingBox, Label};
use crate::core_modules::blob_set::BlobSet;
use crate::core_modules::contour::ChainCode;
use crate::core_modules::error::{BlobError, Result};
use crate::core_modules::polygon::Polygon;
use crate::core_modules::tracker::{Track, TrackId, TrackState};
use image::{Rgb, RgbImage};

const BOUNDING_BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const CENTROID_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const ANGLE_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const CENTROID_ARM: i64 = 2;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderOptions {
    /// Paint every blob pixel in its label colour.
    pub fill: bool,
    /// Mark the centroid with a small cross.
    pub centroid: bool,
    /// Outline the bounding box.
    pub bounding_box: bool,
    /// Draw the major axis through the centroid.
    pub angle: bool,
    /// Weight of the fill colour against the frame, in `[0, 1]`.
    pub alpha: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            fill: true,
            centroid: true,
            bounding_box: true,
            angle: true,
            alpha: 1.0,
        }
    }
}

/// Fully saturated colour for `label`.
pub fn label_color(label: Label) -> Rgb<u8> {
    hue_color(label as u64)
}

/// Fully saturated colour for track `id`.
pub fn track_color(id: TrackId) -> Rgb<u8> {
    hue_color(id)
}

fn hue_color(key: u64) -> Rgb<u8> {
    let hue = (key as f64 * 0.618_033_988_75).fract() * 6.0;
    let sector = hue.floor() as u32;
    let f = hue - hue.floor();
    let rise = (255.0 * f).round() as u8;
    let fall = 255 - rise;
    match sector {
        0 => Rgb([255, rise, 0]),
        1 => Rgb([fall, 255, 0]),
        2 => Rgb([0, 255, rise]),
        3 => Rgb([0, fall, 255]),
        4 => Rgb([rise, 0, 255]),
        _ => Rgb([255, 0, fall]),
    }
}

/// Draws every blob of `blobs` into `image`, which must match the label raster's size.
pub fn render_blobs(blobs: &BlobSet, image: &mut RgbImage, options: &RenderOptions) -> Result<()> {
    if image.dimensions() != blobs.labels().dimensions() {
        let (w, h) = image.dimensions();
        return Err(BlobError::InvalidInput(format!(
            "frame is {w}x{h}, label raster is {}x{}",
            blobs.width(),
            blobs.height()
        )));
    }
    if !(0.0..=1.0).contains(&options.alpha) {
        return Err(BlobError::ArgumentOutOfRange(format!(
            "alpha must be within [0, 1], got {}",
            options.alpha
        )));
    }

    for blob in blobs.iter() {
        if options.fill {
            fill_blob(blobs, blob, image, options.alpha);
        }
        if options.bounding_box {
            outline(&blob.bounding_box, image, BOUNDING_BOX_COLOR);
        }
        if options.angle {
            draw_axis(blob, image);
        }
        if options.centroid {
            let (cx, cy) = blob.centroid();
            let (cx, cy) = (cx.round() as i64, cy.round() as i64);
            for d in -CENTROID_ARM..=CENTROID_ARM {
                put(image, cx + d, cy, CENTROID_COLOR);
                put(image, cx, cy + d, CENTROID_COLOR);
            }
        }
    }
    tracing::trace!(blobs = blobs.len(), "rendered blobs");
    Ok(())
}

/// Outlines each track's last bounding box in its track colour and marks its
/// last centroid with a filled square. Inactive tracks are drawn at half
/// intensity.
pub fn render_tracks<'a>(tracks: impl IntoIterator<Item = &'a Track>, image: &mut RgbImage) {
    for track in tracks {
        let mut color = track_color(track.id);
        if track.state == TrackState::Inactive {
            color = Rgb(color.0.map(|c| c / 2));
        }
        outline(&track.last_bounding_box, image, color);
        let (cx, cy) = track.last_centroid;
        let (cx, cy) = (cx.round() as i64, cy.round() as i64);
        for dy in -1..=1 {
            for dx in -1..=1 {
                put(image, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Paints every pixel the chain code walks through.
pub fn render_contour(code: &ChainCode, image: &mut RgbImage, color: Rgb<u8>) {
    for p in code.points() {
        put(image, p.x as i64, p.y as i64, color);
    }
}

/// Draws the closed outline of `polygon`.
pub fn render_polygon(polygon: &Polygon, image: &mut RgbImage, color: Rgb<u8>) {
    let n = polygon.len();
    for i in 0..n {
        let a = polygon.points[i];
        let b = polygon.points[(i + 1) % n];
        draw_line(
            image,
            (a.x as f64, a.y as f64),
            (b.x as f64, b.y as f64),
            color,
        );
    }
}

fn fill_blob(blobs: &BlobSet, blob: &Blob, image: &mut RgbImage, alpha: f64) {
    let color = label_color(blob.label);
    let bb = blob.bounding_box;
    for y in bb.min_y..=bb.max_y {
        for x in bb.min_x..=bb.max_x {
            if blobs.labels().get_pixel(x, y)[0] != blob.label {
                continue;
            }
            let pixel = image.get_pixel_mut(x, y);
            for (dst, &src) in pixel.0.iter_mut().zip(color.0.iter()) {
                *dst = blend(*dst, src, alpha);
            }
        }
    }
}

fn blend(dst: u8, src: u8, alpha: f64) -> u8 {
    (dst as f64 * (1.0 - alpha) + src as f64 * alpha).round() as u8
}

fn outline(bb: &BoundingBox, image: &mut RgbImage, color: Rgb<u8>) {
    let (min_x, min_y) = (bb.min_x as i64, bb.min_y as i64);
    let (max_x, max_y) = (bb.max_x as i64, bb.max_y as i64);
    for x in min_x..=max_x {
        put(image, x, min_y, color);
        put(image, x, max_y, color);
    }
    for y in min_y..=max_y {
        put(image, min_x, y, color);
        put(image, max_x, y, color);
    }
}

/// Major axis through the centroid, half the box diagonal to each side.
fn draw_axis(blob: &Blob, image: &mut RgbImage) {
    let (cx, cy) = blob.centroid();
    let half = blob.bounding_box.diagonal() / 2.0;
    let (sin, cos) = blob.angle().sin_cos();
    let (dx, dy) = (cos * half, sin * half);
    draw_line(image, (cx - dx, cy - dy), (cx + dx, cy + dy), ANGLE_COLOR);
}

/// DDA line between two points, both ends included.
fn draw_line(image: &mut RgbImage, from: (f64, f64), to: (f64, f64), color: Rgb<u8>) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i64;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        put(
            image,
            (from.0 + dx * t).round() as i64,
            (from.1 + dy * t).round() as i64,
            color,
        );
    }
}

fn put(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < image.width() as i64 && y < image.height() as i64 {
        image.put_pixel(x as u32, y as u32, color);
    }
}
