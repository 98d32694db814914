// THEORY:
// The `BlobSet` is the Blob Store: the single owner of one frame's label raster and
// of every `Blob` found in it. It is built once per frame from a labeling pass and
// then queried, filtered and handed (by shared reference) to the tracker.
//
// Key architectural principles:
// 1.  **Exclusive Ownership**: Blobs live inside the set and are only lent out. Other
//     components copy the plain values they need.
// 2.  **Label Order**: Blobs are kept in a `BTreeMap` keyed by label, so iteration,
//     tie-breaks and tracking are deterministic.
// 3.  **Raster Is Read-Only**: Filters only shrink the blob map; the label raster
//     keeps reporting what the labeling pass found.
// 4.  **Lazy Shapes**: Contours and polygons are traced the first time they are
//     asked for and cached in the blob.

use crate::core_modules::blob::{Blob, Label};
use crate::core_modules::contour::{self, ChainCode};
use crate::core_modules::error::{BlobError, Result};
use crate::core_modules::labeler::{LabelImage, Labeling, labeler};
use crate::core_modules::polygon::Polygon;
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use std::collections::BTreeMap;

/// All blobs of one frame together with the label raster they came from.
#[derive(Debug, Clone)]
pub struct BlobSet {
    labels: LabelImage,
    blobs: BTreeMap<Label, Blob>,
    labeled_pixels: usize,
}

impl BlobSet {
    /// Labels a binary raster (non-zero is foreground) and builds its blobs.
    pub fn label(raster: &GrayImage) -> Result<Self> {
        let labeling = labeler::label(raster)?;
        Ok(Self::from_labeling(labeling))
    }

    /// Like [`BlobSet::label`] for a decoded image; only 8-bit single-channel
    /// images are accepted.
    pub fn label_dynamic(image: &DynamicImage) -> Result<Self> {
        match image {
            DynamicImage::ImageLuma8(gray) => Self::label(gray),
            other => Err(BlobError::InvalidInput(format!(
                "expected a single-channel 8-bit raster, got {:?}",
                other.color()
            ))),
        }
    }

    pub fn from_labeling(labeling: Labeling) -> Self {
        let blobs = labeling
            .stats
            .iter()
            .enumerate()
            .map(|(i, stats)| {
                let label = i as Label + 1;
                (label, Blob::from_stats(label, stats))
            })
            .collect();
        Self {
            labels: labeling.labels,
            blobs,
            labeled_pixels: labeling.labeled_pixels,
        }
    }

    /// Number of foreground pixels labeled in the pass that built this set.
    pub fn labeled_pixels(&self) -> usize {
        self.labeled_pixels
    }

    pub fn labels(&self) -> &LabelImage {
        &self.labels
    }

    pub fn width(&self) -> u32 {
        self.labels.width()
    }

    pub fn height(&self) -> u32 {
        self.labels.height()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn get(&self, label: Label) -> Option<&Blob> {
        self.blobs.get(&label)
    }

    /// Blobs in ascending label order.
    pub fn iter(&self) -> impl Iterator<Item = &Blob> {
        self.blobs.values()
    }

    /// Pixels of the label raster that belong to no region.
    pub fn background_pixel_count(&self) -> u64 {
        self.labels.pixels().filter(|p| p[0] == 0).count() as u64
    }

    /// Keeps only blobs with `min <= area <= max`.
    pub fn filter_by_area(&mut self, min: u64, max: u64) -> Result<()> {
        if min > max {
            return Err(BlobError::ArgumentOutOfRange(format!(
                "minimum area {min} is greater than maximum area {max}"
            )));
        }
        let before = self.blobs.len();
        self.blobs
            .retain(|_, blob| blob.area >= min && blob.area <= max);
        tracing::trace!(min, max, before, after = self.blobs.len(), "filtered by area");
        Ok(())
    }

    /// Keeps only the blob carrying `label`, if any.
    pub fn filter_by_label(&mut self, label: Label) {
        self.blobs.retain(|&l, _| l == label);
    }

    /// Label raster lookup. Out-of-bounds coordinates and background both give 0.
    #[inline]
    pub fn get_label(&self, x: i64, y: i64) -> Label {
        if x < 0 || y < 0 || x >= self.labels.width() as i64 || y >= self.labels.height() as i64 {
            return 0;
        }
        self.labels.get_pixel(x as u32, y as u32)[0]
    }

    /// The blob with the longest bounding-box diagonal; the lowest label wins ties.
    pub fn greater_blob(&self) -> Option<&Blob> {
        self.first_max_by(|blob| blob.bounding_box.diagonal())
    }

    /// The blob with the most pixels; the lowest label wins ties.
    pub fn largest_blob(&self) -> Option<&Blob> {
        self.first_max_by(|blob| blob.area as f64)
    }

    fn first_max_by(&self, key: impl Fn(&Blob) -> f64) -> Option<&Blob> {
        let mut best: Option<(&Blob, f64)> = None;
        for blob in self.blobs.values() {
            let value = key(blob);
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((blob, value)),
            }
        }
        best.map(|(blob, _)| blob)
    }

    /// Average RGB colour of `image` over the pixels of blob `label`.
    pub fn mean_color(&self, label: Label, image: &RgbImage) -> Result<[f64; 3]> {
        if image.dimensions() != self.labels.dimensions() {
            let (w, h) = image.dimensions();
            return Err(BlobError::InvalidInput(format!(
                "colour image is {w}x{h}, label raster is {}x{}",
                self.width(),
                self.height()
            )));
        }
        let blob = self.blob(label)?;

        let bb = blob.bounding_box;
        let mut sum = [0u64; 3];
        let mut count = 0u64;
        for y in bb.min_y..=bb.max_y {
            for x in bb.min_x..=bb.max_x {
                if self.labels.get_pixel(x, y)[0] != label {
                    continue;
                }
                let pixel = image.get_pixel(x, y);
                for (acc, &channel) in sum.iter_mut().zip(pixel.0.iter()) {
                    *acc += channel as u64;
                }
                count += 1;
            }
        }

        let count = count.max(1) as f64;
        Ok(sum.map(|s| s as f64 / count))
    }

    /// A binary mask (255 on, 0 off) of the pixels of every blob still in the set.
    pub fn filter_labels(&self) -> GrayImage {
        let (width, height) = self.labels.dimensions();
        GrayImage::from_fn(width, height, |x, y| {
            let label = self.labels.get_pixel(x, y)[0];
            Luma([if label != 0 && self.blobs.contains_key(&label) {
                255
            } else {
                0
            }])
        })
    }

    /// The blob's boundary chain code, traced on first use.
    pub fn contour(&self, label: Label) -> Result<&ChainCode> {
        let blob = self.blob(label)?;
        if let Some(code) = blob.contour_cell().get() {
            return Ok(code);
        }
        let code = contour::trace_boundary(&self.labels, blob)?;
        Ok(blob.contour_cell().get_or_init(|| code))
    }

    /// The blob's boundary polygon, derived from its chain code on first use.
    pub fn polygon(&self, label: Label) -> Result<&Polygon> {
        let code = self.contour(label)?;
        let blob = self.blob(label)?;
        Ok(blob
            .polygon_cell()
            .get_or_init(|| Polygon::from_chain_code(code)))
    }

    fn blob(&self, label: Label) -> Result<&Blob> {
        self.blobs
            .get(&label)
            .ok_or_else(|| BlobError::InvalidInput(format!("no blob with label {label}")))
    }
}
