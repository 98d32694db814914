// THEORY:
// The labeler is the first stage of the blob engine. It turns a binary raster into
// a label raster in which every 8-connected region of foreground pixels carries its
// own positive integer, and it collects the raw statistics of each region on the way.
//
// Key architectural principles & algorithm steps:
// 1.  **First Pass (Provisional Labels)**: Pixels are visited in raster order. A
//     foreground pixel looks at the four neighbours that have already been visited
//     (W, NW, N, NE). With no labeled neighbour it opens a new provisional label;
//     otherwise it takes one and records every other neighbour label as equivalent.
// 2.  **Equivalence Structure**: Equivalences live in a flat union-find over
//     provisional labels: a parent array with path compression and union by rank.
//     No pointers, no per-region objects.
// 3.  **Second Pass (Resolution)**: Each provisional label is resolved to its root,
//     and roots are numbered 1, 2, 3... in order of first appearance. While the
//     final label is written back, a flat per-label accumulator collects area,
//     bounding box and raw moments.
// 4.  **Stateless Utility**: The labeler has no memory between frames. `Blob`
//     objects are built later by the `BlobSet`.

use crate::core_modules::blob::{Label, Point};
use crate::core_modules::error::{BlobError, Result};
use image::{GrayImage, ImageBuffer, Luma};

/// A raster of the same dimensions as the input holding each pixel's blob label.
/// Background pixels hold 0.
pub type LabelImage = ImageBuffer<Luma<Label>, Vec<Label>>;

/// Raw per-region accumulators gathered during the second labeling pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawStats {
    /// Number of pixels carrying the label.
    pub area: u64,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    /// Sum of x.
    pub m10: f64,
    /// Sum of y.
    pub m01: f64,
    /// Sum of x*y.
    pub m11: f64,
    /// Sum of x*x.
    pub m20: f64,
    /// Sum of y*y.
    pub m02: f64,
    /// First pixel of the region in raster order, i.e. its topmost-leftmost pixel.
    pub start: Point,
}

impl RawStats {
    fn new(x: u32, y: u32) -> Self {
        Self {
            area: 0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            m10: 0.0,
            m01: 0.0,
            m11: 0.0,
            m20: 0.0,
            m02: 0.0,
            start: Point { x, y },
        }
    }

    #[inline]
    fn accumulate(&mut self, x: u32, y: u32) {
        let (fx, fy) = (x as f64, y as f64);
        self.area += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.m10 += fx;
        self.m01 += fy;
        self.m11 += fx * fy;
        self.m20 += fx * fx;
        self.m02 += fy * fy;
    }
}

/// The complete output of one labeling pass.
#[derive(Debug, Clone)]
pub struct Labeling {
    /// The label raster.
    pub labels: LabelImage,
    /// Statistics indexed by `label - 1`.
    pub stats: Vec<RawStats>,
    /// Number of foreground pixels that received a label.
    pub labeled_pixels: usize,
}

/// Union-find over provisional labels. Index 0 is the background and never joins a set.
#[derive(Debug)]
struct DisjointSets {
    parent: Vec<Label>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn new() -> Self {
        Self {
            parent: vec![0],
            rank: vec![0],
        }
    }

    fn len(&self) -> usize {
        self.parent.len()
    }

    /// Opens a new singleton set, or `None` once the label range is exhausted.
    fn make_set(&mut self) -> Option<Label> {
        let next = Label::try_from(self.parent.len()).ok()?;
        self.parent.push(next);
        self.rank.push(0);
        Some(next)
    }

    fn find(&mut self, label: Label) -> Label {
        let mut root = label;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }

        // Path compression: point every node on the walked path at the root.
        let mut current = label;
        while current != root {
            let next = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = next;
        }
        root
    }

    fn union(&mut self, a: Label, b: Label) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return;
        }

        let rank_a = self.rank[root_a as usize];
        let rank_b = self.rank[root_b as usize];
        if rank_a < rank_b {
            self.parent[root_a as usize] = root_b;
        } else if rank_a > rank_b {
            self.parent[root_b as usize] = root_a;
        } else {
            self.parent[root_b as usize] = root_a;
            self.rank[root_a as usize] += 1;
        }
    }
}

pub mod labeler {
    use super::*;

    /// Labels every 8-connected foreground region of `raster`.
    /// Any non-zero pixel is foreground.
    pub fn label(raster: &GrayImage) -> Result<Labeling> {
        label_bounded(raster, Label::MAX)
    }

    /// Same as [`label`] with an explicit cap on the number of final labels.
    pub(crate) fn label_bounded(raster: &GrayImage, max_labels: Label) -> Result<Labeling> {
        let (width, height) = raster.dimensions();
        if width == 0 || height == 0 {
            return Err(BlobError::InvalidInput(format!(
                "raster is empty ({width}x{height})"
            )));
        }

        let w = width as usize;
        let h = height as usize;
        let pixels = raster.as_raw();
        let mut buffer: Vec<Label> = vec![0; w * h];
        let mut sets = DisjointSets::new();

        // --- 1. Provisional Labels ---
        for y in 0..h {
            let row = y * w;
            for x in 0..w {
                let i = row + x;
                if pixels[i] == 0 {
                    continue;
                }

                // W, NW, N, NE: the neighbours already visited in raster order.
                let mut neighbours = [0 as Label; 4];
                if x > 0 {
                    neighbours[0] = buffer[i - 1];
                }
                if y > 0 {
                    let up = i - w;
                    if x > 0 {
                        neighbours[1] = buffer[up - 1];
                    }
                    neighbours[2] = buffer[up];
                    if x + 1 < w {
                        neighbours[3] = buffer[up + 1];
                    }
                }

                let mut current: Label = 0;
                for &neighbour in &neighbours {
                    if neighbour == 0 {
                        continue;
                    }
                    if current == 0 {
                        current = neighbour;
                    } else if neighbour != current {
                        sets.union(current, neighbour);
                    }
                }

                if current == 0 {
                    current = sets.make_set().ok_or(BlobError::LabelOverflow {
                        max: Label::MAX as u64,
                    })?;
                }
                buffer[i] = current;
            }
        }

        // --- 2. Resolution & Accumulation ---
        let mut remap: Vec<Label> = vec![0; sets.len()];
        let mut stats: Vec<RawStats> = Vec::new();
        let mut labeled_pixels = 0usize;

        for y in 0..h {
            let row = y * w;
            for x in 0..w {
                let i = row + x;
                let provisional = buffer[i];
                if provisional == 0 {
                    continue;
                }

                let root = sets.find(provisional) as usize;
                let mut final_label = remap[root];
                if final_label == 0 {
                    if stats.len() as u64 >= max_labels as u64 {
                        return Err(BlobError::LabelOverflow {
                            max: max_labels as u64,
                        });
                    }
                    stats.push(RawStats::new(x as u32, y as u32));
                    final_label = stats.len() as Label;
                    remap[root] = final_label;
                }

                buffer[i] = final_label;
                stats[final_label as usize - 1].accumulate(x as u32, y as u32);
                labeled_pixels += 1;
            }
        }

        tracing::debug!(
            width,
            height,
            provisional = sets.len() - 1,
            regions = stats.len(),
            labeled_pixels,
            "labeled raster"
        );

        let labels = LabelImage::from_raw(width, height, buffer).ok_or_else(|| {
            BlobError::InvalidInput(format!("label buffer does not fit {width}x{height}"))
        })?;

        Ok(Labeling {
            labels,
            stats,
            labeled_pixels,
        })
    }
}
