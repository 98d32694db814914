// THEORY:
// The contour module outlines a single blob. It walks the blob's outer boundary on
// the label raster and records every step as one of the 8 compass directions: a
// chain code.
//
// Key architectural principles & algorithm steps:
// 1.  **Fixed Start**: Tracing starts at the blob's topmost-leftmost pixel. Its West
//     neighbour precedes it in raster order, so it is known to be outside the blob
//     and serves as the first backtrack pixel.
// 2.  **Moore-Neighbour Walk**: From the current pixel, the 8 neighbours are scanned
//     clockwise starting just after the backtrack pixel. The first one inside the
//     blob is the next boundary pixel; the last one rejected becomes the new
//     backtrack.
// 3.  **Closing Condition**: The walk stops when it stands on the start pixel and is
//     about to repeat the very first step. An isolated pixel has no inside
//     neighbour at all and yields an empty, already closed chain code.

use crate::core_modules::blob::{Blob, Label, Point};
use crate::core_modules::error::{BlobError, Result};
use crate::core_modules::labeler::LabelImage;
use std::f64::consts::SQRT_2;

/// A unit step between 8-connected pixels. Variants are in clockwise screen order
/// (y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    North,
    NorthEast,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
        Direction::North,
        Direction::NorthEast,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Self {
        Self::ALL[index % 8]
    }

    /// `(dx, dy)` of a single step.
    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
        }
    }

    pub fn from_delta(dx: i64, dy: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.delta() == (dx, dy))
    }

    pub fn is_diagonal(self) -> bool {
        self.index() % 2 == 1
    }

    /// Euclidean length of the step: 1 or sqrt(2).
    pub fn step_length(self) -> f64 {
        if self.is_diagonal() { SQRT_2 } else { 1.0 }
    }
}

/// A closed boundary: a start pixel plus the steps that lead back to it.
///
/// A single-pixel blob has no steps. Its chain code is the empty loop at
/// `start`: `is_empty()` holds, `perimeter()` is 0 and `points()` yields
/// `start` alone.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainCode {
    pub start: Point,
    pub steps: Vec<Direction>,
}

impl ChainCode {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Boundary length in pixels: 1 per axis-aligned step, sqrt(2) per diagonal step.
    pub fn perimeter(&self) -> f64 {
        self.steps.iter().map(|d| d.step_length()).sum()
    }

    /// The boundary pixels in walking order, one per step, beginning with `start`.
    /// A pixel appears once for each time the walk passes through it.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        let mut current = (self.start.x as i64, self.start.y as i64);
        std::iter::once(self.start).chain(
            self.steps
                .iter()
                .take(self.steps.len().saturating_sub(1))
                .map(move |d| {
                    let (dx, dy) = d.delta();
                    current = (current.0 + dx, current.1 + dy);
                    Point::new(current.0 as u32, current.1 as u32)
                }),
        )
    }
}

/// Traces the outer boundary of `blob` on the label raster it was labeled in.
pub fn trace_boundary(labels: &LabelImage, blob: &Blob) -> Result<ChainCode> {
    if blob.area == 0 {
        return Err(BlobError::DegenerateGeometry(format!(
            "blob {} has zero area",
            blob.label
        )));
    }
    let (width, height) = labels.dimensions();
    if blob.start.x >= width
        || blob.start.y >= height
        || labels.get_pixel(blob.start.x, blob.start.y)[0] != blob.label
    {
        return Err(BlobError::InvalidInput(format!(
            "blob {} does not belong to this label raster",
            blob.label
        )));
    }
    Ok(trace(labels, blob.label, blob.start, blob.area))
}

/// Moore-neighbour walk; callers guarantee `start` carries `label`.
pub(crate) fn trace(labels: &LabelImage, label: Label, start: Point, area: u64) -> ChainCode {
    let (width, height) = labels.dimensions();
    let inside = |x: i64, y: i64| {
        x >= 0
            && y >= 0
            && x < width as i64
            && y < height as i64
            && labels.get_pixel(x as u32, y as u32)[0] == label
    };

    let origin = (start.x as i64, start.y as i64);
    let mut current = origin;
    let mut backtrack = Direction::West;
    let mut first: Option<Direction> = None;
    let mut steps = Vec::new();
    // Each boundary pixel can be entered from at most 4 sides.
    let step_limit = 4 * area as usize + 4;

    while let Some((step, next_backtrack)) = next_step(current, backtrack, &inside) {
        if current == origin && first == Some(step) {
            break;
        }
        if first.is_none() {
            first = Some(step);
        }

        let (dx, dy) = step.delta();
        current = (current.0 + dx, current.1 + dy);
        backtrack = next_backtrack;
        steps.push(step);

        if steps.len() > step_limit {
            tracing::warn!(label, steps = steps.len(), "boundary walk did not close");
            break;
        }
    }

    tracing::trace!(label, steps = steps.len(), "traced boundary");
    ChainCode { start, steps }
}

/// Finds the next boundary step from `current`, scanning clockwise from the
/// backtrack neighbour. Returns the step and the backtrack direction as seen
/// from the pixel the step lands on.
fn next_step(
    current: (i64, i64),
    backtrack: Direction,
    inside: &impl Fn(i64, i64) -> bool,
) -> Option<(Direction, Direction)> {
    let base = backtrack.index();
    for offset in 1..=8 {
        let step = Direction::from_index(base + offset);
        let (dx, dy) = step.delta();
        if inside(current.0 + dx, current.1 + dy) {
            // The neighbour scanned just before `step` was outside.
            let (bx, by) = Direction::from_index(base + offset - 1).delta();
            let next_backtrack = Direction::from_delta(bx - dx, by - dy)?;
            return Some((step, next_backtrack));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::blob_set::BlobSet;
    use image::{GrayImage, Luma};

    fn raster_from_rows(rows: &[&str]) -> GrayImage {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        GrayImage::from_fn(width, height, |x, y| {
            let c = rows[y as usize].as_bytes()[x as usize];
            Luma([if c == b'#' { 255 } else { 0 }])
        })
    }

    fn closes(code: &ChainCode) -> bool {
        let (dx, dy) = code.steps.iter().fold((0, 0), |(ax, ay), d| {
            let (x, y) = d.delta();
            (ax + x, ay + y)
        });
        dx == 0 && dy == 0
    }

    #[test]
    fn single_pixel_closes_immediately() {
        let set = BlobSet::label(&raster_from_rows(&["...", ".#.", "..."])).unwrap();
        let code = trace_boundary(set.labels(), set.get(1).unwrap()).unwrap();
        assert!(code.is_empty());
        assert_eq!(code.start, Point::new(1, 1));
        assert_eq!(code.perimeter(), 0.0);
        assert_eq!(code.points().collect::<Vec<_>>(), vec![Point::new(1, 1)]);
    }

    #[test]
    fn two_by_two_square_walks_clockwise() {
        let set = BlobSet::label(&raster_from_rows(&["##", "##"])).unwrap();
        let code = trace_boundary(set.labels(), set.get(1).unwrap()).unwrap();
        assert_eq!(
            code.steps,
            vec![
                Direction::East,
                Direction::South,
                Direction::West,
                Direction::North
            ]
        );
    }

    #[test]
    fn square_perimeter_is_axis_steps_only() {
        for n in 2..7u32 {
            let raster = GrayImage::from_fn(n + 4, n + 4, |x, y| {
                let on = (2..n + 2).contains(&x) && (2..n + 2).contains(&y);
                Luma([if on { 255 } else { 0 }])
            });
            let set = BlobSet::label(&raster).unwrap();
            let code = trace_boundary(set.labels(), set.get(1).unwrap()).unwrap();
            assert!(closes(&code));
            assert_eq!(code.len(), 4 * (n as usize - 1));
            assert!((code.perimeter() - 4.0 * (n as f64 - 1.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn thin_line_is_walked_out_and_back() {
        let set = BlobSet::label(&raster_from_rows(&["###"])).unwrap();
        let code = trace_boundary(set.labels(), set.get(1).unwrap()).unwrap();
        assert_eq!(
            code.steps,
            vec![
                Direction::East,
                Direction::East,
                Direction::West,
                Direction::West
            ]
        );
    }

    #[test]
    fn diagonal_steps_cost_sqrt_two() {
        let set = BlobSet::label(&raster_from_rows(&[
            ".#.", //
            "#.#", //
            ".#.",
        ]))
        .unwrap();
        let code = trace_boundary(set.labels(), set.get(1).unwrap()).unwrap();
        assert!(closes(&code));
        assert_eq!(code.len(), 4);
        assert!(code.steps.iter().all(|d| d.is_diagonal()));
        assert!((code.perimeter() - 4.0 * SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn ring_traces_only_the_outer_boundary() {
        let set = BlobSet::label(&raster_from_rows(&[
            "#####", //
            "#...#", //
            "#...#", //
            "#####",
        ]))
        .unwrap();
        let code = trace_boundary(set.labels(), set.get(1).unwrap()).unwrap();
        assert!(closes(&code));
        assert_eq!(code.len(), 14);
        for p in code.points() {
            assert!(p.x == 0 || p.x == 4 || p.y == 0 || p.y == 3);
        }
    }

    #[test]
    fn every_point_belongs_to_the_blob() {
        let set = BlobSet::label(&raster_from_rows(&[
            "..##..", //
            ".####.", //
            "##..##", //
            ".#..#.", //
            "..##..",
        ]))
        .unwrap();
        let blob = set.get(1).unwrap();
        let code = trace_boundary(set.labels(), blob).unwrap();
        assert!(closes(&code));
        for p in code.points() {
            assert_eq!(set.get_label(p.x as i64, p.y as i64), blob.label);
        }
    }

    #[test]
    fn foreign_blob_is_rejected() {
        let a = BlobSet::label(&raster_from_rows(&["#..", "..."])).unwrap();
        let b = BlobSet::label(&raster_from_rows(&["...", "..#"])).unwrap();
        let err = trace_boundary(a.labels(), b.get(1).unwrap()).unwrap_err();
        assert!(matches!(err, BlobError::InvalidInput(_)));
    }

    #[test]
    fn direction_deltas_round_trip() {
        for d in Direction::ALL {
            let (dx, dy) = d.delta();
            assert_eq!(Direction::from_delta(dx, dy), Some(d));
        }
        assert_eq!(Direction::from_delta(0, 0), None);
    }
}
