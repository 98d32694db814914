// THEORY:
// The polygon module turns a chain code into a compact vertex list and answers the
// geometric questions asked about a blob's outline: area, perimeter, circularity,
// a simplified outline and the convex hull.
//
// Key architectural principles:
// 1.  **Order Is Meaning**: A polygon's vertices are in boundary order and the loop
//     is implicitly closed. Every transformation keeps the orientation of its input.
// 2.  **Subset Vertices**: Simplification and hull both return a subset of the input
//     vertices, so coordinates stay on the pixel grid.
// 3.  **Fail, Don't Guess**: Melkman's hull is only correct for a simple chain.
//     Every hull is checked to be strictly convex and to enclose every input vertex
//     before it is returned. Outlines that merely touch themselves get a second
//     pass over a sorted vertex order; outlines whose edges cross are rejected.

use crate::core_modules::blob::Point;
use crate::core_modules::contour::ChainCode;
use crate::core_modules::error::{BlobError, Result};
use std::collections::VecDeque;
use std::f64::consts::PI;

/// Tolerance used by [`Polygon::simplify_default`].
pub const DEFAULT_SIMPLIFY_DELTA: f64 = 1.0;

/// A closed loop of vertices in boundary order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polygon {
    pub points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Collapses straight runs of a chain code, emitting a vertex only where the
    /// direction changes.
    pub fn from_chain_code(code: &ChainCode) -> Self {
        let Some(&last) = code.steps.last() else {
            return Self::new(vec![code.start]);
        };

        let mut points = Vec::new();
        let mut previous = last;
        let (mut x, mut y) = (code.start.x as i64, code.start.y as i64);
        for &step in &code.steps {
            if step != previous {
                points.push(Point::new(x as u32, y as u32));
            }
            let (dx, dy) = step.delta();
            x += dx;
            y += dy;
            previous = step;
        }
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shoelace area with sign: positive for clockwise loops on screen (y down).
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
            })
            .sum();
        twice as f64 / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Length of the closed loop.
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| distance(self.points[i], self.points[(i + 1) % n]))
            .sum()
    }

    /// `perimeter^2 / (4 pi area) - 1`: 0 for a circle, growing with elongation and
    /// jaggedness. Small negative results from rounding are clamped to 0.
    pub fn circularity(&self) -> Result<f64> {
        let area = self.area();
        if area == 0.0 {
            return Err(BlobError::DegenerateGeometry(format!(
                "circularity of a polygon with zero area ({} vertices)",
                self.points.len()
            )));
        }
        let perimeter = self.perimeter();
        Ok((perimeter * perimeter / (4.0 * PI * area) - 1.0).max(0.0))
    }

    /// Ramer-Douglas-Peucker simplification of the closed loop. A vertex survives
    /// when its perpendicular distance to the line through its retained
    /// neighbours exceeds `delta`. `delta == 0` returns the polygon unchanged.
    pub fn simplify(&self, delta: f64) -> Result<Polygon> {
        if delta.is_nan() || delta < 0.0 {
            return Err(BlobError::ArgumentOutOfRange(format!(
                "simplify tolerance must be non-negative, got {delta}"
            )));
        }
        if delta == 0.0 || self.points.len() < 3 {
            return Ok(self.clone());
        }
        Ok(self.simplify_with(delta))
    }

    pub fn simplify_default(&self) -> Polygon {
        if self.points.len() < 3 {
            return self.clone();
        }
        self.simplify_with(DEFAULT_SIMPLIFY_DELTA)
    }

    fn simplify_with(&self, delta: f64) -> Polygon {
        let points = &self.points;
        let n = points.len();

        // Split the loop at vertex 0 and the vertex farthest from it.
        let mut farthest = 1;
        let mut farthest_distance = distance(points[0], points[1]);
        for (i, &p) in points.iter().enumerate().skip(2) {
            let d = distance(points[0], p);
            if d > farthest_distance {
                farthest = i;
                farthest_distance = d;
            }
        }

        let mut keep = vec![false; n];
        keep[0] = true;
        keep[farthest] = true;

        // Index `n` stands for vertex 0 closing the loop.
        let mut stack = vec![(0, farthest), (farthest, n)];
        while let Some((first, last)) = stack.pop() {
            if last <= first + 1 {
                continue;
            }
            let a = points[first % n];
            let b = points[last % n];
            let mut worst = first;
            let mut worst_distance = 0.0;
            for i in first + 1..last {
                let d = line_distance(points[i % n], a, b);
                if d > worst_distance {
                    worst = i;
                    worst_distance = d;
                }
            }
            if worst_distance > delta {
                keep[worst % n] = true;
                stack.push((first, worst));
                stack.push((worst, last));
            }
        }

        let simplified: Vec<Point> = points
            .iter()
            .zip(&keep)
            .filter_map(|(&p, &k)| k.then_some(p))
            .collect();
        tracing::trace!(from = n, to = simplified.len(), delta, "simplified polygon");
        Polygon::new(simplified)
    }

    /// Convex hull by Melkman's algorithm over the vertices in boundary order.
    ///
    /// Traced outlines may touch themselves (one-pixel spurs walked out and back,
    /// lobes joined through a single pixel) and revisit vertices. Such a loop is
    /// still accepted: when the boundary-order pass does not produce a hull that
    /// encloses every vertex, Melkman is rerun over the vertices in lexicographic
    /// order, which always forms a simple chain. Only a loop whose edges properly
    /// cross each other is rejected with `InvalidInput`.
    pub fn convex_hull(&self) -> Result<Polygon> {
        let mut points: Vec<Point> = Vec::with_capacity(self.points.len());
        for &p in &self.points {
            if points.last() != Some(&p) {
                points.push(p);
            }
        }
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }

        if points.len() < 3 {
            return Err(BlobError::DegenerateGeometry(format!(
                "convex hull needs at least 3 distinct vertices, got {}",
                points.len()
            )));
        }
        let origin = points[0];
        let collinear = match points.iter().find(|&&p| p != origin) {
            Some(&other) => points.iter().all(|&p| cross(origin, other, p) == 0),
            None => true,
        };
        if collinear {
            return Err(BlobError::DegenerateGeometry(
                "all polygon vertices are collinear".to_string(),
            ));
        }

        let boundary_hull = melkman(&points).and_then(|hull| enclosing(hull, &points));
        let mut hull = match boundary_hull {
            Some(hull) => hull,
            None => {
                if has_proper_crossing(&points) {
                    return Err(BlobError::InvalidInput(
                        "convex hull requires a polygon whose edges do not cross".to_string(),
                    ));
                }
                let mut sorted = points.clone();
                sorted.sort_unstable();
                sorted.dedup();
                tracing::trace!(vertices = points.len(), "hull rerun over sorted vertices");
                melkman(&sorted)
                    .and_then(|hull| enclosing(hull, &points))
                    .ok_or_else(|| {
                        BlobError::InvalidInput(
                            "convex hull does not enclose the polygon".to_string(),
                        )
                    })?
            }
        };

        if self.signed_area() < 0.0 {
            hull.reverse();
        }
        Ok(Polygon::new(hull))
    }

    /// Point-in-polygon test; points on an edge count as inside.
    pub fn contains(&self, p: Point) -> bool {
        let n = self.points.len();
        match n {
            0 => return false,
            1 => return self.points[0] == p,
            _ => {}
        }

        let (px, py) = (p.x as f64, p.y as f64);
        let mut inside = false;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            if on_segment(p, a, b) {
                return true;
            }
            let (ax, ay, bx, by) = (a.x as f64, a.y as f64, b.x as f64, b.y as f64);
            if (ay > py) != (by > py) {
                let x_cross = ax + (py - ay) * (bx - ax) / (by - ay);
                if px < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

/// Melkman's deque pass over a chain. Correct when the chain is simple; callers
/// check the result with [`enclosing`].
fn melkman(points: &[Point]) -> Option<Vec<Point>> {
    let seed = (2..points.len()).find(|&i| cross(points[0], points[1], points[i]) != 0)?;
    let (a, b, c) = (points[0], points[seed - 1], points[seed]);
    let mut deque: VecDeque<Point> = if cross(a, b, c) > 0 {
        VecDeque::from(vec![c, a, b, c])
    } else {
        VecDeque::from(vec![c, b, a, c])
    };

    for &p in &points[seed + 1..] {
        let len = deque.len();
        if cross(deque[0], deque[1], p) > 0 && cross(deque[len - 2], deque[len - 1], p) > 0 {
            continue;
        }

        while deque.len() >= 2 && cross(deque[deque.len() - 2], deque[deque.len() - 1], p) <= 0 {
            deque.pop_back();
        }
        deque.push_back(p);

        while deque.len() >= 2 && cross(p, deque[0], deque[1]) <= 0 {
            deque.pop_front();
        }
        deque.push_front(p);
    }

    // Front and back hold the same vertex.
    deque.pop_back();
    Some(deque.into_iter().collect())
}

/// Drops repeated and collinear vertices from `hull`, then returns it only if it
/// is a strictly convex loop with every point of `points` inside or on it.
fn enclosing(mut hull: Vec<Point>, points: &[Point]) -> Option<Vec<Point>> {
    loop {
        let n = hull.len();
        if n < 3 {
            return None;
        }
        let flat = (0..n).find(|&i| cross(hull[(i + n - 1) % n], hull[i], hull[(i + 1) % n]) == 0);
        match flat {
            Some(i) => {
                hull.remove(i);
            }
            None => break,
        }
    }

    let n = hull.len();
    let mut distinct = hull.clone();
    distinct.sort_unstable();
    distinct.dedup();
    let convex = distinct.len() == n
        && (0..n).all(|i| cross(hull[i], hull[(i + 1) % n], hull[(i + 2) % n]) > 0);
    let encloses = points
        .iter()
        .all(|&q| (0..n).all(|i| cross(hull[i], hull[(i + 1) % n], q) >= 0));
    (convex && encloses).then_some(hull)
}

/// Whether two edges of the closed loop cross at a point interior to both.
/// Edges that touch or overlap do not count.
fn has_proper_crossing(points: &[Point]) -> bool {
    let n = points.len();
    let straddles = |d1: i64, d2: i64| (d1 > 0 && d2 < 0) || (d1 < 0 && d2 > 0);
    for i in 0..n {
        let (a, b) = (points[i], points[(i + 1) % n]);
        for j in i + 1..n {
            let (c, d) = (points[j], points[(j + 1) % n]);
            if straddles(cross(a, b, c), cross(a, b, d)) && straddles(cross(c, d, a), cross(c, d, b)) {
                return true;
            }
        }
    }
    false
}

/// Twice the signed area of triangle `o, a, b`.
fn cross(o: Point, a: Point, b: Point) -> i64 {
    let (ox, oy) = (o.x as i64, o.y as i64);
    (a.x as i64 - ox) * (b.y as i64 - oy) - (a.y as i64 - oy) * (b.x as i64 - ox)
}

fn on_segment(p: Point, a: Point, b: Point) -> bool {
    cross(a, b, p) == 0
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}

fn distance(a: Point, b: Point) -> f64 {
    let dx = a.x as f64 - b.x as f64;
    let dy = a.y as f64 - b.y as f64;
    dx.hypot(dy)
}

/// Perpendicular distance from `p` to the line through `a` and `b`, or to `a`
/// when the two coincide.
fn line_distance(p: Point, a: Point, b: Point) -> f64 {
    let length = distance(a, b);
    if length == 0.0 {
        return distance(p, a);
    }
    cross(a, b, p).abs() as f64 / length
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::blob::Label;
    use crate::core_modules::blob_set::BlobSet;
    use image::{GrayImage, Luma};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::collections::{BTreeSet, VecDeque};

    fn poly(points: &[(u32, u32)]) -> Polygon {
        Polygon::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    fn raster_from_rows(rows: &[&str]) -> GrayImage {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        GrayImage::from_fn(width, height, |x, y| {
            let c = rows[y as usize].as_bytes()[x as usize];
            Luma([if c == b'#' { 255 } else { 0 }])
        })
    }

    fn vertex_set(polygon: &Polygon) -> BTreeSet<Point> {
        polygon.points.iter().copied().collect()
    }

    fn random_raster(rng: &mut ChaCha8Rng, width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |_, _| {
            Luma([if rng.gen_bool(0.5) { 255 } else { 0 }])
        })
    }

    /// Pixels not carrying `label` that connect to the raster border through
    /// 4-neighbours without crossing `label`.
    fn exterior_of(set: &BlobSet, label: Label) -> Vec<bool> {
        let (width, height) = set.labels().dimensions();
        let index = |x: u32, y: u32| (y * width + x) as usize;
        let mut outside = vec![false; (width * height) as usize];
        let mut queue = VecDeque::new();
        for y in 0..height {
            for x in 0..width {
                let border = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
                if border && set.get_label(x as i64, y as i64) != label {
                    outside[index(x, y)] = true;
                    queue.push_back((x, y));
                }
            }
        }
        while let Some((x, y)) = queue.pop_front() {
            for (dx, dy) in [(1i64, 0i64), (-1, 0), (0, 1), (0, -1)] {
                let (nx, ny) = (x as i64 + dx, y as i64 + dy);
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }
                let (nx, ny) = (nx as u32, ny as u32);
                if !outside[index(nx, ny)] && set.get_label(nx as i64, ny as i64) != label {
                    outside[index(nx, ny)] = true;
                    queue.push_back((nx, ny));
                }
            }
        }
        outside
    }

    fn blob_pixels(set: &BlobSet, label: Label) -> Vec<Point> {
        set.labels()
            .enumerate_pixels()
            .filter(|(_, _, l)| l[0] == label)
            .map(|(x, y, _)| Point::new(x, y))
            .collect()
    }

    fn assert_hull_encloses_blob(set: &BlobSet, label: Label) -> Polygon {
        let hull = set.polygon(label).unwrap().convex_hull().unwrap();
        for p in blob_pixels(set, label) {
            assert!(hull.contains(p), "blob {label}: pixel {p:?} outside hull {hull:?}");
        }
        hull
    }

    #[test]
    fn chain_code_corners_become_vertices() {
        let set = BlobSet::label(&raster_from_rows(&[
            ".....", //
            ".###.", //
            ".###.", //
            ".###.", //
            ".....",
        ]))
        .unwrap();
        let polygon = set.polygon(1).unwrap();
        assert_eq!(polygon, &poly(&[(1, 1), (3, 1), (3, 3), (1, 3)]));
        assert_eq!(polygon.area(), 4.0);
        assert_eq!(polygon.perimeter(), 8.0);
    }

    #[test]
    fn single_pixel_polygon_has_one_vertex() {
        let set = BlobSet::label(&raster_from_rows(&["...", ".#.", "..."])).unwrap();
        let polygon = set.polygon(1).unwrap();
        assert_eq!(polygon, &poly(&[(1, 1)]));
        assert_eq!(polygon.area(), 0.0);
        assert!(matches!(
            polygon.circularity(),
            Err(BlobError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn rasterized_polygon_reproduces_the_blob() {
        let shapes: [&[&str]; 3] = [
            &[
                "........", //
                "..###...", //
                "..###...", //
                "#######.", //
                "#######.", //
                "..###...", //
                "..###...",
            ],
            &[
                "#....", //
                "##...", //
                "###..", //
                "####.", //
                "#####",
            ],
            &[
                "......", //
                ".####.", //
                ".####.", //
                ".##...", //
                ".##...",
            ],
        ];
        for rows in shapes {
            let set = BlobSet::label(&raster_from_rows(rows)).unwrap();
            let polygon = set.polygon(1).unwrap();
            let (width, height) = set.labels().dimensions();
            for y in 0..height {
                for x in 0..width {
                    let in_blob = set.get_label(x as i64, y as i64) == 1;
                    assert_eq!(polygon.contains(Point::new(x, y)), in_blob, "pixel ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn area_and_orientation() {
        let clockwise = poly(&[(0, 0), (4, 0), (4, 3), (0, 3)]);
        let mut counter = clockwise.clone();
        counter.points.reverse();
        assert_eq!(clockwise.signed_area(), 12.0);
        assert_eq!(counter.signed_area(), -12.0);
        assert_eq!(counter.area(), 12.0);
        assert_eq!(poly(&[(0, 0), (5, 5)]).area(), 0.0);
    }

    #[test]
    fn circularity_of_square_and_circle() {
        let square = poly(&[(0, 0), (4, 0), (4, 4), (0, 4)]);
        let expected = 4.0 / PI - 1.0;
        assert!((square.circularity().unwrap() - expected).abs() < 1e-12);

        let circle = Polygon::new(
            (0..720)
                .map(|i| {
                    let t = i as f64 * PI / 360.0;
                    Point::new(
                        (2000.0 + 1000.0 * t.cos()).round() as u32,
                        (2000.0 + 1000.0 * t.sin()).round() as u32,
                    )
                })
                .collect(),
        );
        let c = circle.circularity().unwrap();
        assert!((0.0..0.01).contains(&c));
    }

    #[test]
    fn zero_tolerance_is_identity() {
        let polygon = poly(&[(0, 0), (1, 0), (2, 0), (2, 1), (2, 2), (1, 2), (0, 2), (0, 1)]);
        assert_eq!(polygon.simplify(0.0).unwrap(), polygon);
    }

    #[test]
    fn simplify_drops_collinear_and_small_deviations() {
        let polygon = poly(&[
            (0, 0),
            (5, 0),
            (10, 0),
            (10, 5),
            (10, 10),
            (5, 10),
            (0, 10),
            (0, 5),
        ]);
        let simplified = polygon.simplify(0.5).unwrap();
        assert_eq!(simplified, poly(&[(0, 0), (10, 0), (10, 10), (0, 10)]));

        let bumpy = poly(&[(0, 0), (5, 1), (10, 0), (10, 10), (5, 9), (0, 10)]);
        assert_eq!(bumpy.simplify(2.0).unwrap().len(), 4);
        assert_eq!(bumpy.simplify(0.5).unwrap(), bumpy);
        assert_eq!(bumpy.simplify_default(), bumpy.simplify(1.0).unwrap());
    }

    #[test]
    fn simplify_rejects_negative_tolerance() {
        let polygon = poly(&[(0, 0), (4, 0), (4, 4)]);
        assert!(matches!(
            polygon.simplify(-1.0),
            Err(BlobError::ArgumentOutOfRange(_))
        ));
        assert!(polygon.simplify(f64::NAN).is_err());
    }

    #[test]
    fn hull_of_convex_polygon_keeps_every_vertex() {
        let polygon = poly(&[(0, 0), (4, 0), (6, 2), (4, 4), (0, 4)]);
        let hull = polygon.convex_hull().unwrap();
        assert_eq!(vertex_set(&hull), vertex_set(&polygon));
        assert!(hull.len() <= polygon.len());
        assert!(hull.signed_area() > 0.0);
    }

    #[test]
    fn hull_drops_concave_vertices() {
        let l_shape = poly(&[(0, 0), (4, 0), (4, 2), (2, 2), (2, 4), (0, 4)]);
        let hull = l_shape.convex_hull().unwrap();
        assert_eq!(
            vertex_set(&hull),
            vertex_set(&poly(&[(0, 0), (4, 0), (4, 2), (2, 4), (0, 4)]))
        );
    }

    #[test]
    fn hull_keeps_input_orientation() {
        let mut polygon = poly(&[(0, 0), (4, 0), (4, 2), (2, 2), (2, 4), (0, 4)]);
        polygon.points.reverse();
        let hull = polygon.convex_hull().unwrap();
        assert!(hull.signed_area() < 0.0);
    }

    #[test]
    fn hull_rejects_self_intersecting_input() {
        let bowtie = poly(&[(0, 0), (4, 4), (4, 0), (0, 4)]);
        assert!(matches!(
            bowtie.convex_hull(),
            Err(BlobError::InvalidInput(_))
        ));
    }

    #[test]
    fn hull_of_degenerate_input_fails() {
        assert!(matches!(
            poly(&[(0, 0), (3, 0)]).convex_hull(),
            Err(BlobError::DegenerateGeometry(_))
        ));
        assert!(matches!(
            poly(&[(0, 0), (1, 1), (2, 2), (3, 3)]).convex_hull(),
            Err(BlobError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn hull_of_traced_blob_contains_all_pixels() {
        let set = BlobSet::label(&raster_from_rows(&[
            "..#...", //
            ".###..", //
            "#####.", //
            ".#.###", //
            "....#.",
        ]))
        .unwrap();
        let hull = set.polygon(1).unwrap().convex_hull().unwrap();
        for (x, y, label) in set.labels().enumerate_pixels() {
            if label[0] == 1 {
                assert!(hull.contains(Point::new(x, y)));
            }
        }
    }

    #[test]
    fn hull_of_spur_and_bridge_blobs() {
        let caret = BlobSet::label(&raster_from_rows(&[
            ".#.", //
            "#.#",
        ]))
        .unwrap();
        let hull = assert_hull_encloses_blob(&caret, 1);
        assert_eq!(
            vertex_set(&hull),
            vertex_set(&poly(&[(1, 0), (2, 1), (0, 1)]))
        );

        let bridge = BlobSet::label(&raster_from_rows(&[
            "##..", //
            "##..", //
            "..##", //
            "..##",
        ]))
        .unwrap();
        let hull = assert_hull_encloses_blob(&bridge, 1);
        assert_eq!(
            vertex_set(&hull),
            vertex_set(&poly(&[(0, 0), (1, 0), (3, 2), (3, 3), (2, 3), (0, 1)]))
        );

        let spurs = BlobSet::label(&raster_from_rows(&[
            "......#", //
            ".####.#", //
            "######.", //
            ".####..", //
            "...#...", //
            "....#..",
        ]))
        .unwrap();
        assert_eq!(spurs.len(), 1);
        assert_hull_encloses_blob(&spurs, 1);
    }

    #[test]
    fn hull_of_touching_loop_is_accepted() {
        // Out to (4,0) and back along the same edge before closing.
        let polygon = poly(&[(0, 0), (4, 0), (0, 0), (0, 3), (2, 3)]);
        let hull = polygon.convex_hull().unwrap();
        assert_eq!(
            vertex_set(&hull),
            vertex_set(&poly(&[(0, 0), (4, 0), (2, 3), (0, 3)]))
        );
    }

    #[test]
    fn hull_of_random_traced_blobs() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut hulls = 0;
        for _ in 0..300 {
            let size = rng.gen_range(6..12);
            let set = BlobSet::label(&random_raster(&mut rng, size, size)).unwrap();
            for blob in set.iter() {
                let pixels = blob_pixels(&set, blob.label);
                let first = pixels[0];
                let collinear = match pixels.iter().find(|&&p| p != first) {
                    Some(&other) => pixels.iter().all(|&p| cross(first, other, p) == 0),
                    None => true,
                };
                if collinear {
                    assert!(matches!(
                        set.polygon(blob.label).unwrap().convex_hull(),
                        Err(BlobError::DegenerateGeometry(_))
                    ));
                } else {
                    assert_hull_encloses_blob(&set, blob.label);
                    hulls += 1;
                }
            }
        }
        assert!(hulls > 100);
    }

    #[test]
    fn random_traced_polygons_cover_blob_and_holes() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            let size = rng.gen_range(6..12);
            let set = BlobSet::label(&random_raster(&mut rng, size, size)).unwrap();
            for blob in set.iter() {
                let polygon = set.polygon(blob.label).unwrap();
                let outside = exterior_of(&set, blob.label);
                for (x, y, _) in set.labels().enumerate_pixels() {
                    let enclosed = !outside[(y * size + x) as usize];
                    assert_eq!(
                        polygon.contains(Point::new(x, y)),
                        enclosed,
                        "blob {} pixel ({x}, {y})",
                        blob.label
                    );
                }
            }
        }
    }

    #[test]
    fn simplify_measures_perpendicular_distance() {
        // The apex projects past the end of the closing chord (12,0)-(2,0): it
        // lies 1 from the chord's line but sqrt(5) from the chord itself.
        let sliver = poly(&[(2, 0), (12, 0), (0, 1)]);
        assert_eq!(sliver.simplify(1.5).unwrap(), poly(&[(2, 0), (12, 0)]));
        assert_eq!(sliver.simplify(0.5).unwrap(), sliver);

        let on_line = line_distance(Point::new(12, 1), Point::new(0, 0), Point::new(10, 0));
        assert!((on_line - 1.0).abs() < 1e-12);
        let same = line_distance(Point::new(3, 4), Point::new(0, 0), Point::new(0, 0));
        assert!((same - 5.0).abs() < 1e-12);
    }
}
