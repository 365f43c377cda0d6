//! Screen-space lasso rasterisation.
//!
//! The lasso is recorded as the pixels under the pointer while dragging.
//! Consecutive pointer samples are joined with Bresenham lines so fast drags
//! leave no gaps. Pinning then uses the bounding box of all recorded pixels.

/// Integer screen coordinate `[x, y]`.
pub type Pixel = [i32; 2];

/// Pixels of the line from `a` to `b`, both endpoints included.
///
/// The result runs from the endpoint with the smaller coordinate along the
/// line's major axis, so `bresenham(a, b)` and `bresenham(b, a)` cover the
/// same pixels.
pub fn bresenham(a: Pixel, b: Pixel) -> Vec<Pixel> {
    let shallow = (b[1] - a[1]).abs() < (b[0] - a[0]).abs();
    match (shallow, a[0] > b[0], a[1] > b[1]) {
        (true, true, _) => walk_x(b, a),
        (true, false, _) => walk_x(a, b),
        (false, _, true) => walk_y(b, a),
        (false, _, false) => walk_y(a, b),
    }
}

/// Lines with |slope| < 1, requires `a[0] <= b[0]`.
fn walk_x(a: Pixel, b: Pixel) -> Vec<Pixel> {
    let dx = b[0] - a[0];
    let dy = (b[1] - a[1]).abs();
    let ys = (b[1] - a[1]).signum();

    let mut out = Vec::with_capacity(dx as usize + 1);
    let mut err = 2 * dy - dx;
    let mut y = a[1];
    for x in a[0]..=b[0] {
        out.push([x, y]);
        if err > 0 {
            y += ys;
            err -= 2 * dx;
        }
        err += 2 * dy;
    }
    out
}

/// Lines with |slope| >= 1, requires `a[1] <= b[1]`.
fn walk_y(a: Pixel, b: Pixel) -> Vec<Pixel> {
    let dy = b[1] - a[1];
    let dx = (b[0] - a[0]).abs();
    let xs = (b[0] - a[0]).signum();

    let mut out = Vec::with_capacity(dy as usize + 1);
    let mut err = 2 * dx - dy;
    let mut x = a[0];
    for y in a[1]..=b[1] {
        out.push([x, y]);
        if err > 0 {
            x += xs;
            err -= 2 * dy;
        }
        err += 2 * dx;
    }
    out
}

/// Axis-aligned pixel box, bounds inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Aabb {
    pub min: Pixel,
    pub max: Pixel,
}

impl Aabb {
    /// Bounding box of `points`, `None` when empty.
    pub fn from_points(points: &[Pixel]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Aabb {
            min: *first,
            max: *first,
        };
        for p in rest {
            bounds.min = [bounds.min[0].min(p[0]), bounds.min[1].min(p[1])];
            bounds.max = [bounds.max[0].max(p[0]), bounds.max[1].max(p[1])];
        }
        Some(bounds)
    }

    pub fn width(&self) -> i32 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> i32 {
        self.max[1] - self.min[1]
    }

    /// Whether a (sub-pixel) screen point lies inside the box.
    pub fn contains(&self, point: [f64; 2]) -> bool {
        let [x, y] = point;
        x >= self.min[0] as f64
            && x <= self.max[0] as f64
            && y >= self.min[1] as f64
            && y <= self.max[1] as f64
    }
}

/// A lasso stroke under construction.
#[derive(Clone, Debug, Default)]
pub struct Lasso {
    pixels: Vec<Pixel>,
    last: Option<Pixel>,
}

impl Lasso {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pointer sample, joining it to the previous one.
    pub fn extend_to(&mut self, p: Pixel) {
        match self.last {
            Some(prev) => self.pixels.extend(bresenham(prev, p)),
            None => self.pixels.push(p),
        }
        self.last = Some(p);
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(&self.pixels)
    }

    pub fn clear(&mut self) {
        self.pixels.clear();
        self.last = None;
    }
}

impl FromIterator<Pixel> for Lasso {
    fn from_iter<I: IntoIterator<Item = Pixel>>(iter: I) -> Self {
        let mut lasso = Lasso::new();
        for p in iter {
            lasso.extend_to(p);
        }
        lasso
    }
}
