/// Six-parameter affine geotransform in GDAL coefficient order:
/// `[x_origin, pixel_width, x_rotation, y_origin, y_rotation, pixel_height]`.
///
/// Maps pixel-space `(col, row)` to map-space `(x, y)` measured at the
/// upper-left corner of the pixel. `pixel_height` is negative for the
/// usual north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform([f64; 6]);

/// Geographic extent of a raster in map coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl Bounds {
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            minx: self.minx.min(other.minx),
            miny: self.miny.min(other.miny),
            maxx: self.maxx.max(other.maxx),
            maxy: self.maxy.max(other.maxy),
        }
    }
}

impl GeoTransform {
    pub fn new(coeffs: [f64; 6]) -> Self {
        GeoTransform(coeffs)
    }

    /// North-up transform from an upper-left origin and pixel spacing.
    /// `pixel_height` should be negative for row indices growing southward.
    pub fn from_origin(x_origin: f64, y_origin: f64, pixel_width: f64, pixel_height: f64) -> Self {
        GeoTransform([x_origin, pixel_width, 0.0, y_origin, 0.0, pixel_height])
    }

    pub fn coeffs(&self) -> [f64; 6] {
        self.0
    }

    pub fn origin(&self) -> (f64, f64) {
        (self.0[0], self.0[3])
    }

    pub fn pixel_size(&self) -> (f64, f64) {
        (self.0[1], self.0[5])
    }

    /// True when the rotation terms are zero (axis-aligned pixels).
    pub fn is_north_up(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0
    }

    /// Apply the affine to fractional pixel coordinates.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let [x0, a, b, y0, d, e] = self.0;
        (x0 + a * col + b * row, y0 + d * col + e * row)
    }

    /// Inverse affine, mapping `(x, y)` back to `(col, row)`.
    /// Returns `None` for a degenerate (zero-determinant) transform.
    pub fn invert(&self) -> Option<GeoTransform> {
        let [x0, a, b, y0, d, e] = self.0;
        let det = a * e - b * d;
        if det == 0.0 {
            return None;
        }

        // col = inv_x0 + (e/det) x + (-b/det) y, and symmetrically for row
        let inv_x0 = (b * y0 - e * x0) / det;
        let inv_y0 = (d * x0 - a * y0) / det;
        Some(GeoTransform([
            inv_x0,
            e / det,
            -b / det,
            inv_y0,
            -d / det,
            a / det,
        ]))
    }

    /// Map extent covered by an array of the given shape.
    pub fn array_bounds(&self, rows: usize, cols: usize) -> Bounds {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(cols as f64, 0.0),
            self.apply(0.0, rows as f64),
            self.apply(cols as f64, rows as f64),
        ];

        let mut bounds = Bounds {
            minx: f64::INFINITY,
            miny: f64::INFINITY,
            maxx: f64::NEG_INFINITY,
            maxy: f64::NEG_INFINITY,
        };
        for (x, y) in corners {
            bounds.minx = bounds.minx.min(x);
            bounds.miny = bounds.miny.min(y);
            bounds.maxx = bounds.maxx.max(x);
            bounds.maxy = bounds.maxy.max(y);
        }
        bounds
    }

    /// Per-axis coordinate arrays for an array of the given shape.
    ///
    /// The affine is applied at the first and last pixel of each axis and
    /// the interior is sampled evenly between the two corner coordinates.
    /// For a north-up transform this is exact: every entry equals direct
    /// affine application at that index.
    pub fn coordinate_arrays(&self, rows: usize, cols: usize) -> (Vec<f64>, Vec<f64>) {
        let (x_first, y_first) = self.apply(0.0, 0.0);
        let (x_last, _) = self.apply(cols.saturating_sub(1) as f64, 0.0);
        let (_, y_last) = self.apply(0.0, rows.saturating_sub(1) as f64);

        (
            linspace(x_first, x_last, cols),
            linspace(y_first, y_last, rows),
        )
    }
}

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}
