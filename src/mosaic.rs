use crate::raster::{Bounds, GeoTransform, RasterTile};
use chrono::NaiveDate;
use std::fmt;
use tracing::debug;

/// Relative tolerance when comparing pixel spacings across tiles.
const RESOLUTION_TOLERANCE: f64 = 1e-6;

/// Same-day tiles merged into one continuous raster at native resolution.
#[derive(Debug, Clone)]
pub struct Mosaic {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: String,
    pub nodata: u8,
    pub date: NaiveDate,
}

impl Mosaic {
    pub fn bounds(&self) -> Bounds {
        self.transform.array_bounds(self.height, self.width)
    }

    pub fn value_at(&self, col: usize, row: usize) -> u8 {
        self.data[row * self.width + col]
    }
}

#[derive(Debug)]
pub enum MosaicError {
    NoTiles(NaiveDate),
    NotNorthUp(NaiveDate),
    ResolutionMismatch {
        expected: (f64, f64),
        found: (f64, f64),
    },
    CrsMismatch {
        expected: String,
        found: String,
    },
    ShapeMismatch {
        first: (NaiveDate, usize, usize),
        other: (NaiveDate, usize, usize),
    },
}

impl fmt::Display for MosaicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MosaicError::NoTiles(date) => write!(f, "No tiles to merge for {}", date),
            MosaicError::NotNorthUp(date) => write!(
                f,
                "Tiles for {} carry a rotated geotransform; only axis-aligned tiles can be merged",
                date
            ),
            MosaicError::ResolutionMismatch { expected, found } => write!(
                f,
                "Pixel spacing differs between tiles: {:?} vs {:?}",
                expected, found
            ),
            MosaicError::CrsMismatch { expected, found } => write!(
                f,
                "Tiles are in different coordinate systems: {} vs {}",
                expected, found
            ),
            MosaicError::ShapeMismatch { first, other } => write!(
                f,
                "Cannot stack mosaics of different shapes: {} is {}x{} but {} is {}x{}. \
                 Pick dates with matching tile coverage or handle the mosaics individually.",
                first.0, first.2, first.1, other.0, other.2, other.1
            ),
        }
    }
}

impl std::error::Error for MosaicError {}

/// Merge same-day tiles into one raster covering the union of their
/// bounds, first-wins: where tiles overlap, the earliest tile in the list
/// that has a valid pixel keeps the cell.
///
/// All tiles must be axis-aligned and share pixel spacing and CRS; the
/// merge never resamples.
pub fn merge(tiles: &[RasterTile], date: NaiveDate) -> Result<Mosaic, MosaicError> {
    let first = tiles.first().ok_or(MosaicError::NoTiles(date))?;
    let (pixel_width, pixel_height) = first.transform.pixel_size();

    for tile in tiles {
        if !tile.transform.is_north_up() {
            return Err(MosaicError::NotNorthUp(date));
        }

        let (pw, ph) = tile.transform.pixel_size();
        if !close(pw, pixel_width) || !close(ph, pixel_height) {
            return Err(MosaicError::ResolutionMismatch {
                expected: (pixel_width, pixel_height),
                found: (pw, ph),
            });
        }

        if tile.crs != first.crs {
            return Err(MosaicError::CrsMismatch {
                expected: first.crs.clone(),
                found: tile.crs.clone(),
            });
        }
    }

    let mut bounds = first.bounds();
    for tile in &tiles[1..] {
        bounds = bounds.union(&tile.bounds());
    }

    let width = ((bounds.maxx - bounds.minx) / pixel_width).round() as usize;
    let height = ((bounds.miny - bounds.maxy) / pixel_height).round() as usize;
    let transform = GeoTransform::from_origin(bounds.minx, bounds.maxy, pixel_width, pixel_height);

    let nodata = first.nodata;
    let mut data = vec![nodata; width * height];

    for tile in tiles {
        let (origin_x, origin_y) = tile.transform.origin();
        let col_off = ((origin_x - bounds.minx) / pixel_width).round() as usize;
        let row_off = ((origin_y - bounds.maxy) / pixel_height).round() as usize;

        for row in 0..tile.height {
            for col in 0..tile.width {
                let value = tile.value_at(col, row);
                if value == tile.nodata {
                    continue;
                }

                let out_row = row_off + row;
                let out_col = col_off + col;
                if out_row >= height || out_col >= width {
                    continue;
                }

                let cell = &mut data[out_row * width + out_col];
                if *cell == nodata {
                    *cell = value;
                }
            }
        }
    }

    debug!(%date, width, height, tiles = tiles.len(), "merged mosaic");

    Ok(Mosaic {
        data,
        width,
        height,
        transform,
        crs: first.crs.clone(),
        nodata,
        date,
    })
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= RESOLUTION_TOLERANCE * b.abs().max(a.abs())
}

/// Per-date mosaics aligned along a time axis for joint visualization.
/// All members must share spatial dimensions; there is no implicit
/// resampling or cropping.
#[derive(Debug)]
pub struct MosaicStack {
    mosaics: Vec<Mosaic>,
    width: usize,
    height: usize,
}

impl MosaicStack {
    /// Shape the mosaics would stack into, or the mismatch that prevents it.
    pub fn try_shape(mosaics: &[Mosaic]) -> Result<(usize, usize, usize), MosaicError> {
        let Some(first) = mosaics.first() else {
            return Ok((0, 0, 0));
        };

        for mosaic in &mosaics[1..] {
            if mosaic.width != first.width || mosaic.height != first.height {
                return Err(MosaicError::ShapeMismatch {
                    first: (first.date, first.width, first.height),
                    other: (mosaic.date, mosaic.width, mosaic.height),
                });
            }
        }

        Ok((mosaics.len(), first.height, first.width))
    }

    pub fn stack(mosaics: Vec<Mosaic>) -> Result<Self, MosaicError> {
        let (_, height, width) = Self::try_shape(&mosaics)?;

        Ok(MosaicStack {
            mosaics,
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.mosaics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mosaics.is_empty()
    }

    /// `(time, height, width)` shape of the stacked array.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.mosaics.len(), self.height, self.width)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.mosaics.iter().map(|m| m.date).collect()
    }

    pub fn get(&self, index: usize) -> Option<&Mosaic> {
        self.mosaics.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mosaic> {
        self.mosaics.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODATA: u8 = 255;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 17).unwrap()
    }

    fn tile(origin_x: f64, origin_y: f64, data: Vec<u8>, side: usize) -> RasterTile {
        RasterTile {
            data,
            width: side,
            height: side,
            transform: GeoTransform::from_origin(origin_x, origin_y, 30.0, -30.0),
            crs: "EPSG:32721".to_string(),
            nodata: NODATA,
            palette: None,
        }
    }

    #[test]
    fn test_merge_covers_union_of_bounds() {
        // Two 2x2 tiles, horizontally adjacent
        let left = tile(0.0, 60.0, vec![1, 1, 1, 1], 2);
        let right = tile(60.0, 60.0, vec![2, 2, 2, 2], 2);

        let mosaic = merge(&[left.clone(), right.clone()], date()).unwrap();

        assert_eq!((mosaic.width, mosaic.height), (4, 2));
        assert_eq!(mosaic.bounds(), left.bounds().union(&right.bounds()));

        // Every coordinate takes its value from the covering tile
        assert_eq!(mosaic.value_at(0, 0), 1);
        assert_eq!(mosaic.value_at(1, 1), 1);
        assert_eq!(mosaic.value_at(2, 0), 2);
        assert_eq!(mosaic.value_at(3, 1), 2);
    }

    #[test]
    fn test_merge_first_wins_on_overlap() {
        // Right tile overlaps the left tile's second column
        let left = tile(0.0, 60.0, vec![1, 1, 1, 1], 2);
        let right = tile(30.0, 60.0, vec![2, 2, 2, 2], 2);

        let mosaic = merge(&[left, right], date()).unwrap();

        assert_eq!((mosaic.width, mosaic.height), (3, 2));
        // Overlapping column keeps the first tile's value
        assert_eq!(mosaic.value_at(1, 0), 1);
        assert_eq!(mosaic.value_at(1, 1), 1);
        // Non-overlapping part of the second tile fills normally
        assert_eq!(mosaic.value_at(2, 0), 2);
    }

    #[test]
    fn test_merge_nodata_never_claims_cells() {
        // First tile's second column is nodata; the overlapping tile's
        // valid pixels must show through.
        let left = tile(0.0, 60.0, vec![1, NODATA, 1, NODATA], 2);
        let right = tile(30.0, 60.0, vec![2, 2, 2, 2], 2);

        let mosaic = merge(&[left, right], date()).unwrap();

        assert_eq!(mosaic.value_at(1, 0), 2);
        assert_eq!(mosaic.value_at(1, 1), 2);
    }

    #[test]
    fn test_merge_gap_stays_nodata() {
        // Diagonal tiles leave uncovered corners
        let upper_left = tile(0.0, 120.0, vec![1, 1, 1, 1], 2);
        let lower_right = tile(60.0, 60.0, vec![2, 2, 2, 2], 2);

        let mosaic = merge(&[upper_left, lower_right], date()).unwrap();

        assert_eq!((mosaic.width, mosaic.height), (4, 4));
        assert_eq!(mosaic.value_at(0, 0), 1);
        assert_eq!(mosaic.value_at(3, 3), 2);
        assert_eq!(mosaic.value_at(3, 0), NODATA);
        assert_eq!(mosaic.value_at(0, 3), NODATA);
    }

    #[test]
    fn test_merge_rejects_resolution_mismatch() {
        let a = tile(0.0, 60.0, vec![1, 1, 1, 1], 2);
        let mut b = tile(60.0, 60.0, vec![2, 2, 2, 2], 2);
        b.transform = GeoTransform::from_origin(60.0, 60.0, 10.0, -10.0);

        match merge(&[a, b], date()) {
            Err(MosaicError::ResolutionMismatch { .. }) => {}
            other => panic!("expected resolution mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_rejects_crs_mismatch() {
        let a = tile(0.0, 60.0, vec![1, 1, 1, 1], 2);
        let mut b = tile(60.0, 60.0, vec![2, 2, 2, 2], 2);
        b.crs = "EPSG:32635".to_string();

        match merge(&[a, b], date()) {
            Err(MosaicError::CrsMismatch { .. }) => {}
            other => panic!("expected crs mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_empty_input() {
        match merge(&[], date()) {
            Err(MosaicError::NoTiles(_)) => {}
            other => panic!("expected no-tiles error, got {:?}", other),
        }
    }

    #[test]
    fn test_stack_requires_matching_shapes() {
        let a = merge(&[tile(0.0, 60.0, vec![1, 1, 1, 1], 2)], date()).unwrap();
        let b = merge(
            &[tile(0.0, 60.0, vec![2, 2, 2, 2], 2)],
            NaiveDate::from_ymd_opt(2024, 3, 28).unwrap(),
        )
        .unwrap();

        let stack = MosaicStack::stack(vec![a.clone(), b]).unwrap();
        assert_eq!(stack.shape(), (2, 2, 2));

        let wide = merge(
            &[
                tile(0.0, 60.0, vec![1, 1, 1, 1], 2),
                tile(60.0, 60.0, vec![2, 2, 2, 2], 2),
            ],
            NaiveDate::from_ymd_opt(2024, 3, 28).unwrap(),
        )
        .unwrap();

        match MosaicStack::stack(vec![a, wide]) {
            Err(MosaicError::ShapeMismatch { .. }) => {}
            other => panic!("expected shape mismatch, got {:?}", other),
        }
    }
}
