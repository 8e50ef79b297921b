use super::transform::{Bounds, GeoTransform};
use std::fmt;

/// One decoded raster tile: byte classification data plus georeferencing.
#[derive(Debug, Clone)]
pub struct RasterTile {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    /// CRS identifier, `EPSG:<code>` when the authority is known,
    /// otherwise the raw WKT definition.
    pub crs: String,
    pub nodata: u8,
    /// Embedded 256-entry color table, when the file carries one.
    pub palette: Option<Vec<(u8, u8, u8, u8)>>,
}

impl RasterTile {
    pub fn bounds(&self) -> Bounds {
        self.transform.array_bounds(self.height, self.width)
    }

    pub fn value_at(&self, col: usize, row: usize) -> u8 {
        self.data[row * self.width + col]
    }
}

/// Raster access capability: `open(uri) -> tile`.
///
/// The pipeline only depends on this trait; the GDAL-backed reader is one
/// implementation, the in-memory reader another.
pub trait RasterReader {
    fn open(&self, uri: &str) -> Result<RasterTile, RasterError>;
}

#[derive(Debug)]
pub enum RasterError {
    Open(String),
    Read(String),
    MissingTransform(String),
    Write(String),
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::Open(msg) => write!(f, "Failed to open raster: {}", msg),
            RasterError::Read(msg) => write!(f, "Failed to read raster: {}", msg),
            RasterError::MissingTransform(uri) => {
                write!(f, "Raster has no geotransform: {}", uri)
            }
            RasterError::Write(msg) => write!(f, "Failed to write raster: {}", msg),
        }
    }
}

impl std::error::Error for RasterError {}
