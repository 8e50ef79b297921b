pub mod gdal;
pub mod transform;
pub mod types;

pub use gdal::{GdalOptions, GdalReader};
pub use transform::{Bounds, GeoTransform};
pub use types::{RasterError, RasterReader, RasterTile};

use std::collections::HashMap;

/// Reader backed by pre-registered tiles. Lets the mosaic and pipeline
/// layers run against synthetic rasters, with no network or GDAL involved.
#[derive(Debug, Default)]
pub struct MemoryReader {
    tiles: HashMap<String, RasterTile>,
}

impl MemoryReader {
    pub fn new() -> Self {
        MemoryReader {
            tiles: HashMap::new(),
        }
    }

    pub fn insert(&mut self, uri: impl Into<String>, tile: RasterTile) {
        self.tiles.insert(uri.into(), tile);
    }
}

impl RasterReader for MemoryReader {
    fn open(&self, uri: &str) -> Result<RasterTile, RasterError> {
        self.tiles
            .get(uri)
            .cloned()
            .ok_or_else(|| RasterError::Open(format!("{}: no such tile", uri)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reader_round_trip() {
        let tile = RasterTile {
            data: vec![1, 2, 3, 4],
            width: 2,
            height: 2,
            transform: GeoTransform::from_origin(0.0, 60.0, 30.0, -30.0),
            crs: "EPSG:32635".to_string(),
            nodata: 255,
            palette: None,
        };

        let mut reader = MemoryReader::new();
        reader.insert("mem://a", tile);

        let read = reader.open("mem://a").unwrap();
        assert_eq!(read.value_at(1, 1), 4);
        assert!(reader.open("mem://missing").is_err());
    }
}
