use crate::mosaic::Mosaic;
use crate::raster::RasterError;
use gdal::DriverManager;
use gdal::raster::Buffer;
use gdal::spatial_ref::SpatialRef;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write a mosaic as a single-band byte GeoTIFF with its geotransform,
/// CRS and nodata value, named after the acquisition date. This is the
/// hand-off artifact for rendering frontends.
pub fn write_geotiff(mosaic: &Mosaic, output_dir: &Path) -> Result<PathBuf, RasterError> {
    fs::create_dir_all(output_dir).map_err(|e| RasterError::Write(e.to_string()))?;

    let path = output_dir.join(format!("mosaic_{}.tif", mosaic.date.format("%Y%m%d")));

    let driver = DriverManager::get_driver_by_name("GTiff")
        .map_err(|e| RasterError::Write(e.to_string()))?;

    let mut dataset = driver
        .create_with_band_type::<u8, _>(&path, mosaic.width, mosaic.height, 1)
        .map_err(|e| RasterError::Write(e.to_string()))?;

    dataset
        .set_geo_transform(&mosaic.transform.coeffs())
        .map_err(|e| RasterError::Write(e.to_string()))?;

    if let Some(spatial_ref) = parse_crs(&mosaic.crs) {
        dataset
            .set_spatial_ref(&spatial_ref)
            .map_err(|e| RasterError::Write(e.to_string()))?;
    }

    let mut band = dataset
        .rasterband(1)
        .map_err(|e| RasterError::Write(e.to_string()))?;
    band.set_no_data_value(Some(mosaic.nodata as f64))
        .map_err(|e| RasterError::Write(e.to_string()))?;

    let mut buffer = Buffer::new((mosaic.width, mosaic.height), mosaic.data.clone());
    band.write((0, 0), (mosaic.width, mosaic.height), &mut buffer)
        .map_err(|e| RasterError::Write(e.to_string()))?;

    info!(path = %path.display(), date = %mosaic.date, "wrote mosaic");
    Ok(path)
}

fn parse_crs(crs: &str) -> Option<SpatialRef> {
    if crs.is_empty() {
        return None;
    }

    if let Some(code) = crs.strip_prefix("EPSG:") {
        if let Ok(epsg) = code.parse::<u32>() {
            return SpatialRef::from_epsg(epsg).ok();
        }
    }
    SpatialRef::from_wkt(crs).ok()
}
