use super::transform::GeoTransform;
use super::types::{RasterError, RasterReader, RasterTile};
use gdal::Dataset;
use serde::Deserialize;
use tracing::debug;

/// GDAL process-wide options needed for authenticated cloud access,
/// gathered into one explicit value instead of scattered mutations of
/// interpreter state. Applied once, when the reader is constructed.
#[derive(Debug, Clone, Deserialize)]
pub struct GdalOptions {
    #[serde(default = "default_cookie_file")]
    pub cookie_file: String,
    #[serde(default = "default_cookie_file")]
    pub cookie_jar: String,
    #[serde(default = "default_readdir")]
    pub disable_readdir_on_open: String,
    #[serde(default = "default_extensions")]
    pub allowed_extensions: String,
}

fn default_cookie_file() -> String {
    "~/.gdal_cookies.txt".to_string()
}

fn default_readdir() -> String {
    "EMPTY_DIR".to_string()
}

fn default_extensions() -> String {
    "TIF, TIFF".to_string()
}

impl Default for GdalOptions {
    fn default() -> Self {
        GdalOptions {
            cookie_file: default_cookie_file(),
            cookie_jar: default_cookie_file(),
            disable_readdir_on_open: default_readdir(),
            allowed_extensions: default_extensions(),
        }
    }
}

impl GdalOptions {
    fn apply(&self) -> Result<(), RasterError> {
        let pairs = [
            ("GDAL_HTTP_COOKIEFILE", self.cookie_file.as_str()),
            ("GDAL_HTTP_COOKIEJAR", self.cookie_jar.as_str()),
            (
                "GDAL_DISABLE_READDIR_ON_OPEN",
                self.disable_readdir_on_open.as_str(),
            ),
            (
                "CPL_VSIL_CURL_ALLOWED_EXTENSIONS",
                self.allowed_extensions.as_str(),
            ),
        ];

        for (key, value) in pairs {
            gdal::config::set_config_option(key, value)
                .map_err(|e| RasterError::Open(format!("GDAL option {}: {}", key, e)))?;
        }
        Ok(())
    }
}

/// GDAL-backed raster reader. Remote http(s) assets are opened through the
/// `/vsicurl/` virtual filesystem, which picks up EarthData credentials
/// from `~/.netrc`.
pub struct GdalReader {
    default_nodata: u8,
}

impl GdalReader {
    pub fn new(options: &GdalOptions, default_nodata: u8) -> Result<Self, RasterError> {
        options.apply()?;
        Ok(GdalReader { default_nodata })
    }
}

impl RasterReader for GdalReader {
    fn open(&self, uri: &str) -> Result<RasterTile, RasterError> {
        let path = vsi_path(uri);
        debug!(path = %path, "opening raster");

        let dataset =
            Dataset::open(&path).map_err(|e| RasterError::Open(format!("{}: {}", uri, e)))?;

        let coeffs = dataset
            .geo_transform()
            .map_err(|_| RasterError::MissingTransform(uri.to_string()))?;
        let transform = GeoTransform::new(coeffs);

        let (width, height) = dataset.raster_size();
        let band = dataset
            .rasterband(1)
            .map_err(|e| RasterError::Read(format!("{}: {}", uri, e)))?;

        let buffer = band
            .read_as::<u8>((0, 0), (width, height), (width, height), None)
            .map_err(|e| RasterError::Read(format!("{}: {}", uri, e)))?;

        let nodata = band
            .no_data_value()
            .map(|v| v as u8)
            .unwrap_or(self.default_nodata);

        let palette = band.color_table().map(|table| {
            (0..256)
                .map(|i| match table.entry(i) {
                    Some(entry) => (
                        entry.c1.clamp(0, 255) as u8,
                        entry.c2.clamp(0, 255) as u8,
                        entry.c3.clamp(0, 255) as u8,
                        entry.c4.clamp(0, 255) as u8,
                    ),
                    None => (0, 0, 0, 0),
                })
                .collect()
        });

        let crs = read_crs(&dataset);

        Ok(RasterTile {
            data: buffer.data().to_vec(),
            width,
            height,
            transform,
            crs,
            nodata,
            palette,
        })
    }
}

/// Prefer the compact `EPSG:<code>` form; fall back to WKT for rasters
/// without an authority-registered CRS.
fn read_crs(dataset: &Dataset) -> String {
    if let Ok(spatial_ref) = dataset.spatial_ref() {
        if let (Ok(name), Ok(code)) = (spatial_ref.auth_name(), spatial_ref.auth_code()) {
            return format!("{}:{}", name, code);
        }
        if let Ok(wkt) = spatial_ref.to_wkt() {
            return wkt;
        }
    }
    String::new()
}

fn vsi_path(uri: &str) -> String {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        format!("/vsicurl/{}", uri)
    } else {
        uri.to_string()
    }
}
