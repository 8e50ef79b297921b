use chrono::NaiveDate;

use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::bbox::Bbox;
use crate::catalog::{CMR_STAC_URL, RetryPolicy};
use crate::product::Product;
use crate::raster::GdalOptions;

pub mod error;
pub use error::ConfigError;

/// One pipeline run: which product to search, where, when, and how to
/// mosaic the results.
#[derive(Debug, Clone)]
pub struct RunConfig {
    product: Product,
    bbox: Bbox,
    start_date: NaiveDate,
    end_date: NaiveDate,
    dates_of_interest: Vec<NaiveDate>,
    stac_endpoint: Option<String>,
    output_dir: Option<PathBuf>,
    workers: usize,
    stack: bool,
    retry: RetryPolicy,
    gdal: GdalOptions,
}

// Deserializes a RunConfig, ensuring the dates are valid and in order,
// every date of interest falls inside the search window, and the worker
// count is usable.
impl<'de> Deserialize<'de> for RunConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ConfigHelper {
            product: Product,
            bbox: BboxHelper,
            start_date: String,
            end_date: String,
            #[serde(default)]
            dates_of_interest: Vec<String>,
            #[serde(default)]
            stac_endpoint: Option<String>,
            #[serde(default)]
            output_dir: Option<PathBuf>,
            #[serde(default)]
            workers: Option<usize>,
            #[serde(default = "default_stack")]
            stack: bool,
            #[serde(default)]
            retry: Option<RetryPolicy>,
            #[serde(default)]
            gdal: Option<GdalOptions>,
        }

        #[derive(Deserialize)]
        struct BboxHelper {
            xmin: f64,
            xmax: f64,
            ymin: f64,
            ymax: f64,
        }

        fn default_stack() -> bool {
            true
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        let start_date = NaiveDate::parse_from_str(&helper.start_date, "%Y-%m-%d")
            .map_err(|e| D::Error::custom(format!("Invalid start_date format: {}", e)))?;

        let end_date = NaiveDate::parse_from_str(&helper.end_date, "%Y-%m-%d")
            .map_err(|e| D::Error::custom(format!("Invalid end_date format: {}", e)))?;

        if start_date > end_date {
            return Err(D::Error::custom(ConfigError::DateOrder));
        }

        let mut dates_of_interest = Vec::with_capacity(helper.dates_of_interest.len());
        for raw in &helper.dates_of_interest {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| D::Error::custom(format!("Invalid date of interest: {}", e)))?;
            if date < start_date || date > end_date {
                return Err(D::Error::custom(ConfigError::DateOutOfRange(date)));
            }
            dates_of_interest.push(date);
        }

        let workers = match helper.workers {
            Some(0) => return Err(D::Error::custom(ConfigError::Workers)),
            Some(n) => n,
            None => default_workers(),
        };

        let bbox = Bbox::new(
            helper.bbox.xmin,
            helper.bbox.xmax,
            helper.bbox.ymin,
            helper.bbox.ymax,
        )
        .map_err(|e| D::Error::custom(ConfigError::Bbox(e)))?;

        Ok(RunConfig {
            product: helper.product,
            bbox,
            start_date,
            end_date,
            dates_of_interest,
            stac_endpoint: helper.stac_endpoint,
            output_dir: helper.output_dir,
            workers,
            stack: helper.stack,
            retry: helper.retry.unwrap_or_default(),
            gdal: helper.gdal.unwrap_or_default(),
        })
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl RunConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: RunConfig = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn product(&self) -> Product {
        self.product
    }

    pub fn bbox(&self) -> &Bbox {
        &self.bbox
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn dates_of_interest(&self) -> &[NaiveDate] {
        &self.dates_of_interest
    }

    /// Search endpoint: an explicit override, or the product's provider
    /// under the CMR STAC root.
    pub fn stac_endpoint(&self) -> String {
        match &self.stac_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("{}/{}", CMR_STAC_URL, self.product.provider()),
        }
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn stack(&self) -> bool {
        self.stack
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn gdal(&self) -> &GdalOptions {
        &self.gdal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(contents: &str) -> Result<RunConfig, ConfigError> {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("config.json");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();

        RunConfig::from_file(file_path)
    }

    #[test]
    fn test_from_file() {
        let config = write_config(
            r#"
    {
        "product": "dswx-hls",
        "bbox": { "xmin": -59.63818, "xmax": -58.15723, "ymin": -35.02927, "ymax": -33.77271 },
        "start_date": "2024-03-01",
        "end_date": "2024-03-31",
        "dates_of_interest": ["2024-03-01", "2024-03-17", "2024-03-28"]
    }
    "#,
        )
        .unwrap();

        assert_eq!(config.product(), Product::DswxHls);
        assert_eq!(
            config.start_date(),
            NaiveDate::from_ymd_opt(2024, 3, 1).expect("Invalid date")
        );
        assert_eq!(
            config.end_date(),
            NaiveDate::from_ymd_opt(2024, 3, 31).expect("Invalid date")
        );
        assert_eq!(config.dates_of_interest().len(), 3);
        assert!(config.stack());
        assert_eq!(
            config.stac_endpoint(),
            "https://cmr.earthdata.nasa.gov/stac/POCLOUD"
        );
    }

    #[test]
    fn test_reversed_dates_are_rejected() {
        let result = write_config(
            r#"
    {
        "product": "dswx-hls",
        "bbox": { "xmin": -59.6, "xmax": -58.1, "ymin": -35.0, "ymax": -33.7 },
        "start_date": "2024-03-31",
        "end_date": "2024-03-01"
    }
    "#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_date_of_interest_outside_window_is_rejected() {
        let result = write_config(
            r#"
    {
        "product": "dswx-hls",
        "bbox": { "xmin": -59.6, "xmax": -58.1, "ymin": -35.0, "ymax": -33.7 },
        "start_date": "2024-03-01",
        "end_date": "2024-03-31",
        "dates_of_interest": ["2024-04-02"]
    }
    "#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_zero_workers_are_rejected() {
        let result = write_config(
            r#"
    {
        "product": "dist-alert-hls",
        "bbox": { "xmin": 22.93945, "xmax": 25.57617, "ymin": 40.69742, "ymax": 41.68221 },
        "start_date": "2023-08-01",
        "end_date": "2023-09-30",
        "workers": 0
    }
    "#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_endpoint_override() {
        let config = write_config(
            r#"
    {
        "product": "dist-alert-hls",
        "bbox": { "xmin": 22.93945, "xmax": 25.57617, "ymin": 40.69742, "ymax": 41.68221 },
        "start_date": "2023-08-01",
        "end_date": "2023-09-30",
        "stac_endpoint": "http://localhost:8080/stac/LPCLOUD"
    }
    "#,
        )
        .unwrap();

        assert_eq!(config.stac_endpoint(), "http://localhost:8080/stac/LPCLOUD");
        assert_eq!(config.product(), Product::DistAlertHls);
    }
}
