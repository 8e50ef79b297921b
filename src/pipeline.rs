use crate::catalog::{CatalogClient, CatalogError, CatalogSearch, SearchQuery};
use crate::colormap::ColorMap;
use crate::config::RunConfig;
use crate::export;
use crate::index::GranuleIndex;
use crate::mosaic::{self, Mosaic, MosaicError, MosaicStack};
use crate::raster::{GdalReader, RasterError, RasterReader};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug)]
pub enum PipelineError {
    Catalog(CatalogError),
    Raster(RasterError),
    Mosaic(MosaicError),
    ThreadPool(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Catalog(e) => write!(f, "{}", e),
            PipelineError::Raster(e) => write!(f, "{}", e),
            PipelineError::Mosaic(e) => write!(f, "{}", e),
            PipelineError::ThreadPool(msg) => write!(f, "Failed to start worker pool: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<CatalogError> for PipelineError {
    fn from(err: CatalogError) -> PipelineError {
        PipelineError::Catalog(err)
    }
}

impl From<RasterError> for PipelineError {
    fn from(err: RasterError) -> PipelineError {
        PipelineError::Raster(err)
    }
}

impl From<MosaicError> for PipelineError {
    fn from(err: MosaicError) -> PipelineError {
        PipelineError::Mosaic(err)
    }
}

/// Outcome of one pipeline run: the index summary, the per-date mosaics,
/// and the render hand-off (color map, exported files).
#[derive(Debug)]
pub struct RunReport {
    pub total_records: usize,
    pub indexed: usize,
    pub unique_uris: usize,
    pub without_asset: usize,
    pub counts: Vec<(NaiveDate, usize)>,
    pub mosaics: Vec<Mosaic>,
    /// Dates whose mosaic could not be built, with the reason.
    pub failures: Vec<(NaiveDate, String)>,
    /// `(time, height, width)` when stacking was requested and succeeded.
    pub stack_shape: Option<(usize, usize, usize)>,
    pub colormap: Option<ColorMap>,
    pub outputs: Vec<PathBuf>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Granules found intersecting AOI: {} ({} indexed, {} unique assets, {} without a matching asset)",
            self.total_records, self.indexed, self.unique_uris, self.without_asset
        )?;

        if !self.counts.is_empty() {
            writeln!(f, "\nGranules per day:")?;
            for (date, count) in &self.counts {
                writeln!(f, "  {}  {}", date, count)?;
            }
        }

        if !self.mosaics.is_empty() {
            writeln!(f, "\nMosaics:")?;
            for mosaic in &self.mosaics {
                writeln!(
                    f,
                    "  {}  {} x {} pixels ({})",
                    mosaic.date, mosaic.height, mosaic.width, mosaic.crs
                )?;
            }
        }

        if !self.failures.is_empty() {
            writeln!(f, "\nFailed dates:")?;
            for (date, reason) in &self.failures {
                writeln!(f, "  {}  {}", date, reason)?;
            }
        }

        if let Some((t, h, w)) = self.stack_shape {
            writeln!(f, "\nStacked time series: {} x {} x {}", t, h, w)?;
        }

        for path in &self.outputs {
            writeln!(f, "Wrote {}", path.display())?;
        }

        Ok(())
    }
}

/// The full discovery-to-mosaic pipeline. Generic over the catalog and
/// raster collaborators so runs can be driven against synthetic data.
pub struct Pipeline<C: CatalogSearch, R: RasterReader> {
    config: RunConfig,
    catalog: C,
    reader: R,
}

impl Pipeline<CatalogClient, GdalReader> {
    /// Production pipeline: CMR STAC catalog + GDAL raster access.
    pub fn new(config: RunConfig) -> Result<Self, PipelineError> {
        let catalog = CatalogClient::new(config.stac_endpoint(), config.retry())?;
        let reader = GdalReader::new(config.gdal(), config.product().fill_value())?;

        Ok(Pipeline {
            config,
            catalog,
            reader,
        })
    }
}

impl<C: CatalogSearch + Sync, R: RasterReader + Sync> Pipeline<C, R> {
    pub fn with_collaborators(config: RunConfig, catalog: C, reader: R) -> Self {
        Pipeline {
            config,
            catalog,
            reader,
        }
    }

    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let product = self.config.product();
        let query = SearchQuery::new(
            *self.config.bbox(),
            self.config.start_date(),
            self.config.end_date(),
            product.collection(),
        );

        let records = self.catalog.search(&query)?;
        let mut index = GranuleIndex::build(&records, product.asset_key());

        let dates: Vec<NaiveDate> = if self.config.dates_of_interest().is_empty() {
            index.dates()
        } else {
            self.config.dates_of_interest().to_vec()
        };
        for &date in &dates {
            index.ensure_date(date);
        }

        let colormap = self.build_colormap(&index, &dates);

        // Dates are independent, so mosaics build on a bounded worker pool.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers())
            .build()
            .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;

        let results: Vec<(NaiveDate, Result<Option<Mosaic>, PipelineError>)> = pool.install(|| {
            dates
                .par_iter()
                .map(|&date| (date, self.mosaic_for(date, &index)))
                .collect()
        });

        let mut mosaics = Vec::new();
        let mut failures = Vec::new();
        for (date, result) in results {
            match result {
                Ok(Some(mosaic)) => mosaics.push(mosaic),
                Ok(None) => {}
                Err(e) => {
                    warn!(%date, error = %e, "mosaic failed");
                    failures.push((date, e.to_string()));
                }
            }
        }

        let stack_shape = if self.config.stack() && mosaics.len() > 1 {
            Some(MosaicStack::try_shape(&mosaics)?)
        } else {
            None
        };

        let mut outputs = Vec::new();
        if let Some(output_dir) = self.config.output_dir() {
            for mosaic in &mosaics {
                outputs.push(export::write_geotiff(mosaic, output_dir)?);
            }
        }

        Ok(RunReport {
            total_records: index.total_records(),
            indexed: index.len(),
            unique_uris: index.unique_uris(),
            without_asset: index.without_asset(),
            counts: index.counts(),
            mosaics,
            failures,
            stack_shape,
            colormap,
            outputs,
        })
    }

    /// Merge one date's tiles. A date without granules is a valid empty
    /// outcome; any tile fetch failure aborts the whole date.
    fn mosaic_for(
        &self,
        date: NaiveDate,
        index: &GranuleIndex,
    ) -> Result<Option<Mosaic>, PipelineError> {
        let uris = index.uris_for(date);
        if uris.is_empty() {
            warn!(%date, "no granules for date, skipping");
            return Ok(None);
        }

        info!(%date, tiles = uris.len(), "building mosaic");
        let mut tiles = Vec::with_capacity(uris.len());
        for uri in uris {
            tiles.push(self.reader.open(uri)?);
        }

        Ok(Some(mosaic::merge(&tiles, date)?))
    }

    /// Color map from the first sample tile, with product overrides. The
    /// run proceeds without one if the sample carries no palette.
    fn build_colormap(&self, index: &GranuleIndex, dates: &[NaiveDate]) -> Option<ColorMap> {
        let sample_uri = dates
            .iter()
            .flat_map(|&date| index.uris_for(date).first())
            .next()?;

        let tile = match self.reader.open(sample_uri) {
            Ok(tile) => tile,
            Err(e) => {
                warn!(uri = %sample_uri, error = %e, "could not open color map sample");
                return None;
            }
        };

        match ColorMap::from_tile(&tile, sample_uri) {
            Ok(colormap) => Some(
                colormap.with_overrides(&self.config.product().color_overrides()),
            ),
            Err(e) => {
                warn!(uri = %sample_uri, error = %e, "no usable color table in sample");
                None
            }
        }
    }
}
