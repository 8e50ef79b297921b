use serde::Deserialize;
use std::fmt::Display;

/// OPERA data products the pipeline knows how to search and render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Product {
    /// Land surface disturbance alerts (wildfire impact mapping).
    #[serde(rename(deserialize = "dist-alert-hls"))]
    DistAlertHls,
    /// Dynamic surface water extent (flood mapping).
    #[serde(rename(deserialize = "dswx-hls"))]
    DswxHls,
}

/// Render-time palette overrides for a byte-classified product.
///
/// Class lists are product metadata taken from the product specification,
/// not a generic algorithm: a new product needs its own lists.
#[derive(Debug, Clone, Copy)]
pub struct ColorOverrides {
    /// Classes forced to `emphasis_color` (e.g. every water-present class).
    pub emphasis: &'static [u8],
    pub emphasis_color: (u8, u8, u8, u8),
    /// Classes forced fully transparent (land background and fill).
    pub transparent: &'static [u8],
}

impl Product {
    pub fn collection(&self) -> &'static str {
        match self {
            Product::DistAlertHls => "OPERA_L3_DIST-ALERT-HLS_V1",
            Product::DswxHls => "OPERA_L3_DSWX-HLS_V1",
        }
    }

    /// DAAC cloud provider hosting the product under the CMR STAC root.
    pub fn provider(&self) -> &'static str {
        match self {
            Product::DistAlertHls => "LPCLOUD",
            Product::DswxHls => "POCLOUD",
        }
    }

    /// Substring selecting the asset of interest among a granule's assets.
    ///
    /// DSWx asset keys are numbered (`0_B01_WTR`), so the match is on the
    /// stable band suffix rather than the full key.
    pub fn asset_key(&self) -> &'static str {
        match self {
            Product::DistAlertHls => "VEG-DIST-STATUS",
            Product::DswxHls => "B01_WTR",
        }
    }

    /// Fill value used for unobserved pixels in the classification layer.
    pub fn fill_value(&self) -> u8 {
        255
    }

    pub fn color_overrides(&self) -> ColorOverrides {
        match self {
            // VEG-DIST-STATUS: 1/3 provisional, 2/4 confirmed disturbance
            Product::DistAlertHls => ColorOverrides {
                emphasis: &[1, 2, 3, 4],
                emphasis_color: (255, 0, 0, 255),
                transparent: &[0, 255],
            },
            // B01_WTR: 1 open water, 2 partial water, 252 ice-covered water
            Product::DswxHls => ColorOverrides {
                emphasis: &[1, 2, 252],
                emphasis_color: (0, 0, 255, 255),
                transparent: &[0, 255],
            },
        }
    }
}

impl Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Product::DistAlertHls => write!(f, "DIST-ALERT-HLS"),
            Product::DswxHls => write!(f, "DSWx-HLS"),
        }
    }
}
