use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// One catalog search hit, validated at the client boundary.
#[derive(Debug, Clone)]
pub struct GranuleRecord {
    pub id: String,
    pub datetime: DateTime<Utc>,
    /// Asset name -> fetchable URI.
    pub assets: HashMap<String, String>,
}

impl GranuleRecord {
    /// URI of the first asset whose key contains `key`. Keys are scanned
    /// in sorted order so repeated lookups are deterministic.
    pub fn asset_matching(&self, key: &str) -> Option<&str> {
        let mut names: Vec<&String> = self.assets.keys().collect();
        names.sort();
        names
            .into_iter()
            .find(|name| name.contains(key))
            .map(|name| self.assets[name].as_str())
    }
}

#[derive(Debug)]
pub enum CatalogError {
    Http(reqwest::Error),
    Status { code: u16, url: String },
    Auth { code: u16, url: String },
    Decode(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Http(e) => write!(f, "STAC request failed: {}", e),
            CatalogError::Status { code, url } => {
                write!(f, "STAC request returned HTTP {}: {}", code, url)
            }
            CatalogError::Auth { code, url } => write!(
                f,
                "Authentication rejected (HTTP {}) for {}. Ensure a .netrc file \
                 containing valid NASA Earthdata credentials exists in the user \
                 home directory.",
                code, url
            ),
            CatalogError::Decode(msg) => write!(f, "Failed to parse STAC response: {}", msg),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> CatalogError {
        CatalogError::Http(err)
    }
}

// Wire shape of a STAC item-collection page. Only the fields the pipeline
// consumes are modeled; everything else is ignored.

#[derive(Debug, Deserialize)]
pub(crate) struct ItemCollection {
    #[serde(default)]
    pub features: Vec<StacItem>,
    #[serde(default)]
    pub links: Vec<StacLink>,
}

impl ItemCollection {
    pub fn next_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == "next")
            .map(|link| link.href.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StacItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub properties: StacProperties,
    #[serde(default)]
    pub assets: HashMap<String, StacAsset>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StacProperties {
    pub datetime: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StacAsset {
    pub href: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StacLink {
    #[serde(default)]
    pub rel: String,
    #[serde(default)]
    pub href: String,
}

impl StacItem {
    /// Validate the raw item into a `GranuleRecord`, rejecting items with
    /// no parseable timestamp or no assets.
    pub fn into_record(self) -> Result<GranuleRecord, CatalogError> {
        let raw = self.properties.datetime.ok_or_else(|| {
            CatalogError::Decode(format!("item '{}' has no properties.datetime", self.id))
        })?;

        let datetime = DateTime::parse_from_rfc3339(&raw)
            .map_err(|e| {
                CatalogError::Decode(format!("item '{}' datetime '{}': {}", self.id, raw, e))
            })?
            .with_timezone(&Utc);

        if self.assets.is_empty() {
            return Err(CatalogError::Decode(format!(
                "item '{}' has no assets",
                self.id
            )));
        }

        let assets = self
            .assets
            .into_iter()
            .map(|(name, asset)| (name, asset.href))
            .collect();

        Ok(GranuleRecord {
            id: self.id,
            datetime,
            assets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_item() -> serde_json::Value {
        json!({
            "id": "OPERA_L3_DSWX-HLS_T21HUB_20240301T140049Z",
            "properties": { "datetime": "2024-03-01T14:00:49Z" },
            "assets": {
                "0_B01_WTR": { "href": "https://archive.example.gov/T21HUB_B01_WTR.tif" },
                "0_B02_BWTR": { "href": "https://archive.example.gov/T21HUB_B02_BWTR.tif" }
            }
        })
    }

    #[test]
    fn test_item_validates_into_record() {
        let item: StacItem = serde_json::from_value(sample_item()).unwrap();
        let record = item.into_record().unwrap();

        assert_eq!(record.datetime.date_naive().to_string(), "2024-03-01");
        assert_eq!(
            record.asset_matching("B01_WTR"),
            Some("https://archive.example.gov/T21HUB_B01_WTR.tif")
        );
        assert_eq!(record.asset_matching("VEG-DIST-STATUS"), None);
    }

    #[test]
    fn test_item_without_datetime_is_rejected() {
        let mut raw = sample_item();
        raw["properties"] = json!({});
        let item: StacItem = serde_json::from_value(raw).unwrap();

        let err = item.into_record().unwrap_err();
        assert!(err.to_string().contains("properties.datetime"));
    }

    #[test]
    fn test_item_without_assets_is_rejected() {
        let mut raw = sample_item();
        raw["assets"] = json!({});
        let item: StacItem = serde_json::from_value(raw).unwrap();

        assert!(item.into_record().is_err());
    }

    #[test]
    fn test_next_link_lookup() {
        let page: ItemCollection = serde_json::from_value(json!({
            "features": [],
            "links": [
                { "rel": "self", "href": "https://stac.example.gov/search" },
                { "rel": "next", "href": "https://stac.example.gov/search?page=2" }
            ]
        }))
        .unwrap();

        assert_eq!(
            page.next_link(),
            Some("https://stac.example.gov/search?page=2")
        );
    }
}
