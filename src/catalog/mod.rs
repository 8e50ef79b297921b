pub mod types;

pub use types::{CatalogError, GranuleRecord};

use crate::bbox::Bbox;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use types::ItemCollection;

/// Root of the CMR STAC API; search endpoints live one provider below it.
pub const CMR_STAC_URL: &str = "https://cmr.earthdata.nasa.gov/stac";

/// Search capability the pipeline depends on: `search(query) -> records`.
pub trait CatalogSearch {
    fn search(&self, query: &SearchQuery) -> Result<Vec<GranuleRecord>, CatalogError>;
}

/// Immutable catalog query: area of interest, time window, collections.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub bbox: Bbox,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub collections: Vec<String>,
    pub page_size: usize,
}

impl SearchQuery {
    pub fn new(bbox: Bbox, start_date: NaiveDate, end_date: NaiveDate, collection: &str) -> Self {
        SearchQuery {
            bbox,
            start_date,
            end_date,
            collections: vec![collection.to_string()],
            page_size: 250,
        }
    }

    /// Closed datetime window in the `start/end` form STAC expects.
    pub fn datetime_window(&self) -> String {
        format!(
            "{}/{}",
            self.start_date.format("%Y-%m-%d"),
            self.end_date.format("%Y-%m-%d")
        )
    }
}

/// Retry policy for transient catalog failures. Delay doubles per attempt
/// up to the cap; authentication and client errors are never retried.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_delay() -> u64 {
    2
}

fn default_max_delay() -> u64 {
    120
}

fn default_timeout() -> u64 {
    60
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: default_max_retries(),
            initial_delay_secs: default_initial_delay(),
            max_delay_secs: default_max_delay(),
            request_timeout_secs: default_timeout(),
        }
    }
}

fn next_delay(current: Duration, max: Duration) -> Duration {
    std::cmp::min(current * 2, max)
}

/// Blocking STAC API client with pagination and bounded-backoff retry.
pub struct CatalogClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl CatalogClient {
    pub fn new(endpoint: impl Into<String>, retry: RetryPolicy) -> Result<Self, CatalogError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(retry.request_timeout_secs))
            .build()?;

        Ok(CatalogClient {
            http,
            endpoint: endpoint.into(),
            retry,
        })
    }

    /// Client for a DAAC provider under the CMR STAC root.
    pub fn for_provider(provider: &str, retry: RetryPolicy) -> Result<Self, CatalogError> {
        Self::new(format!("{}/{}", CMR_STAC_URL, provider), retry)
    }

    fn fetch_page(&self, url: &str, query: Option<&SearchQuery>) -> Result<ItemCollection, CatalogError> {
        let mut delay = Duration::from_secs(self.retry.initial_delay_secs);
        let max_delay = Duration::from_secs(self.retry.max_delay_secs);
        let mut attempt = 0;

        loop {
            match self.fetch_page_once(url, query) {
                Ok(page) => return Ok(page),
                Err(e) if is_transient(&e) && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        error = %e,
                        retry = attempt,
                        max_retries = self.retry.max_retries,
                        delay_secs = delay.as_secs(),
                        "STAC request failed, retrying"
                    );
                    std::thread::sleep(delay);
                    delay = next_delay(delay, max_delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn fetch_page_once(
        &self,
        url: &str,
        query: Option<&SearchQuery>,
    ) -> Result<ItemCollection, CatalogError> {
        let mut request = self.http.get(url);
        if let Some(q) = query {
            request = request.query(&[
                ("bbox", q.bbox.to_query_param()),
                ("datetime", q.datetime_window()),
                ("collections", q.collections.join(",")),
                ("limit", q.page_size.to_string()),
            ]);
        }

        let response = request.send()?;
        let status = response.status();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(CatalogError::Auth {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(CatalogError::Status {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

impl CatalogSearch for CatalogClient {
    /// Run the search and drain all result pages. An empty result set is a
    /// valid outcome, not an error.
    fn search(&self, query: &SearchQuery) -> Result<Vec<GranuleRecord>, CatalogError> {
        let search_url = format!("{}/search", self.endpoint);
        info!(
            url = %search_url,
            collections = %query.collections.join(","),
            window = %query.datetime_window(),
            "searching catalog"
        );

        let mut records = Vec::new();
        let mut page = self.fetch_page(&search_url, Some(query))?;

        loop {
            for item in page.features.drain(..) {
                records.push(item.into_record()?);
            }

            match page.next_link() {
                Some(next) => {
                    let next = next.to_string();
                    debug!(url = %next, "following next page");
                    page = self.fetch_page(&next, None)?;
                }
                None => break,
            }
        }

        info!(count = records.len(), "search complete");
        Ok(records)
    }
}

/// Only network-level failures and server-side errors are worth retrying.
fn is_transient(err: &CatalogError) -> bool {
    match err {
        CatalogError::Http(e) => e.is_timeout() || e.is_connect(),
        CatalogError::Status { code, .. } => *code == 429 || *code >= 500,
        CatalogError::Auth { .. } | CatalogError::Decode(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bbox() -> Bbox {
        Bbox::new(-59.63818, -58.15723, -35.02927, -33.77271).unwrap()
    }

    #[test]
    fn test_datetime_window_format() {
        let query = SearchQuery::new(
            test_bbox(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            "OPERA_L3_DSWX-HLS_V1",
        );

        assert_eq!(query.datetime_window(), "2024-03-01/2024-03-31");
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let max = Duration::from_secs(120);
        let mut delay = Duration::from_secs(2);

        let mut observed = Vec::new();
        for _ in 0..8 {
            delay = next_delay(delay, max);
            observed.push(delay.as_secs());
        }

        assert_eq!(observed, vec![4, 8, 16, 32, 64, 120, 120, 120]);
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&CatalogError::Status {
            code: 503,
            url: String::new()
        }));
        assert!(is_transient(&CatalogError::Status {
            code: 429,
            url: String::new()
        }));
        assert!(!is_transient(&CatalogError::Status {
            code: 404,
            url: String::new()
        }));
        assert!(!is_transient(&CatalogError::Auth {
            code: 401,
            url: String::new()
        }));
        assert!(!is_transient(&CatalogError::Decode("bad json".to_string())));
    }
}
