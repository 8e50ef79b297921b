use crate::catalog::GranuleRecord;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// Granules organized by acquisition date.
///
/// The grouping key is the UTC timestamp truncated to a calendar date.
/// Duplicate timestamps are expected (overlapping tile footprints from one
/// pass) and every one of them is kept as a separate entry under its date.
#[derive(Debug, Default)]
pub struct GranuleIndex {
    by_date: BTreeMap<NaiveDate, Vec<String>>,
    total_records: usize,
    without_asset: usize,
}

impl GranuleIndex {
    /// Build the index from search records, selecting one asset URI per
    /// record by asset-key substring match. Records without a matching
    /// asset are counted and logged, never silently dropped.
    pub fn build(records: &[GranuleRecord], asset_key: &str) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
        let mut without_asset = 0;

        for record in records {
            match record.asset_matching(asset_key) {
                Some(uri) => {
                    by_date
                        .entry(record.datetime.date_naive())
                        .or_default()
                        .push(uri.to_string());
                }
                None => {
                    without_asset += 1;
                    warn!(id = %record.id, asset_key, "granule has no matching asset");
                }
            }
        }

        GranuleIndex {
            by_date,
            total_records: records.len(),
            without_asset,
        }
    }

    /// Per-date granule counts; dates without granules are excluded.
    pub fn counts(&self) -> Vec<(NaiveDate, usize)> {
        self.by_date
            .iter()
            .filter(|(_, uris)| !uris.is_empty())
            .map(|(date, uris)| (*date, uris.len()))
            .collect()
    }

    /// Asset URIs acquired on the given date, in catalog order.
    pub fn uris_for(&self, date: NaiveDate) -> &[String] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Dates that have at least one granule.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.by_date
            .iter()
            .filter(|(_, uris)| !uris.is_empty())
            .map(|(date, _)| *date)
            .collect()
    }

    /// Record a date of interest even when no granules landed on it; the
    /// entry stays empty and does not appear in `counts()`.
    pub fn ensure_date(&mut self, date: NaiveDate) {
        self.by_date.entry(date).or_default();
    }

    /// Number of indexed asset URIs.
    pub fn len(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_records(&self) -> usize {
        self.total_records
    }

    pub fn without_asset(&self) -> usize {
        self.without_asset
    }

    /// Distinct URI count. Anything below `len()` means the catalog
    /// returned the same asset twice.
    pub fn unique_uris(&self) -> usize {
        self.by_date
            .values()
            .flatten()
            .collect::<HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;

    fn record(id: &str, datetime: &str, assets: &[(&str, &str)]) -> GranuleRecord {
        GranuleRecord {
            id: id.to_string(),
            datetime: datetime.parse::<DateTime<Utc>>().unwrap(),
            assets: assets
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn wtr(uri: &str) -> Vec<(&'static str, &str)> {
        vec![("0_B01_WTR", uri)]
    }

    #[test]
    fn test_grouping_partitions_the_input() {
        let records = vec![
            record("g1", "2024-03-01T14:00:49Z", &wtr("https://x/a.tif")),
            record("g2", "2024-03-01T14:00:49Z", &wtr("https://x/b.tif")),
            record("g3", "2024-03-01T20:12:00Z", &wtr("https://x/c.tif")),
            record("g4", "2024-03-17T14:01:02Z", &wtr("https://x/d.tif")),
        ];

        let index = GranuleIndex::build(&records, "B01_WTR");

        // Union of per-date lists equals the input set: nothing dropped,
        // nothing duplicated.
        assert_eq!(index.len(), records.len());
        assert_eq!(index.unique_uris(), records.len());

        let day1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        assert_eq!(index.uris_for(day1).len(), 3);
        assert_eq!(index.uris_for(day2).len(), 1);
    }

    #[test]
    fn test_duplicate_timestamps_are_preserved() {
        let records = vec![
            record("g1", "2024-03-01T14:00:49Z", &wtr("https://x/a.tif")),
            record("g2", "2024-03-01T14:00:49Z", &wtr("https://x/a.tif")),
        ];

        let index = GranuleIndex::build(&records, "B01_WTR");

        assert_eq!(index.len(), 2);
        assert_eq!(index.unique_uris(), 1);
    }

    #[test]
    fn test_counts_exclude_empty_dates() {
        let records = vec![record("g1", "2024-03-01T14:00:49Z", &wtr("https://x/a.tif"))];

        let mut index = GranuleIndex::build(&records, "B01_WTR");
        index.ensure_date(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());

        let counts = index.counts();
        assert_eq!(counts.len(), 1);
        assert_eq!(
            counts[0],
            (NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 1)
        );

        // The empty entry is still addressable.
        assert!(
            index
                .uris_for(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap())
                .is_empty()
        );
    }

    #[test]
    fn test_records_without_matching_asset_are_counted() {
        let records = vec![
            record("g1", "2024-03-01T14:00:49Z", &wtr("https://x/a.tif")),
            record(
                "g2",
                "2024-03-01T14:00:49Z",
                &[("0_B02_BWTR", "https://x/b.tif")],
            ),
        ];

        let index = GranuleIndex::build(&records, "B01_WTR");

        assert_eq!(index.len(), 1);
        assert_eq!(index.without_asset(), 1);
        assert_eq!(index.total_records(), 2);
    }

    #[test]
    fn test_empty_input_yields_empty_index() {
        let index = GranuleIndex::build(&[], "B01_WTR");

        assert!(index.is_empty());
        assert!(index.counts().is_empty());
        assert!(index.dates().is_empty());
    }
}
