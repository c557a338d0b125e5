use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::output::{daily_output_dir, read_listings_csv, write_listings_csv};
use crate::pipeline::processing::enrich::{Enricher, LookupEnricher};
use crate::pipeline::processing::lookup::LookupIndexes;
use crate::pipeline::processing::scoring::{listing_to_record, passes_keyword_filter};
use crate::types::{ListingRecord, ListingSource};

/// Summary of one daily run
#[derive(Debug, Clone, Default)]
pub struct PipelineResult {
    pub searches_run: usize,
    pub searches_failed: usize,
    pub listings_scraped: usize,
    pub listings_kept: usize,
    pub parcel_matches: usize,
    pub location_matches: usize,
    pub output_file: PathBuf,
}

/// Scrapes every configured search, enriches the rows and writes the day's CSV.
pub struct DailyPipeline<'a> {
    source: &'a dyn ListingSource,
    config: &'a Config,
    jitter: bool,
}

impl<'a> DailyPipeline<'a> {
    pub fn new(source: &'a dyn ListingSource, config: &'a Config) -> Self {
        Self {
            source,
            config,
            jitter: true,
        }
    }

    /// Disable the pause between searches
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    pub fn output_path(&self, date: NaiveDate) -> PathBuf {
        daily_output_dir(&self.config.output.root, date).join(&self.config.output.file_name)
    }

    #[instrument(skip(self), fields(source = self.source.source_name()))]
    pub async fn run(&self, date: NaiveDate) -> Result<PipelineResult> {
        info!("🚀 Starting daily run with {} searches", self.config.searches.len());

        let indexes = LookupIndexes::load(&self.config.lookups)?;
        info!(
            "Loaded {} parcel rows and {} location rows",
            indexes.parcel.len(),
            indexes.location.len()
        );
        let enricher = LookupEnricher::from_indexes(&indexes);

        let mut result = PipelineResult::default();
        let mut records: Vec<ListingRecord> = Vec::new();

        for (i, search) in self.config.searches.iter().enumerate() {
            if i > 0 {
                self.pause().await;
            }

            result.searches_run += 1;
            metrics::scrape::search_run(&search.category);

            let listings = match self.source.fetch_listings(search).await {
                Ok(listings) => listings,
                Err(e) => {
                    warn!("Search {} ({}) failed, skipping: {}", search.search_id, search.category, e);
                    result.searches_failed += 1;
                    metrics::scrape::search_failed(&search.category);
                    continue;
                }
            };
            result.listings_scraped += listings.len();

            let before = records.len();
            for listing in listings.iter().filter(|l| passes_keyword_filter(search, l)) {
                let (record, outcome) = enricher.enrich_with_outcome(listing_to_record(search, listing));
                metrics::enrich::outcome_recorded(outcome);
                if outcome.parcel_matched {
                    result.parcel_matches += 1;
                }
                if outcome.location_matched {
                    result.location_matches += 1;
                }
                records.push(record);
            }
            let kept = records.len() - before;
            metrics::scrape::listings_kept(&search.category, kept);
            info!(
                "✅ Search {} ({}): {} scraped, {} kept",
                search.search_id,
                search.category,
                listings.len(),
                kept
            );
        }

        result.listings_kept = records.len();
        result.output_file = self.output_path(date);
        write_listings_csv(&result.output_file, &records)?;

        info!(
            "📁 Wrote {} listings ({} parcel matches, {} location values) to {}",
            result.listings_kept,
            result.parcel_matches,
            result.location_matches,
            result.output_file.display()
        );
        Ok(result)
    }

    async fn pause(&self) {
        if !self.jitter {
            return;
        }
        let (low, high) = self.config.fetch.delay_bounds_ms();
        let ms = rand::thread_rng().gen_range(low..=high);
        debug!("Sleeping {}ms before next search", ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Counts from re-enriching an existing CSV
#[derive(Debug, Clone, Default)]
pub struct EnrichFileResult {
    pub rows: usize,
    /// Rows without a zip to query, written back as read
    pub rows_unchanged: usize,
    pub parcel_matches: usize,
    pub location_matches: usize,
    pub output_file: PathBuf,
}

/// Re-run enrichment over a consolidated CSV without touching the network.
/// `output` defaults to rewriting `input` in place. Rows without a `zip_code` keep
/// whatever enrichment they already carry, so a daily CSV can be re-run safely.
#[instrument(skip(indexes))]
pub fn enrich_csv_file(
    input: &Path,
    output: Option<&Path>,
    indexes: &LookupIndexes,
) -> Result<EnrichFileResult> {
    let enricher = LookupEnricher::from_indexes(indexes);
    let mut result = EnrichFileResult {
        output_file: output.unwrap_or(input).to_path_buf(),
        ..EnrichFileResult::default()
    };

    let records: Vec<ListingRecord> = read_listings_csv(input)?
        .into_iter()
        .map(|record| {
            if record.zip_code.as_deref().map_or(true, |zip| zip.trim().is_empty()) {
                result.rows_unchanged += 1;
                return record;
            }
            let (record, outcome) = enricher.enrich_with_outcome(record);
            metrics::enrich::outcome_recorded(outcome);
            result.parcel_matches += usize::from(outcome.parcel_matched);
            result.location_matches += usize::from(outcome.location_matched);
            record
        })
        .collect();
    result.rows = records.len();

    if result.rows_unchanged > 0 {
        warn!(
            "{} of {} rows have no zip_code and were left as they were",
            result.rows_unchanged, result.rows
        );
    }

    write_listings_csv(&result.output_file, &records)?;
    info!(
        "Re-enriched {} rows ({} parcel matches, {} unchanged) into {}",
        result.rows,
        result.parcel_matches,
        result.rows_unchanged,
        result.output_file.display()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchDef;
    use crate::error::ScraperError;
    use crate::types::Listing;
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::tempdir;

    struct StaticSource;

    #[async_trait]
    impl ListingSource for StaticSource {
        fn source_name(&self) -> &'static str {
            "static"
        }

        async fn fetch_listings(&self, search: &SearchDef) -> Result<Vec<Listing>> {
            if search.search_id == 2 {
                return Err(ScraperError::Api {
                    message: "HTTP 503".to_string(),
                });
            }
            Ok(vec![Listing {
                mls_listing_id: Some(format!("M{}", search.search_id)),
                address: Some("10 Main St".to_string()),
                price: Some(300_000),
                raw: json!({}),
                ..Listing::default()
            }])
        }
    }

    fn config(root: &Path) -> Config {
        let mut config = Config::from_toml_str(
            r#"
            [[searches]]
            search_id = 1
            category = "Fix_n_flip"
            url = "https://example.com/1"

            [[searches]]
            search_id = 2
            category = "Fix_n_flip"
            url = "https://example.com/2"

            [[searches]]
            search_id = 3
            category = "DADU_play"
            description = "plain homes"
            url = "https://example.com/3"
            "#,
        )
        .unwrap();
        config.output.root = root.join("out");
        config.lookups.parcel_dirs = vec![root.join("missing-parcel")];
        config.lookups.location_dirs = vec![root.join("missing-location")];
        config
    }

    #[tokio::test]
    async fn test_failed_search_is_skipped_and_filter_applied() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        let source = StaticSource;
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let result = DailyPipeline::new(&source, &config)
            .without_jitter()
            .run(date)
            .await
            .unwrap();

        assert_eq!(result.searches_run, 3);
        assert_eq!(result.searches_failed, 1);
        assert_eq!(result.listings_scraped, 2);
        // the DADU listing has no keyword anywhere
        assert_eq!(result.listings_kept, 1);
        assert_eq!(result.parcel_matches, 0);
        assert_eq!(result.output_file, dir.path().join("out/2024/05/01/all_listings.csv"));
        assert!(result.output_file.exists());
    }
}
