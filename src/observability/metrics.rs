//! Counters for the daily run.
//!
//! Recorded through the `metrics` facade; they stay inert unless the embedding
//! application installs a recorder.

use std::fmt;

/// Every metric name used by the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    SearchesRun,
    SearchesFailed,
    ListingsParsed,
    ListingsKept,
    LookupRowsSkipped,
    EnrichParcelMatches,
    EnrichLocationMatches,
    EnrichMisses,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SearchesRun => "listing_searches_run_total",
            MetricName::SearchesFailed => "listing_searches_failed_total",
            MetricName::ListingsParsed => "listing_listings_parsed_total",
            MetricName::ListingsKept => "listing_listings_kept_total",
            MetricName::LookupRowsSkipped => "listing_lookup_rows_skipped_total",
            MetricName::EnrichParcelMatches => "listing_enrich_parcel_matches_total",
            MetricName::EnrichLocationMatches => "listing_enrich_location_matches_total",
            MetricName::EnrichMisses => "listing_enrich_misses_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub mod scrape {
    use super::MetricName;

    pub fn search_run(category: &str) {
        ::metrics::counter!(MetricName::SearchesRun.as_str(), "category" => category.to_string())
            .increment(1);
    }

    pub fn search_failed(category: &str) {
        ::metrics::counter!(MetricName::SearchesFailed.as_str(), "category" => category.to_string())
            .increment(1);
    }

    pub fn listings_parsed(source: &str, count: usize) {
        ::metrics::counter!(MetricName::ListingsParsed.as_str(), "source" => source.to_string())
            .increment(count as u64);
    }

    pub fn listings_kept(category: &str, count: usize) {
        ::metrics::counter!(MetricName::ListingsKept.as_str(), "category" => category.to_string())
            .increment(count as u64);
    }
}

pub mod lookup {
    use super::MetricName;

    pub fn rows_skipped(kind: &'static str, count: usize) {
        ::metrics::counter!(MetricName::LookupRowsSkipped.as_str(), "kind" => kind)
            .increment(count as u64);
    }
}

pub mod enrich {
    use super::MetricName;
    use crate::pipeline::processing::enrich::EnrichmentOutcome;

    pub fn outcome_recorded(outcome: EnrichmentOutcome) {
        if outcome.parcel_matched {
            ::metrics::counter!(MetricName::EnrichParcelMatches.as_str()).increment(1);
        } else {
            ::metrics::counter!(MetricName::EnrichMisses.as_str()).increment(1);
        }
        if outcome.location_matched {
            ::metrics::counter!(MetricName::EnrichLocationMatches.as_str()).increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let all = [
            MetricName::SearchesRun,
            MetricName::SearchesFailed,
            MetricName::ListingsParsed,
            MetricName::ListingsKept,
            MetricName::LookupRowsSkipped,
            MetricName::EnrichParcelMatches,
            MetricName::EnrichLocationMatches,
            MetricName::EnrichMisses,
        ];
        let names: std::collections::HashSet<_> = all.iter().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), all.len());
        assert!(names.iter().all(|n| n.starts_with("listing_") && n.ends_with("_total")));
    }

    #[test]
    fn test_recording_without_recorder_is_harmless() {
        scrape::search_run("DADU_play");
        lookup::rows_skipped("parcel", 3);
        assert_eq!(MetricName::EnrichMisses.to_string(), "listing_enrich_misses_total");
    }
}
