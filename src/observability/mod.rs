// Observability: counters for scrape and enrichment outcomes

pub mod metrics;
