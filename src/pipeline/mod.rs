// Daily pipeline: scrape, score, enrich, and write the consolidated CSV

pub mod aggregator;
pub mod output;
pub mod processing;

pub use aggregator::{enrich_csv_file, DailyPipeline, EnrichFileResult, PipelineResult};
