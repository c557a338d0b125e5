// Pipeline processing: normalization, lookups, scoring, and enrichment

pub mod enrich;
pub mod lookup;
pub mod normalize;
pub mod scoring;
