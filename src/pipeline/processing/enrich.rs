use crate::pipeline::processing::lookup::{
    find_location_value, find_match, LocationValueIndex, LookupIndexes, ParcelIndex,
};
use crate::pipeline::processing::normalize::normalize_address;
use crate::types::ListingRecord;

/// What one enrichment pass found for a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnrichmentOutcome {
    pub parcel_matched: bool,
    pub location_matched: bool,
}

/// Trait for adding supplemental lookup data to consolidated listing rows
pub trait Enricher {
    /// Fill the enrichment columns of `record`. Never fails; columns without a match
    /// are left as empty strings.
    fn enrich(&self, record: ListingRecord) -> ListingRecord {
        self.enrich_with_outcome(record).0
    }

    fn enrich_with_outcome(&self, record: ListingRecord) -> (ListingRecord, EnrichmentOutcome);
}

/// Enricher backed by the parcel and location-value indexes loaded for a run
pub struct LookupEnricher<'a> {
    parcel_index: &'a ParcelIndex,
    location_index: &'a LocationValueIndex,
}

impl<'a> LookupEnricher<'a> {
    pub fn new(parcel_index: &'a ParcelIndex, location_index: &'a LocationValueIndex) -> Self {
        Self {
            parcel_index,
            location_index,
        }
    }

    pub fn from_indexes(indexes: &'a LookupIndexes) -> Self {
        Self::new(&indexes.parcel, &indexes.location)
    }
}

impl Enricher for LookupEnricher<'_> {
    fn enrich_with_outcome(&self, mut record: ListingRecord) -> (ListingRecord, EnrichmentOutcome) {
        let mut outcome = EnrichmentOutcome::default();
        record.tax_parcel_number.clear();
        record.location_value.clear();

        let address = normalize_address(record.address.as_deref().unwrap_or(""));
        let zip = record.zip_code.as_deref().unwrap_or("");

        let Some(parcel) = find_match(self.parcel_index, zip, &address) else {
            return (record, outcome);
        };
        record.tax_parcel_number = parcel.tax_parcel_number.clone();
        outcome.parcel_matched = true;

        if let Some(location) = find_location_value(self.location_index, &parcel.tax_parcel_number) {
            record.location_value = location.value.clone();
            outcome.location_matched = true;
        }

        (record, outcome)
    }
}

/// Convenience wrapper over [`LookupEnricher`] for a single record.
pub fn enrich(
    listing: ListingRecord,
    parcel_index: &ParcelIndex,
    location_index: &LocationValueIndex,
) -> ListingRecord {
    LookupEnricher::new(parcel_index, location_index).enrich(listing)
}
