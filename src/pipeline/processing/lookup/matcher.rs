use crate::constants::ZIP_TOLERANCE;
use crate::pipeline::processing::normalize::{normalize_tax_parcel_number, zip_to_int};

use super::{LocationValueIndex, LocationValueRecord, ParcelIndex, ParcelRecord};

/// Best parcel for a listing's normalized address and zip.
///
/// Candidates sharing the address key are kept when their zip is within
/// `ZIP_TOLERANCE` of the query zip; the closest zip wins and equal distances go to
/// the first-loaded candidate. Zips are compared on their base five digits. When
/// either side has no parseable zip only an exact string match counts.
pub fn find_match<'a>(
    index: &'a ParcelIndex,
    query_zip: &str,
    query_address_normalized: &str,
) -> Option<&'a ParcelRecord> {
    let query_base = zip_to_int(query_zip);

    let mut best: Option<(u32, &ParcelRecord)> = None;
    for candidate in index.get(query_address_normalized) {
        let Some(distance) = zip_distance(query_zip, query_base, &candidate.zip_code) else {
            continue;
        };
        if distance > ZIP_TOLERANCE {
            continue;
        }
        // strict comparison keeps the earliest candidate on ties
        if best.map_or(true, |(best_distance, _)| distance < best_distance) {
            best = Some((distance, candidate));
        }
    }

    best.map(|(_, record)| record)
}

fn zip_distance(query_zip: &str, query_base: Option<u32>, candidate_zip: &str) -> Option<u32> {
    match (query_base, zip_to_int(candidate_zip)) {
        (Some(query), Some(candidate)) => Some(query.abs_diff(candidate)),
        _ if query_zip.trim() == candidate_zip.trim() => Some(0),
        _ => None,
    }
}

/// Location value recorded for a parcel number; the first-loaded file wins.
pub fn find_location_value<'a>(
    index: &'a LocationValueIndex,
    tax_parcel_number: &str,
) -> Option<&'a LocationValueRecord> {
    index.first(&normalize_tax_parcel_number(tax_parcel_number))
}
