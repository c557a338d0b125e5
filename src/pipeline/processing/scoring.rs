//! Derived columns and search-specific filtering for scraped listings.

use crate::config::SearchDef;
use crate::constants::{DADU_CATEGORY, FIX_N_FLIP_CATEGORY, LAND_CATEGORIES};
use crate::types::{Listing, ListingRecord};

const DADU_KEYWORDS: [&str; 8] = [
    "dadu",
    "adu",
    "accessory dwelling",
    "alley access",
    "large lot",
    "subdivide",
    "build",
    "corner",
];

/// Raw JSON keys that sometimes carry listing remarks
const REMARK_KEYS: [&str; 5] = [
    "remarks",
    "publicRemarks",
    "description",
    "listingRemarks",
    "propertyDescription",
];

pub fn price_per_sqft(price: Option<u64>, sqft: Option<u64>) -> Option<f64> {
    match (price, sqft) {
        (Some(price), Some(sqft)) if price > 0 && sqft > 0 => {
            Some((price as f64 / sqft as f64 * 100.0).round() / 100.0)
        }
        _ => None,
    }
}

/// Heuristic 0-100 deal score. Cheaper per square foot, bigger lots and lower
/// prices all push the score up.
pub fn deal_rating(
    price: Option<u64>,
    lot_sqft: Option<u64>,
    home_ppsf: Option<f64>,
    lot_ppsf: Option<f64>,
    category: &str,
) -> u8 {
    let mut score = 50.0_f64;

    if let Some(ppsf) = home_ppsf {
        score += ((300.0 - ppsf) / 6.0).clamp(-20.0, 25.0);
    }
    if let Some(lot) = lot_sqft.filter(|&l| l > 0) {
        score += ((lot as f64 - 3000.0) / 800.0).clamp(0.0, 25.0);
    }
    if let Some(lot_ppsf) = lot_ppsf {
        score += ((10.0 - lot_ppsf) * 0.5).clamp(-10.0, 10.0);
    }
    if let Some(price) = price.filter(|&p| p > 0) {
        score += ((450_000.0 - price as f64) / 60_000.0).clamp(-10.0, 10.0);
    }

    if LAND_CATEGORIES.contains(&category) && lot_sqft.is_some_and(|l| l >= 6000) {
        score += 5.0;
    }
    if category == FIX_N_FLIP_CATEGORY && home_ppsf.is_some_and(|p| p <= 250.0) {
        score += 5.0;
    }

    score.round().clamp(0.0, 100.0) as u8
}

/// DADU searches only keep listings that mention a development angle somewhere.
pub fn passes_keyword_filter(search: &SearchDef, listing: &Listing) -> bool {
    if search.category != DADU_CATEGORY {
        return true;
    }

    let mut haystack = [
        Some(search.description.as_str()),
        listing.address.as_deref(),
        listing.city.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();

    for key in REMARK_KEYS {
        if let Some(text) = listing.raw.get(key).and_then(|v| v.as_str()) {
            haystack.push(' ');
            haystack.push_str(&text.to_lowercase());
        }
    }

    DADU_KEYWORDS.iter().any(|kw| haystack.contains(kw))
}

/// Convert a scraped listing into an (unenriched) consolidated row.
pub fn listing_to_record(search: &SearchDef, listing: &Listing) -> ListingRecord {
    let home_ppsf = price_per_sqft(listing.price, listing.home_sqft);
    let lot_ppsf = price_per_sqft(listing.price, listing.lot_sqft);

    let city = if search.city.is_empty() {
        listing.city.clone()
    } else {
        Some(search.city.clone())
    };

    ListingRecord {
        mls_listing_id: listing.mls_listing_id.clone(),
        search_id: search.search_id,
        search_category: search.category.clone(),
        city,
        address: listing.address.clone(),
        listing_price: listing.price,
        home_sqft: listing.home_sqft,
        lot_sqft: listing.lot_sqft,
        zoning: listing.zoning.clone(),
        home_price_per_sqft: home_ppsf,
        lot_price_per_sqft: lot_ppsf,
        deal_rating: deal_rating(listing.price, listing.lot_sqft, home_ppsf, lot_ppsf, &search.category),
        listing_url: listing.url.clone(),
        tax_parcel_number: String::new(),
        location_value: String::new(),
        zip_code: listing.zip_code.clone(),
    }
}
