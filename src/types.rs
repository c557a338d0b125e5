use crate::config::SearchDef;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Raw listing JSON node as found in a search results page
pub type RawListingData = serde_json::Value;

/// A listing as scraped from one search results page, before scoring or enrichment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub mls_listing_id: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub price: Option<u64>,
    pub home_sqft: Option<u64>,
    pub lot_sqft: Option<u64>,
    pub zoning: Option<String>,
    pub url: Option<String>,
    pub raw: RawListingData,
}

/// One row of the consolidated daily CSV.
///
/// Field order is the column order. `zip_code` is carried for matching only and is
/// not written; it is read back when a CSV being re-enriched happens to have it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub mls_listing_id: Option<String>,
    pub search_id: u32,
    pub search_category: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub listing_price: Option<u64>,
    pub home_sqft: Option<u64>,
    pub lot_sqft: Option<u64>,
    pub zoning: Option<String>,
    pub home_price_per_sqft: Option<f64>,
    pub lot_price_per_sqft: Option<f64>,
    pub deal_rating: u8,
    pub listing_url: Option<String>,
    #[serde(default)]
    pub tax_parcel_number: String,
    #[serde(default)]
    pub location_value: String,
    #[serde(default, skip_serializing)]
    pub zip_code: Option<String>,
}

/// Anything that can turn a configured search into scraped listings
#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    /// Short identifier used in logs
    fn source_name(&self) -> &'static str;

    /// Fetch and extract every listing on the search results page
    async fn fetch_listings(&self, search: &SearchDef) -> Result<Vec<Listing>>;
}
