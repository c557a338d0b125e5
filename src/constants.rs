/// Shared names and defaults so the CLI, config and pipeline agree on them.

// Lookup directories (both spellings of the location folder are accepted)
pub const PARCEL_LOOKUP_DIR: &str = "lookups/parcel";
pub const LOCATION_LOOKUP_DIRS: [&str; 2] = ["lookups/location", "lookups/Location"];

// Maximum absolute difference between a listing zip and a parcel zip
pub const ZIP_TOLERANCE: u32 = 4;

// Run configuration
pub const DEFAULT_CONFIG_PATH: &str = "config/searches.toml";
pub const CONFIG_PATH_ENV: &str = "LISTINGS_CONFIG";

// Output
pub const DEFAULT_OUTPUT_ROOT: &str = "output";
pub const DEFAULT_OUTPUT_FILE: &str = "all_listings.csv";

// Logging
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const LOG_FILE_NAME: &str = "listing_scraper.log";

// Fetching
pub const DEFAULT_BASE_URL: &str = "https://www.redfin.com";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Consolidated CSV columns, in output order.
pub const OUTPUT_COLUMNS: [&str; 15] = [
    "mls_listing_id",
    "search_id",
    "search_category",
    "city",
    "address",
    "listing_price",
    "home_sqft",
    "lot_sqft",
    "zoning",
    "home_price_per_sqft",
    "lot_price_per_sqft",
    "deal_rating",
    "listing_url",
    "tax_parcel_number",
    "location_value",
];

// Search categories with special handling in scoring and filtering
pub const DADU_CATEGORY: &str = "DADU_play";
pub const FIX_N_FLIP_CATEGORY: &str = "Fix_n_flip";
pub const LAND_CATEGORIES: [&str; 3] = ["DADU_play", "Corner_Lot", "FixerWithLand"];
