use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::StatusCode;
use tracing::{debug, info, instrument, warn};

use crate::config::{FetchConfig, SearchDef};
use crate::error::{Result, ScraperError};
use crate::observability::metrics;
use crate::parser::{Parser, RedfinSearchParser};
use crate::types::{Listing, ListingSource};

pub const REDFIN_SOURCE: &str = "redfin";

/// Fetches one saved-search results page per call and extracts its listings.
///
/// A single GET per search; a failed or non-200 response is returned as an error
/// for the caller to log and skip.
pub struct RedfinSearchClient {
    client: reqwest::Client,
    parser: RedfinSearchParser,
    base_url: String,
}

impl RedfinSearchClient {
    pub fn new(fetch: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(fetch.user_agent.clone())
            .timeout(fetch.timeout())
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            parser: RedfinSearchParser::new(fetch.base_url.clone()),
            base_url: fetch.base_url.clone(),
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let t_fetch = std::time::Instant::now();
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(REFERER, format!("{}/", self.base_url.trim_end_matches('/')))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(
            "GET {} -> {} ({} bytes in {:.2}s)",
            url,
            status,
            body.len(),
            t_fetch.elapsed().as_secs_f64()
        );

        if status != StatusCode::OK {
            return Err(ScraperError::Api {
                message: format!("GET {url} returned HTTP {status}"),
            });
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl ListingSource for RedfinSearchClient {
    fn source_name(&self) -> &'static str {
        REDFIN_SOURCE
    }

    #[instrument(skip(self, search), fields(search_id = search.search_id, category = %search.category))]
    async fn fetch_listings(&self, search: &SearchDef) -> Result<Vec<Listing>> {
        let body = self.fetch_page(&search.url).await?;
        let (listings, meta) = self.parser.parse(&body);

        info!(
            "Parsed {} listings ({} JSON blobs in {} script blocks)",
            listings.len(),
            meta.json_blobs,
            meta.script_blocks
        );
        if listings.is_empty() {
            warn!("No listings found - the page structure may have changed");
        }
        metrics::scrape::listings_parsed(REDFIN_SOURCE, listings.len());

        Ok(listings)
    }
}
