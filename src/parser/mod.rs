use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

use crate::types::Listing;

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>").expect("valid script regex"));
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)([mk])?$").expect("valid number regex"));

/// Upper bound on JSON candidates pulled out of a single script block
const MAX_CANDIDATES_PER_SCRIPT: usize = 16;

/// Script bodies without one of these markers carry no search results
const RESULT_MARKERS: [&str; 4] = ["homeData", "payload", "listings", "searchResults"];

/// Counters describing what a parse found, for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseMeta {
    pub script_blocks: usize,
    pub json_blobs: usize,
    pub listings: usize,
}

pub trait Parser {
    fn parse(&self, body: &str) -> (Vec<Listing>, ParseMeta);
}

/// Extracts listings from the JSON a search results page embeds in its scripts.
///
/// Works on raw text: script bodies are located with a pattern, JSON objects inside
/// them are found by brace matching, and any nested object carrying listing-like
/// keys becomes a [`Listing`].
pub struct RedfinSearchParser {
    pub base_url: String,
}

impl RedfinSearchParser {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn absolute_url(&self, url: &str) -> String {
        if !url.starts_with('/') {
            return url.to_string();
        }
        reqwest::Url::parse(&self.base_url)
            .and_then(|base| base.join(url))
            .map(|joined| joined.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.base_url.trim_end_matches('/'), url))
    }
}

impl Parser for RedfinSearchParser {
    fn parse(&self, body: &str) -> (Vec<Listing>, ParseMeta) {
        let mut meta = ParseMeta::default();
        let mut blobs = Vec::new();

        for caps in SCRIPT_RE.captures_iter(body) {
            meta.script_blocks += 1;
            blobs.extend(json_blobs(&caps[1]));
        }
        meta.json_blobs = blobs.len();

        let mut seen_urls = HashSet::new();
        let mut listings = Vec::new();
        for blob in &blobs {
            for node in walk(blob) {
                let Some(obj) = node.as_object() else { continue };
                if !looks_like_listing(obj) {
                    continue;
                }
                let Some(mut listing) = extract_listing(obj) else { continue };

                if let Some(url) = listing.url.take() {
                    let url = self.absolute_url(&url);
                    if !seen_urls.insert(url.clone()) {
                        continue;
                    }
                    listing.url = Some(url);
                }
                listings.push(listing);
            }
        }

        meta.listings = listings.len();
        debug!(
            "Parsed {} listings from {} JSON blobs in {} script blocks",
            meta.listings, meta.json_blobs, meta.script_blocks
        );
        (listings, meta)
    }
}

fn mentions_results(script: &str) -> bool {
    RESULT_MARKERS.iter().any(|marker| script.contains(marker))
}

/// JSON values embedded in one script body. A body that is itself JSON (as in
/// `application/ld+json`) is taken whole; otherwise balanced `{...}` spans are tried,
/// but only in scripts that mention search results.
fn json_blobs(script: &str) -> Vec<Value> {
    let trimmed = script.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return match value {
            Value::Array(items) => items.into_iter().filter(Value::is_object).collect(),
            Value::Object(_) => vec![value],
            _ => Vec::new(),
        };
    }
    if !mentions_results(trimmed) {
        return Vec::new();
    }

    find_braced_candidates(trimmed, MAX_CANDIDATES_PER_SCRIPT)
        .into_iter()
        .filter_map(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .filter(Value::is_object)
        .collect()
}

/// Outermost `{...}` spans in `text`, skipping braces inside double-quoted strings.
pub fn find_braced_candidates(text: &str, max_candidates: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_str = false;
    let mut escape = false;

    for (i, ch) in text.char_indices() {
        if in_str {
            if escape {
                escape = false;
            } else if ch == '\\' {
                escape = true;
            } else if ch == '"' {
                in_str = false;
            }
            continue;
        }
        match ch {
            '"' => in_str = true,
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    out.push(&text[start..=i]);
                    if out.len() >= max_candidates {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// Every value nested inside `root`, depth first
fn walk(root: &Value) -> Vec<&Value> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        out.push(current);
        match current {
            Value::Object(map) => stack.extend(map.values()),
            Value::Array(items) => stack.extend(items.iter()),
            _ => {}
        }
    }
    out
}

fn looks_like_listing(obj: &Map<String, Value>) -> bool {
    let has = |keys: &[&str]| keys.iter().all(|k| obj.contains_key(*k));
    has(&["price", "url"]) || has(&["streetLine", "city", "price"]) || has(&["homeData", "url"])
}

/// `{ "value": x, ... }` wrappers are unwrapped to `x`.
fn unwrap_value(value: &Value) -> &Value {
    match value {
        Value::Object(map) => map.get("value").unwrap_or(value),
        _ => value,
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// First present value among `keys`
fn first_of<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .map(unwrap_value)
        .find(|v| is_present(v))
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Lenient integer parsing: `450000`, `"$450,000"`, `"1.2M"`, `"450k"`, `1599.5`.
pub fn parse_int(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => {
            let cleaned = s.trim().replace(['$', ','], "").to_lowercase();
            if cleaned.is_empty() {
                return None;
            }
            if let Some(caps) = NUMBER_RE.captures(&cleaned) {
                let mut number: f64 = caps[1].parse().ok()?;
                match caps.get(2).map(|m| m.as_str()) {
                    Some("m") => number *= 1_000_000.0,
                    Some("k") => number *= 1_000.0,
                    _ => {}
                }
                return Some(number as u64);
            }
            cleaned.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64)
        }
        _ => None,
    }
}

fn extract_listing(obj: &Map<String, Value>) -> Option<Listing> {
    let url = first_of(obj, &["url", "URL", "listingUrl"]).and_then(text_of);
    let price = first_of(obj, &["price", "listPrice", "value"]).and_then(parse_int);

    let address = first_of(obj, &["streetLine", "address", "streetAddress"]).and_then(|street| {
        match street {
            Value::Object(map) => first_of(map, &["streetAddress", "name"]).and_then(text_of),
            other => text_of(other),
        }
    });
    let city = first_of(obj, &["city"]).and_then(text_of);
    let zip_code = first_of(obj, &["zip", "zipCode", "postalCode"]).and_then(text_of);

    let home_sqft = first_of(
        obj,
        &["sqFt", "sqft", "livingArea", "livingAreaSqFt", "sqftValue"],
    )
    .and_then(parse_int);
    let lot_sqft = first_of(obj, &["lotSqFt", "lotSize", "lotSizeSqFt"]).and_then(parse_int);

    let mls_listing_id =
        first_of(obj, &["mlsId", "mlsListingId", "listingId", "id"]).and_then(text_of);
    let zoning = first_of(obj, &["zoning", "zoningCode"]).and_then(text_of);

    let has_content = address.is_some()
        || city.is_some()
        || price.is_some()
        || home_sqft.is_some()
        || lot_sqft.is_some()
        || url.is_some();
    if !has_content {
        return None;
    }

    Some(Listing {
        mls_listing_id,
        address,
        city,
        zip_code,
        price,
        home_sqft,
        lot_sqft,
        zoning,
        url,
        raw: Value::Object(obj.clone()),
    })
}
