//! Canonical forms for the strings used as join keys between scraped listings and
//! reference lookups: street addresses, zip codes and tax parcel numbers.

use once_cell::sync::Lazy;
use regex::Regex;

static ZIP5_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{5})\b").expect("valid zip regex"));

/// Street suffixes and directionals folded to one spelling. Every value is also a
/// key mapping to itself, which keeps normalization idempotent.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("street", "st"),
    ("st", "st"),
    ("avenue", "ave"),
    ("ave", "ave"),
    ("av", "ave"),
    ("road", "rd"),
    ("rd", "rd"),
    ("drive", "dr"),
    ("dr", "dr"),
    ("lane", "ln"),
    ("ln", "ln"),
    ("court", "ct"),
    ("ct", "ct"),
    ("place", "pl"),
    ("pl", "pl"),
    ("boulevard", "blvd"),
    ("blvd", "blvd"),
    ("parkway", "pkwy"),
    ("pkwy", "pkwy"),
    ("terrace", "ter"),
    ("ter", "ter"),
    ("circle", "cir"),
    ("cir", "cir"),
    ("highway", "hwy"),
    ("hwy", "hwy"),
    ("north", "n"),
    ("n", "n"),
    ("south", "s"),
    ("s", "s"),
    ("east", "e"),
    ("e", "e"),
    ("west", "w"),
    ("w", "w"),
    ("northeast", "ne"),
    ("ne", "ne"),
    ("northwest", "nw"),
    ("nw", "nw"),
    ("southeast", "se"),
    ("se", "se"),
    ("southwest", "sw"),
    ("sw", "sw"),
];

fn abbreviate(token: &str) -> &str {
    ABBREVIATIONS
        .iter()
        .find(|(long, _)| *long == token)
        .map(|(_, short)| *short)
        .unwrap_or(token)
}

/// Canonicalize a free-text street address for equality comparison.
///
/// Lower-cases, turns every non-alphanumeric character into a space, collapses
/// whitespace and folds common suffixes/directionals ("Street" and "St." both
/// become `st`). Never fails; empty or garbage input yields an empty or
/// best-effort string.
pub fn normalize_address(raw_address: &str) -> String {
    // lower-case first: some case mappings emit combining marks that must be stripped too
    let cleaned: String = raw_address
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .map(abbreviate)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract the base five-digit zip from inputs like `98404`, `98404-1234`,
/// `WA 98404` or `984041234`. Returns `None` when no five-digit group exists.
pub fn normalize_zip(zip_code: &str) -> Option<String> {
    let trimmed = zip_code.trim();
    if let Some(caps) = ZIP5_RE.captures(trimmed) {
        return Some(caps[1].to_string());
    }
    // zip+4 written without the dash
    if trimmed.len() == 9 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Some(trimmed[..5].to_string());
    }
    None
}

/// Numeric value of the base zip, used for tolerance arithmetic.
pub fn zip_to_int(zip_code: &str) -> Option<u32> {
    normalize_zip(zip_code).and_then(|z| z.parse().ok())
}

/// Parcel numbers are compared as trimmed strings, leading zeros kept.
pub fn normalize_tax_parcel_number(value: &str) -> String {
    value.trim().to_string()
}
