//! Daily output layout and the consolidated CSV format.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::constants::OUTPUT_COLUMNS;
use crate::error::Result;
use crate::types::ListingRecord;

/// `root/YYYY/MM/DD`
pub fn daily_output_dir(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(format!("{:04}", date.year()))
        .join(format!("{:02}", date.month()))
        .join(format!("{:02}", date.day()))
}

/// Write the consolidated CSV, creating parent directories. The header row is
/// always written, so a day with no listings still yields a valid file.
pub fn write_listings_csv(path: &Path, records: &[ListingRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(OUTPUT_COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    debug!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

/// Read a consolidated CSV back. Unknown columns are ignored and an optional
/// `zip_code` column is picked up for matching.
pub fn read_listings_csv(path: &Path) -> Result<Vec<ListingRecord>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_daily_output_dir_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            daily_output_dir(Path::new("output"), date),
            PathBuf::from("output/2024/03/07")
        );
    }

    #[test]
    fn test_empty_run_still_writes_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2024/01/02/all_listings.csv");
        write_listings_csv(&path, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), OUTPUT_COLUMNS.join(","));
    }

    #[test]
    fn test_written_rows_match_header_width_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("all_listings.csv");
        let record = ListingRecord {
            mls_listing_id: Some("2210001".to_string()),
            search_id: 4,
            search_category: "Corner_Lot".to_string(),
            address: Some("1216 E 70th St".to_string()),
            listing_price: Some(450_000),
            home_price_per_sqft: Some(281.25),
            deal_rating: 61,
            tax_parcel_number: "1234567890".to_string(),
            location_value: "450000".to_string(),
            zip_code: Some("98404".to_string()),
            ..ListingRecord::default()
        };
        write_listings_csv(&path, &[record.clone()]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(!lines[0].contains("zip_code"));
        assert_eq!(lines[1].split(',').count(), OUTPUT_COLUMNS.len());

        let back = read_listings_csv(&path).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].tax_parcel_number, "1234567890");
        assert_eq!(back[0].home_price_per_sqft, Some(281.25));
        assert_eq!(back[0].city, None);
        assert_eq!(back[0].zip_code, None);
    }

    #[test]
    fn test_read_honours_optional_zip_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(
            &path,
            "mls_listing_id,search_id,search_category,address,deal_rating,zip_code\n\
             A1,2,DADU_play,9 Elm Ave,50,98406\n",
        )
        .unwrap();

        let records = read_listings_csv(&path).unwrap();
        assert_eq!(records[0].zip_code.as_deref(), Some("98406"));
        assert_eq!(records[0].tax_parcel_number, "");
    }
}
