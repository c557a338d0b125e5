//! Reference lookups loaded from locally supplied CSV files.
//!
//! Two kinds exist: parcel files (tax parcel number, zip code, site address) keyed by
//! normalized address, and location-value files (tax parcel number, value) keyed by
//! parcel number. Every CSV under the configured directories is read in a stable
//! order and appended to one index per kind; nothing is replaced or de-duplicated.

pub mod matcher;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::LookupConfig;
use crate::error::ConfigError;
use crate::observability::metrics;
use crate::pipeline::processing::normalize::{normalize_address, normalize_tax_parcel_number};

pub use matcher::{find_location_value, find_match};

/// Normalized key -> every reference record that produced that key, in load order.
#[derive(Debug, Clone)]
pub struct LookupIndex<R> {
    entries: HashMap<String, Vec<R>>,
    records: usize,
}

impl<R> Default for LookupIndex<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            records: 0,
        }
    }
}

impl<R> LookupIndex<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, key: String, record: R) {
        self.entries.entry(key).or_default().push(record);
        self.records += 1;
    }

    /// All candidates under `key`, first-loaded first. Empty when the key is unknown.
    pub fn get(&self, key: &str) -> &[R] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, key: &str) -> Option<&R> {
        self.get(key).first()
    }

    /// Number of records across all keys
    pub fn len(&self) -> usize {
        self.records
    }

    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

/// One row of a parcel lookup file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelRecord {
    pub tax_parcel_number: String,
    pub zip_code: String,
    pub normalized_address: String,
}

/// One row of a location-value lookup file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationValueRecord {
    pub tax_parcel_number: String,
    pub value: String,
}

pub type ParcelIndex = LookupIndex<ParcelRecord>;
pub type LocationValueIndex = LookupIndex<LocationValueRecord>;

/// Why a reference row was left out of an index. Never propagated.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SkippedRow {
    #[error("missing tax parcel number")]
    MissingParcel,
    #[error("missing zip code")]
    MissingZip,
    #[error("missing or empty site address")]
    MissingAddress,
    #[error("missing location value")]
    MissingValue,
}

/// How one kind of lookup file maps headers to records.
///
/// Header names handed to `resolve` are already trimmed, lower-cased and BOM-free.
pub trait ReferenceSchema {
    type Record;
    type Columns;

    fn kind(&self) -> &'static str;

    /// Column positions for this file, or `None` when the file lacks required headers.
    fn resolve(&self, headers: &[String]) -> Option<Self::Columns>;

    /// Index key and record for one row.
    fn read_row(
        &self,
        columns: &Self::Columns,
        row: &csv::StringRecord,
    ) -> Result<(String, Self::Record), SkippedRow>;
}

/// Recognized header aliases for parcel files
#[derive(Debug, Clone)]
pub struct ParcelSchema {
    pub tax_parcel_number: &'static [&'static str],
    pub zip_code: &'static [&'static str],
    pub site_address: &'static [&'static str],
}

impl Default for ParcelSchema {
    fn default() -> Self {
        Self {
            tax_parcel_number: &["taxparcelnumber"],
            zip_code: &["zipcode"],
            site_address: &["site_address"],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParcelColumns {
    tax_parcel_number: usize,
    zip_code: usize,
    site_address: usize,
}

impl ReferenceSchema for ParcelSchema {
    type Record = ParcelRecord;
    type Columns = ParcelColumns;

    fn kind(&self) -> &'static str {
        "parcel"
    }

    fn resolve(&self, headers: &[String]) -> Option<ParcelColumns> {
        Some(ParcelColumns {
            tax_parcel_number: find_column(headers, self.tax_parcel_number)?,
            zip_code: find_column(headers, self.zip_code)?,
            site_address: find_column(headers, self.site_address)?,
        })
    }

    fn read_row(
        &self,
        columns: &ParcelColumns,
        row: &csv::StringRecord,
    ) -> Result<(String, ParcelRecord), SkippedRow> {
        let tax_parcel_number = field(row, columns.tax_parcel_number)
            .map(normalize_tax_parcel_number)
            .ok_or(SkippedRow::MissingParcel)?;
        let zip_code = field(row, columns.zip_code).ok_or(SkippedRow::MissingZip)?;
        let normalized_address = field(row, columns.site_address)
            .map(normalize_address)
            .filter(|a| !a.is_empty())
            .ok_or(SkippedRow::MissingAddress)?;

        Ok((
            normalized_address.clone(),
            ParcelRecord {
                tax_parcel_number,
                zip_code: zip_code.to_string(),
                normalized_address,
            },
        ))
    }
}

/// Recognized header aliases for location-value files.
///
/// The value column is the first of `value_priority` present; failing that, and if
/// `infer_single_value_column` is set, the only column besides the parcel number.
#[derive(Debug, Clone)]
pub struct LocationValueSchema {
    pub tax_parcel_number: &'static [&'static str],
    pub value_priority: &'static [&'static str],
    pub infer_single_value_column: bool,
}

impl Default for LocationValueSchema {
    fn default() -> Self {
        Self {
            tax_parcel_number: &["taxparcelnumber"],
            value_priority: &["location_value", "value"],
            infer_single_value_column: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LocationValueColumns {
    tax_parcel_number: usize,
    value: usize,
}

impl ReferenceSchema for LocationValueSchema {
    type Record = LocationValueRecord;
    type Columns = LocationValueColumns;

    fn kind(&self) -> &'static str {
        "location"
    }

    fn resolve(&self, headers: &[String]) -> Option<LocationValueColumns> {
        let tax_parcel_number = find_column(headers, self.tax_parcel_number)?;

        let value = self
            .value_priority
            .iter()
            .find_map(|alias| find_column(headers, &[*alias]))
            .or_else(|| {
                if !self.infer_single_value_column {
                    return None;
                }
                let others: Vec<usize> = (0..headers.len())
                    .filter(|&i| i != tax_parcel_number)
                    .collect();
                match others.as_slice() {
                    [only] => Some(*only),
                    _ => None,
                }
            })?;

        Some(LocationValueColumns {
            tax_parcel_number,
            value,
        })
    }

    fn read_row(
        &self,
        columns: &LocationValueColumns,
        row: &csv::StringRecord,
    ) -> Result<(String, LocationValueRecord), SkippedRow> {
        let tax_parcel_number = field(row, columns.tax_parcel_number)
            .map(normalize_tax_parcel_number)
            .ok_or(SkippedRow::MissingParcel)?;
        let value = field(row, columns.value).ok_or(SkippedRow::MissingValue)?;

        Ok((
            tax_parcel_number.clone(),
            LocationValueRecord {
                tax_parcel_number,
                value: value.to_string(),
            },
        ))
    }
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| aliases.iter().any(|alias| h == alias))
}

/// Trimmed, non-empty field at `index`
fn field(row: &csv::StringRecord, index: usize) -> Option<&str> {
    row.get(index).map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Build one index from every CSV beneath `directories`, in directory order and
/// then path order within each directory.
///
/// Missing directories contribute nothing. Files without the schema's required
/// headers are ignored, and rows missing required values are dropped. When
/// `required` is set and no file could be used, the build fails.
#[instrument(skip(schema, directories), fields(kind = schema.kind()))]
pub fn build_index<S, P>(
    schema: &S,
    directories: &[P],
    required: bool,
) -> Result<LookupIndex<S::Record>, ConfigError>
where
    S: ReferenceSchema,
    P: AsRef<Path>,
{
    let mut index = LookupIndex::new();
    let mut files_used = 0usize;
    let mut rows_skipped = 0usize;

    for path in discover_csv_files(directories)? {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&path)
            .map_err(|source| ConfigError::Unreadable {
                path: path.clone(),
                source,
            })?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| ConfigError::Unreadable {
                path: path.clone(),
                source,
            })?
            .iter()
            .map(normalize_header)
            .collect();

        let Some(columns) = schema.resolve(&headers) else {
            warn!(
                "Ignoring {} lookup file {}: required headers not found ({:?})",
                schema.kind(),
                path.display(),
                headers
            );
            continue;
        };
        files_used += 1;

        let mut loaded = 0usize;
        for (line, result) in reader.records().enumerate() {
            let row = match result {
                Ok(row) => row,
                Err(e) if e.is_io_error() => {
                    return Err(ConfigError::Unreadable {
                        path: path.clone(),
                        source: e,
                    });
                }
                Err(e) => {
                    debug!("Skipping unparseable row {} in {}: {}", line + 2, path.display(), e);
                    rows_skipped += 1;
                    continue;
                }
            };

            match schema.read_row(&columns, &row) {
                Ok((key, record)) => {
                    index.insert(key, record);
                    loaded += 1;
                }
                Err(reason) => {
                    debug!("Skipping row {} in {}: {}", line + 2, path.display(), reason);
                    rows_skipped += 1;
                }
            }
        }
        debug!("Loaded {} {} records from {}", loaded, schema.kind(), path.display());
    }

    metrics::lookup::rows_skipped(schema.kind(), rows_skipped);

    if required && files_used == 0 {
        return Err(ConfigError::NoLookupFiles {
            dirs: directories.iter().map(|d| d.as_ref().to_path_buf()).collect(),
        });
    }

    info!(
        "Loaded {} {} records under {} keys from {} files ({} rows skipped)",
        index.len(),
        schema.kind(),
        index.key_count(),
        files_used,
        rows_skipped
    );
    Ok(index)
}

pub fn build_parcel_index<P: AsRef<Path>>(
    directories: &[P],
    required: bool,
) -> Result<ParcelIndex, ConfigError> {
    build_index(&ParcelSchema::default(), directories, required)
}

pub fn build_location_index<P: AsRef<Path>>(
    directories: &[P],
    required: bool,
) -> Result<LocationValueIndex, ConfigError> {
    build_index(&LocationValueSchema::default(), directories, required)
}

/// CSV paths beneath each directory, each directory sorted on its own, with a
/// directory reachable under two spellings read only once.
fn discover_csv_files<P: AsRef<Path>>(directories: &[P]) -> Result<Vec<PathBuf>, ConfigError> {
    let mut seen_dirs = HashSet::new();
    let mut seen_files = HashSet::new();
    let mut files = Vec::new();

    for dir in directories {
        let dir = dir.as_ref();
        if !dir.exists() {
            debug!("Lookup directory {} does not exist, skipping", dir.display());
            continue;
        }
        if !dir.is_dir() {
            return Err(ConfigError::NotADirectory(dir.to_path_buf()));
        }
        let canonical = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        if !seen_dirs.insert(canonical) {
            continue;
        }

        let mut found = Vec::new();
        collect_csv_files(dir, &mut found)?;
        found.sort();
        for path in found {
            let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            if seen_files.insert(canonical) {
                files.push(path);
            }
        }
    }

    Ok(files)
}

fn collect_csv_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ConfigError> {
    let entries = fs::read_dir(dir).map_err(|source| ConfigError::UnreadableDir {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| ConfigError::UnreadableDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|source| ConfigError::UnreadableDir {
            path: path.clone(),
            source,
        })?;
        // symlinked directories are not followed
        if file_type.is_dir() {
            collect_csv_files(&path, out)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        {
            out.push(path);
        }
    }
    Ok(())
}

/// Both lookup indexes for one run. Built once, then only read.
#[derive(Debug, Clone, Default)]
pub struct LookupIndexes {
    pub parcel: ParcelIndex,
    pub location: LocationValueIndex,
}

impl LookupIndexes {
    pub fn load(config: &LookupConfig) -> Result<Self, ConfigError> {
        let parcel = build_parcel_index(&config.parcel_dirs, config.require_parcel)?;
        let location = build_location_index(&config.location_dirs, config.require_location)?;
        Ok(Self { parcel, location })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_headers_match_case_insensitively_in_any_order() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "parcels.csv",
            "\u{feff}Site_Address, ZipCode ,TaxParcelNumber\n1216 E 70th St,98404,1234567890\n",
        );

        let index = build_parcel_index(&[dir.path()], true).unwrap();
        assert_eq!(index.len(), 1);
        let record = index.first("1216 e 70th st").unwrap();
        assert_eq!(record.tax_parcel_number, "1234567890");
        assert_eq!(record.zip_code, "98404");
    }

    #[test]
    fn test_files_are_unioned_in_path_order() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "b.csv",
            "taxparcelnumber,zipcode,site_address\n222,98405,10 Main Street\n",
        );
        write(
            dir.path(),
            "a.csv",
            "taxparcelnumber,zipcode,site_address\n111,98404,10 Main St\n",
        );

        let index = build_parcel_index(&[dir.path()], false).unwrap();
        let candidates = index.get("10 main st");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].tax_parcel_number, "111");
        assert_eq!(candidates[1].tax_parcel_number, "222");
    }

    #[test]
    fn test_rows_missing_required_values_are_skipped() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "parcels.csv",
            "taxparcelnumber,zipcode,site_address\n\
             ,98404,1 A St\n\
             333,,2 B St\n\
             444,98404,\n\
             555,98404,3 C St\n\
             666,98404\n",
        );

        let index = build_parcel_index(&[dir.path()], true).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.first("3 c st").unwrap().tax_parcel_number, "555");
    }

    #[test]
    fn test_file_without_required_headers_is_ignored() {
        let dir = tempdir().unwrap();
        write(dir.path(), "notes.csv", "owner,phone\nSmith,555-1234\n");
        write(
            dir.path(),
            "parcels.csv",
            "taxparcelnumber,zipcode,site_address\n1,98404,5 Elm Ave\n",
        );

        let index = build_parcel_index(&[dir.path()], true).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_required_without_usable_files_fails() {
        let dir = tempdir().unwrap();
        write(dir.path(), "notes.csv", "owner,phone\nSmith,555-1234\n");

        let err = build_parcel_index(&[dir.path()], true).unwrap_err();
        assert!(matches!(err, ConfigError::NoLookupFiles { .. }));

        let index = build_parcel_index(&[dir.path()], false).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_missing_directory_yields_empty_index() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let index = build_location_index(&[missing], false).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_file_path_is_not_a_directory() {
        let dir = tempdir().unwrap();
        write(dir.path(), "parcels.csv", "taxparcelnumber,zipcode,site_address\n");
        let err = build_parcel_index(&[dir.path().join("parcels.csv")], false).unwrap_err();
        assert!(matches!(err, ConfigError::NotADirectory(_)));
    }

    #[test]
    fn test_example_and_non_csv_files_are_ignored() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "parcels.csv.example",
            "taxparcelnumber,zipcode,site_address\n9,98404,1 Example St\n",
        );
        write(dir.path(), "readme.txt", "not a csv");
        let index = build_parcel_index(&[dir.path()], false).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_nested_directories_are_read() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("pierce");
        fs::create_dir(&nested).unwrap();
        write(
            &nested,
            "parcels.csv",
            "taxparcelnumber,zipcode,site_address\n77,98404,8 Oak Ln\n",
        );
        let index = build_parcel_index(&[dir.path()], true).unwrap();
        assert_eq!(index.first("8 oak ln").unwrap().tax_parcel_number, "77");
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_loop_is_not_followed() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "parcels.csv",
            "taxparcelnumber,zipcode,site_address\n77,98404,8 Oak Ln\n",
        );
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let index = build_parcel_index(&[dir.path()], true).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_same_directory_listed_twice_loads_once() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "values.csv",
            "taxparcelnumber,location_value\n1234567890,450000\n",
        );
        let index = build_location_index(&[dir.path(), dir.path()], true).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_location_value_column_priority() {
        let schema = LocationValueSchema::default();
        let headers = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();

        let cols = schema
            .resolve(&headers(&["value", "taxparcelnumber", "location_value"]))
            .unwrap();
        assert_eq!(cols.value, 2);

        let cols = schema
            .resolve(&headers(&["taxparcelnumber", "notes", "value"]))
            .unwrap();
        assert_eq!(cols.value, 2);

        let cols = schema
            .resolve(&headers(&["land_value", "taxparcelnumber"]))
            .unwrap();
        assert_eq!(cols.value, 0);

        assert!(schema
            .resolve(&headers(&["taxparcelnumber", "land", "improvements"]))
            .is_none());
        assert!(schema.resolve(&headers(&["parcel", "value"])).is_none());
    }

    #[test]
    fn test_location_rows_without_value_are_skipped() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "values.csv",
            "TaxParcelNumber,Value\n 1234567890 ,\n1234567890,450000\n",
        );
        let index = build_location_index(&[dir.path()], true).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.first("1234567890").unwrap().value, "450000");
    }
}
