use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lookup error: {0}")]
    Lookup(#[from] ConfigError),

    #[error("API error: {message}")]
    Api { message: String },
}

/// Directory- and file-level failures while loading reference lookups.
/// Row-level defects never surface here; those rows are dropped during the load.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no usable lookup CSV files found under {}", display_dirs(.dirs))]
    NoLookupFiles { dirs: Vec<PathBuf> },

    #[error("lookup path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to read lookup file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to list lookup directory {}: {source}", .path.display())]
    UnreadableDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ScraperError>;
