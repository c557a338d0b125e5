use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::info;

use listing_scraper::apis::RedfinSearchClient;
use listing_scraper::config::Config;
use listing_scraper::constants::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use listing_scraper::logging;
use listing_scraper::pipeline::processing::lookup::{find_location_value, find_match, LookupIndexes};
use listing_scraper::pipeline::processing::normalize::normalize_address;
use listing_scraper::pipeline::{enrich_csv_file, DailyPipeline};

#[derive(Parser)]
#[command(name = "listing_scraper")]
#[command(about = "Daily real-estate listing scraper with parcel enrichment")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every configured search and write the day's consolidated CSV
    Run {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Re-enrich an existing consolidated CSV from the lookup tables
    Enrich {
        #[arg(long)]
        input: PathBuf,
        /// Defaults to rewriting the input file
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show which parcel and location value an address resolves to
    Lookup {
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "")]
        zip: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn config_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn load_config(flag: Option<PathBuf>) -> Result<Config> {
    let path = config_path(flag);
    let config = Config::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    info!("Loaded {} searches from {}", config.searches.len(), path.display());
    Ok(config)
}

/// The lookup command can run before any searches are configured.
fn load_config_or_default(flag: Option<PathBuf>) -> Result<Config> {
    let path = config_path(flag);
    if path.exists() {
        load_config(Some(path))
    } else {
        Ok(Config::from_toml_str("")?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, date } => {
            let config = load_config(config)?;
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let client = RedfinSearchClient::new(&config.fetch)?;

            println!("🔄 Running daily scrape for {}...", date);
            let result = DailyPipeline::new(&client, &config).run(date).await?;

            println!("\n📊 Daily Results:");
            println!("   Searches run: {}", result.searches_run);
            println!("   Searches failed: {}", result.searches_failed);
            println!("   Listings scraped: {}", result.listings_scraped);
            println!("   Listings kept: {}", result.listings_kept);
            println!("   Parcel matches: {}", result.parcel_matches);
            println!("   Location values: {}", result.location_matches);
            println!("   Output file: {}", result.output_file.display());
        }
        Commands::Enrich {
            input,
            output,
            config,
        } => {
            let config = load_config_or_default(config)?;
            let indexes = LookupIndexes::load(&config.lookups)?;
            let result = enrich_csv_file(&input, output.as_deref(), &indexes)?;

            println!(
                "✅ Enriched {} rows ({} parcel matches, {} location values, {} without zip unchanged) -> {}",
                result.rows,
                result.parcel_matches,
                result.location_matches,
                result.rows_unchanged,
                result.output_file.display()
            );
        }
        Commands::Lookup {
            address,
            zip,
            config,
        } => {
            let config = load_config_or_default(config)?;
            let indexes = LookupIndexes::load(&config.lookups)?;
            let normalized = normalize_address(&address);

            println!("Normalized address: {}", normalized);
            match find_match(&indexes.parcel, &zip, &normalized) {
                Some(parcel) => {
                    println!("Tax parcel number: {}", parcel.tax_parcel_number);
                    println!("Parcel zip: {}", parcel.zip_code);
                    match find_location_value(&indexes.location, &parcel.tax_parcel_number) {
                        Some(location) => println!("Location value: {}", location.value),
                        None => println!("Location value: (none)"),
                    }
                }
                None => println!("No parcel within zip tolerance"),
            }
        }
    }

    Ok(())
}
