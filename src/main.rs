use clap::{Parser, Subcommand};
use geonames_service::location::{self, LocationError, LocationResolver, Validity};
use geonames_service::logging::init_tracing;
use geonames_service::server::{self, ValidityResponse};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Geonames — country and city lookup service
///
/// Resolves ISO2 codes or country names, lists cities, and validates
/// country/city pairs against a static reference dataset.
///
/// Examples:
///   geonames serve --port 8080
///   geonames countries
///   geonames cities "United Kingdom"
///   geonames validate gb --city London
#[derive(Parser)]
#[command(name = "geonames", version, about, long_about = None)]
struct Cli {
    /// Directory holding countries.json and cities/ (or cities.json).
    #[arg(long, global = true, env = "GEONAMES_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Default log level when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        #[arg(long, env = "GEONAMES_HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(long, short = 'p', env = "PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Print all countries as JSON.
    Countries,
    /// Print the cities of a country (ISO2 code or name) as JSON.
    Cities {
        country: String,
    },
    /// Check a country, or a country/city pair.
    Validate {
        country: String,

        /// City name (case-sensitive).
        #[arg(long)]
        city: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    // ── Load reference data ─────────────────────────────────────

    let resolver = location::load_dir(&cli.data_dir)
        .unwrap_or_else(|e| fail(LocationError::from(e)));

    // ── Dispatch ────────────────────────────────────────────────

    match cli.command {
        Command::Serve { host, port } => {
            if let Err(e) = server::start(Arc::new(resolver), &host, port).await {
                fail(format!("Cannot serve on {}:{}: {}", host, port, e));
            }
        }
        Command::Countries => print_json(&resolver.list_countries()),
        Command::Cities { country } => {
            let cities = resolver.cities_for_identifier(&country).unwrap_or_else(|e| fail(e));
            print_json(&cities);
        }
        Command::Validate { country, city } => {
            let validity = run_validate(&resolver, &country, city.as_deref()).unwrap_or_else(|e| fail(e));
            print_json(&ValidityResponse::from(validity));
        }
    }
}

fn run_validate(
    resolver: &LocationResolver,
    country: &str,
    city: Option<&str>,
) -> Result<Validity, LocationError> {
    match city {
        Some(city) => resolver.validate_city(Some(country), Some(city)),
        None => resolver.validate_country(Some(country)),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(format!("Cannot serialize output: {}", e)),
    }
}

/// Every fatal exit goes through here, so the message reaches stderr even
/// when logging is filtered off.
fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", err);
    std::process::exit(1);
}
