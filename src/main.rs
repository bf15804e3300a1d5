mod backend;
mod cli;
mod export;
mod finder;

pub const USER_AGENT: &str = concat!("company-finder/", env!("CARGO_PKG_VERSION"));

use std::time::Duration;

use clap::Parser;
use reqwest::Client;
use tracing::info;

use backend::OpenAiClient;
use cli::{Cli, Command, SearchArgs};
use export::{CountryReport, Report};
use finder::{Finder, FinderConfig, Region, catalog};

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("company_finder=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Regions => print!("{}", region_table()),
        Command::Profile { company } => {
            let backend = backend_from_env()?;
            let profile = finder::profile_company(&backend, &company).await;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::Region { region, search } => {
            let finder = build_finder(backend_from_env()?, &search).await;
            let result = finder
                .search_region(region, search.deep, search.deadline())
                .await;
            emit(&result, &search)?;
        }
        Command::Country { country, search } => {
            let country = country.trim().to_ascii_uppercase();
            let finder = build_finder(backend_from_env()?, &search).await;
            let outcome = finder
                .country_outcome(&country, search.deep, search.deadline())
                .await;
            emit(
                &CountryReport {
                    country: &country,
                    outcome: &outcome,
                },
                &search,
            )?;
        }
    }

    Ok(())
}

fn backend_from_env() -> Result<OpenAiClient, Box<dyn std::error::Error>> {
    let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
    let backend = OpenAiClient::from_env(http)
        .inspect_err(|e| tracing::error!("backend client not available: {e}"))?;
    Ok(backend)
}

async fn build_finder(backend: OpenAiClient, search: &SearchArgs) -> Finder<OpenAiClient> {
    let config = FinderConfig {
        courtesy_delay: Duration::from_millis(search.delay_ms),
        ..FinderConfig::default()
    };
    let finder = match search.seed() {
        Some(seed) => {
            Finder::with_seed_company(backend, seed, search.capabilities(), config).await
        }
        None => Finder::new(backend, search.capabilities(), config),
    };
    if let Some(description) = finder.seed_description() {
        info!(seed = ?finder.seed_company(), description, "seed company profile");
    }
    info!(capabilities = ?finder.capabilities(), "searching");
    finder
}

fn emit(report: &impl Report, search: &SearchArgs) -> Result<(), export::ExportError> {
    let rendered = export::render(report, search.format)?;
    info!(summary = report.summary(), "search finished");
    match &search.output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            info!(path = %path.display(), "results written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn region_table() -> String {
    let mut out = String::new();
    for region in Region::ALL {
        out.push_str(&format!("{region}\n"));
        for country in region.countries() {
            let city = catalog::major_city(country).unwrap_or("Unknown");
            out.push_str(&format!("  {country}  {city}\n"));
        }
    }
    out
}
