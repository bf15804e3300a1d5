use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::export::Format;
use crate::finder::Region;

#[derive(Parser)]
#[command(name = "company-finder", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Search every country of a region concurrently
    Region {
        /// Region: "EU", "ASEAN", "MENA", or "ASIA(CN/JP/KR)" (alias "ASIA")
        region: Region,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Search a single country by ISO code (e.g. "GB")
    Country {
        /// Two-letter country code
        country: String,
        #[command(flatten)]
        search: SearchArgs,
    },
    /// Identify a company's description and capabilities
    Profile {
        /// Company name (e.g. "BlackBird.AI")
        company: String,
    },
    /// List the built-in regions with their countries and hint cities
    Regions,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Capability to search for; repeat for several (default: built-in list)
    #[arg(short = 'c', long = "capability")]
    pub capabilities: Vec<String>,
    /// Seed company whose profiled capabilities drive the search
    #[arg(long)]
    pub seed: Option<String>,
    /// Run a second, refined pass per country
    #[arg(long)]
    pub deep: bool,
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    pub format: Format,
    /// Write output to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Give up on countries still running after this many seconds
    #[arg(long, value_name = "SECS")]
    pub deadline: Option<u64>,
    /// Pause between consecutive searches of one country, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub delay_ms: u64,
}

impl SearchArgs {
    pub fn capabilities(&self) -> Option<Vec<String>> {
        let caps: Vec<String> = self
            .capabilities
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        (!caps.is_empty()).then_some(caps)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline.map(Duration::from_secs)
    }

    pub fn seed(&self) -> Option<&str> {
        self.seed.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}
