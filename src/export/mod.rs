//! Rendering of search results as a JSON document, a row-per-company CSV, or a Markdown table.

mod markdown;

use clap::ValueEnum;
use serde::Serialize;

use crate::finder::{Company, CountryOutcome, RegionSearchResult};

const CSV_HEADER: [&str; 7] = [
    "name",
    "url",
    "description",
    "country",
    "industry",
    "size",
    "founded",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Json,
    Csv,
    Markdown,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV output was not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A finished search that can be exported.
pub trait Report: Serialize {
    fn title(&self) -> String;
    fn summary(&self) -> &str;
    fn companies(&self) -> &[Company];
}

/// One country's settled search. Serializes as the flat result, or as the
/// flat error entry when the country failed.
pub struct CountryReport<'a> {
    pub country: &'a str,
    pub outcome: &'a CountryOutcome,
}

impl Serialize for CountryReport<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.outcome.serialize(serializer)
    }
}

impl Report for CountryReport<'_> {
    fn title(&self) -> String {
        format!("Companies in {}", self.country)
    }

    fn summary(&self) -> &str {
        match self.outcome {
            CountryOutcome::Completed(result) => &result.summary,
            CountryOutcome::Failed(failure) => &failure.error,
        }
    }

    fn companies(&self) -> &[Company] {
        match self.outcome {
            CountryOutcome::Completed(result) => &result.companies,
            CountryOutcome::Failed(failure) => &failure.companies,
        }
    }
}

impl Report for RegionSearchResult {
    fn title(&self) -> String {
        format!("Companies in {}", self.region)
    }

    fn summary(&self) -> &str {
        &self.summary
    }

    fn companies(&self) -> &[Company] {
        &self.companies
    }
}

pub fn render(report: &impl Report, format: Format) -> Result<String, ExportError> {
    match format {
        Format::Json => Ok(serde_json::to_string_pretty(report)?),
        Format::Csv => companies_csv(report.companies()),
        Format::Markdown => Ok(markdown::companies_table(
            &report.title(),
            report.summary(),
            report.companies(),
        )),
    }
}

pub fn companies_csv(companies: &[Company]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for c in companies {
        writer.write_record([
            &c.name,
            &c.url,
            &c.description,
            &c.country,
            &c.industry,
            &c.size,
            &c.founded,
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
