use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::backend::LocationHint;

pub const DEFAULT_CAPABILITIES: [&str; 4] = [
    "narrative intelligence",
    "disinformation detection",
    "Information Operations (IO) Defense",
    "inauthentic online behaviour detection",
];

const UNKNOWN_CITY: &str = "Unknown";

const COUNTRY_CITIES: &[(&str, &str)] = &[
    ("GB", "London"),
    ("DE", "Berlin"),
    ("FR", "Paris"),
    ("IT", "Rome"),
    ("FI", "Helsinki"),
    ("NL", "Amsterdam"),
    ("BE", "Brussels"),
    ("DK", "Copenhagen"),
    ("SE", "Stockholm"),
    ("NO", "Oslo"),
    ("EE", "Tallinn"),
    ("MY", "Kuala Lumpur"),
    ("ID", "Jakarta"),
    ("PH", "Manila"),
    ("TH", "Bangkok"),
    ("VN", "Hanoi"),
    ("SG", "Singapore"),
    ("AE", "Dubai"),
    ("SA", "Riyadh"),
    ("KW", "Kuwait City"),
    ("BH", "Manama"),
    ("QA", "Doha"),
    ("JP", "Tokyo"),
    ("KR", "Seoul"),
    ("CN", "Beijing"),
];

/// Fixed named group of countries searched together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Eu,
    Asean,
    Mena,
    Asia,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown region '{0}': expected one of EU, ASEAN, MENA, ASIA(CN/JP/KR)")]
pub struct UnknownRegion(String);

impl Region {
    pub const ALL: [Region; 4] = [Region::Eu, Region::Asean, Region::Mena, Region::Asia];

    pub fn label(self) -> &'static str {
        match self {
            Region::Eu => "EU",
            Region::Asean => "ASEAN",
            Region::Mena => "MENA",
            Region::Asia => "ASIA(CN/JP/KR)",
        }
    }

    pub fn countries(self) -> &'static [&'static str] {
        match self {
            Region::Eu => &["GB", "DE", "FR", "IT", "FI", "NL", "BE", "DK", "SE", "NO", "EE"],
            Region::Asean => &["MY", "ID", "PH", "TH", "VN", "SG"],
            Region::Mena => &["AE", "SA", "KW", "BH", "QA"],
            Region::Asia => &["JP", "KR", "CN"],
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Region {
    type Err = UnknownRegion;

    /// Accepts the display label case-insensitively; `ASIA` is shorthand for `ASIA(CN/JP/KR)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        if wanted == "ASIA" {
            return Ok(Region::Asia);
        }
        Region::ALL
            .into_iter()
            .find(|r| r.label() == wanted)
            .ok_or_else(|| UnknownRegion(s.to_string()))
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

pub fn major_city(country: &str) -> Option<&'static str> {
    COUNTRY_CITIES
        .iter()
        .find(|(code, _)| *code == country)
        .map(|(_, city)| *city)
}

/// Location hint for a country code; unknown codes get an "Unknown" city.
pub fn location_hint(country: &str) -> LocationHint {
    let city = major_city(country).unwrap_or(UNKNOWN_CITY);
    LocationHint {
        country: country.to_string(),
        region: city.to_string(),
        city: city.to_string(),
    }
}
