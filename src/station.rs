//! Station identifiers and the static reserve registry.
//!
//! Station codes are 7-8 lowercase characters: a 3-letter reserve code, a
//! 2-character site code and a category suffix, e.g. "apacpwq" (Apalachicola,
//! Cat Point, water quality) or "apaebmet" (Apalachicola, East Bay, weather).
use chrono::FixedOffset;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Data category of a station table, fixed when the table is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "wq")]
    WaterQuality,
    #[serde(rename = "nut")]
    Nutrient,
    #[serde(rename = "met")]
    Weather,
}

impl Category {
    pub fn suffix(&self) -> &'static str {
        match self {
            Category::WaterQuality => "wq",
            Category::Nutrient => "nut",
            Category::Weather => "met",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wq" => Ok(Category::WaterQuality),
            "nut" => Ok(Category::Nutrient),
            "met" => Ok(Category::Weather),
            other => Err(ValidationError::StationCode(other.to_string())),
        }
    }
}

/// A parsed station code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationCode {
    reserve: String,
    site: String,
    category: Category,
}

impl StationCode {
    /// Parse a station code such as "apacpwq".
    ///
    /// Upper-case input is accepted and normalized.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let normalized = value.trim().to_ascii_lowercase();
        let re = Regex::new(r"^([a-z]{3})([a-z0-9]{2})(wq|nut|met)$")
            .map_err(|_| ValidationError::StationCode(value.to_string()))?;
        let caps = re
            .captures(&normalized)
            .ok_or_else(|| ValidationError::StationCode(value.to_string()))?;

        Ok(Self {
            reserve: caps[1].to_string(),
            site: caps[2].to_string(),
            category: caps[3].parse()?,
        })
    }

    pub fn reserve(&self) -> &str {
        &self.reserve
    }

    pub fn site(&self) -> &str {
        &self.site
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

impl fmt::Display for StationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.reserve, self.site, self.category)
    }
}

impl FromStr for StationCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StationCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StationCode> for String {
    fn from(code: StationCode) -> Self {
        code.to_string()
    }
}

// ---------------------------------------------------------------------------
// Reserve registry
// ---------------------------------------------------------------------------

/// A research reserve and its standard-time UTC offset.
///
/// Offsets are standard time year round; station clocks never observe
/// daylight saving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reserve {
    pub code: &'static str,
    pub name: &'static str,
    pub utc_offset_hours: i32,
}

pub static RESERVES: &[Reserve] = &[
    Reserve { code: "ace", name: "ACE Basin", utc_offset_hours: -5 },
    Reserve { code: "apa", name: "Apalachicola", utc_offset_hours: -5 },
    Reserve { code: "cbm", name: "Chesapeake Bay, MD", utc_offset_hours: -5 },
    Reserve { code: "cbv", name: "Chesapeake Bay, VA", utc_offset_hours: -5 },
    Reserve { code: "del", name: "Delaware", utc_offset_hours: -5 },
    Reserve { code: "elk", name: "Elkhorn Slough", utc_offset_hours: -8 },
    Reserve { code: "gnd", name: "Grand Bay", utc_offset_hours: -6 },
    Reserve { code: "grb", name: "Great Bay", utc_offset_hours: -5 },
    Reserve { code: "gtm", name: "Guana Tolomato Matanzas", utc_offset_hours: -5 },
    Reserve { code: "hud", name: "Hudson River", utc_offset_hours: -5 },
    Reserve { code: "jac", name: "Jacques Cousteau", utc_offset_hours: -5 },
    Reserve { code: "job", name: "Jobos Bay", utc_offset_hours: -4 },
    Reserve { code: "kac", name: "Kachemak Bay", utc_offset_hours: -9 },
    Reserve { code: "lks", name: "Lake Superior", utc_offset_hours: -6 },
    Reserve { code: "mar", name: "Mission-Aransas", utc_offset_hours: -6 },
    Reserve { code: "nar", name: "Narragansett Bay", utc_offset_hours: -5 },
    Reserve { code: "niw", name: "North Inlet-Winyah Bay", utc_offset_hours: -5 },
    Reserve { code: "noc", name: "North Carolina", utc_offset_hours: -5 },
    Reserve { code: "owc", name: "Old Woman Creek", utc_offset_hours: -5 },
    Reserve { code: "pdb", name: "Padilla Bay", utc_offset_hours: -8 },
    Reserve { code: "rkb", name: "Rookery Bay", utc_offset_hours: -5 },
    Reserve { code: "sap", name: "Sapelo Island", utc_offset_hours: -5 },
    Reserve { code: "sfb", name: "San Francisco Bay", utc_offset_hours: -8 },
    Reserve { code: "sos", name: "South Slough", utc_offset_hours: -8 },
    Reserve { code: "tjr", name: "Tijuana River", utc_offset_hours: -8 },
    Reserve { code: "wel", name: "Wells", utc_offset_hours: -5 },
    Reserve { code: "wkb", name: "Weeks Bay", utc_offset_hours: -6 },
    Reserve { code: "wqb", name: "Waquoit Bay", utc_offset_hours: -5 },
];

/// Look up a reserve by its 3-letter code.
pub fn find_reserve(code: &str) -> Option<&'static Reserve> {
    RESERVES.iter().find(|r| r.code == code)
}

/// Standard-time UTC offset for a station.
pub fn utc_offset(code: &StationCode) -> Result<FixedOffset, ValidationError> {
    let reserve = find_reserve(code.reserve())
        .ok_or_else(|| ValidationError::UnknownReserve(code.to_string()))?;
    FixedOffset::east_opt(reserve.utc_offset_hours * 3600)
        .ok_or_else(|| ValidationError::UnknownReserve(code.to_string()))
}

// ---------------------------------------------------------------------------
// Station descriptor
// ---------------------------------------------------------------------------

/// Metadata attached to every table derived from a station's data.
///
/// The UTC offset always comes from the reserve table. A serialized
/// descriptor may omit it; one that carries a different offset is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStationDescriptor")]
pub struct StationDescriptor {
    pub code: StationCode,
    /// WGS84 latitude, decimal degrees.
    pub latitude: f64,
    /// WGS84 longitude, decimal degrees (negative west).
    pub longitude: f64,
    pub utc_offset_hours: i32,
}

#[derive(Debug, Deserialize)]
struct RawStationDescriptor {
    code: StationCode,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    utc_offset_hours: Option<i32>,
}

impl TryFrom<RawStationDescriptor> for StationDescriptor {
    type Error = ValidationError;

    fn try_from(raw: RawStationDescriptor) -> Result<Self, Self::Error> {
        let station = Self::from_code(raw.code, raw.latitude, raw.longitude)?;
        match raw.utc_offset_hours {
            Some(hours) if hours != station.utc_offset_hours => Err(ValidationError::OffsetMismatch {
                station: station.code.to_string(),
                expected: station.utc_offset_hours,
                actual: hours,
            }),
            _ => Ok(station),
        }
    }
}

impl StationDescriptor {
    /// Build a descriptor, resolving the UTC offset from the reserve table.
    pub fn new(code: &str, latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        Self::from_code(StationCode::parse(code)?, latitude, longitude)
    }

    fn from_code(code: StationCode, latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        let offset = utc_offset(&code)?;
        Ok(Self {
            code,
            latitude,
            longitude,
            utc_offset_hours: offset.local_minus_utc() / 3600,
        })
    }

    pub fn category(&self) -> Category {
        self.code.category()
    }

    /// Fixed offset of the station clock.
    pub fn offset(&self) -> Result<FixedOffset, ValidationError> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .ok_or_else(|| ValidationError::UnknownReserve(self.code.to_string()))
    }
}
