use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;
use crate::station::StationCode;

/// How the combiner chooses the shared time grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CombineMode {
    /// Earliest to latest timestamp across all inputs.
    Union,
    /// Overlapping range of all inputs.
    Intersect,
    /// The existing grid of the named station.
    Station(String),
}

impl FromStr for CombineMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "union" => Ok(CombineMode::Union),
            "intersect" => Ok(CombineMode::Intersect),
            code => StationCode::parse(code)
                .map(|station| CombineMode::Station(station.to_string()))
                .map_err(|_| ConfigurationError::CombineMode(s.to_string())),
        }
    }
}

impl fmt::Display for CombineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombineMode::Union => f.write_str("union"),
            CombineMode::Intersect => f.write_str("intersect"),
            CombineMode::Station(code) => f.write_str(code),
        }
    }
}

impl TryFrom<String> for CombineMode {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CombineMode> for String {
    fn from(mode: CombineMode) -> Self {
        mode.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecompositionType {
    #[default]
    Additive,
    Multiplicative,
}

impl FromStr for DecompositionType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "additive" | "add" => Ok(DecompositionType::Additive),
            "multiplicative" | "mult" => Ok(DecompositionType::Multiplicative),
            _ => Err(ConfigurationError::DecompositionType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Centering {
    #[default]
    Mean,
    Median,
}

impl FromStr for Centering {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Centering::Mean),
            "median" => Ok(Centering::Median),
            _ => Err(ConfigurationError::Centering(s.to_string())),
        }
    }
}

/// Bounds outside of which daily metabolism estimates are flagged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlausibilityBounds {
    /// Gross production below this is flagged (g O2 m-2 d-1).
    pub min_production: f64,
    /// Respiration above this is flagged (g O2 m-2 d-1, respiration is negative).
    pub max_respiration: f64,
}

impl Default for PlausibilityBounds {
    fn default() -> Self {
        Self {
            min_production: 0.0,
            max_respiration: 0.0,
        }
    }
}

/// Options recognized by the processing stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    /// Accepted quality codes. An empty set accepts every code.
    pub quality_codes_accepted: BTreeSet<i32>,
    pub timestep_minutes: u32,
    /// Defaults to half the timestep.
    pub tolerance_minutes: Option<u32>,
    pub combine_mode: CombineMode,
    pub completeness_threshold: f64,
    /// Fewest valid records each of the day and night periods needs.
    pub min_period_records: usize,
    pub decomposition_type: DecompositionType,
    pub centering: Centering,
    pub anemometer_height_m: f64,
    /// Constant station depth overriding the depth column.
    pub depth_m: Option<f64>,
    /// Bottom sondes see no air-sea exchange.
    pub bottom_station: bool,
    pub plausibility: PlausibilityBounds,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            quality_codes_accepted: BTreeSet::from([0]),
            timestep_minutes: 30,
            tolerance_minutes: None,
            combine_mode: CombineMode::Union,
            completeness_threshold: 0.5,
            min_period_records: 3,
            decomposition_type: DecompositionType::Additive,
            centering: Centering::Mean,
            anemometer_height_m: 10.0,
            depth_m: None,
            bottom_station: false,
            plausibility: PlausibilityBounds::default(),
        }
    }
}

impl ProcessingOptions {
    /// Tolerance in minutes, defaulting to half the timestep.
    pub fn tolerance(&self) -> u32 {
        self.tolerance_minutes.unwrap_or(self.timestep_minutes / 2)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_grid(self.timestep_minutes, self.tolerance())?;

        if !(0.0..=1.0).contains(&self.completeness_threshold) {
            return Err(ConfigurationError::CompletenessThreshold(
                self.completeness_threshold,
            ));
        }
        if self.anemometer_height_m.is_nan() || self.anemometer_height_m <= 0.0 {
            return Err(ConfigurationError::AnemometerHeight(self.anemometer_height_m));
        }
        if let Some(depth) = self.depth_m {
            if depth.is_nan() || depth <= 0.0 {
                return Err(ConfigurationError::Depth(depth));
            }
        }
        Ok(())
    }

    /// Load options from `SWMP_*` environment variables.
    ///
    /// Unset variables keep their defaults; set but unparsable ones are errors.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let defaults = Self::default();

        let options = Self {
            quality_codes_accepted: match env::var("SWMP_QUALITY_CODES") {
                Ok(raw) => parse_codes(&raw)?,
                Err(_) => defaults.quality_codes_accepted,
            },
            timestep_minutes: env_parse("SWMP_TIMESTEP_MINUTES")?
                .unwrap_or(defaults.timestep_minutes),
            tolerance_minutes: env_parse("SWMP_TOLERANCE_MINUTES")?,
            combine_mode: env_parse("SWMP_COMBINE_MODE")?.unwrap_or(defaults.combine_mode),
            completeness_threshold: env_parse("SWMP_COMPLETENESS_THRESHOLD")?
                .unwrap_or(defaults.completeness_threshold),
            min_period_records: env_parse("SWMP_MIN_PERIOD_RECORDS")?
                .unwrap_or(defaults.min_period_records),
            decomposition_type: env_parse("SWMP_DECOMPOSITION_TYPE")?
                .unwrap_or(defaults.decomposition_type),
            centering: env_parse("SWMP_CENTERING")?.unwrap_or(defaults.centering),
            anemometer_height_m: env_parse("SWMP_ANEMOMETER_HEIGHT_M")?
                .unwrap_or(defaults.anemometer_height_m),
            depth_m: env_parse("SWMP_DEPTH_M")?,
            bottom_station: env_parse("SWMP_BOTTOM_STATION")?.unwrap_or(defaults.bottom_station),
            plausibility: PlausibilityBounds {
                min_production: env_parse("SWMP_MIN_PRODUCTION")?
                    .unwrap_or(defaults.plausibility.min_production),
                max_respiration: env_parse("SWMP_MAX_RESPIRATION")?
                    .unwrap_or(defaults.plausibility.max_respiration),
            },
        };

        options.validate()?;
        Ok(options)
    }
}

/// Check a timestep/tolerance pair: the step is positive and the tolerance
/// is at most half of it.
pub fn validate_grid(timestep_minutes: u32, tolerance_minutes: u32) -> Result<(), ConfigurationError> {
    if timestep_minutes == 0 {
        return Err(ConfigurationError::ZeroTimestep(timestep_minutes));
    }
    // Compare doubled values so odd steps keep their exact half.
    if u64::from(tolerance_minutes) * 2 > u64::from(timestep_minutes) {
        return Err(ConfigurationError::ToleranceTooLarge {
            tolerance: tolerance_minutes,
            timestep: timestep_minutes,
        });
    }
    Ok(())
}

fn env_parse<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigurationError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigurationError::EnvValue { var, value: raw }),
        Err(_) => Ok(None),
    }
}

/// Parse a comma separated code list such as "0,1,-3". Blank means accept all.
fn parse_codes(raw: &str) -> Result<BTreeSet<i32>, ConfigurationError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>()
                .map_err(|_| ConfigurationError::EnvValue {
                    var: "SWMP_QUALITY_CODES",
                    value: raw.to_string(),
                })
        })
        .collect()
}
