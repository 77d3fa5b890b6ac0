//! Observation tables shared by every processing stage.
//!
//! A table is column oriented: one timestamp vector plus one `Column` per
//! parameter, each holding a value vector and, until quality filtering has
//! run, a parallel flag vector. Tables are never mutated by a stage; each
//! stage builds a new table and carries the station descriptors forward.
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::ValidationError;
use crate::station::{Category, StationDescriptor};

/// Values of one parameter, aligned with the table's timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub values: Vec<Option<f64>>,
    /// Provider quality codes; `None` once flags have been stripped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<Vec<Option<i32>>>,
}

impl Column {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self {
            values,
            flags: None,
        }
    }

    pub fn with_flags(values: Vec<Option<f64>>, flags: Vec<Option<i32>>) -> Self {
        Self {
            values,
            flags: Some(flags),
        }
    }

    /// A column of `len` missing values.
    pub fn missing(len: usize) -> Self {
        Self::new(vec![None; len])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of present values.
    pub fn count_present(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            values: indices.iter().map(|&i| self.values[i]).collect(),
            flags: self
                .flags
                .as_ref()
                .map(|flags| indices.iter().map(|&i| flags[i]).collect()),
        }
    }
}

/// Processing history carried with a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableAttributes {
    /// Quality filtering has run and flags were stripped.
    #[serde(default)]
    pub qaqc_applied: bool,
    /// Step of the regular grid, once the table has been regridded.
    #[serde(default)]
    pub timestep_minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawTable {
    stations: Vec<StationDescriptor>,
    timestamps: Vec<DateTime<FixedOffset>>,
    columns: BTreeMap<String, Column>,
    #[serde(default)]
    attributes: TableAttributes,
}

/// A station's observations, ordered by strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct ObservationTable {
    stations: Vec<StationDescriptor>,
    timestamps: Vec<DateTime<FixedOffset>>,
    columns: BTreeMap<String, Column>,
    attributes: TableAttributes,
}

impl ObservationTable {
    /// Build a table for one station.
    ///
    /// Rows are sorted by timestamp; when a timestamp repeats, the first row
    /// in input order is kept. Every column must match the timestamp count.
    pub fn new(
        station: StationDescriptor,
        timestamps: Vec<DateTime<FixedOffset>>,
        columns: BTreeMap<String, Column>,
    ) -> Result<Self, ValidationError> {
        Self::build(vec![station], timestamps, columns, TableAttributes::default())
    }

    fn build(
        stations: Vec<StationDescriptor>,
        timestamps: Vec<DateTime<FixedOffset>>,
        columns: BTreeMap<String, Column>,
        attributes: TableAttributes,
    ) -> Result<Self, ValidationError> {
        for (name, column) in &columns {
            if column.len() != timestamps.len() {
                return Err(ValidationError::ColumnLength {
                    column: name.clone(),
                    expected: timestamps.len(),
                    actual: column.len(),
                });
            }
            if let Some(flags) = &column.flags {
                if flags.len() != timestamps.len() {
                    return Err(ValidationError::ColumnLength {
                        column: format!("{name} flags"),
                        expected: timestamps.len(),
                        actual: flags.len(),
                    });
                }
            }
        }

        if timestamps.windows(2).all(|w| w[0] < w[1]) {
            return Ok(Self {
                stations,
                timestamps,
                columns,
                attributes,
            });
        }

        // Stable sort keeps the first of any repeated timestamp in front.
        let mut order: Vec<usize> = (0..timestamps.len()).collect();
        order.sort_by_key(|&i| timestamps[i]);
        order.dedup_by_key(|i| timestamps[*i]);

        debug!(
            "Reordered {} rows, dropped {} duplicate timestamps",
            timestamps.len(),
            timestamps.len() - order.len()
        );

        Ok(Self {
            stations,
            timestamps: order.iter().map(|&i| timestamps[i]).collect(),
            columns: columns
                .into_iter()
                .map(|(name, column)| {
                    let selected = column.select(&order);
                    (name, selected)
                })
                .collect(),
            attributes,
        })
    }

    /// Assemble a stage output whose timestamps are already strictly increasing.
    pub(crate) fn from_parts(
        stations: Vec<StationDescriptor>,
        timestamps: Vec<DateTime<FixedOffset>>,
        columns: BTreeMap<String, Column>,
        attributes: TableAttributes,
    ) -> Self {
        debug_assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(columns.values().all(|c| c.len() == timestamps.len()));
        Self {
            stations,
            timestamps,
            columns,
            attributes,
        }
    }

    /// Descriptor of the first (or only) station the table was built from.
    pub fn station(&self) -> &StationDescriptor {
        &self.stations[0]
    }

    pub fn stations(&self) -> &[StationDescriptor] {
        &self.stations
    }

    pub fn categories(&self) -> Vec<Category> {
        self.stations.iter().map(|s| s.category()).collect()
    }

    pub fn timestamps(&self) -> &[DateTime<FixedOffset>] {
        &self.timestamps
    }

    pub fn columns(&self) -> &BTreeMap<String, Column> {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Values of a required column.
    pub fn values(&self, name: &str) -> Result<&[Option<f64>], ValidationError> {
        self.columns
            .get(name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| ValidationError::MissingColumn(name.to_string()))
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn attributes(&self) -> &TableAttributes {
        &self.attributes
    }

    pub fn has_flags(&self) -> bool {
        self.columns.values().any(|c| c.flags.is_some())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        self.timestamps.last().copied()
    }

    /// Station code used in log fields; combined tables join their codes.
    pub(crate) fn label(&self) -> String {
        self.stations
            .iter()
            .map(|s| s.code.to_string())
            .collect::<Vec<_>>()
            .join("+")
    }
}

impl TryFrom<RawTable> for ObservationTable {
    type Error = ValidationError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        if raw.stations.is_empty() {
            return Err(ValidationError::MissingColumn("stations".to_string()));
        }
        Self::build(raw.stations, raw.timestamps, raw.columns, raw.attributes)
    }
}
