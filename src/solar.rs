//! Solar boundary table: sunrise and sunset instants bounding the day and
//! night periods of each metabolic day.
//!
//! The astronomical computation itself sits behind [`SunEventProvider`];
//! [`NoaaSunCalculator`] is the default implementation.

pub mod noaa;

pub use noaa::NoaaSunCalculator;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, instrument};

use crate::error::{SwmpError, ValidationError};
use crate::station::StationDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SunEvent {
    Sunrise,
    Sunset,
}

impl SunEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SunEvent::Sunrise => "sunrise",
            SunEvent::Sunset => "sunset",
        }
    }
}

impl fmt::Display for SunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of sunrise and sunset instants.
pub trait SunEventProvider {
    /// The `event` nearest the local day containing `at`, or `None` when the
    /// sun does not cross the horizon that day.
    fn sun_event(
        &self,
        latitude: f64,
        longitude: f64,
        at: DateTime<FixedOffset>,
        event: SunEvent,
    ) -> Option<DateTime<FixedOffset>>;
}

/// One sunrise or sunset in the boundary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarBoundary {
    pub instant: DateTime<FixedOffset>,
    pub event: SunEvent,
    /// Date of the sunset that opens the metabolic day this boundary belongs to.
    pub metabolic_date: NaiveDate,
    /// Sunrise and sunset of the daylight period inside that metabolic day.
    pub sunrise: DateTime<FixedOffset>,
    pub sunset: DateTime<FixedOffset>,
    /// `sunset - sunrise` in decimal hours.
    pub day_length_hours: f64,
}

/// Chronologically sorted sunrise/sunset boundaries for one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarBoundaryTable {
    boundaries: Vec<SolarBoundary>,
}

impl SolarBoundaryTable {
    pub fn boundaries(&self) -> &[SolarBoundary] {
        &self.boundaries
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// The boundary opening the right-open interval that contains `t`.
    ///
    /// Instants before the first boundary, or at or after the last one,
    /// belong to no interval.
    pub fn locate(&self, t: DateTime<FixedOffset>) -> Result<&SolarBoundary, ValidationError> {
        let after = self.boundaries.partition_point(|b| b.instant <= t);
        if after == 0 || after == self.boundaries.len() {
            return Err(ValidationError::OutsideSolarRange(t));
        }
        Ok(&self.boundaries[after - 1])
    }
}

/// Build the boundary table for a station over `[start - 1 day, end + 1 day]`.
///
/// Events are grouped by the local calendar date on which they fall; when a
/// date receives more than one sunrise (or sunset), the earliest wins.
#[instrument(skip(provider, station), fields(station = %station.code))]
pub fn solar_boundaries<P: SunEventProvider + ?Sized>(
    provider: &P,
    station: &StationDescriptor,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<SolarBoundaryTable, SwmpError> {
    let offset = station.offset()?;

    let mut events: BTreeMap<(NaiveDate, SunEvent), DateTime<FixedOffset>> = BTreeMap::new();
    let mut date = start - Duration::days(1);
    let last = end + Duration::days(1);

    while date <= last {
        let noon = local_noon(offset, date)?;
        for event in [SunEvent::Sunrise, SunEvent::Sunset] {
            let instant = provider
                .sun_event(station.latitude, station.longitude, noon, event)
                .ok_or(ValidationError::NoSunEvent {
                    event: event.as_str(),
                    date,
                    latitude: station.latitude,
                })?;
            events
                .entry((instant.date_naive(), event))
                .and_modify(|kept| *kept = (*kept).min(instant))
                .or_insert(instant);
        }
        date += Duration::days(1);
    }

    let mut sorted: Vec<(DateTime<FixedOffset>, SunEvent)> =
        events.iter().map(|(&(_, event), &instant)| (instant, event)).collect();
    sorted.sort();

    // Daylight periods keyed by the local date of their sunrise.
    let mut daylight: BTreeMap<NaiveDate, (DateTime<FixedOffset>, DateTime<FixedOffset>)> =
        BTreeMap::new();
    for pair in sorted.windows(2) {
        if let [(sunrise, SunEvent::Sunrise), (sunset, SunEvent::Sunset)] = pair {
            daylight.insert(sunrise.date_naive(), (*sunrise, *sunset));
        }
    }

    let mut boundaries = Vec::with_capacity(sorted.len());
    for (instant, event) in sorted {
        let day = instant.date_naive();
        let metabolic_date = match event {
            SunEvent::Sunset => day,
            SunEvent::Sunrise => day - Duration::days(1),
        };
        // The daylight inside metabolic day D is that of D + 1. The final
        // sunset opens a day past the padded range and falls back to its own.
        let next = metabolic_date + Duration::days(1);
        let &(sunrise, sunset) = daylight
            .get(&next)
            .or_else(|| daylight.get(&metabolic_date))
            .ok_or(ValidationError::NoSunEvent {
                event: SunEvent::Sunrise.as_str(),
                date: next,
                latitude: station.latitude,
            })?;

        boundaries.push(SolarBoundary {
            instant,
            event,
            metabolic_date,
            sunrise,
            sunset,
            day_length_hours: (sunset - sunrise).num_seconds() as f64 / 3600.0,
        });
    }

    debug!(
        "Built {} solar boundaries from {} to {}",
        boundaries.len(),
        start,
        end
    );

    Ok(SolarBoundaryTable { boundaries })
}

fn local_noon(offset: FixedOffset, date: NaiveDate) -> Result<DateTime<FixedOffset>, ValidationError> {
    date.and_hms_opt(12, 0, 0)
        .and_then(|noon| offset.from_local_datetime(&noon).single())
        .ok_or(ValidationError::NoSunEvent {
            event: "noon",
            date,
            latitude: f64::NAN,
        })
}
