//! Metabolic-day partitioning.
//!
//! A metabolic day runs from one sunset to the next and is named by the date
//! of its opening sunset. Within it, the night period runs from sunset to
//! sunrise and the day period from sunrise to the closing sunset.
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{SwmpError, ValidationError};
use crate::solar::{solar_boundaries, SolarBoundaryTable, SunEvent, SunEventProvider};
use crate::table::ObservationTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolarPeriod {
    Day,
    Night,
}

impl From<SunEvent> for SolarPeriod {
    fn from(event: SunEvent) -> Self {
        match event {
            SunEvent::Sunrise => SolarPeriod::Day,
            SunEvent::Sunset => SolarPeriod::Night,
        }
    }
}

/// Metabolic day and solar period of one grid row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAssignment {
    pub metabolic_date: NaiveDate,
    pub period: SolarPeriod,
    pub sunrise: DateTime<FixedOffset>,
    pub sunset: DateTime<FixedOffset>,
    pub day_length_hours: f64,
}

/// A table with one `DayAssignment` per row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionedTable {
    table: ObservationTable,
    assignments: Vec<DayAssignment>,
}

impl PartitionedTable {
    pub fn table(&self) -> &ObservationTable {
        &self.table
    }

    pub fn assignments(&self) -> &[DayAssignment] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Assign every row of `table` to a metabolic day and solar period.
///
/// Each timestamp falls in the right-open interval `[b[i], b[i+1])` of the
/// boundary table. A timestamp outside every interval fails the whole call.
#[instrument(skip(table, boundaries), fields(station = %table.label(), rows = table.len()))]
pub fn partition(
    table: &ObservationTable,
    boundaries: &SolarBoundaryTable,
) -> Result<PartitionedTable, ValidationError> {
    let assignments = table
        .timestamps()
        .iter()
        .map(|&t| {
            boundaries.locate(t).map(|b| DayAssignment {
                metabolic_date: b.metabolic_date,
                period: b.event.into(),
                sunrise: b.sunrise,
                sunset: b.sunset,
                day_length_hours: b.day_length_hours,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Assigned {} rows to metabolic days", assignments.len());

    Ok(PartitionedTable {
        table: table.clone(),
        assignments,
    })
}

/// Build the station's boundary table over the table's date range and
/// partition the table against it.
pub fn metab_day<P: SunEventProvider + ?Sized>(
    table: &ObservationTable,
    provider: &P,
) -> Result<PartitionedTable, SwmpError> {
    let (first, last) = match (table.first_timestamp(), table.last_timestamp()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(ValidationError::EmptyTable.into()),
    };
    let station = table.station();
    let offset = station.offset()?;

    let boundaries = solar_boundaries(
        provider,
        station,
        first.with_timezone(&offset).date_naive(),
        last.with_timezone(&offset).date_naive(),
    )?;

    Ok(partition(table, &boundaries)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::StationDescriptor;
    use crate::table::Column;
    use chrono::{Duration, TimeZone, Timelike};
    use std::collections::BTreeMap;

    /// Sunrise at 06:00 and sunset at 18:00 local, every day.
    struct EvenSun;

    impl SunEventProvider for EvenSun {
        fn sun_event(
            &self,
            _latitude: f64,
            _longitude: f64,
            at: DateTime<FixedOffset>,
            event: SunEvent,
        ) -> Option<DateTime<FixedOffset>> {
            match event {
                SunEvent::Sunrise => at.with_hour(6),
                SunEvent::Sunset => at.with_hour(18),
            }
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2013, 8, day, hour, 0, 0)
            .unwrap()
    }

    fn hourly_table(hours: i64) -> ObservationTable {
        let start = at(1, 0);
        let timestamps = (0..hours).map(|h| start + Duration::hours(h)).collect();
        let mut columns = BTreeMap::new();
        columns.insert("do_mgl".to_string(), Column::missing(hours as usize));
        ObservationTable::new(
            StationDescriptor::new("apacpwq", 29.72, -84.88).unwrap(),
            timestamps,
            columns,
        )
        .unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2013, 8, day).unwrap()
    }

    #[test]
    fn test_every_row_gets_one_assignment() {
        let partitioned = metab_day(&hourly_table(48), &EvenSun).unwrap();
        assert_eq!(partitioned.len(), 48);

        let a = partitioned.assignments();
        // 00:00 on the 1st: night of the day opened by sunset on July 31
        assert_eq!(a[0].metabolic_date, date(1).pred_opt().unwrap());
        assert_eq!(a[0].period, SolarPeriod::Night);
        // 10:00 on the 1st: daylight of the same metabolic day
        assert_eq!(a[10].metabolic_date, date(1).pred_opt().unwrap());
        assert_eq!(a[10].period, SolarPeriod::Day);
        // 20:00 on the 1st: night of metabolic day 1
        assert_eq!(a[20].metabolic_date, date(1));
        assert_eq!(a[20].period, SolarPeriod::Night);
        assert!((a[20].day_length_hours - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_instant_opens_new_interval() {
        let partitioned = metab_day(&hourly_table(48), &EvenSun).unwrap();
        let a = partitioned.assignments();

        // 18:00 on the 1st is the sunset itself
        assert_eq!(a[18].metabolic_date, date(1));
        assert_eq!(a[18].period, SolarPeriod::Night);
        assert_eq!(a[17].metabolic_date, date(1).pred_opt().unwrap());
        assert_eq!(a[17].period, SolarPeriod::Day);
        // 06:00 on the 2nd is the sunrise
        assert_eq!(a[30].period, SolarPeriod::Day);
        assert_eq!(a[30].sunrise, at(2, 6));
        assert_eq!(a[30].sunset, at(2, 18));
    }

    #[test]
    fn test_rows_outside_boundaries_rejected() {
        let boundaries = solar_boundaries(
            &EvenSun,
            &StationDescriptor::new("apacpwq", 29.72, -84.88).unwrap(),
            date(10),
            date(10),
        )
        .unwrap();

        let err = partition(&hourly_table(4), &boundaries).unwrap_err();
        assert!(matches!(err, ValidationError::OutsideSolarRange(_)));
    }
}
