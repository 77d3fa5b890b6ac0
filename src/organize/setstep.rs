use chrono::{DateTime, Duration, FixedOffset, Timelike};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use crate::config::validate_grid;
use crate::error::{SwmpError, ValidationError};
use crate::table::{Column, ObservationTable, TableAttributes};

/// Place a table on a regular time grid.
///
/// The grid starts at the first observation rounded down to the hour and
/// runs in `timestep_minutes` steps until it reaches or passes the last
/// observation. Each grid instant takes the values of the nearest
/// observation within the tolerance (half the step when `None`); instants
/// with no observation in range become gap rows with every value missing.
/// Nothing is interpolated.
#[instrument(skip(table), fields(station = %table.label(), rows = table.len()))]
pub fn setstep(
    table: &ObservationTable,
    timestep_minutes: u32,
    tolerance_minutes: Option<u32>,
) -> Result<ObservationTable, SwmpError> {
    let tolerance = tolerance_minutes.unwrap_or(timestep_minutes / 2);
    validate_grid(timestep_minutes, tolerance)?;

    let (first, last) = match (table.first_timestamp(), table.last_timestamp()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(ValidationError::EmptyTable.into()),
    };

    let grid = regular_grid(floor_to_hour(first), last, timestep_minutes);
    let (columns, matched) = match_to_grid(table, &grid, tolerance);

    let gaps = grid.len() - matched;
    info!(
        "Regridded {} rows onto {} steps of {} minutes ({} gap rows)",
        table.len(),
        grid.len(),
        timestep_minutes,
        gaps
    );

    Ok(ObservationTable::from_parts(
        table.stations().to_vec(),
        grid,
        columns,
        TableAttributes {
            timestep_minutes: Some(timestep_minutes),
            ..table.attributes().clone()
        },
    ))
}

/// Round down to the start of the hour, in the timestamp's own offset.
pub fn floor_to_hour(t: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    t - Duration::minutes(i64::from(t.minute()))
        - Duration::seconds(i64::from(t.second()))
        - Duration::nanoseconds(i64::from(t.nanosecond()))
}

/// Steps of `timestep_minutes` from `start` covering `end`: the sequence has
/// ceil((end - start) / step) + 1 instants. A zero step yields no grid.
pub fn regular_grid(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    timestep_minutes: u32,
) -> Vec<DateTime<FixedOffset>> {
    if timestep_minutes == 0 {
        return Vec::new();
    }
    let step_ms = i64::from(timestep_minutes) * 60_000;
    let span_ms = (end - start).num_milliseconds().max(0);
    let steps = (span_ms + step_ms - 1) / step_ms;

    (0..=steps)
        .map(|i| start + Duration::milliseconds(i * step_ms))
        .collect()
}

/// Index of the nearest observation within tolerance for each grid instant.
///
/// Ties go to the earlier observation.
pub(crate) fn nearest_indices(
    observed: &[DateTime<FixedOffset>],
    grid: &[DateTime<FixedOffset>],
    tolerance_minutes: u32,
) -> Vec<Option<usize>> {
    let tolerance = Duration::minutes(i64::from(tolerance_minutes));

    grid.iter()
        .map(|g| {
            let after = observed.partition_point(|t| t < g);
            let before = after.checked_sub(1);

            let candidates = [before, (after < observed.len()).then_some(after)];
            candidates
                .into_iter()
                .flatten()
                .map(|i| (i, (observed[i] - *g).abs()))
                .filter(|(_, diff)| *diff <= tolerance)
                .min_by_key(|(_, diff)| *diff)
                .map(|(i, _)| i)
        })
        .collect()
}

/// Copy each column onto `grid`, leaving unmatched instants missing.
///
/// Also returns how many grid instants found an observation.
pub(crate) fn match_to_grid(
    table: &ObservationTable,
    grid: &[DateTime<FixedOffset>],
    tolerance_minutes: u32,
) -> (BTreeMap<String, Column>, usize) {
    let matches = nearest_indices(table.timestamps(), grid, tolerance_minutes);
    let matched = matches.iter().filter(|m| m.is_some()).count();
    debug!("Matched {} of {} grid instants", matched, grid.len());

    let columns = table
        .columns()
        .iter()
        .map(|(name, column)| {
            let values = matches.iter().map(|m| m.and_then(|i| column.values[i])).collect();
            let flags = column
                .flags
                .as_ref()
                .map(|flags| matches.iter().map(|m| m.and_then(|i| flags[i])).collect());
            (name.clone(), Column { values, flags })
        })
        .collect();

    (columns, matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigurationError;
    use crate::station::StationDescriptor;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2013, 7, day, hour, minute, 0)
            .unwrap()
    }

    fn table(timestamps: Vec<DateTime<FixedOffset>>) -> ObservationTable {
        let values = (0..timestamps.len()).map(|i| Some(i as f64)).collect();
        let mut columns = BTreeMap::new();
        columns.insert("temp".to_string(), Column::new(values));
        ObservationTable::new(
            StationDescriptor::new("apacpwq", 29.72, -84.88).unwrap(),
            timestamps,
            columns,
        )
        .unwrap()
    }

    #[test]
    fn test_floor_to_hour() {
        assert_eq!(floor_to_hour(at(1, 10, 47)), at(1, 10, 0));
        assert_eq!(floor_to_hour(at(1, 10, 0)), at(1, 10, 0));
    }

    #[test]
    fn test_grid_length_rounds_up() {
        assert_eq!(regular_grid(at(1, 0, 0), at(1, 1, 0), 15).len(), 5);
        assert_eq!(regular_grid(at(1, 0, 0), at(1, 1, 5), 15).len(), 6);
        assert_eq!(regular_grid(at(1, 0, 0), at(1, 0, 0), 15).len(), 1);
    }

    #[test]
    fn test_zero_step_grid_is_empty() {
        assert!(regular_grid(at(1, 0, 0), at(1, 1, 0), 0).is_empty());
    }

    #[test]
    fn test_irregular_times_snap_to_grid() {
        let input = table(vec![at(1, 0, 14), at(1, 0, 31), at(1, 1, 2)]);
        let out = setstep(&input, 30, None).unwrap();

        assert_eq!(out.timestamps(), &[at(1, 0, 0), at(1, 0, 30), at(1, 1, 0), at(1, 1, 30)]);
        // 00:00 is 14 minutes from the first reading, within 15
        assert_eq!(
            out.values("temp").unwrap(),
            &[Some(0.0), Some(1.0), Some(2.0), None]
        );
        assert_eq!(out.attributes().timestep_minutes, Some(30));
    }

    #[test]
    fn test_outside_tolerance_is_gap() {
        let input = table(vec![at(1, 0, 0), at(1, 0, 28)]);
        let out = setstep(&input, 15, Some(5)).unwrap();
        assert_eq!(
            out.values("temp").unwrap(),
            &[Some(0.0), None, Some(1.0)]
        );
    }

    #[test]
    fn test_tie_goes_to_earlier_observation() {
        let input = table(vec![at(1, 0, 0), at(1, 0, 10), at(1, 0, 20)]);
        let out = setstep(&input, 15, Some(5)).unwrap();
        // 00:15 is 5 minutes from both 00:10 and 00:20
        assert_eq!(out.values("temp").unwrap()[1], Some(1.0));
    }

    #[test]
    fn test_tolerance_over_half_step_fails() {
        let input = table(vec![at(1, 0, 0)]);
        let err = setstep(&input, 15, Some(8)).unwrap_err();
        assert!(matches!(
            err,
            SwmpError::Configuration(ConfigurationError::ToleranceTooLarge { .. })
        ));
    }

    #[test]
    fn test_empty_table_fails() {
        let input = table(vec![]);
        assert!(matches!(
            setstep(&input, 15, None),
            Err(SwmpError::Validation(ValidationError::EmptyTable))
        ));
    }
}
