use chrono::{DateTime, FixedOffset};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

use super::setstep::{match_to_grid, regular_grid};
use crate::config::{validate_grid, CombineMode};
use crate::error::{SwmpError, ValidationError};
use crate::table::{Column, ObservationTable, TableAttributes};

/// Merge tables from several stations onto one regular time grid.
///
/// - `Union` spans the earliest to the latest timestamp of all inputs.
/// - `Intersect` spans only the range every input covers.
/// - `Station(code)` reuses the named input's own timestamps. That input
///   must already sit on a regular grid of `timestep_minutes`.
///
/// In `Union` and `Intersect` mode every input must be of a different
/// category. Anchor mode lifts that restriction so one dedicated table
/// (typically weather) can be aligned to several stations. Parameter names
/// must not repeat across inputs in any mode.
#[instrument(skip(tables), fields(tables = tables.len(), mode = %mode))]
pub fn combine(
    tables: &[ObservationTable],
    mode: &CombineMode,
    timestep_minutes: u32,
    tolerance_minutes: Option<u32>,
) -> Result<ObservationTable, SwmpError> {
    let tolerance = tolerance_minutes.unwrap_or(timestep_minutes / 2);
    validate_grid(timestep_minutes, tolerance)?;

    if tables.len() < 2 {
        return Err(ValidationError::TooFewTables(tables.len()).into());
    }
    if tables.iter().any(ObservationTable::is_empty) {
        return Err(ValidationError::EmptyTable.into());
    }
    check_columns(tables)?;

    let (grid, anchor) = match mode {
        CombineMode::Union | CombineMode::Intersect => {
            check_categories(tables)?;
            let (start, end) = grid_range(tables, mode)?;
            (regular_grid(start, end, timestep_minutes), None)
        }
        CombineMode::Station(code) => {
            let index = tables
                .iter()
                .position(|t| t.stations().iter().any(|s| s.code.to_string() == *code))
                .ok_or_else(|| ValidationError::AnchorAbsent(code.clone()))?;
            match tables[index].attributes().timestep_minutes {
                None => return Err(ValidationError::NotRegularized.into()),
                Some(actual) if actual != timestep_minutes => {
                    return Err(ValidationError::GridStepMismatch {
                        expected: timestep_minutes,
                        actual,
                    }
                    .into())
                }
                Some(_) => {}
            }
            (tables[index].timestamps().to_vec(), Some(index))
        }
    };

    let mut columns: BTreeMap<String, Column> = BTreeMap::new();
    for (index, table) in tables.iter().enumerate() {
        if Some(index) == anchor {
            columns.extend(table.columns().clone());
        } else {
            let (matched_columns, matched) = match_to_grid(table, &grid, tolerance);
            debug!(
                "Table {} matched {} of {} grid instants",
                table.label(),
                matched,
                grid.len()
            );
            columns.extend(matched_columns);
        }
    }

    let stations = tables
        .iter()
        .flat_map(|t| t.stations().iter().cloned())
        .collect();

    info!(
        "Combined {} tables into {} rows and {} columns",
        tables.len(),
        grid.len(),
        columns.len()
    );

    Ok(ObservationTable::from_parts(
        stations,
        grid,
        columns,
        TableAttributes {
            qaqc_applied: tables.iter().all(|t| t.attributes().qaqc_applied),
            timestep_minutes: Some(timestep_minutes),
        },
    ))
}

fn grid_range(
    tables: &[ObservationTable],
    mode: &CombineMode,
) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), ValidationError> {
    let firsts = tables.iter().filter_map(ObservationTable::first_timestamp);
    let lasts = tables.iter().filter_map(ObservationTable::last_timestamp);

    let (start, end) = match mode {
        CombineMode::Intersect => (firsts.max(), lasts.min()),
        _ => (firsts.min(), lasts.max()),
    };
    let (start, end) = start.zip(end).ok_or(ValidationError::EmptyTable)?;

    if start > end {
        return Err(ValidationError::EmptyIntersection { start, end });
    }
    Ok((start, end))
}

fn check_categories(tables: &[ObservationTable]) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for category in tables.iter().flat_map(ObservationTable::categories) {
        if !seen.insert(category) {
            return Err(ValidationError::DuplicateCategory(category.to_string()));
        }
    }
    Ok(())
}

fn check_columns(tables: &[ObservationTable]) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for name in tables.iter().flat_map(|t| t.columns().keys()) {
        if !seen.insert(name.as_str()) {
            return Err(ValidationError::ColumnCollision(name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::organize::setstep::setstep;
    use crate::station::StationDescriptor;
    use chrono::{Duration, TimeZone};

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2012, 2, day, hour, minute, 0)
            .unwrap()
    }

    fn table(code: &str, column: &str, start: DateTime<FixedOffset>, rows: i64) -> ObservationTable {
        let timestamps = (0..rows).map(|i| start + Duration::minutes(30 * i)).collect();
        let mut columns = BTreeMap::new();
        columns.insert(
            column.to_string(),
            Column::new((0..rows).map(|i| Some(i as f64)).collect()),
        );
        ObservationTable::new(
            StationDescriptor::new(code, 29.7, -84.9).unwrap(),
            timestamps,
            columns,
        )
        .unwrap()
    }

    #[test]
    fn test_union_spans_all_inputs() {
        let wq = table("apacpwq", "do_mgl", at(1, 0, 0), 4);
        let met = table("apaebmet", "wspd", at(1, 1, 0), 4);

        let out = combine(&[wq, met], &CombineMode::Union, 30, None).unwrap();

        assert_eq!(out.first_timestamp(), Some(at(1, 0, 0)));
        assert_eq!(out.last_timestamp(), Some(at(1, 2, 30)));
        assert_eq!(out.len(), 6);
        assert_eq!(out.values("wspd").unwrap()[0], None);
        assert_eq!(out.values("do_mgl").unwrap()[5], None);
        assert_eq!(out.stations().len(), 2);
    }

    #[test]
    fn test_intersect_spans_overlap() {
        let wq = table("apacpwq", "do_mgl", at(1, 0, 0), 4);
        let met = table("apaebmet", "wspd", at(1, 1, 0), 4);

        let out = combine(&[wq, met], &CombineMode::Intersect, 30, None).unwrap();

        assert_eq!(out.timestamps(), &[at(1, 1, 0), at(1, 1, 30)]);
        assert_eq!(out.values("do_mgl").unwrap(), &[Some(2.0), Some(3.0)]);
        assert_eq!(out.values("wspd").unwrap(), &[Some(0.0), Some(1.0)]);
    }

    #[test]
    fn test_intersect_without_overlap_fails() {
        let wq = table("apacpwq", "do_mgl", at(1, 0, 0), 2);
        let met = table("apaebmet", "wspd", at(2, 0, 0), 2);

        let err = combine(&[wq, met], &CombineMode::Intersect, 30, None).unwrap_err();
        assert!(matches!(
            err,
            SwmpError::Validation(ValidationError::EmptyIntersection { .. })
        ));
    }

    #[test]
    fn test_anchor_uses_station_grid() {
        let wq = table("apacpwq", "do_mgl", at(1, 0, 0), 3);
        let met = table("apaebmet", "wspd", at(1, 0, 0), 10);

        let wq = setstep(&wq, 30, None).unwrap();

        let mode = CombineMode::Station("apacpwq".to_string());
        let out = combine(&[met, wq.clone()], &mode, 30, None).unwrap();

        assert_eq!(out.timestamps(), wq.timestamps());
        assert_eq!(out.values("wspd").unwrap(), &[Some(0.0), Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_anchor_must_be_present() {
        let wq = table("apacpwq", "do_mgl", at(1, 0, 0), 3);
        let met = table("apaebmet", "wspd", at(1, 0, 0), 3);

        let mode = CombineMode::Station("apadbwq".to_string());
        let err = combine(&[wq, met], &mode, 30, None).unwrap_err();
        assert!(matches!(
            err,
            SwmpError::Validation(ValidationError::AnchorAbsent(code)) if code == "apadbwq"
        ));
    }

    #[test]
    fn test_same_category_rejected_outside_anchor_mode() {
        let cp = table("apacpwq", "do_mgl", at(1, 0, 0), 3);
        let db = table("apadbwq", "temp", at(1, 0, 0), 3);

        let err = combine(&[cp.clone(), db.clone()], &CombineMode::Union, 30, None).unwrap_err();
        assert!(matches!(
            err,
            SwmpError::Validation(ValidationError::DuplicateCategory(_))
        ));

        let mode = CombineMode::Station("apacpwq".to_string());
        let cp = setstep(&cp, 30, None).unwrap();
        assert!(combine(&[cp, db], &mode, 30, None).is_ok());
    }

    #[test]
    fn test_anchor_must_be_regridded_at_the_step() {
        let hourly = {
            let base = table("apacpwq", "do_mgl", at(1, 0, 0), 6);
            let timestamps = (0..6).map(|i| at(1, 0, 0) + Duration::hours(i)).collect();
            ObservationTable::new(base.station().clone(), timestamps, base.columns().clone()).unwrap()
        };
        let met = table("apaebmet", "wspd", at(1, 0, 0), 12);
        let mode = CombineMode::Station("apacpwq".to_string());

        let err = combine(&[hourly.clone(), met.clone()], &mode, 30, None).unwrap_err();
        assert!(matches!(
            err,
            SwmpError::Validation(ValidationError::NotRegularized)
        ));

        let regridded = setstep(&hourly, 60, None).unwrap();
        let err = combine(&[regridded.clone(), met.clone()], &mode, 30, None).unwrap_err();
        assert!(matches!(
            err,
            SwmpError::Validation(ValidationError::GridStepMismatch {
                expected: 30,
                actual: 60
            })
        ));

        let out = combine(&[regridded, met], &mode, 60, None).unwrap();
        assert_eq!(out.len(), 6);
        assert_eq!(out.attributes().timestep_minutes, Some(60));
    }

    #[test]
    fn test_colliding_columns_rejected() {
        let wq = table("apacpwq", "temp", at(1, 0, 0), 3);
        let nut = table("apacpnut", "temp", at(1, 0, 0), 3);

        let err = combine(&[wq, nut], &CombineMode::Union, 30, None).unwrap_err();
        assert!(matches!(
            err,
            SwmpError::Validation(ValidationError::ColumnCollision(name)) if name == "temp"
        ));
    }

    #[test]
    fn test_single_table_rejected() {
        let wq = table("apacpwq", "do_mgl", at(1, 0, 0), 3);
        assert!(matches!(
            combine(&[wq], &CombineMode::Union, 30, None),
            Err(SwmpError::Validation(ValidationError::TooFewTables(1)))
        ));
    }
}
