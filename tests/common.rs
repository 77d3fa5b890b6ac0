#![allow(dead_code)]

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Timelike};
use std::collections::BTreeMap;
use swmp_metab::station::StationDescriptor;
use swmp_metab::table::{Column, ObservationTable};

/// Apalachicola reserve coordinates
pub const APA_LAT: f64 = 29.7245;
pub const APA_LON: f64 = -84.8827;

/// Local standard time at the Apalachicola reserve (UTC-5).
pub fn est(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::west_opt(5 * 3600)
        .unwrap()
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .unwrap()
}

/// `count` timestamps `step_minutes` apart.
pub fn times(start: DateTime<FixedOffset>, step_minutes: i64, count: usize) -> Vec<DateTime<FixedOffset>> {
    (0..count as i64)
        .map(|i| start + Duration::minutes(step_minutes * i))
        .collect()
}

/// Hours since local midnight as a decimal.
pub fn local_hours(t: DateTime<FixedOffset>) -> f64 {
    f64::from(t.hour()) + f64::from(t.minute()) / 60.0
}

/// A table whose values come from `f(parameter, timestamp)`, every reading
/// carrying the flag `0`.
pub fn flagged_table<F>(
    code: &str,
    timestamps: Vec<DateTime<FixedOffset>>,
    parameters: &[&str],
    f: F,
) -> ObservationTable
where
    F: Fn(&str, DateTime<FixedOffset>) -> f64,
{
    let mut columns = BTreeMap::new();
    for parameter in parameters {
        let values = timestamps.iter().map(|t| Some(f(parameter, *t))).collect();
        let flags = vec![Some(0); timestamps.len()];
        columns.insert(parameter.to_string(), Column::with_flags(values, flags));
    }
    ObservationTable::new(
        StationDescriptor::new(code, APA_LAT, APA_LON).unwrap(),
        timestamps,
        columns,
    )
    .unwrap()
}

/// Water quality readings with a daily oxygen cycle peaking at 16:00.
pub fn water_quality(timestamps: Vec<DateTime<FixedOffset>>) -> ObservationTable {
    flagged_table(
        "apacpwq",
        timestamps,
        &["do_mgl", "temp", "sal", "depth"],
        |parameter, t| match parameter {
            "do_mgl" => {
                7.0 + 1.5 * (2.0 * std::f64::consts::PI * (local_hours(t) - 10.0) / 24.0).sin()
            }
            "temp" => 28.0,
            "sal" => 25.0,
            _ => 1.5,
        },
    )
}

/// Weather readings with constant conditions.
pub fn weather(timestamps: Vec<DateTime<FixedOffset>>) -> ObservationTable {
    flagged_table(
        "apaebmet",
        timestamps,
        &["atemp", "wspd", "bp"],
        |parameter, _| match parameter {
            "atemp" => 27.0,
            "wspd" => 2.0,
            _ => 1013.0,
        },
    )
}
