mod common;

use common::{est, flagged_table, times, water_quality, weather};
use std::collections::BTreeSet;
use swmp_metab::config::{CombineMode, ProcessingOptions};
use swmp_metab::error::{SwmpError, ValidationError};
use swmp_metab::organize::{combine, organize, qaqc, setstep};

#[test]
fn test_one_day_with_two_hour_gap() {
    // 96 quarter-hour slots, 10:00 through 11:45 never reported
    let all = times(est(2013, 3, 4, 0, 0), 15, 96);
    let observed: Vec<_> = all
        .iter()
        .copied()
        .filter(|t| !(est(2013, 3, 4, 10, 0)..est(2013, 3, 4, 12, 0)).contains(t))
        .collect();
    assert_eq!(observed.len(), 88);

    let raw = flagged_table("apacpwq", observed, &["temp", "sal"], |parameter, t| {
        let base = if parameter == "temp" { 15.0 } else { 30.0 };
        base + common::local_hours(t) / 10.0
    });

    let filtered = qaqc(&raw, &BTreeSet::from([0]));
    let grid = setstep(&filtered, 15, Some(7)).unwrap();

    assert_eq!(grid.len(), 96);
    assert_eq!(grid.timestamps(), all.as_slice());
    assert!(!grid.has_flags());

    let temp = &grid.column("temp").unwrap().values;
    let sal = &grid.column("sal").unwrap().values;
    let missing: Vec<usize> = (0..96).filter(|&i| temp[i].is_none()).collect();
    assert_eq!(missing, (40..48).collect::<Vec<_>>());
    assert!(missing.iter().all(|&i| sal[i].is_none()));

    for (i, t) in grid.timestamps().iter().enumerate() {
        if missing.contains(&i) {
            continue;
        }
        let source = raw.timestamps().iter().position(|r| r == t).unwrap();
        assert_eq!(temp[i], raw.column("temp").unwrap().values[source]);
        assert_eq!(sal[i], raw.column("sal").unwrap().values[source]);
    }
}

#[test]
fn test_intersect_water_quality_and_weather_over_ten_days() {
    let wq = water_quality(times(est(2013, 8, 1, 0, 0), 15, 960));
    // Weather starts half a day early and runs past the water quality record
    let met = weather(times(est(2013, 7, 31, 12, 0), 15, 1200));

    let wq = qaqc(&wq, &BTreeSet::from([0]));
    let met = qaqc(&met, &BTreeSet::from([0]));
    let combined = combine(&[wq, met], &CombineMode::Intersect, 15, Some(7)).unwrap();

    assert_eq!(combined.len(), 10 * 24 * 60 / 15);
    assert_eq!(combined.first_timestamp(), Some(est(2013, 8, 1, 0, 0)));
    assert_eq!(combined.last_timestamp(), Some(est(2013, 8, 10, 23, 45)));
    assert_eq!(
        combined.parameter_names(),
        vec!["atemp", "bp", "depth", "do_mgl", "sal", "temp", "wspd"]
    );
    assert!(!combined.has_flags());
    assert!(combined
        .columns()
        .values()
        .all(|c| c.count_present() == combined.len()));
    assert_eq!(combined.attributes().timestep_minutes, Some(15));
    assert!(combined.attributes().qaqc_applied);
}

#[test]
fn test_union_spans_every_input() {
    let wq = water_quality(times(est(2013, 8, 1, 0, 0), 30, 48));
    let met = weather(times(est(2013, 8, 1, 12, 0), 30, 48));

    let combined = combine(&[wq, met], &CombineMode::Union, 30, None).unwrap();

    assert_eq!(combined.first_timestamp(), Some(est(2013, 8, 1, 0, 0)));
    assert_eq!(combined.last_timestamp(), Some(est(2013, 8, 2, 11, 30)));
    assert_eq!(combined.len(), 72);
    // Weather is missing before it starts
    assert_eq!(combined.column("wspd").unwrap().count_present(), 48);
    assert_eq!(combined.column("do_mgl").unwrap().count_present(), 48);
}

#[test]
fn test_disjoint_intersection_rejected() {
    let wq = water_quality(times(est(2013, 8, 1, 0, 0), 30, 10));
    let met = weather(times(est(2013, 8, 5, 0, 0), 30, 10));

    let err = combine(&[wq, met], &CombineMode::Intersect, 30, None).unwrap_err();
    assert!(matches!(
        err,
        SwmpError::Validation(ValidationError::EmptyIntersection { .. })
    ));
}

#[test]
fn test_organize_anchors_weather_to_station() {
    let wq = water_quality(times(est(2013, 8, 1, 0, 7), 30, 48));
    let met = weather(times(est(2013, 7, 31, 0, 0), 15, 300));

    let options = ProcessingOptions {
        combine_mode: CombineMode::Station("apacpwq".to_string()),
        ..ProcessingOptions::default()
    };
    let organized = organize(&[wq, met], &options).unwrap();

    // The anchor is regridded from the top of its first hour
    assert_eq!(organized.first_timestamp(), Some(est(2013, 8, 1, 0, 0)));
    assert_eq!(organized.len(), 49);
    assert_eq!(organized.stations().len(), 2);
    assert_eq!(organized.column("bp").unwrap().count_present(), 49);
}

#[test]
fn test_organize_rejects_absent_anchor() {
    let wq = water_quality(times(est(2013, 8, 1, 0, 0), 30, 48));
    let met = weather(times(est(2013, 8, 1, 0, 0), 30, 48));

    let options = ProcessingOptions {
        combine_mode: CombineMode::Station("apadbwq".to_string()),
        ..ProcessingOptions::default()
    };
    let err = organize(&[wq, met], &options).unwrap_err();
    assert!(matches!(
        err,
        SwmpError::Validation(ValidationError::AnchorAbsent(ref code)) if code == "apadbwq"
    ));
}
