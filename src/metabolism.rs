//! Daily ecosystem metabolism from dissolved oxygen, by the open-water
//! method: oxygen change during daylight and darkness, corrected for air-sea
//! exchange, integrated over each metabolic day.
//!
//! # Units
//!
//! - dDO: mg/L/h
//! - DOF, D: g O2 m⁻² h⁻¹
//! - Pg, Rt, NEM: g O2 m⁻² d⁻¹ (or g O2 m⁻³ d⁻¹ for the volumetric rates)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, instrument, warn};

use crate::config::ProcessingOptions;
use crate::error::{SwmpError, ValidationError};
use crate::metab_day::{metab_day, PartitionedTable, SolarPeriod};
use crate::parameters::{ATEMP, BP, DEPTH, DO_MGL, SAL, TEMP, WSPD};
use crate::physics::{mass_transfer_coefficient, oxygen_saturation, MB_PER_ATM};
use crate::solar::SunEventProvider;
use crate::station::StationDescriptor;
use crate::table::ObservationTable;

/// Data-quality conditions recorded on a metabolism row. The row is always
/// kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetabolismFlag {
    /// Too few valid records to estimate metabolism for the day.
    Incomplete,
    /// Gross production below the plausibility bound.
    NegativeProduction,
    /// Respiration above the plausibility bound.
    PositiveRespiration,
}

impl fmt::Display for MetabolismFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetabolismFlag::Incomplete => "incomplete",
            MetabolismFlag::NegativeProduction => "negative_production",
            MetabolismFlag::PositiveRespiration => "positive_respiration",
        };
        f.write_str(s)
    }
}

/// Metabolism estimates for one metabolic day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetabolismRecord {
    pub metabolic_date: NaiveDate,
    /// Rows with a usable flux over the rows expected in 24 hours, at most 1.
    pub completeness: f64,
    pub day_length_hours: f64,
    pub day_records: usize,
    pub night_records: usize,
    /// Mean oxygen flux and air-sea exchange over the daylight period.
    pub dof_day: Option<f64>,
    pub d_day: Option<f64>,
    /// Mean oxygen flux and air-sea exchange over the night period.
    pub dof_night: Option<f64>,
    pub d_night: Option<f64>,
    /// Gross production.
    pub production: Option<f64>,
    /// Total respiration, negative when oxygen is consumed.
    pub respiration: Option<f64>,
    /// Net ecosystem metabolism.
    pub nem: Option<f64>,
    pub mean_depth_m: Option<f64>,
    pub production_vol: Option<f64>,
    pub respiration_vol: Option<f64>,
    pub nem_vol: Option<f64>,
    pub flags: Vec<MetabolismFlag>,
}

impl MetabolismRecord {
    pub fn has_flag(&self, flag: MetabolismFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// One row per metabolic day for a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetabolismTable {
    pub stations: Vec<StationDescriptor>,
    pub timestep_minutes: u32,
    pub records: Vec<MetabolismRecord>,
}

impl MetabolismTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&MetabolismRecord> {
        self.records.iter().find(|r| r.metabolic_date == date)
    }
}

/// Air-sea oxygen exchange, g O2 m⁻² h⁻¹, positive into the water.
///
/// `kl_m_per_day` is the mass-transfer coefficient, `saturation` and
/// `observed` are concentrations in mg/L.
pub fn air_sea_flux(kl_m_per_day: f64, saturation: f64, observed: f64) -> f64 {
    kl_m_per_day / 24.0 * (saturation - observed)
}

/// Per-row inputs to the daily aggregation.
#[derive(Debug, Clone, Copy, Default)]
struct RowFlux {
    dof: Option<f64>,
    d: Option<f64>,
    depth: Option<f64>,
}

#[derive(Debug, Default)]
struct PeriodSums {
    dof: f64,
    d: f64,
    count: usize,
}

impl PeriodSums {
    fn add(&mut self, dof: f64, d: f64) {
        self.dof += dof;
        self.d += d;
        self.count += 1;
    }

    fn means(&self) -> Option<(f64, f64)> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some((self.dof / n, self.d / n))
    }
}

#[derive(Debug, Default)]
struct DayAccumulator {
    day: PeriodSums,
    night: PeriodSums,
    depth_sum: f64,
    depth_count: usize,
    day_length_hours: f64,
}

/// Estimate daily gross production, respiration and net ecosystem
/// metabolism for a regularized table.
///
/// The table needs `do_mgl` and, unless `options.depth_m` is set, `depth`.
/// Surface stations also need `temp`, `sal`, `atemp`, `wspd` and `bp` for
/// the air-sea correction; bottom stations skip it.
///
/// Every metabolic day touched by the table yields a record. Days short of
/// data keep their row with empty estimates and the `Incomplete` flag;
/// implausible estimates are flagged and kept.
#[instrument(skip(table, options, provider), fields(station = %table.label(), rows = table.len()))]
pub fn ecometab<P: SunEventProvider + ?Sized>(
    table: &ObservationTable,
    options: &ProcessingOptions,
    provider: &P,
) -> Result<MetabolismTable, SwmpError> {
    options.validate()?;
    let timestep = table
        .attributes()
        .timestep_minutes
        .ok_or(ValidationError::NotRegularized)?;

    let fluxes = row_fluxes(table, options, timestep)?;
    let partitioned = metab_day(table, provider)?;
    let days = accumulate(&partitioned, &fluxes);

    let expected_rows = f64::from(24 * 60) / f64::from(timestep);
    let records: Vec<MetabolismRecord> = days
        .into_iter()
        .map(|(date, acc)| daily_record(date, &acc, expected_rows, options))
        .collect();

    let incomplete = records
        .iter()
        .filter(|r| r.has_flag(MetabolismFlag::Incomplete))
        .count();
    info!(
        "Estimated metabolism for {} metabolic days ({} incomplete)",
        records.len(),
        incomplete
    );

    Ok(MetabolismTable {
        stations: table.stations().to_vec(),
        timestep_minutes: timestep,
        records,
    })
}

/// Oxygen flux and air-sea exchange at each grid row.
fn row_fluxes(
    table: &ObservationTable,
    options: &ProcessingOptions,
    timestep: u32,
) -> Result<Vec<RowFlux>, ValidationError> {
    let n = table.len();
    let step_hours = f64::from(timestep) / 60.0;
    let oxygen = table.values(DO_MGL)?;

    let depth: Vec<Option<f64>> = match options.depth_m {
        Some(d) => vec![Some(d); n],
        None => table.values(DEPTH)?.to_vec(),
    };

    let exchange: Vec<Option<f64>> = if options.bottom_station {
        vec![Some(0.0); n]
    } else {
        let temp = table.values(TEMP)?;
        let sal = table.values(SAL)?;
        let atemp = table.values(ATEMP)?;
        let wspd = table.values(WSPD)?;
        let bp = table.values(BP)?;

        (0..n)
            .map(|i| {
                let (t, s, p) = (temp[i]?, sal[i]?, bp[i]?);
                let kl = mass_transfer_coefficient(
                    t,
                    s,
                    atemp[i]?,
                    wspd[i]?,
                    p,
                    options.anemometer_height_m,
                );
                let saturation = oxygen_saturation(t, s, Some(p / MB_PER_ATM));
                let d = air_sea_flux(kl, saturation, oxygen[i]?);
                d.is_finite().then_some(d)
            })
            .collect()
    };

    let fluxes = (0..n)
        .map(|i| {
            let ddo = match (i.checked_sub(1).and_then(|j| oxygen[j]), oxygen[i]) {
                (Some(prev), Some(cur)) => Some((cur - prev) / step_hours),
                _ => None,
            };
            RowFlux {
                dof: ddo.zip(depth[i]).map(|(ddo, z)| ddo * z),
                d: exchange[i],
                depth: depth[i],
            }
        })
        .collect();

    Ok(fluxes)
}

fn accumulate(partitioned: &PartitionedTable, fluxes: &[RowFlux]) -> BTreeMap<NaiveDate, DayAccumulator> {
    let mut days: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();

    for (assignment, flux) in partitioned.assignments().iter().zip(fluxes) {
        let acc = days.entry(assignment.metabolic_date).or_default();
        acc.day_length_hours = assignment.day_length_hours;

        if let Some(z) = flux.depth {
            acc.depth_sum += z;
            acc.depth_count += 1;
        }
        if let (Some(dof), Some(d)) = (flux.dof, flux.d) {
            match assignment.period {
                SolarPeriod::Day => acc.day.add(dof, d),
                SolarPeriod::Night => acc.night.add(dof, d),
            }
        }
    }

    debug!("Grouped {} rows into {} metabolic days", fluxes.len(), days.len());
    days
}

fn daily_record(
    date: NaiveDate,
    acc: &DayAccumulator,
    expected_rows: f64,
    options: &ProcessingOptions,
) -> MetabolismRecord {
    let valid = acc.day.count + acc.night.count;
    let completeness = (valid as f64 / expected_rows).min(1.0);
    let mean_depth = (acc.depth_count > 0).then(|| acc.depth_sum / acc.depth_count as f64);

    let day = acc.day.means();
    let night = acc.night.means();

    let mut record = MetabolismRecord {
        metabolic_date: date,
        completeness,
        day_length_hours: acc.day_length_hours,
        day_records: acc.day.count,
        night_records: acc.night.count,
        dof_day: day.map(|(dof, _)| dof),
        d_day: day.map(|(_, d)| d),
        dof_night: night.map(|(dof, _)| dof),
        d_night: night.map(|(_, d)| d),
        production: None,
        respiration: None,
        nem: None,
        mean_depth_m: mean_depth,
        production_vol: None,
        respiration_vol: None,
        nem_vol: None,
        flags: Vec::new(),
    };

    let sufficient = completeness >= options.completeness_threshold
        && acc.day.count >= options.min_period_records
        && acc.night.count >= options.min_period_records;

    let (Some((dof_d, d_d)), Some((dof_n, d_n)), true) = (day, night, sufficient) else {
        warn!(
            "Metabolic day {} is incomplete: completeness {:.2}, {} day and {} night records",
            date, completeness, acc.day.count, acc.night.count
        );
        record.flags.push(MetabolismFlag::Incomplete);
        return record;
    };

    let production = ((dof_d - d_d) - (dof_n - d_n)) * acc.day_length_hours;
    let respiration = (dof_n - d_n) * 24.0;
    let nem = production + respiration;

    record.production = Some(production);
    record.respiration = Some(respiration);
    record.nem = Some(nem);
    if let Some(z) = mean_depth.filter(|z| *z > 0.0) {
        record.production_vol = Some(production / z);
        record.respiration_vol = Some(respiration / z);
        record.nem_vol = Some(nem / z);
    }

    if production < options.plausibility.min_production {
        warn!("Metabolic day {}: production {:.3} below bound", date, production);
        record.flags.push(MetabolismFlag::NegativeProduction);
    }
    if respiration > options.plausibility.max_respiration {
        warn!("Metabolic day {}: respiration {:.3} above bound", date, respiration);
        record.flags.push(MetabolismFlag::PositiveRespiration);
    }

    record
}
