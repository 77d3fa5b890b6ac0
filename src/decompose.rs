//! Decomposition of a monthly series into a grand center, annual and
//! seasonal deviations, and residual events.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::config::{Centering, DecompositionType};
use crate::error::{SwmpError, ValidationError};
use crate::table::ObservationTable;

/// One month of a monthly series, keyed by the first day of the month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyValue {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthlySeries {
    months: Vec<MonthlyValue>,
}

impl MonthlySeries {
    pub fn new(months: Vec<MonthlyValue>) -> Self {
        Self { months }
    }

    /// A series of consecutive months starting at `start`'s month.
    pub fn from_values(start: NaiveDate, values: Vec<Option<f64>>) -> Self {
        let origin = month_index(start);
        let months = values
            .into_iter()
            .enumerate()
            .filter_map(|(i, value)| {
                month_start(origin + i as i32).map(|date| MonthlyValue { date, value })
            })
            .collect();
        Self { months }
    }

    pub fn months(&self) -> &[MonthlyValue] {
        &self.months
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Monthly means of one parameter, by local calendar month.
    ///
    /// Months between the first and last observation with no present value
    /// are kept as missing.
    pub fn monthly_means(table: &ObservationTable, parameter: &str) -> Result<Self, ValidationError> {
        let values = table.values(parameter)?;
        let (first, last) = match (table.first_timestamp(), table.last_timestamp()) {
            (Some(first), Some(last)) => (month_index(first.date_naive()), month_index(last.date_naive())),
            _ => return Err(ValidationError::EmptyTable),
        };

        let mut sums: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
        for (t, v) in table.timestamps().iter().zip(values) {
            if let Some(v) = v {
                let entry = sums.entry(month_index(t.date_naive())).or_default();
                entry.0 += v;
                entry.1 += 1;
            }
        }

        let months = (first..=last)
            .filter_map(|index| {
                let value = sums.get(&index).map(|(sum, n)| sum / *n as f64);
                month_start(index).map(|date| MonthlyValue { date, value })
            })
            .collect();
        Ok(Self { months })
    }
}

/// Components of one month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecompositionRow {
    pub date: NaiveDate,
    pub original: Option<f64>,
    pub grand: f64,
    pub annual: Option<f64>,
    pub seasonal: Option<f64>,
    pub events: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    pub decomposition_type: DecompositionType,
    pub centering: Centering,
    pub rows: Vec<DecompositionRow>,
}

/// Split a monthly series into grand, annual, seasonal and event
/// components.
///
/// The series must start in January, cover whole years, and list
/// consecutive months. Missing months are skipped when centering and get
/// no events component. Additive components sum to the original;
/// multiplicative ones (which need positive values) multiply to it.
///
/// With `events` false the events component is folded into the seasonal
/// one and reported as missing.
#[instrument(skip(series), fields(months = series.len()))]
pub fn decompose(
    series: &MonthlySeries,
    decomposition_type: DecompositionType,
    centering: Centering,
    events: bool,
) -> Result<Decomposition, SwmpError> {
    check_monthly(series)?;
    let op = Op(decomposition_type);

    if decomposition_type == DecompositionType::Multiplicative {
        if let Some(m) = series
            .months
            .iter()
            .find(|m| m.value.is_some_and(|v| v.is_nan() || v <= 0.0))
        {
            return Err(ValidationError::NonPositive {
                date: m.date,
                value: m.value.unwrap_or_default(),
            }
            .into());
        }
    }

    let present = || series.months.iter().filter_map(|m| m.value.map(|v| (m.date, v)));

    let grand = center(present().map(|(_, v)| v).collect(), centering)
        .ok_or_else(|| ValidationError::NotMonthly("series has no values".to_string()))?;

    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for (date, v) in present() {
        by_year.entry(date.year()).or_default().push(v);
    }
    let annual: BTreeMap<i32, f64> = by_year
        .into_iter()
        .filter_map(|(year, values)| center(values, centering).map(|c| (year, op.remove(c, grand))))
        .collect();

    let mut by_month: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for (date, v) in present() {
        if let Some(a) = annual.get(&date.year()) {
            by_month
                .entry(date.month())
                .or_default()
                .push(op.remove(op.remove(v, grand), *a));
        }
    }
    let seasonal: BTreeMap<u32, f64> = by_month
        .into_iter()
        .filter_map(|(month, values)| center(values, centering).map(|c| (month, c)))
        .collect();

    let rows: Vec<DecompositionRow> = series
        .months
        .iter()
        .map(|m| {
            let a = annual.get(&m.date.year()).copied();
            let s = seasonal.get(&m.date.month()).copied();
            let residual = match (m.value, a, s) {
                (Some(v), Some(a), Some(s)) => Some(op.remove(op.remove(op.remove(v, grand), a), s)),
                _ => None,
            };
            let (seasonal, events) = if events {
                (s, residual)
            } else {
                (s.zip(residual).map(|(s, e)| op.apply(s, e)).or(s), None)
            };
            DecompositionRow {
                date: m.date,
                original: m.value,
                grand,
                annual: a,
                seasonal,
                events,
            }
        })
        .collect();

    debug!(
        "Decomposed {} months over {} years, grand center {:.4}",
        rows.len(),
        annual.len(),
        grand
    );

    Ok(Decomposition {
        decomposition_type,
        centering,
        rows,
    })
}

/// Subtraction/addition or division/multiplication.
#[derive(Clone, Copy)]
struct Op(DecompositionType);

impl Op {
    fn remove(self, value: f64, component: f64) -> f64 {
        match self.0 {
            DecompositionType::Additive => value - component,
            DecompositionType::Multiplicative => value / component,
        }
    }

    fn apply(self, value: f64, component: f64) -> f64 {
        match self.0 {
            DecompositionType::Additive => value + component,
            DecompositionType::Multiplicative => value * component,
        }
    }
}

fn center(mut values: Vec<f64>, centering: Centering) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    match centering {
        Centering::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        Centering::Median => {
            values.sort_by(f64::total_cmp);
            let mid = values.len() / 2;
            if values.len() % 2 == 0 {
                Some((values[mid - 1] + values[mid]) / 2.0)
            } else {
                Some(values[mid])
            }
        }
    }
}

fn check_monthly(series: &MonthlySeries) -> Result<(), ValidationError> {
    let first = series
        .months
        .first()
        .ok_or_else(|| ValidationError::NotMonthly("series is empty".to_string()))?;

    if first.date.month() != 1 {
        return Err(ValidationError::NotMonthly(format!(
            "series starts in month {}, not January",
            first.date.month()
        )));
    }
    if series.len() % 12 != 0 {
        return Err(ValidationError::NotMonthly(format!(
            "{} months do not make whole years",
            series.len()
        )));
    }
    for pair in series.months.windows(2) {
        if month_index(pair[1].date) != month_index(pair[0].date) + 1 {
            return Err(ValidationError::NotMonthly(format!(
                "{} does not follow {}",
                pair[1].date, pair[0].date
            )));
        }
    }
    Ok(())
}

fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

fn month_start(index: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)
}
