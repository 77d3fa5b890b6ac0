use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

use crate::table::{Column, ObservationTable, TableAttributes};

/// Every quality code the provider assigns, from -5 (outside sensor range)
/// to 5 (corrected data).
pub const ALL_FLAG_CODES: std::ops::RangeInclusive<i32> = -5..=5;

/// Mask values whose quality flag is not accepted, then drop the flags.
///
/// An empty acceptance set accepts every code and only strips the flags.
/// A value without a flag is kept. Running this on a table without flag
/// columns returns the table unchanged.
#[instrument(skip(table, accepted), fields(station = %table.label(), rows = table.len()))]
pub fn qaqc(table: &ObservationTable, accepted: &BTreeSet<i32>) -> ObservationTable {
    if !table.has_flags() {
        debug!("No flag columns present, nothing to filter");
        return table.clone();
    }

    let mut masked = 0usize;
    let columns: BTreeMap<String, Column> = table
        .columns()
        .iter()
        .map(|(name, column)| {
            let values = match &column.flags {
                Some(flags) if !accepted.is_empty() => column
                    .values
                    .iter()
                    .zip(flags)
                    .map(|(value, flag)| match flag {
                        Some(code) if !accepted.contains(code) => {
                            if value.is_some() {
                                masked += 1;
                            }
                            None
                        }
                        _ => *value,
                    })
                    .collect(),
                _ => column.values.clone(),
            };
            (name.clone(), Column::new(values))
        })
        .collect();

    info!(
        "Masked {} values not flagged as one of {:?}",
        masked, accepted
    );

    ObservationTable::from_parts(
        table.stations().to_vec(),
        table.timestamps().to_vec(),
        columns,
        TableAttributes {
            qaqc_applied: true,
            ..table.attributes().clone()
        },
    )
}
