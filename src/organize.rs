//! Organize stage: quality filtering, regular time grids and combining
//! tables from several stations.
//!
//! Each function takes an immutable table and returns a new one.

pub mod combine;
pub mod qaqc;
pub mod setstep;

pub use combine::combine;
pub use qaqc::qaqc;
pub use setstep::setstep;

use tracing::{info, instrument};

use crate::config::{CombineMode, ProcessingOptions};
use crate::error::{SwmpError, ValidationError};
use crate::table::ObservationTable;

/// Quality-filter each table, then regrid a single table or combine several.
///
/// In anchor mode the anchor table is regridded before combining so the
/// shared grid is regular.
#[instrument(skip(tables, options), fields(tables = tables.len()))]
pub fn organize(
    tables: &[ObservationTable],
    options: &ProcessingOptions,
) -> Result<ObservationTable, SwmpError> {
    options.validate()?;
    let tolerance = Some(options.tolerance());

    let filtered: Vec<ObservationTable> = tables
        .iter()
        .map(|t| qaqc(t, &options.quality_codes_accepted))
        .collect();

    let organized = match filtered.as_slice() {
        [] => return Err(ValidationError::EmptyTable.into()),
        [single] => setstep(single, options.timestep_minutes, tolerance)?,
        many => {
            let prepared = match &options.combine_mode {
                CombineMode::Station(code) => many
                    .iter()
                    .map(|t| {
                        if t.stations().iter().any(|s| s.code.to_string() == *code) {
                            setstep(t, options.timestep_minutes, tolerance)
                        } else {
                            Ok(t.clone())
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                _ => many.to_vec(),
            };
            combine(&prepared, &options.combine_mode, options.timestep_minutes, tolerance)?
        }
    };

    info!(
        "Organized {} tables into {} rows and {} parameters",
        tables.len(),
        organized.len(),
        organized.columns().len()
    );
    Ok(organized)
}
