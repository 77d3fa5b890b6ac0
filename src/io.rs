//! JSON files at the edge of the pipeline.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::decompose::MonthlySeries;
use crate::error::SwmpError;
use crate::table::ObservationTable;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SwmpError> {
    let reader = BufReader::new(File::open(path)?);
    let value = serde_json::from_reader(reader)?;
    debug!("Read {}", path.display());
    Ok(value)
}

/// Load an observation table. Rows are sorted and checked as on construction.
pub fn read_table(path: &Path) -> Result<ObservationTable, SwmpError> {
    read_json(path)
}

pub fn read_series(path: &Path) -> Result<MonthlySeries, SwmpError> {
    read_json(path)
}

/// Write any serializable value as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SwmpError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use chrono::NaiveDate;

    #[test]
    fn test_series_survives_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.json");
        let series = MonthlySeries::from_values(
            NaiveDate::from_ymd_opt(2011, 1, 1).unwrap(),
            vec![Some(1.5), None, Some(2.5)],
        );

        write_json(&path, &series).unwrap();
        assert_eq!(read_series(&path).unwrap(), series);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_table(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SwmpError::Io(_)));
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read_table(&path).unwrap_err(), SwmpError::Json(_)));
    }

    #[test]
    fn test_table_with_foreign_offset_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        std::fs::write(
            &path,
            r#"{
                "stations": [{"code": "apacpwq", "latitude": 29.7, "longitude": -84.9, "utc_offset_hours": 3}],
                "timestamps": ["2013-01-01T00:00:00-05:00"],
                "columns": {"temp": {"values": [10.0]}}
            }"#,
        )
        .unwrap();

        let err = read_table(&path).unwrap_err();
        assert!(matches!(err, SwmpError::Json(_)));
        assert!(err.to_string().contains("UTC-5"), "{err}");
    }

    #[test]
    fn test_table_without_offset_uses_reserve_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        std::fs::write(
            &path,
            r#"{
                "stations": [{"code": "apacpwq", "latitude": 29.7, "longitude": -84.9}],
                "timestamps": ["2013-01-01T00:00:00-05:00"],
                "columns": {"temp": {"values": [10.0]}}
            }"#,
        )
        .unwrap();

        assert_eq!(read_table(&path).unwrap().station().utc_offset_hours, -5);
    }

    #[test]
    fn test_invalid_table_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        std::fs::write(
            &path,
            r#"{
                "stations": [{"code": "apacpwq", "latitude": 29.7, "longitude": -84.9, "utc_offset_hours": -5}],
                "timestamps": ["2013-01-01T00:00:00-05:00", "2013-01-01T00:15:00-05:00"],
                "columns": {"temp": {"values": [10.0]}}
            }"#,
        )
        .unwrap();

        let err = read_table(&path).unwrap_err();
        assert!(err.to_string().contains(&ValidationError::ColumnLength {
            column: "temp".to_string(),
            expected: 2,
            actual: 1,
        }
        .to_string()));
    }
}
