//! CSV projection of a record set: `metric,value,unit,reference_range,status`.

use std::io::{Read, Write};
use std::path::Path;

use ::csv::{Reader, Writer};
use serde::{Deserialize, Serialize};

use crate::models::{MetricRecord, MetricValue, ReferenceRange};
use crate::pipeline::metrics::parse_value;

use super::ExportError;

const UNKNOWN_UNIT: &str = "Unknown";

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    metric: String,
    value: String,
    unit: String,
    reference_range: String,
    status: String,
}

impl From<&MetricRecord> for CsvRow {
    fn from(record: &MetricRecord) -> Self {
        Self {
            metric: record.metric().to_string(),
            value: record.value().to_string(),
            unit: record.unit_or_unknown().to_string(),
            reference_range: record
                .reference_range()
                .map(ReferenceRange::to_string)
                .unwrap_or_default(),
            status: record.status().to_string(),
        }
    }
}

impl CsvRow {
    /// Rebuild the record. The status column is ignored and recomputed.
    fn into_record(self, row: usize) -> Result<MetricRecord, ExportError> {
        let invalid = |message: String| ExportError::InvalidRow { row, message };

        let metric = self.metric.trim();
        if metric.is_empty() {
            return Err(invalid("empty metric".into()));
        }

        let value = match self.value.trim() {
            "" => MetricValue::Missing,
            raw => parse_value(raw)
                .map(|v| v.to_metric_value())
                .ok_or_else(|| invalid(format!("bad value {raw:?}")))?,
        };

        let unit = match self.unit.trim() {
            "" | UNKNOWN_UNIT => None,
            u => Some(u.to_string()),
        };

        let reference_range = match self.reference_range.trim() {
            "" => None,
            raw => Some(raw.parse::<ReferenceRange>().map_err(|e| invalid(e.to_string()))?),
        };

        Ok(MetricRecord::new(metric, value, unit, reference_range))
    }
}

/// Write records with a header row.
pub fn write_csv<W: Write>(records: &[MetricRecord], writer: W) -> Result<(), ExportError> {
    let mut writer = Writer::from_writer(writer);
    if records.is_empty() {
        writer.write_record(["metric", "value", "unit", "reference_range", "status"])?;
    }
    for record in records {
        writer.serialize(CsvRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn records_to_csv(records: &[MetricRecord]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Read records written by [`write_csv`]. Rows are numbered from 1 after the header.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<MetricRecord>, ExportError> {
    let mut reader = Reader::from_reader(reader);
    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(i, row)| row?.into_record(i + 1))
        .collect()
}

pub fn write_csv_file(path: &Path, records: &[MetricRecord]) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_csv(records, file)?;
    tracing::info!(path = %path.display(), rows = records.len(), "Wrote CSV export");
    Ok(())
}

pub fn read_csv_file(path: &Path) -> Result<Vec<MetricRecord>, ExportError> {
    read_csv(std::fs::File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricStatus;

    fn sample() -> Vec<MetricRecord> {
        vec![
            MetricRecord::new(
                "Hemoglobin",
                MetricValue::Scalar(10.5),
                Some("g/dL".into()),
                ReferenceRange::new(13.0, 17.0),
            ),
            MetricRecord::new("Blood Pressure", MetricValue::Pair(150, 95), Some("mmHg".into()), None),
            MetricRecord::new("Lipase", MetricValue::Missing, None, ReferenceRange::new(13.0, 60.0)),
            MetricRecord::new("WBC", MetricValue::Scalar(10570.0), Some("/cumm".into()), ReferenceRange::new(4000.0, 11000.0)),
        ]
    }

    #[test]
    fn header_and_row_format() {
        let csv = records_to_csv(&sample()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "metric,value,unit,reference_range,status");
        assert_eq!(lines[1], "Hemoglobin,10.5,g/dL,13-17,Low");
        assert_eq!(lines[2], "Blood Pressure,150/95,mmHg,,Unknown");
        assert_eq!(lines[3], "Lipase,,Unknown,13-60,Unknown");
        assert_eq!(lines[4], "WBC,10570,/cumm,4000-11000,Normal");
    }

    #[test]
    fn round_trip_preserves_records() {
        let records = sample();
        let csv = records_to_csv(&records).unwrap();
        let back = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn empty_set_writes_header_only() {
        let csv = records_to_csv(&[]).unwrap();
        assert_eq!(csv.trim_end(), "metric,value,unit,reference_range,status");
        assert!(read_csv(csv.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn status_column_recomputed_on_read() {
        let csv = "metric,value,unit,reference_range,status\nGlucose,150,mg/dL,70-100,Normal\n";
        let records = read_csv(csv.as_bytes()).unwrap();
        assert_eq!(records[0].status(), MetricStatus::High);
    }

    #[test]
    fn bad_value_names_row() {
        let csv = "metric,value,unit,reference_range,status\nGlucose,95,mg/dL,,Unknown\nLDL,high,mg/dL,,Unknown\n";
        let err = read_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ExportError::InvalidRow { row: 2, .. }));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        write_csv_file(&path, &sample()).unwrap();
        assert_eq!(read_csv_file(&path).unwrap(), sample());
    }
}
