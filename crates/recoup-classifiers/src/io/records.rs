//! CSV files of raw and enriched records, encoded matrices and predictions.
use std::path::{Path, PathBuf};

use csv::StringRecord;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::data_handling::{columns, Record, RECORD_COLUMNS};
use crate::enrichment::RawRecord;
use crate::error::{RecoupError, Result};
use crate::io::RecordSource;
use crate::math::Array2;

/// Columns a raw (pre-enrichment) file must carry.
pub const RAW_COLUMNS: [&str; 6] = [
    columns::CLIENT_ID,
    columns::DAYS_OVERDUE,
    columns::DEBT_VALUE,
    columns::CHANNEL,
    columns::RESPONSE,
    columns::RISK_BAND,
];

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name)
}

fn read_checked<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    if let Some(missing) = required.iter().find(|c| find_column(&headers, c).is_none()) {
        return Err(RecoupError::Schema(format!(
            "missing column '{}' in {}",
            missing,
            path.display()
        )));
    }

    let mut rows = Vec::new();
    for (row_idx, result) in reader.deserialize().enumerate() {
        let row: T = result.map_err(|e| {
            RecoupError::Schema(format!(
                "{}: invalid row {}: {}",
                path.display(),
                row_idx + 1,
                e
            ))
        })?;
        rows.push(row);
    }
    log::debug!("read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read an enriched record file.
///
/// # Errors
///
/// `Schema` naming the first missing required column, or describing the first
/// row whose values cannot be parsed or whose label is not 0/1.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let records: Vec<Record> = read_checked(path, &RECORD_COLUMNS)?;
    if let Some(bad) = records.iter().find(|r| r.response_positive > 1) {
        return Err(RecoupError::Schema(format!(
            "{}: client {} has {} = {}, expected 0 or 1",
            path.display(),
            bad.client_id,
            columns::RESPONSE_POSITIVE,
            bad.response_positive
        )));
    }
    Ok(records)
}

/// Read a raw record file (before enrichment). Extra columns are ignored.
pub fn read_raw_records<P: AsRef<Path>>(path: P) -> Result<Vec<RawRecord>> {
    read_checked(path.as_ref(), &RAW_COLUMNS)
}

/// Write any serializable rows with a header derived from the field names.
pub fn write_records<P: AsRef<Path>, T: Serialize>(path: P, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a feature matrix with `feature_names` as header.
pub fn write_matrix<P: AsRef<Path>>(
    path: P,
    feature_names: &[String],
    x: &Array2<f64>,
) -> Result<()> {
    if feature_names.len() != x.ncols() {
        return Err(RecoupError::Schema(format!(
            "{} feature names for a matrix with {} columns",
            feature_names.len(),
            x.ncols()
        )));
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(feature_names)?;
    for row in x.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a single-column label file.
pub fn write_labels<P: AsRef<Path>>(path: P, labels: &[u8]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([columns::RESPONSE_POSITIVE])?;
    for label in labels {
        writer.write_record([label.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct PredictionRow {
    cliente_id: u64,
    probabilidade: f64,
    previsao: u8,
}

/// Write one row per record: client id, positive probability and the
/// thresholded prediction.
pub fn write_predictions<P: AsRef<Path>>(
    path: P,
    records: &[Record],
    probabilities: &[f64],
    predicted: &[u8],
) -> Result<()> {
    let rows: Vec<PredictionRow> = records
        .iter()
        .zip(probabilities)
        .zip(predicted)
        .map(|((record, &p), &label)| PredictionRow {
            cliente_id: record.client_id,
            probabilidade: p,
            previsao: label,
        })
        .collect();
    write_records(path, &rows)
}

/// Enriched records read from a CSV file on each `load`.
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    path: PathBuf,
}

impl CsvRecordSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        CsvRecordSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for CsvRecordSource {
    fn load(&self) -> Result<Vec<Record>> {
        read_records(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
