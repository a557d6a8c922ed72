use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, Float32Array, Float64Array, Int32Array, Int64Array};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{ImportanceSamples, ObservableDescription, Prediction, SampleTable};

/// Column holding importance weights; never exposed as a variable.
pub const WEIGHT_COLUMN: &str = "weight";

/// Table files searched for inside a store directory, in order.
pub const TABLE_FILES: [&str; 3] = ["samples.parquet", "samples.pq", "samples.csv"];

/// Observable list of a prediction directory.
pub const DESCRIPTION_FILE: &str = "description.json";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Open a `samples` directory. Every non-weight column is a parameter.
pub fn open_importance_samples(dir: &Path) -> Result<ImportanceSamples> {
    let raw = read_table_in(dir)?;
    let (names, columns, weights) = raw.split_weights();
    let table = SampleTable::new(names, columns, weights)
        .with_context(|| format!("invalid samples in '{}'", dir.display()))?;
    Ok(ImportanceSamples::new(dir, table))
}

/// Open a `pred-*` directory.
///
/// Variables are named by `description.json`; the table's non-weight columns
/// are matched to the listed observables by position.
pub fn open_prediction(dir: &Path) -> Result<Prediction> {
    let description_path = dir.join(DESCRIPTION_FILE);
    let text = std::fs::read_to_string(&description_path)
        .with_context(|| format!("reading {}", description_path.display()))?;
    let description: PredictionDescription =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", description_path.display()))?;

    let raw = read_table_in(dir)?;
    let (_, columns, weights) = raw.split_weights();

    if columns.len() != description.observables.len() {
        bail!(
            "'{}' describes {} observables but its table has {} columns",
            dir.display(),
            description.observables.len(),
            columns.len()
        );
    }

    let names = description.observables.iter().map(|o| o.name.clone()).collect();
    let table = SampleTable::new(names, columns, weights)
        .with_context(|| format!("invalid predictions in '{}'", dir.display()))?;
    Ok(Prediction::new(dir, description.observables, table))
}

/// Read a numeric table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` / `.pq` – one numeric column per variable
/// * `.csv`             – header row with variable names, one sample per row
pub fn read_table(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => read_parquet(path),
        "csv" => read_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// RawTable – headers and columns as read from disk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl RawTable {
    /// Separate the weight column from the variable columns.
    fn split_weights(self) -> (Vec<String>, Vec<Vec<f64>>, Option<Vec<f64>>) {
        let mut names = Vec::with_capacity(self.headers.len());
        let mut columns = Vec::with_capacity(self.columns.len());
        let mut weights = None;

        for (name, column) in self.headers.into_iter().zip(self.columns) {
            if name == WEIGHT_COLUMN {
                weights = Some(column);
            } else {
                names.push(name);
                columns.push(column);
            }
        }
        (names, columns, weights)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PredictionDescription {
    observables: Vec<ObservableDescription>,
}

fn read_table_in(dir: &Path) -> Result<RawTable> {
    if !dir.is_dir() {
        bail!("'{}' is not a directory", dir.display());
    }
    let path: PathBuf = TABLE_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .with_context(|| {
            format!(
                "no sample table in '{}' (expected one of {})",
                dir.display(),
                TABLE_FILES.join(", ")
            )
        })?;

    log::debug!("reading sample table {}", path.display());
    read_table(&path).with_context(|| format!("reading {}", path.display()))
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<RawTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut columns = vec![Vec::new(); headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, value) in record.iter().enumerate() {
            let v = value.trim().parse::<f64>().with_context(|| {
                format!("Row {row_no}, {}: '{value}' is not a number", headers[col_idx])
            })?;
            columns[col_idx].push(v);
        }
    }

    Ok(RawTable { headers, columns })
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Every column must be Float64, Float32, Int32 or Int64. Nulls read as NaN.
fn read_parquet(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut columns = vec![Vec::new(); headers.len()];

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for (col_idx, column) in columns.iter_mut().enumerate() {
            let values = extract_f64_values(batch.column(col_idx))
                .with_context(|| format!("column '{}'", headers[col_idx]))?;
            column.extend(values);
        }
    }

    Ok(RawTable { headers, columns })
}

fn extract_f64_values(col: &ArrayRef) -> Result<Vec<f64>> {
    let values = match col.data_type() {
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect()
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect()
        }
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect()
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            arr.iter().map(|v| v.map_or(f64::NAN, |i| i as f64)).collect()
        }
        other => bail!("Expected a numeric column, got {other:?}"),
    };
    Ok(values)
}
