use std::collections::BTreeSet;
use std::path::Path;

use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int16Array, Int32Array,
    Int64Array, LargeStringArray, StringArray, UInt32Array,
};
use arrow::datatypes::DataType;
use log::{info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::{DataError, Result};
use super::model::{Dataset, LoadReport, Record, Value};
use super::schema::{ColumnDef, Schema};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a tabular dataset from a file and validate it against `schema`.
/// Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row followed by one record per line
/// * `.json`    – `[{ "Year": 2002, "Country": "USA", ... }, ...]`
/// * `.parquet` – flat columns of strings, integers, floats or booleans
///
/// Columns not declared in the schema are ignored. A missing required
/// column fails with [`DataError::SchemaMismatch`] before any record is
/// read.
pub fn load_file(path: &Path, schema: &Schema) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => load_csv(path, schema),
        "json" => load_json(path, schema),
        "parquet" | "pq" => load_parquet(path, schema),
        other => Err(DataError::UnsupportedFormat(other.to_string())),
    }?;

    for (column, count) in &dataset.report().coercion_failures {
        warn!(
            "{}: {count} value(s) in '{column}' could not be coerced; kept as missing",
            path.display(),
        );
    }
    info!(
        "Loaded {} records ({} columns) from {}",
        dataset.len(),
        schema.len(),
        path.display()
    );
    Ok(dataset)
}

/// Substitute the sentinel for a failed coercion and count it.
fn coerce_or_missing(col: &ColumnDef, coerced: Option<Value>, report: &mut LoadReport) -> Value {
    match coerced {
        Some(v) => v,
        None => {
            report.record_failure(&col.name);
            Value::Missing
        }
    }
}

fn check_columns<F>(path: &Path, schema: &Schema, is_present: F) -> Result<()>
where
    F: Fn(&str) -> bool,
{
    let missing = schema.missing_required(is_present);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataError::SchemaMismatch {
            path: path.to_path_buf(),
            missing,
        })
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, then one record per line.
/// Header names are matched after trimming surrounding whitespace.
fn load_csv(path: &Path, schema: &Schema) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| DataError::unavailable(path, e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DataError::unavailable(path, format!("reading CSV headers: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    check_columns(path, schema, |name| headers.iter().any(|h| h == name))?;

    let positions: Vec<Option<usize>> = schema
        .columns()
        .iter()
        .map(|c| headers.iter().position(|h| *h == c.name))
        .collect();

    let mut report = LoadReport::default();
    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let row = result
            .map_err(|e| DataError::unavailable(path, format!("CSV row {row_no}: {e}")))?;

        let mut values = Vec::with_capacity(schema.len());
        for (col, pos) in schema.columns().iter().zip(&positions) {
            let raw = pos.and_then(|i| row.get(i)).unwrap_or("");
            values.push(coerce_or_missing(col, col.kind.coerce_str(raw), &mut report));
        }
        records.push(Record::new(values));
    }

    Ok(Dataset::from_records(schema.clone(), records, report))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON layout (records-oriented, the default
/// `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Year": 2002, "Sport": "Skating", "Country": "USA", "Medal": "Gold" },
///   ...
/// ]
/// ```
///
/// A column is present when at least one record carries the key; records
/// without it hold `Missing`.
fn load_json(path: &Path, schema: &Schema) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).map_err(|e| DataError::unavailable(path, e))?;
    let root: JsonValue = serde_json::from_str(&text)
        .map_err(|e| DataError::unavailable(path, format!("parsing JSON: {e}")))?;

    let rows = root
        .as_array()
        .ok_or_else(|| DataError::unavailable(path, "expected top-level JSON array"))?;

    let mut objects = Vec::with_capacity(rows.len());
    let mut keys: BTreeSet<&str> = BTreeSet::new();
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .ok_or_else(|| DataError::unavailable(path, format!("row {i} is not a JSON object")))?;
        keys.extend(obj.keys().map(String::as_str));
        objects.push(obj);
    }

    check_columns(path, schema, |name| keys.contains(name))?;

    let mut report = LoadReport::default();
    let mut records = Vec::with_capacity(objects.len());
    for obj in objects {
        let mut values = Vec::with_capacity(schema.len());
        for col in schema.columns() {
            let cell = obj.get(&col.name).map(json_to_value).unwrap_or(Value::Missing);
            values.push(coerce_or_missing(col, col.kind.coerce_value(cell), &mut report));
        }
        records.push(Record::new(values));
    }

    Ok(Dataset::from_records(schema.clone(), records, report))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Missing,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat scalar columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path, schema: &Schema) -> Result<Dataset> {
    let file = std::fs::File::open(path).map_err(|e| DataError::unavailable(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| DataError::unavailable(path, format!("reading parquet metadata: {e}")))?;

    let arrow_schema = builder.schema().clone();
    check_columns(path, schema, |name| arrow_schema.index_of(name).is_ok())?;

    let positions: Vec<Option<usize>> = schema
        .columns()
        .iter()
        .map(|c| arrow_schema.index_of(&c.name).ok())
        .collect();

    let reader = builder
        .build()
        .map_err(|e| DataError::unavailable(path, format!("building parquet reader: {e}")))?;

    let mut report = LoadReport::default();
    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| DataError::unavailable(path, format!("reading record batch: {e}")))?;

        for row in 0..batch.num_rows() {
            let mut values = Vec::with_capacity(schema.len());
            for (col, pos) in schema.columns().iter().zip(&positions) {
                let cell = match pos {
                    Some(i) => extract_cell(batch.column(*i), row),
                    None => Some(Value::Missing),
                };
                let coerced = cell.and_then(|v| col.kind.coerce_value(v));
                values.push(coerce_or_missing(col, coerced, &mut report));
            }
            records.push(Record::new(values));
        }
    }

    Ok(Dataset::from_records(schema.clone(), records, report))
}

/// Extract a single scalar from an Arrow column. `None` for array types
/// with no scalar reading.
fn extract_cell(col: &ArrayRef, row: usize) -> Option<Value> {
    if col.is_null(row) {
        return Some(Value::Missing);
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => Value::Text(any.downcast_ref::<StringArray>()?.value(row).to_string()),
        DataType::LargeUtf8 => {
            Value::Text(any.downcast_ref::<LargeStringArray>()?.value(row).to_string())
        }
        DataType::Int16 => Value::Integer(any.downcast_ref::<Int16Array>()?.value(row) as i64),
        DataType::Int32 => Value::Integer(any.downcast_ref::<Int32Array>()?.value(row) as i64),
        DataType::Int64 => Value::Integer(any.downcast_ref::<Int64Array>()?.value(row)),
        DataType::UInt32 => Value::Integer(any.downcast_ref::<UInt32Array>()?.value(row) as i64),
        DataType::Float32 => Value::Float(any.downcast_ref::<Float32Array>()?.value(row) as f64),
        DataType::Float64 => Value::Float(any.downcast_ref::<Float64Array>()?.value(row)),
        DataType::Boolean => Value::Bool(any.downcast_ref::<BooleanArray>()?.value(row)),
        _ => return None,
    };
    Some(value)
}
