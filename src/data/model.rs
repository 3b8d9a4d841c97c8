use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::error::Result;
use super::schema::Schema;

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value. The column type is fixed by the
/// [`Schema`]; `Missing` is the sentinel for empty cells and for values
/// that failed coercion.
///
/// Used as a key in `BTreeMap` / `BTreeSet` / `HashMap` downstream, so
/// equality, ordering and hashing are implemented by hand over the float
/// bit pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Missing => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Missing, Missing) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Missing => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Missing => write!(f, "<missing>"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl Value {
    /// Interpret the value as an `f64` (integers widen).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Ordering within a value domain, used by range predicates.
    ///
    /// Integers and floats compare numerically; text and booleans compare
    /// among themselves. Anything else (including `Missing`) is
    /// incomparable.
    pub fn compare_in_domain(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Integer(i) => JsonValue::from(*i),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Missing => JsonValue::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the source table
// ---------------------------------------------------------------------------

/// A single row, one value per schema column in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Record { values }
    }

    pub fn get(&self, column: usize) -> &Value {
        self.values.get(column).unwrap_or(&Value::Missing)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

// ---------------------------------------------------------------------------
// LoadReport – what happened while reading the source
// ---------------------------------------------------------------------------

/// Per-column count of cells that could not be coerced to the declared
/// type and were replaced by `Missing`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub coercion_failures: BTreeMap<String, usize>,
}

impl LoadReport {
    pub fn record_failure(&mut self, column: &str) {
        *self
            .coercion_failures
            .entry(column.to_string())
            .or_default() += 1;
    }

    pub fn total_failures(&self) -> usize {
        self.coercion_failures.values().sum()
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed distinct values per column.
/// Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Schema,
    records: Vec<Record>,
    /// For each schema column (by index) the sorted set of distinct values.
    unique_values: Vec<BTreeSet<Value>>,
    report: LoadReport,
}

impl Dataset {
    /// Build column indices from the loaded records.
    pub fn from_records(schema: Schema, records: Vec<Record>, report: LoadReport) -> Self {
        let mut unique_values: Vec<BTreeSet<Value>> = vec![BTreeSet::new(); schema.len()];
        for rec in &records {
            for (col, set) in unique_values.iter_mut().enumerate() {
                set.insert(rec.get(col).clone());
            }
        }
        Dataset {
            schema,
            records,
            unique_values,
            report,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted distinct values of a column, the option list for a filter widget.
    pub fn distinct(&self, column: &str) -> Result<&BTreeSet<Value>> {
        let idx = self.schema.index_of(column)?;
        Ok(&self.unique_values[idx])
    }

    /// Smallest and largest non-missing value of a column over the whole
    /// dataset. `None` when every value is missing.
    pub fn extent(&self, column: &str) -> Result<Option<(Value, Value)>> {
        let mut present = self.distinct(column)?.iter().filter(|v| !v.is_missing());
        let Some(first) = present.next() else {
            return Ok(None);
        };
        let last = present.last().unwrap_or(first);
        Ok(Some((first.clone(), last.clone())))
    }

    /// A row as a JSON object keyed by column name.
    pub fn record_to_json(&self, row: usize) -> Option<serde_json::Map<String, JsonValue>> {
        let rec = self.records.get(row)?;
        Some(
            self.schema
                .columns()
                .iter()
                .zip(rec.values())
                .map(|(col, v)| (col.name.clone(), v.to_json()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{ColumnDef, ColumnType};

    #[test]
    fn test_value_ordering_groups_by_type() {
        let mut vals = vec![
            Value::from("b"),
            Value::Integer(3),
            Value::Missing,
            Value::Float(1.5),
            Value::Bool(true),
        ];
        vals.sort();
        assert_eq!(
            vals,
            vec![
                Value::Missing,
                Value::Bool(true),
                Value::Integer(3),
                Value::Float(1.5),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn test_compare_in_domain_mixes_numbers() {
        assert_eq!(
            Value::Integer(2).compare_in_domain(&Value::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Missing.compare_in_domain(&Value::Integer(1)), None);
        assert_eq!(Value::from("a").compare_in_domain(&Value::Integer(1)), None);
    }

    #[test]
    fn test_value_deserializes_untagged() {
        let v: Vec<Value> = serde_json::from_str(r#"[1, 2.5, "x", true, null]"#).unwrap();
        assert_eq!(
            v,
            vec![
                Value::Integer(1),
                Value::Float(2.5),
                Value::from("x"),
                Value::Bool(true),
                Value::Missing,
            ]
        );
    }

    #[test]
    fn test_extent_skips_missing() {
        let schema = Schema::new(vec![ColumnDef::new("Year", ColumnType::Integer)]).unwrap();
        let ds = Dataset::from_records(
            schema,
            vec![
                Record::new(vec![Value::Integer(2006)]),
                Record::new(vec![Value::Missing]),
                Record::new(vec![Value::Integer(1924)]),
            ],
            LoadReport::default(),
        );
        assert_eq!(
            ds.extent("Year").unwrap(),
            Some((Value::Integer(1924), Value::Integer(2006)))
        );
        assert_eq!(ds.distinct("Year").unwrap().len(), 3);
    }
}
