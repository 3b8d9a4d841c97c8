use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::error::{DataError, Result};
use super::model::Value;

/// Semantic type of a column, fixed at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Bool,
}

impl ColumnType {
    /// Parse a raw text cell.
    ///
    /// Empty cells become `Missing`. Returns `None` when the text cannot be
    /// read as this type; the caller substitutes `Missing` and records the
    /// failure.
    pub fn coerce_str(&self, raw: &str) -> Option<Value> {
        let s = raw.trim();
        if s.is_empty() {
            return Some(Value::Missing);
        }
        match self {
            ColumnType::Text => Some(Value::Text(raw.to_string())),
            ColumnType::Integer => {
                if let Ok(i) = s.parse::<i64>() {
                    return Some(Value::Integer(i));
                }
                // "12.0" is still an integer column value
                match s.parse::<f64>() {
                    Ok(f) if !f.is_finite() => Some(Value::Missing),
                    Ok(f) => integral(f).map(Value::Integer),
                    Err(_) => None,
                }
            }
            ColumnType::Float => s.parse::<f64>().ok().map(float_or_missing),
            ColumnType::Bool => match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(Value::Bool(true)),
                "false" | "0" | "no" => Some(Value::Bool(false)),
                _ => None,
            },
        }
    }

    /// Convert an already-typed value (JSON cell, Parquet cell, filter
    /// argument) to this column type. `None` means coercion failed.
    pub fn coerce_value(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (_, Value::Missing) => Some(Value::Missing),
            // NaN and infinities load as empty cells
            (_, Value::Float(f)) if !f.is_finite() => Some(Value::Missing),
            (_, Value::Text(s)) => self.coerce_str(&s),
            (ColumnType::Text, v) => Some(Value::Text(v.to_string())),
            (ColumnType::Integer, Value::Integer(i)) => Some(Value::Integer(i)),
            (ColumnType::Integer, Value::Float(f)) => integral(f).map(Value::Integer),
            (ColumnType::Float, v @ (Value::Integer(_) | Value::Float(_))) => {
                v.as_f64().map(Value::Float)
            }
            (ColumnType::Bool, Value::Bool(b)) => Some(Value::Bool(b)),
            (ColumnType::Bool, Value::Integer(i @ (0 | 1))) => Some(Value::Bool(i == 1)),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

/// An integral float that fits in `i64`, as an integer.
pub(crate) fn integral(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is out of range
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn float_or_missing(f: f64) -> Value {
    if f.is_finite() {
        Value::Float(f)
    } else {
        Value::Missing
    }
}

fn default_required() -> bool {
    true
}

/// A declared column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    /// Absent required columns fail the load; absent optional columns load
    /// as `Missing`.
    #[serde(default = "default_required")]
    pub required: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        ColumnDef {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Ordered set of declared columns. Column names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnDef>", into = "Vec<ColumnDef>")]
pub struct Schema {
    columns: Vec<ColumnDef>,
}

impl TryFrom<Vec<ColumnDef>> for Schema {
    type Error = DataError;

    fn try_from(columns: Vec<ColumnDef>) -> Result<Self> {
        Schema::new(columns)
    }
}

impl From<Schema> for Vec<ColumnDef> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for col in &columns {
            if !seen.insert(col.name.as_str()) {
                return Err(DataError::InvalidSchema(format!(
                    "duplicate column '{}'",
                    col.name
                )));
            }
        }
        Ok(Schema { columns })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| DataError::UnknownColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&ColumnDef> {
        let idx = self.index_of(name)?;
        Ok(&self.columns[idx])
    }

    /// Names of required columns the source does not provide.
    pub fn missing_required<F>(&self, is_present: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        self.columns
            .iter()
            .filter(|c| c.required && !is_present(&c.name))
            .map(|c| c.name.clone())
            .collect()
    }

    /// A copy of this schema with one more column appended.
    pub fn with_column(&self, column: ColumnDef) -> Result<Self> {
        let mut columns = self.columns.clone();
        columns.push(column);
        Schema::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_coercion() {
        let t = ColumnType::Integer;
        assert_eq!(t.coerce_str(" 27 "), Some(Value::Integer(27)));
        assert_eq!(t.coerce_str("27.0"), Some(Value::Integer(27)));
        assert_eq!(t.coerce_str(""), Some(Value::Missing));
        assert_eq!(t.coerce_str("27.5"), None);
        assert_eq!(t.coerce_str("week 3"), None);
    }

    #[test]
    fn test_non_finite_numbers_are_missing() {
        for raw in ["NaN", "nan", "inf", "-inf", "Infinity"] {
            assert_eq!(ColumnType::Float.coerce_str(raw), Some(Value::Missing), "{raw}");
            assert_eq!(ColumnType::Integer.coerce_str(raw), Some(Value::Missing), "{raw}");
        }
        assert_eq!(
            ColumnType::Float.coerce_value(Value::Float(f64::NAN)),
            Some(Value::Missing)
        );
        assert_eq!(
            ColumnType::Integer.coerce_value(Value::Float(f64::NEG_INFINITY)),
            Some(Value::Missing)
        );
        assert_eq!(ColumnType::Float.coerce_str("1.5"), Some(Value::Float(1.5)));
    }

    #[test]
    fn test_out_of_range_integral_float_fails() {
        assert_eq!(ColumnType::Integer.coerce_str("1e19"), None);
        assert_eq!(ColumnType::Integer.coerce_value(Value::Float(-1e19)), None);
        assert_eq!(
            ColumnType::Integer.coerce_value(Value::Float(9.2e18)),
            Some(Value::Integer(9_200_000_000_000_000_000))
        );
        assert_eq!(integral(i64::MAX as f64), None);
        assert_eq!(integral(i64::MIN as f64), Some(i64::MIN));
    }

    #[test]
    fn test_coerce_value_across_types() {
        assert_eq!(
            ColumnType::Float.coerce_value(Value::Integer(3)),
            Some(Value::Float(3.0))
        );
        assert_eq!(
            ColumnType::Text.coerce_value(Value::Integer(2002)),
            Some(Value::from("2002"))
        );
        assert_eq!(
            ColumnType::Integer.coerce_value(Value::from("2002")),
            Some(Value::Integer(2002))
        );
        assert_eq!(ColumnType::Bool.coerce_value(Value::Float(0.5)), None);
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = Schema::new(vec![
            ColumnDef::new("Year", ColumnType::Integer),
            ColumnDef::new("Year", ColumnType::Text),
        ])
        .unwrap_err();
        assert!(matches!(err, DataError::InvalidSchema(_)));
    }

    #[test]
    fn test_missing_required_ignores_optional() {
        let schema = Schema::new(vec![
            ColumnDef::new("Year", ColumnType::Integer),
            ColumnDef::new("City", ColumnType::Text).optional(),
            ColumnDef::new("Medal", ColumnType::Text),
        ])
        .unwrap();
        let missing = schema.missing_required(|name| name == "Year");
        assert_eq!(missing, vec!["Medal".to_string()]);
    }

    #[test]
    fn test_schema_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            schema: Schema,
        }
        let doc: Doc = toml::from_str(
            r#"
            [[schema]]
            name = "Week_Reported"
            type = "integer"

            [[schema]]
            name = "County"
            type = "text"
            required = false
            "#,
        )
        .unwrap();
        assert_eq!(doc.schema.len(), 2);
        assert!(!doc.schema.column("County").unwrap().required);
    }
}
