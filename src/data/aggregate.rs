use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::error::{DataError, Result};
use super::filter::FilteredView;
use super::model::Value;
use super::schema::ColumnType;

/// How the records of one group are reduced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fn", rename_all = "snake_case")]
pub enum Reducer {
    /// Number of records in the group.
    #[default]
    Count,
    /// Sum of a numeric column; missing cells contribute nothing.
    Sum { column: String },
}

impl Reducer {
    pub fn sum(column: impl Into<String>) -> Self {
        Reducer::Sum {
            column: column.into(),
        }
    }
}

/// The reduced value of one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Measure {
    Count(u64),
    Integer(i64),
    Float(f64),
}

impl Measure {
    pub fn as_f64(&self) -> f64 {
        match self {
            Measure::Count(n) => *n as f64,
            Measure::Integer(i) => *i as f64,
            Measure::Float(v) => *v,
        }
    }

    fn to_json(self) -> JsonValue {
        match self {
            Measure::Count(n) => JsonValue::from(n),
            Measure::Integer(i) => JsonValue::from(i),
            Measure::Float(v) => serde_json::Number::from_f64(v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
        }
    }
}

/// Tuple of grouping-column values, in grouping-column order.
pub type GroupKey = Vec<Value>;

#[derive(Debug, Clone, PartialEq)]
struct Group {
    records: usize,
    measure: Measure,
}

/// One output row of an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: GroupKey,
    pub value: Measure,
}

/// Group-by result over a filtered view. Keys are unique; iteration order
/// is unspecified, use [`Aggregate::sorted_rows`] for display order.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    group_by: Vec<String>,
    key_types: Vec<ColumnType>,
    reducer: Reducer,
    groups: HashMap<GroupKey, Group>,
}

enum Accumulate {
    Count,
    Integer(usize),
    Float(usize),
}

/// Group the records of `view` by `group_by` and reduce each group.
///
/// Every visible record lands in exactly one group, including records
/// whose grouping values are missing.
pub fn aggregate<S: AsRef<str>>(
    view: &FilteredView<'_>,
    group_by: &[S],
    reducer: &Reducer,
) -> Result<Aggregate> {
    let schema = view.dataset().schema();
    let key_columns = group_by
        .iter()
        .map(|c| schema.index_of(c.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let key_types = key_columns
        .iter()
        .map(|&i| schema.columns()[i].kind)
        .collect();

    let acc = match reducer {
        Reducer::Count => Accumulate::Count,
        Reducer::Sum { column } => {
            let idx = schema.index_of(column)?;
            match schema.columns()[idx].kind {
                ColumnType::Integer => Accumulate::Integer(idx),
                ColumnType::Float => Accumulate::Float(idx),
                _ => return Err(DataError::NotNumeric(column.clone())),
            }
        }
    };
    let empty = match acc {
        Accumulate::Count => Measure::Count(0),
        Accumulate::Integer(_) => Measure::Integer(0),
        Accumulate::Float(_) => Measure::Float(0.0),
    };

    let summed = match reducer {
        Reducer::Sum { column } => column.as_str(),
        Reducer::Count => "",
    };

    let mut groups: HashMap<GroupKey, Group> = HashMap::new();
    for rec in view.records() {
        let key: GroupKey = key_columns.iter().map(|&i| rec.get(i).clone()).collect();
        let group = groups.entry(key).or_insert(Group {
            records: 0,
            measure: empty,
        });
        group.records += 1;
        group.measure = match (group.measure, &acc) {
            (Measure::Count(n), _) => Measure::Count(n + 1),
            (Measure::Integer(sum), Accumulate::Integer(idx)) => match rec.get(*idx) {
                Value::Integer(v) => match sum.checked_add(*v) {
                    Some(total) => Measure::Integer(total),
                    None => {
                        warn!("sum of '{summed}' overflowed i64; continuing as float");
                        Measure::Float(sum as f64 + *v as f64)
                    }
                },
                _ => Measure::Integer(sum),
            },
            (Measure::Float(sum), Accumulate::Integer(idx) | Accumulate::Float(idx)) => {
                match rec.get(*idx).as_f64() {
                    Some(v) if !v.is_nan() => Measure::Float(sum + v),
                    _ => Measure::Float(sum),
                }
            }
            (m, _) => m,
        };
    }

    Ok(Aggregate {
        group_by: group_by.iter().map(|c| c.as_ref().to_string()).collect(),
        key_types,
        reducer: reducer.clone(),
        groups,
    })
}

impl Aggregate {
    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    pub fn reducer(&self) -> &Reducer {
        &self.reducer
    }

    /// Number of distinct groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Reduced value for a key. `None` means no visible record has this
    /// combination; it is not a zero.
    pub fn lookup(&self, key: &[Value]) -> Option<Measure> {
        self.groups.get(key).map(|g| g.measure)
    }

    /// Number of view records that fell into the group.
    pub fn records_in(&self, key: &[Value]) -> Option<usize> {
        self.groups.get(key).map(|g| g.records)
    }

    /// Total records absorbed by all groups; equals the view length.
    pub fn total_records(&self) -> usize {
        self.groups.values().map(|g| g.records).sum()
    }

    /// Coerce loosely typed key parts (e.g. command-line text) to the
    /// grouping column types. `None` when the key does not have one part
    /// per grouping column.
    pub fn coerce_key(&self, key: &[Value]) -> Option<GroupKey> {
        if key.len() != self.key_types.len() {
            return None;
        }
        Some(
            key.iter()
                .zip(&self.key_types)
                .map(|(v, kind)| kind.coerce_value(v.clone()).unwrap_or_else(|| v.clone()))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupKey, Measure)> {
        self.groups.iter().map(|(k, g)| (k, g.measure))
    }

    /// Rows ordered by key (chronological when the first key is a year).
    pub fn sorted_rows(&self) -> Vec<AggregateRow> {
        let mut rows: Vec<AggregateRow> = self
            .iter()
            .map(|(key, value)| AggregateRow {
                key: key.clone(),
                value,
            })
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        rows
    }

    /// Sorted rows as flat JSON objects: one field per grouping column plus
    /// `value_name`.
    pub fn to_json_rows(&self, value_name: &str) -> Vec<serde_json::Map<String, JsonValue>> {
        self.sorted_rows()
            .into_iter()
            .map(|row| {
                let mut obj: serde_json::Map<String, JsonValue> = self
                    .group_by
                    .iter()
                    .zip(&row.key)
                    .map(|(name, v)| (name.clone(), v.to_json()))
                    .collect();
                obj.insert(value_name.to_string(), row.value.to_json());
                obj
            })
            .collect()
    }
}
