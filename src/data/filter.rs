use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::error::Result;
use super::model::{Dataset, Record, Value};
use super::schema::Schema;

// ---------------------------------------------------------------------------
// FilterSpec – one named predicate over one column
// ---------------------------------------------------------------------------

/// A predicate over a single column. Several specs combine with AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSpec {
    /// Inclusive `[min, max]` over an ordered domain. `min > max` matches
    /// nothing.
    Range {
        column: String,
        min: Value,
        max: Value,
    },
    /// The value must be one of `values`. An empty set matches nothing.
    Membership {
        column: String,
        values: BTreeSet<Value>,
    },
}

impl FilterSpec {
    pub fn range(column: impl Into<String>, min: impl Into<Value>, max: impl Into<Value>) -> Self {
        FilterSpec::Range {
            column: column.into(),
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn membership<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        FilterSpec::Membership {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            FilterSpec::Range { column, .. } | FilterSpec::Membership { column, .. } => column,
        }
    }

    /// Bind the spec to a schema column and coerce its bounds / members to
    /// the column type. Values that do not coerce are kept as given and
    /// simply never match.
    fn resolve(&self, schema: &Schema) -> Result<Predicate> {
        let column = schema.index_of(self.column())?;
        let kind = schema.columns()[column].kind;
        let coerce = |v: &Value| kind.coerce_value(v.clone()).unwrap_or_else(|| v.clone());
        Ok(match self {
            FilterSpec::Range { min, max, .. } => Predicate::Range {
                column,
                min: coerce(min),
                max: coerce(max),
            },
            FilterSpec::Membership { values, .. } => Predicate::Membership {
                column,
                values: values.iter().map(coerce).collect(),
            },
        })
    }
}

/// Command-line form: `COL=MIN..MAX` for a range, `COL=A,B,C` for a
/// membership test, `COL=` for an empty membership. Values are read as
/// text and coerced to the column type when the filter is applied.
impl FromStr for FilterSpec {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (column, rest) = s
            .split_once('=')
            .ok_or_else(|| format!("expected COLUMN=VALUES, got '{s}'"))?;
        let column = column.trim();
        if column.is_empty() {
            return Err(format!("missing column name in '{s}'"));
        }
        if let Some((min, max)) = rest.split_once("..") {
            return Ok(FilterSpec::range(column, min.trim(), max.trim()));
        }
        Ok(FilterSpec::membership(
            column,
            rest.split(',').map(str::trim).filter(|v| !v.is_empty()),
        ))
    }
}

/// A spec bound to a column index.
#[derive(Debug)]
enum Predicate {
    Range {
        column: usize,
        min: Value,
        max: Value,
    },
    Membership {
        column: usize,
        values: BTreeSet<Value>,
    },
}

impl Predicate {
    fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::Range { column, min, max } => {
                let v = record.get(*column);
                matches!(
                    v.compare_in_domain(min),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    v.compare_in_domain(max),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }
            Predicate::Membership { column, values } => values.contains(record.get(*column)),
        }
    }
}

// ---------------------------------------------------------------------------
// FilteredView
// ---------------------------------------------------------------------------

/// The records of a dataset that pass every active filter, in dataset
/// order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

/// Return the view of records passing all `filters`.
///
/// A record passes a range spec when its value lies in `[min, max]`
/// (`Missing` never does) and a membership spec when its value is in the
/// selected set. No match is an empty view, not an error; naming a column
/// outside the schema is an error.
pub fn apply_filters<'a>(dataset: &'a Dataset, filters: &[FilterSpec]) -> Result<FilteredView<'a>> {
    let predicates = filters
        .iter()
        .map(|f| f.resolve(dataset.schema()))
        .collect::<Result<Vec<_>>>()?;

    let indices = dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, rec)| predicates.iter().all(|p| p.matches(rec)))
        .map(|(i, _)| i)
        .collect();

    Ok(FilteredView { dataset, indices })
}

impl<'a> FilteredView<'a> {
    /// The unfiltered view.
    pub fn full(dataset: &'a Dataset) -> Self {
        FilteredView {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Positions of the passing records in the dataset.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn records(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let records = self.dataset.records();
        self.indices.iter().map(move |&i| &records[i])
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Sorted distinct values of a column among the visible records.
    pub fn distinct(&self, column: &str) -> Result<BTreeSet<Value>> {
        let idx = self.dataset.schema().index_of(column)?;
        Ok(self.records().map(|r| r.get(idx).clone()).collect())
    }

    /// Smallest and largest non-missing value among the visible records.
    pub fn extent(&self, column: &str) -> Result<Option<(Value, Value)>> {
        let values = self.distinct(column)?;
        let mut present = values.into_iter().filter(|v| !v.is_missing());
        Ok(present.next().map(|first| {
            let last = present.last().unwrap_or_else(|| first.clone());
            (first, last)
        }))
    }

    /// Visible rows as JSON objects for tabular display.
    pub fn to_records(&self) -> Vec<serde_json::Map<String, JsonValue>> {
        self.indices
            .iter()
            .filter_map(|&i| self.dataset.record_to_json(i))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Single-selection (chart click) state
// ---------------------------------------------------------------------------

/// What a single-selection means while nothing is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmptySelection {
    /// No constraint: every record stays visible.
    #[default]
    #[serde(rename = "all")]
    ShowAll,
    /// Nothing is visible until a point is selected.
    #[serde(rename = "none")]
    ShowNone,
}

/// A point selection bound to one column, such as clicking a year bar.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub column: String,
    pub value: Option<Value>,
    pub empty: EmptySelection,
}

impl Selection {
    pub fn new(column: impl Into<String>, empty: EmptySelection) -> Self {
        Selection {
            column: column.into(),
            value: None,
            empty,
        }
    }

    /// The filter this selection contributes, if any.
    pub fn to_filter(&self) -> Option<FilterSpec> {
        match (&self.value, self.empty) {
            (Some(v), _) => Some(FilterSpec::membership(&self.column, [v.clone()])),
            (None, EmptySelection::ShowAll) => None,
            (None, EmptySelection::ShowNone) => {
                Some(FilterSpec::membership(&self.column, Vec::<Value>::new()))
            }
        }
    }
}
