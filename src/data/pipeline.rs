use std::collections::BTreeMap;

use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::aggregate::{aggregate, Aggregate, Reducer};
use super::error::Result;
use super::filter::{apply_filters, FilterSpec, FilteredView};
use super::model::Dataset;

/// A named group-by table derived on every recompute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub name: String,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub reducer: Reducer,
    /// Output field holding the reduced value, e.g. `TotalMedals`.
    #[serde(default)]
    pub value_name: Option<String>,
}

impl AggregateSpec {
    pub fn count<S: Into<String>>(name: impl Into<String>, group_by: impl IntoIterator<Item = S>) -> Self {
        AggregateSpec {
            name: name.into(),
            group_by: group_by.into_iter().map(Into::into).collect(),
            reducer: Reducer::Count,
            value_name: None,
        }
    }

    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn with_value_name(mut self, value_name: impl Into<String>) -> Self {
        self.value_name = Some(value_name.into());
        self
    }

    /// `value_name`, or the summed column / `count` when unset.
    pub fn value_name(&self) -> &str {
        match (&self.value_name, &self.reducer) {
            (Some(name), _) => name,
            (None, Reducer::Sum { column }) => column,
            (None, Reducer::Count) => "count",
        }
    }
}

/// Everything the rendering layer needs after one filter change.
#[derive(Debug, Clone)]
pub struct Recomputation<'a> {
    pub view: FilteredView<'a>,
    pub aggregates: BTreeMap<String, Aggregate>,
}

impl Recomputation<'_> {
    pub fn aggregate(&self, name: &str) -> Option<&Aggregate> {
        self.aggregates.get(name)
    }
}

/// Filter `dataset` and derive every aggregate in `plan` from the result.
///
/// Pure function of its inputs. The aggregates only read the shared view,
/// so they are computed in parallel.
pub fn recompute<'a>(
    dataset: &'a Dataset,
    filters: &[FilterSpec],
    plan: &[AggregateSpec],
) -> Result<Recomputation<'a>> {
    let view = apply_filters(dataset, filters)?;

    let aggregates = plan
        .par_iter()
        .map(|spec| {
            aggregate(&view, &spec.group_by, &spec.reducer).map(|agg| (spec.name.clone(), agg))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    debug!(
        "Recomputed view: {}/{} records, {} aggregate(s)",
        view.len(),
        dataset.len(),
        aggregates.len()
    );
    Ok(Recomputation { view, aggregates })
}
