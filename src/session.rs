use std::collections::BTreeSet;
use std::sync::Arc;

use crate::data::error::Result;
use crate::data::filter::{EmptySelection, FilterSpec, Selection};
use crate::data::model::{Dataset, Value};
use crate::data::pipeline::{recompute, AggregateSpec, Recomputation};

// ---------------------------------------------------------------------------
// Per-user session state
// ---------------------------------------------------------------------------

/// Filter and selection state of one user over a shared dataset,
/// independent of rendering.
///
/// The host calls [`Session::recompute`] after every change; nothing is
/// recomputed behind its back.
#[derive(Debug, Clone)]
pub struct Session {
    /// Read-only dataset shared with every other session.
    dataset: Arc<Dataset>,

    /// Aggregates derived on every recompute.
    plan: Vec<AggregateSpec>,

    /// Active filters, at most one per column, in the order first set.
    filters: Vec<FilterSpec>,

    /// Point selection from a chart click, if the dashboard has one.
    selection: Option<Selection>,
}

impl Session {
    /// Start with no filters: every record is visible.
    pub fn new(dataset: Arc<Dataset>, plan: Vec<AggregateSpec>) -> Self {
        Self {
            dataset,
            plan,
            filters: Vec::new(),
            selection: None,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    /// Replace the filter on the spec's column, or add it.
    pub fn set_filter(&mut self, spec: FilterSpec) {
        match self.filters.iter_mut().find(|f| f.column() == spec.column()) {
            Some(slot) => *slot = spec,
            None => self.filters.push(spec),
        }
    }

    /// Remove any filter on `column`.
    pub fn clear_filter(&mut self, column: &str) {
        self.filters.retain(|f| f.column() != column);
    }

    /// Restrict an ordered column to `[min, max]`.
    pub fn set_range(&mut self, column: &str, min: Value, max: Value) {
        self.set_filter(FilterSpec::range(column, min, max));
    }

    /// Toggle a single value in a column's membership filter. A column
    /// without a membership filter starts from all of its values selected.
    pub fn toggle_value(&mut self, column: &str, value: &Value) -> Result<()> {
        let kind = self.dataset.schema().column(column)?.kind;
        let value = kind
            .coerce_value(value.clone())
            .unwrap_or_else(|| value.clone());
        let mut selected = match self.filters.iter().find(|f| f.column() == column) {
            Some(FilterSpec::Membership { values, .. }) => values.clone(),
            _ => self.dataset.distinct(column)?.clone(),
        };
        if !selected.remove(&value) {
            selected.insert(value);
        }
        self.set_filter(FilterSpec::Membership {
            column: column.to_string(),
            values: selected,
        });
        Ok(())
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) -> Result<()> {
        let all_vals = self.dataset.distinct(column)?.clone();
        self.set_filter(FilterSpec::Membership {
            column: column.to_string(),
            values: all_vals,
        });
        Ok(())
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) {
        self.set_filter(FilterSpec::Membership {
            column: column.to_string(),
            values: BTreeSet::new(),
        });
    }

    /// Bind a single-selection to `column` with the given empty policy.
    pub fn enable_selection(&mut self, column: &str, empty: EmptySelection) {
        self.selection = Some(Selection::new(column, empty));
    }

    /// Record a chart click. Ignored when no selection is bound.
    pub fn select_point(&mut self, value: Value) {
        if let Some(sel) = &mut self.selection {
            sel.value = Some(value);
        }
    }

    pub fn clear_selection(&mut self) {
        if let Some(sel) = &mut self.selection {
            sel.value = None;
        }
    }

    /// Current filters plus whatever the selection contributes.
    pub fn effective_filters(&self) -> Vec<FilterSpec> {
        let mut filters = self.filters.clone();
        filters.extend(self.selection.as_ref().and_then(Selection::to_filter));
        filters
    }

    /// Recompute the view and every aggregate for the current state.
    pub fn recompute(&self) -> Result<Recomputation<'_>> {
        recompute(&self.dataset, &self.effective_filters(), &self.plan)
    }
}
