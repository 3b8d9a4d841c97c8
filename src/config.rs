use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::color::ColorMap;
use crate::data::aggregate::Reducer;
use crate::data::filter::{EmptySelection, FilterSpec};
use crate::data::model::{Dataset, Value};
use crate::data::pipeline::AggregateSpec;
use crate::data::schema::Schema;

/// A dashboard described in TOML:
///
/// ```toml
/// [dataset]
/// path = "olympics.json"
///
/// [[schema]]
/// name = "Year"
/// type = "integer"
///
/// [[filters]]
/// kind = "range"
/// column = "Year"
/// min = 1924
/// max = 2006
///
/// [[aggregates]]
/// name = "total_by_year"
/// group_by = ["Year"]
/// value_name = "TotalMedals"
///
/// [selection]
/// column = "Year"
/// empty = "all"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub dataset: DatasetConfig,
    pub schema: Schema,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub aggregates: Vec<AggregateSpec>,
    #[serde(default)]
    pub selection: Option<SelectionConfig>,
    #[serde(default)]
    pub legends: Vec<LegendConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Relative paths resolve against the config file's directory.
    pub path: PathBuf,
}

/// Single-selection bound to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub column: String,
    #[serde(default)]
    pub empty: EmptySelection,
    /// Initially selected point.
    #[serde(default)]
    pub value: Option<Value>,
}

/// Colour legend for a categorical column. Without `domain` the colours
/// are spread over the column's distinct values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendConfig {
    pub column: String,
    #[serde(default)]
    pub domain: Vec<Value>,
    #[serde(default)]
    pub range: Vec<String>,
}

impl LegendConfig {
    pub fn build(&self, dataset: &Dataset) -> Result<ColorMap> {
        if self.domain.is_empty() {
            let values = dataset
                .distinct(&self.column)
                .with_context(|| format!("legend for '{}'", self.column))?;
            Ok(ColorMap::categorical(&self.column, values))
        } else {
            Ok(ColorMap::fixed(
                &self.column,
                self.domain.iter().cloned(),
                self.range.iter().cloned(),
            ))
        }
    }
}

impl DashboardConfig {
    /// Read and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config = Self::from_toml_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if config.dataset.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.dataset.path = dir.join(&config.dataset.path);
            }
        }
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: DashboardConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every column the dashboard names is declared.
    pub fn validate(&self) -> Result<()> {
        let schema = &self.schema;
        for f in &self.filters {
            schema
                .index_of(f.column())
                .with_context(|| "in [[filters]]")?;
        }

        let mut names = BTreeSet::new();
        for agg in &self.aggregates {
            if !names.insert(agg.name.as_str()) {
                bail!("duplicate aggregate name '{}'", agg.name);
            }
            for col in &agg.group_by {
                schema
                    .index_of(col)
                    .with_context(|| format!("in aggregate '{}'", agg.name))?;
            }
            if let Reducer::Sum { column } = &agg.reducer {
                let def = schema
                    .column(column)
                    .with_context(|| format!("in aggregate '{}'", agg.name))?;
                if !def.kind.is_numeric() {
                    bail!("aggregate '{}' sums non-numeric column '{column}'", agg.name);
                }
            }
        }

        if let Some(sel) = &self.selection {
            schema.index_of(&sel.column).context("in [selection]")?;
        }
        for legend in &self.legends {
            schema.index_of(&legend.column).context("in [[legends]]")?;
        }
        Ok(())
    }
}
