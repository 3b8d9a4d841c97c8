//! Command-line definitions and the commands behind them.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::{json, Map, Value as JsonValue};

use crate::config::DashboardConfig;
use crate::data::cache::DatasetCache;
use crate::data::filter::FilterSpec;
use crate::data::loader::load_file;
use crate::data::model::Value;
use crate::data::network::DirectedGraph;
use crate::data::schema::{ColumnDef, ColumnType, Schema};
use crate::session::Session;

#[derive(Debug, Parser)]
#[command(name = "dashpipe", version, about = "Filter and aggregate tabular data for dashboards")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a configured dashboard once and print its data as JSON
    Run(RunArgs),
    /// Print in/out degree per node of a directed edge list
    Graph(GraphArgs),
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Dashboard config file (TOML)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Data file to use instead of the one named in the config
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Filter replacing the config's filter on the same column
    #[arg(short, long = "filter", value_name = "COL=MIN..MAX | COL=A,B")]
    pub filters: Vec<FilterSpec>,

    /// Selected point for the configured single-selection
    #[arg(long, value_name = "VALUE")]
    pub select: Option<String>,

    /// Point lookup in a named aggregate
    #[arg(long = "lookup", value_name = "NAME=K1,K2")]
    pub lookups: Vec<LookupArg>,

    /// Include the filtered rows in the output
    #[arg(long)]
    pub rows: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, clap::Args)]
pub struct GraphArgs {
    /// Edge list (CSV, JSON or Parquet)
    #[arg(long)]
    pub edges: PathBuf,

    #[arg(long, default_value = "source")]
    pub source: String,

    #[arg(long, default_value = "target")]
    pub target: String,

    /// Integer edge weight column; missing weights count as 1
    #[arg(long)]
    pub weight: Option<String>,

    /// Node table carrying an integer attribute
    #[arg(long, requires = "attribute")]
    pub nodes: Option<PathBuf>,

    #[arg(long, default_value = "id")]
    pub id: String,

    /// Integer node attribute column, e.g. `age`; missing values count as 0
    #[arg(long, requires = "nodes")]
    pub attribute: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// `NAME=K1,K2,...`: look up key `(K1, K2, ...)` in aggregate `NAME`.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupArg {
    pub aggregate: String,
    pub key: Vec<Value>,
}

impl FromStr for LookupArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (name, key) = s
            .split_once('=')
            .ok_or_else(|| format!("expected NAME=K1,K2, got '{s}'"))?;
        Ok(LookupArg {
            aggregate: name.trim().to_string(),
            key: key.split(',').map(|k| Value::from(k.trim())).collect(),
        })
    }
}

/// Load, filter and aggregate as the config describes, with command-line
/// overrides applied, and return the result document.
pub fn run_dashboard(args: &RunArgs) -> Result<JsonValue> {
    let config = DashboardConfig::from_file(&args.config)?;
    let path = args.data.clone().unwrap_or_else(|| config.dataset.path.clone());

    let cache = DatasetCache::new();
    let dataset = cache
        .get_or_load(&path, &config.schema)
        .with_context(|| format!("loading dataset for {}", args.config.display()))?;

    let mut session = Session::new(Arc::clone(&dataset), config.aggregates.clone());
    for spec in config.filters.iter().chain(&args.filters) {
        session.set_filter(spec.clone());
    }
    if let Some(sel) = &config.selection {
        session.enable_selection(&sel.column, sel.empty);
        let kind = config.schema.column(&sel.column)?.kind;
        let point = match &args.select {
            Some(raw) => Some(kind.coerce_str(raw).unwrap_or_else(|| Value::from(raw.as_str()))),
            None => sel.value.clone(),
        };
        if let Some(v) = point {
            session.select_point(v);
        }
    }

    let out = session.recompute()?;
    info!(
        "{} of {} records pass {} filter(s)",
        out.view.len(),
        dataset.len(),
        session.effective_filters().len()
    );

    let mut aggregates = Map::new();
    for spec in &config.aggregates {
        if let Some(agg) = out.aggregate(&spec.name) {
            aggregates.insert(spec.name.clone(), json!(agg.to_json_rows(spec.value_name())));
        }
    }

    let mut lookups = Vec::with_capacity(args.lookups.len());
    for lookup in &args.lookups {
        let agg = out
            .aggregate(&lookup.aggregate)
            .ok_or_else(|| anyhow!("no aggregate named '{}'", lookup.aggregate))?;
        let key = agg.coerce_key(&lookup.key).ok_or_else(|| {
            anyhow!(
                "lookup in '{}' needs {} key part(s) ({}), got {}",
                lookup.aggregate,
                agg.group_by().len(),
                agg.group_by().join(", "),
                lookup.key.len()
            )
        })?;
        lookups.push(json!({
            "aggregate": lookup.aggregate,
            "key": key,
            "value": agg.lookup(&key),
        }));
    }

    let mut legends = Map::new();
    for legend in &config.legends {
        legends.insert(legend.column.clone(), json!(legend.build(&dataset)?.legend_entries()));
    }

    let mut doc = json!({
        "records": dataset.len(),
        "visible": out.view.len(),
        "coercion_failures": dataset.report().coercion_failures,
        "aggregates": aggregates,
        "lookups": lookups,
        "legends": legends,
    });
    if args.rows {
        doc["rows"] = json!(out.view.to_records());
    }
    Ok(doc)
}

/// Build the graph and return per-node degree metrics.
pub fn run_graph(args: &GraphArgs) -> Result<JsonValue> {
    let mut edge_columns = vec![
        ColumnDef::new(&args.source, ColumnType::Text),
        ColumnDef::new(&args.target, ColumnType::Text),
    ];
    if let Some(w) = &args.weight {
        edge_columns.push(ColumnDef::new(w, ColumnType::Integer));
    }
    let edges = load_file(&args.edges, &Schema::new(edge_columns)?)?;
    let mut graph =
        DirectedGraph::from_edges(&edges, &args.source, &args.target, args.weight.as_deref())?;

    if let (Some(nodes_path), Some(attr)) = (&args.nodes, &args.attribute) {
        let schema = Schema::new(vec![
            ColumnDef::new(&args.id, ColumnType::Text),
            ColumnDef::new(attr, ColumnType::Integer),
        ])?;
        let nodes = load_file(nodes_path, &schema)?;
        graph = graph.with_node_attribute(&nodes, &args.id, attr)?;
    }

    Ok(json!({
        "nodes": graph.node_count(),
        "edges": graph.edge_count(),
        "degrees": graph.degrees(),
    }))
}
