/// Data layer: schema, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file, check schema → Dataset  (memoized by cache)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<Record>, distinct values per column
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  range / membership predicates → FilteredView
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  group-by count / sum → Aggregate (one per spec)
///   └───────────┘
/// ```
///
/// `pipeline::recompute` runs the last two stages in one call.

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod filter;
pub mod loader;
pub mod mapping;
pub mod model;
pub mod network;
pub mod pipeline;
pub mod schema;

pub use aggregate::{aggregate, Aggregate, AggregateRow, GroupKey, Measure, Reducer};
pub use cache::DatasetCache;
pub use error::DataError;
pub use filter::{apply_filters, EmptySelection, FilterSpec, FilteredView, Selection};
pub use loader::load_file;
pub use model::{Dataset, LoadReport, Record, Value};
pub use pipeline::{recompute, AggregateSpec, Recomputation};
pub use schema::{ColumnDef, ColumnType, Schema};
