//! Filter-and-aggregate data layer for exploratory dashboards.
//!
//! Load a table once against a declared schema, narrow it with range and
//! membership filters, and derive group-by tables for a chart renderer.

pub mod cli;
pub mod color;
pub mod config;
pub mod data;
pub mod session;
