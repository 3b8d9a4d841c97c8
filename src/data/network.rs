use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::error::Result;
use super::model::{Dataset, Value};
use super::schema::integral;

/// Directed graph built from an edge-list table. One edge per ordered
/// pair of nodes; self-loops count toward both degrees of their node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectedGraph {
    nodes: BTreeSet<String>,
    edges: BTreeMap<(String, String), i64>,
    attributes: BTreeMap<String, BTreeMap<String, i64>>,
}

/// Degree metrics of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDegree {
    pub id: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub attributes: BTreeMap<String, i64>,
}

const DEFAULT_WEIGHT: i64 = 1;
const DEFAULT_ATTRIBUTE: i64 = 0;

fn node_id(v: &Value) -> Option<String> {
    match v {
        Value::Missing => None,
        other => Some(other.to_string()),
    }
}

fn as_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Integer(i) => Some(*i),
        Value::Float(f) => integral(*f),
        Value::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl DirectedGraph {
    /// Build from the rows of `dataset`. Rows with a missing endpoint are
    /// skipped. A repeated pair keeps the weight of its last row; missing
    /// or non-integer weights become 1.
    pub fn from_edges(
        dataset: &Dataset,
        source: &str,
        target: &str,
        weight: Option<&str>,
    ) -> Result<Self> {
        let schema = dataset.schema();
        let source_idx = schema.index_of(source)?;
        let target_idx = schema.index_of(target)?;
        let weight_idx = weight.map(|w| schema.index_of(w)).transpose()?;

        let mut graph = DirectedGraph::default();
        for rec in dataset.records() {
            let (Some(u), Some(v)) = (node_id(rec.get(source_idx)), node_id(rec.get(target_idx)))
            else {
                continue;
            };
            let w = weight_idx
                .and_then(|i| as_integer(rec.get(i)))
                .unwrap_or(DEFAULT_WEIGHT);
            graph.nodes.insert(u.clone());
            graph.nodes.insert(v.clone());
            graph.edges.insert((u, v), w);
        }
        Ok(graph)
    }

    /// Attach an integer attribute (e.g. `age`) read from a node table.
    /// Nodes without a row, or with a missing or non-integer value, get 0.
    /// Ids that appear in no edge join the graph as isolated nodes.
    pub fn with_node_attribute(mut self, nodes: &Dataset, id: &str, attribute: &str) -> Result<Self> {
        let id_idx = nodes.schema().index_of(id)?;
        let attr_idx = nodes.schema().index_of(attribute)?;

        let mut values: BTreeMap<String, i64> = self
            .nodes
            .iter()
            .map(|n| (n.clone(), DEFAULT_ATTRIBUTE))
            .collect();
        for rec in nodes.records() {
            let Some(n) = node_id(rec.get(id_idx)) else {
                continue;
            };
            let value = as_integer(rec.get(attr_idx)).unwrap_or(DEFAULT_ATTRIBUTE);
            self.nodes.insert(n.clone());
            values.insert(n, value);
        }
        for (n, v) in values {
            self.attributes
                .entry(n)
                .or_default()
                .insert(attribute.to_string(), v);
        }
        Ok(self)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn weight(&self, source: &str, target: &str) -> Option<i64> {
        self.edges
            .get(&(source.to_string(), target.to_string()))
            .copied()
    }

    pub fn in_degree(&self, node: &str) -> usize {
        self.edges.keys().filter(|(_, v)| v == node).count()
    }

    pub fn out_degree(&self, node: &str) -> usize {
        self.edges.keys().filter(|(u, _)| u == node).count()
    }

    /// Degree metrics for every node, sorted by id.
    pub fn degrees(&self) -> Vec<NodeDegree> {
        let mut in_deg: BTreeMap<&str, usize> = BTreeMap::new();
        let mut out_deg: BTreeMap<&str, usize> = BTreeMap::new();
        for (u, v) in self.edges.keys() {
            *out_deg.entry(u).or_default() += 1;
            *in_deg.entry(v).or_default() += 1;
        }
        self.nodes
            .iter()
            .map(|n| NodeDegree {
                id: n.clone(),
                in_degree: in_deg.get(n.as_str()).copied().unwrap_or(0),
                out_degree: out_deg.get(n.as_str()).copied().unwrap_or(0),
                attributes: self.attributes.get(n).cloned().unwrap_or_default(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{LoadReport, Record};
    use crate::data::schema::{ColumnDef, ColumnType, Schema};

    fn edges(rows: &[(&str, &str, Value)]) -> Dataset {
        let schema = Schema::new(vec![
            ColumnDef::new("source", ColumnType::Text),
            ColumnDef::new("target", ColumnType::Text),
            ColumnDef::new("weight", ColumnType::Integer).optional(),
        ])
        .unwrap();
        let records = rows
            .iter()
            .map(|(u, v, w)| Record::new(vec![(*u).into(), (*v).into(), w.clone()]))
            .collect();
        Dataset::from_records(schema, records, LoadReport::default())
    }

    #[test]
    fn test_degrees() {
        let ds = edges(&[
            ("a", "b", Value::Integer(3)),
            ("a", "c", Value::Missing),
            ("b", "c", Value::Integer(2)),
        ]);
        let g = DirectedGraph::from_edges(&ds, "source", "target", Some("weight")).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.out_degree("a"), 2);
        assert_eq!(g.in_degree("c"), 2);
        assert_eq!(g.in_degree("a"), 0);
        assert_eq!(g.weight("a", "c"), Some(1));
        assert_eq!(g.weight("c", "a"), None);

        let degrees = g.degrees();
        assert_eq!(degrees[2].id, "c");
        assert_eq!((degrees[2].in_degree, degrees[2].out_degree), (2, 0));
    }

    #[test]
    fn test_repeated_pair_is_one_edge() {
        let ds = edges(&[
            ("a", "b", Value::Integer(3)),
            ("a", "b", Value::Integer(5)),
        ]);
        let g = DirectedGraph::from_edges(&ds, "source", "target", Some("weight")).unwrap();
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.weight("a", "b"), Some(5));
        assert_eq!(g.out_degree("a"), 1);
    }

    #[test]
    fn test_node_attribute_defaults_to_zero() {
        let ds = edges(&[("a", "b", Value::Missing), ("b", "c", Value::Missing)]);
        let node_schema = Schema::new(vec![
            ColumnDef::new("id", ColumnType::Text),
            ColumnDef::new("age", ColumnType::Integer),
        ])
        .unwrap();
        let nodes = Dataset::from_records(
            node_schema,
            vec![
                Record::new(vec!["a".into(), Value::Integer(7)]),
                Record::new(vec!["b".into(), Value::Missing]),
                Record::new(vec!["z".into(), Value::Integer(4)]),
            ],
            LoadReport::default(),
        );
        let g = DirectedGraph::from_edges(&ds, "source", "target", None)
            .unwrap()
            .with_node_attribute(&nodes, "id", "age")
            .unwrap();
        let ages: Vec<i64> = g.degrees().iter().map(|d| d.attributes["age"]).collect();
        assert_eq!(ages, vec![7, 0, 0, 4]);
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 2);

        // z has no interactions but is still a node
        let degrees = g.degrees();
        let z = &degrees[3];
        assert_eq!(z.id, "z");
        assert_eq!((z.in_degree, z.out_degree), (0, 0));
    }

    #[test]
    fn test_out_of_range_weight_uses_default() {
        let ds = edges(&[("a", "b", Value::Float(1e19)), ("b", "c", Value::Float(12.0))]);
        let g = DirectedGraph::from_edges(&ds, "source", "target", Some("weight")).unwrap();
        assert_eq!(g.weight("a", "b"), Some(1));
        assert_eq!(g.weight("b", "c"), Some(12));
    }
}
