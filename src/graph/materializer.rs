//! Conversion of single traversal records into canonical node and edge records.

use serde_json::{json, Value as JsonValue};
use crate::common::value::{identity_string, RawEdge, RawElement, RawProperties, RawVertex};
use super::model::{EdgeRecord, GraphBuilder, NodeRecord, Properties};

/// A vertex or edge turned into canonical records
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    Vertex(NodeRecord),
    Edge {
        edge: EdgeRecord,
        source: NodeRecord,
        target: NodeRecord,
    },
}

impl Materialized {
    /// Merge into the running node/edge sets
    pub fn merge_into(self, builder: &mut GraphBuilder) {
        match self {
            Materialized::Vertex(node) => builder.upsert_node(node),
            Materialized::Edge { edge, source, target } => {
                builder.upsert_edge(edge);
                builder.upsert_node(source);
                builder.upsert_node(target);
            }
        }
    }

    /// Element rendering used inside table rows
    pub fn to_table_json(&self) -> JsonValue {
        match self {
            Materialized::Vertex(node) => node_cell(node),
            Materialized::Edge { edge, source, target } => json!({
                "id": edge.id,
                "label": edge.label,
                "data": edge.properties,
                "inV": node_cell(target),
                "outV": node_cell(source),
            }),
        }
    }
}

fn node_cell(node: &NodeRecord) -> JsonValue {
    json!({
        "id": node.id,
        "label": node.label,
        "data": node.properties,
    })
}

/// Keep the first value of every multi-valued property; keys without values are dropped
pub fn flatten_properties(raw: &RawProperties) -> Properties {
    raw.iter()
        .filter_map(|(key, values)| values.first().map(|v| (key.clone(), v.clone())))
        .collect()
}

pub fn materialize_vertex(vertex: &RawVertex) -> NodeRecord {
    NodeRecord::new(identity_string(&vertex.id), vertex.label.clone())
        .with_properties(flatten_properties(&vertex.properties))
}

/// Edge plus both endpoints; `source` comes from the out-vertex
pub fn materialize_edge(edge: &RawEdge) -> Materialized {
    let source = materialize_vertex(&edge.out_v);
    let target = materialize_vertex(&edge.in_v);
    let mut record = EdgeRecord::new(
        identity_string(&edge.id),
        edge.label.clone(),
        source.id.clone(),
        target.id.clone(),
    );
    record.properties = flatten_properties(&edge.properties);

    Materialized::Edge {
        edge: record,
        source,
        target,
    }
}

/// Materialize a vertex or an edge; any other element yields `None`
pub fn materialize(element: &RawElement) -> Option<Materialized> {
    match element {
        RawElement::Vertex(v) => Some(Materialized::Vertex(materialize_vertex(v))),
        RawElement::Edge(e) => Some(materialize_edge(e)),
        _ => None,
    }
}

/// Whether a sequence is an expand-path result: made only of vertices and
/// edges, with at least one edge. A vertex-only sequence does not qualify.
pub fn is_expand_path(items: &[RawElement]) -> bool {
    items.iter().all(RawElement::is_graph_element) && items.iter().any(RawElement::is_edge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person(id: i64) -> RawVertex {
        RawVertex::new(id, "person")
    }

    fn knows(id: i64, from: i64, to: i64) -> RawElement {
        RawEdge::new(id, "knows", person(from), person(to))
            .with_property("weight", 0.4)
            .into()
    }

    #[test]
    fn test_vertex_keeps_first_property_value() {
        let raw = person(1)
            .with_property("name", "marko")
            .with_property("name", "marko a. rodriguez")
            .with_property("age", 29);
        let node = materialize_vertex(&raw);
        assert_eq!(node.id, "1");
        assert_eq!(node.node_type, "person");
        assert_eq!(node.properties["name"], json!("marko"));
        assert_eq!(node.properties["age"], json!(29));
    }

    #[test]
    fn test_empty_property_values_dropped() {
        let mut raw = person(1);
        raw.properties.insert("nickname".to_string(), vec![]);
        assert!(materialize_vertex(&raw).properties.is_empty());
    }

    #[test]
    fn test_edge_materializes_endpoints() {
        let Some(Materialized::Edge { edge, source, target }) = materialize(&knows(7, 1, 2)) else {
            panic!("expected edge");
        };
        assert_eq!(edge.id, "7");
        assert_eq!(edge.source, "1");
        assert_eq!(edge.target, "2");
        assert_eq!(edge.properties["weight"], json!(0.4));
        assert_eq!(source.id, "1");
        assert_eq!(target.id, "2");
    }

    #[test]
    fn test_scalars_not_materialized() {
        assert!(materialize(&RawElement::scalar(5)).is_none());
        assert!(materialize(&RawElement::list(vec![])).is_none());
    }

    #[test]
    fn test_expand_path_predicate() {
        let v = |id| RawElement::from(person(id));
        assert!(is_expand_path(&[v(1), knows(7, 1, 2), v(2)]));
        assert!(is_expand_path(&[knows(7, 1, 2)]));
        assert!(!is_expand_path(&[v(1), v(2)]));
        assert!(!is_expand_path(&[]));
        assert!(!is_expand_path(&[v(1), knows(7, 1, 2), RawElement::scalar(3)]));
    }

    #[test]
    fn test_merge_adds_edge_and_endpoints() {
        let mut builder = GraphBuilder::new();
        materialize(&knows(7, 1, 2)).unwrap().merge_into(&mut builder);
        assert_eq!(builder.node_count(), 2);
        assert_eq!(builder.edge_count(), 1);
    }

    #[test]
    fn test_table_cell_rendering() {
        let cell = materialize(&knows(7, 1, 2)).unwrap().to_table_json();
        assert_eq!(cell["inV"]["id"], json!("2"));
        assert_eq!(cell["outV"]["id"], json!("1"));
        assert_eq!(cell["data"]["weight"], json!(0.4));
    }
}
