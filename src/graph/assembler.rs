//! Classification of a traversal result stream into graph or table output.
//!
//! Assembly is a left fold over the stream in arrival order. Each element is
//! classified into a [`RowKind`], and the response mode advances through
//! [`GraphMode::step`]. Once a table row is seen the mode stays `Table`, so the
//! final mode is only known after the last element.

use std::collections::HashSet;
use serde_json::{Map, Value as JsonValue};
use crate::common::value::{identity_string, RawElement};
use super::materializer::{is_expand_path, materialize, Materialized};
use super::model::{AssembledGraph, GraphBuilder, GraphMode};

/// How one result element contributes to the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Vertex,
    Edge,
    /// Engine-native path object, not supported and skipped
    NativePath,
    /// Vertex/edge sequence produced by an expand-path step
    ExpandPath,
    /// Scalar, map or any other sequence
    TableRow,
}

pub fn classify(element: &RawElement) -> RowKind {
    match element {
        RawElement::Vertex(_) => RowKind::Vertex,
        RawElement::Edge(_) => RowKind::Edge,
        RawElement::Path(_) => RowKind::NativePath,
        RawElement::List(items) if is_expand_path(items) => RowKind::ExpandPath,
        _ => RowKind::TableRow,
    }
}

impl GraphMode {
    /// Mode transition for one element: a table row makes the result tabular for good
    pub fn step(self, kind: RowKind) -> GraphMode {
        match (self, kind) {
            (_, RowKind::TableRow) => GraphMode::Table,
            (mode, _) => mode,
        }
    }
}

/// Running state of the fold
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    builder: GraphBuilder,
    vertex_ids: Vec<JsonValue>,
    seen_ids: HashSet<String>,
    table_result: Vec<JsonValue>,
    mode: GraphMode,
}

impl Assembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one element
    pub fn step(mut self, element: &RawElement) -> Self {
        let kind = classify(element);
        self.mode = self.mode.step(kind);

        match kind {
            RowKind::Vertex | RowKind::Edge => self.absorb(element),
            RowKind::NativePath => {
                tracing::debug!("Skipping native path result");
            }
            RowKind::ExpandPath => {
                if let RawElement::List(items) = element {
                    for item in items {
                        self.absorb(item);
                    }
                }
                self.table_result.push(table_row(element));
            }
            RowKind::TableRow => self.table_result.push(table_row(element)),
        }
        self
    }

    fn absorb(&mut self, element: &RawElement) {
        let endpoints: Vec<&JsonValue> = match element {
            RawElement::Vertex(vertex) => vec![&vertex.id],
            RawElement::Edge(edge) => vec![&edge.out_v.id, &edge.in_v.id],
            _ => Vec::new(),
        };
        if let Some(materialized) = materialize(element) {
            materialized.merge_into(&mut self.builder);
            for id in endpoints {
                if self.seen_ids.insert(identity_string(id)) {
                    self.vertex_ids.push(id.clone());
                }
            }
        }
    }

    pub fn mode(&self) -> GraphMode {
        self.mode
    }

    /// Distinct vertex ids in discovery order, as the engine reported them
    pub fn vertex_ids(&self) -> &[JsonValue] {
        &self.vertex_ids
    }

    pub fn builder_mut(&mut self) -> &mut GraphBuilder {
        &mut self.builder
    }

    /// Final payload; table mode drops the collected nodes and edges
    pub fn finish(self) -> AssembledGraph {
        match self.mode {
            GraphMode::Graph => {
                let (nodes, edges) = self.builder.into_parts();
                AssembledGraph {
                    nodes,
                    edges,
                    mode: GraphMode::Graph,
                    table_result: self.table_result,
                }
            }
            GraphMode::Table => AssembledGraph {
                nodes: Vec::new(),
                edges: Vec::new(),
                mode: GraphMode::Table,
                table_result: self.table_result,
            },
        }
    }
}

/// Fold a whole result stream
pub fn assemble<'a>(elements: impl IntoIterator<Item = &'a RawElement>) -> Assembly {
    elements.into_iter().fold(Assembly::new(), Assembly::step)
}

/// Flatten one element into a table row.
///
/// Scalars are kept verbatim. Maps and sequences become objects: map keys use their
/// column name, sequence entries use their index. Cell values are numbers as-is,
/// vertices and edges as materialized records, and everything else as a JSON string.
pub fn table_row(element: &RawElement) -> JsonValue {
    match element {
        RawElement::Scalar(value) => value.clone(),
        RawElement::Map(entries) => {
            let mut row = Map::new();
            for (key, value) in entries {
                row.insert(key.column_name(), table_cell(value));
            }
            JsonValue::Object(row)
        }
        RawElement::List(items) | RawElement::Path(items) => {
            let mut row = Map::new();
            for (index, value) in items.iter().enumerate() {
                row.insert(index.to_string(), table_cell(value));
            }
            JsonValue::Object(row)
        }
        element => materialize(element)
            .map(|m| m.to_table_json())
            .unwrap_or(JsonValue::Null),
    }
}

fn table_cell(value: &RawElement) -> JsonValue {
    match value {
        RawElement::Scalar(JsonValue::Number(n)) => JsonValue::Number(n.clone()),
        RawElement::Vertex(_) | RawElement::Edge(_) => materialize(value)
            .as_ref()
            .map(Materialized::to_table_json)
            .unwrap_or(JsonValue::Null),
        other => JsonValue::String(other.to_plain_json().to_string()),
    }
}
