use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Flattened, single-valued property table
pub type Properties = BTreeMap<String, JsonValue>;

/// Canonical node for visualization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub label: String,
    #[serde(rename = "nodeType")]
    pub node_type: String,
    #[serde(rename = "data", default)]
    pub properties: Properties,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        NodeRecord {
            id: id.into(),
            node_type: label.clone(),
            label,
            properties: Properties::new(),
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Fold a later record for the same id into this one; later property values win
    pub fn merge(&mut self, later: NodeRecord) {
        if !later.label.is_empty() {
            self.label = later.label;
            self.node_type = later.node_type;
        }
        self.properties.extend(later.properties);
    }
}

/// Canonical edge; `source` and `target` are node ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: String,
    pub label: String,
    #[serde(rename = "edgeType")]
    pub edge_type: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "data", default)]
    pub properties: Properties,
}

impl EdgeRecord {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        let label = label.into();
        EdgeRecord {
            id: id.into(),
            edge_type: label.clone(),
            label,
            source: source.into(),
            target: target.into(),
            properties: Properties::new(),
        }
    }

    pub fn merge(&mut self, later: EdgeRecord) {
        if !later.label.is_empty() {
            self.label = later.label;
            self.edge_type = later.edge_type;
        }
        self.source = later.source;
        self.target = later.target;
        self.properties.extend(later.properties);
    }
}

/// Response format of a traversal result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GraphMode {
    #[default]
    Graph,
    Table,
}

/// Node and edge sets keyed by id, kept in first-seen order
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    nodes: Vec<NodeRecord>,
    node_index: HashMap<String, usize>,
    edges: Vec<EdgeRecord>,
    edge_index: HashMap<String, usize>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_node(&mut self, node: NodeRecord) {
        match self.node_index.get(&node.id) {
            Some(&pos) => self.nodes[pos].merge(node),
            None => {
                self.node_index.insert(node.id.clone(), self.nodes.len());
                self.nodes.push(node);
            }
        }
    }

    pub fn upsert_edge(&mut self, edge: EdgeRecord) {
        match self.edge_index.get(&edge.id) {
            Some(&pos) => self.edges[pos].merge(edge),
            None => {
                self.edge_index.insert(edge.id.clone(), self.edges.len());
                self.edges.push(edge);
            }
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeRecord> {
        self.node_index.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeRecord> {
        match self.node_index.get(id) {
            Some(&pos) => Some(&mut self.nodes[pos]),
            None => None,
        }
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeRecord> {
        self.edge_index.get(id).map(|&pos| &self.edges[pos])
    }

    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeRecord] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn into_parts(self) -> (Vec<NodeRecord>, Vec<EdgeRecord>) {
        (self.nodes, self.edges)
    }
}

/// Node/edge payload without table output, as returned by neighbor queries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl From<GraphBuilder> for GraphData {
    fn from(builder: GraphBuilder) -> Self {
        let (nodes, edges) = builder.into_parts();
        GraphData { nodes, edges }
    }
}

/// Final payload of a traversal query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledGraph {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
    pub mode: GraphMode,
    #[serde(rename = "tableResult")]
    pub table_result: Vec<JsonValue>,
}

impl AssembledGraph {
    /// Payload returned when the query itself failed
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every edge endpoint has a node entry
    pub fn is_closed(&self) -> bool {
        self.edges.iter().all(|e| {
            self.nodes.iter().any(|n| n.id == e.source) && self.nodes.iter().any(|n| n.id == e.target)
        })
    }
}
