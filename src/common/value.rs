use std::collections::BTreeMap;
use serde_json::{Map, Value as JsonValue};

/// Multi-valued property table as the traversal engine reports it.
/// Vertex properties may carry several values per key, edge properties one.
pub type RawProperties = BTreeMap<String, Vec<JsonValue>>;

/// Vertex element returned by the traversal engine
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawVertex {
    pub id: JsonValue,
    pub label: String,
    pub properties: RawProperties,
}

impl RawVertex {
    pub fn new(id: impl Into<JsonValue>, label: impl Into<String>) -> Self {
        RawVertex {
            id: id.into(),
            label: label.into(),
            properties: RawProperties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.properties.entry(key.into()).or_default().push(value.into());
        self
    }
}

/// Edge element returned by the traversal engine.
/// `out_v` is the source endpoint, `in_v` the target.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEdge {
    pub id: JsonValue,
    pub label: String,
    pub out_v: RawVertex,
    pub in_v: RawVertex,
    pub properties: RawProperties,
}

impl RawEdge {
    pub fn new(
        id: impl Into<JsonValue>,
        label: impl Into<String>,
        out_v: RawVertex,
        in_v: RawVertex,
    ) -> Self {
        RawEdge {
            id: id.into(),
            label: label.into(),
            out_v,
            in_v,
            properties: RawProperties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.properties.insert(key.into(), vec![value.into()]);
        self
    }
}

/// Key of a map-shaped result row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapKey {
    /// Engine token key such as `T.id`, `T.label` or `Direction.OUT`
    Reserved(String),
    /// Ordinary key, stringified
    Plain(String),
}

impl MapKey {
    pub fn reserved(name: impl Into<String>) -> Self {
        MapKey::Reserved(name.into())
    }

    pub fn plain(name: impl Into<String>) -> Self {
        MapKey::Plain(name.into())
    }

    /// Column name used in table rows; reserved keys get a `~` prefix
    pub fn column_name(&self) -> String {
        match self {
            MapKey::Reserved(name) => format!("~{}", name),
            MapKey::Plain(name) => name.clone(),
        }
    }
}

/// One item of a traversal result stream
#[derive(Debug, Clone, PartialEq)]
pub enum RawElement {
    Vertex(RawVertex),
    Edge(RawEdge),
    /// Engine-native path object
    Path(Vec<RawElement>),
    /// Plain sequence; may be a composite expand path
    List(Vec<RawElement>),
    /// Map row, entries in engine order
    Map(Vec<(MapKey, RawElement)>),
    /// Number, string, boolean or null
    Scalar(JsonValue),
}

impl RawElement {
    pub fn scalar(value: impl Into<JsonValue>) -> Self {
        RawElement::Scalar(value.into())
    }

    pub fn list(items: Vec<RawElement>) -> Self {
        RawElement::List(items)
    }

    pub fn map(entries: Vec<(MapKey, RawElement)>) -> Self {
        RawElement::Map(entries)
    }

    pub fn is_vertex(&self) -> bool {
        matches!(self, RawElement::Vertex(_))
    }

    pub fn is_edge(&self) -> bool {
        matches!(self, RawElement::Edge(_))
    }

    /// Check if the element is a vertex or an edge
    pub fn is_graph_element(&self) -> bool {
        self.is_vertex() || self.is_edge()
    }

    pub fn is_map(&self) -> bool {
        matches!(self, RawElement::Map(_))
    }

    /// Plain JSON rendering, used when a value has to be stringified into a table cell
    pub fn to_plain_json(&self) -> JsonValue {
        match self {
            RawElement::Vertex(v) => vertex_plain_json(v),
            RawElement::Edge(e) => {
                let mut obj = Map::new();
                obj.insert("id".to_string(), e.id.clone());
                obj.insert("label".to_string(), JsonValue::String(e.label.clone()));
                obj.insert("inV".to_string(), e.in_v.id.clone());
                obj.insert("outV".to_string(), e.out_v.id.clone());
                JsonValue::Object(obj)
            }
            RawElement::Path(items) | RawElement::List(items) => {
                JsonValue::Array(items.iter().map(RawElement::to_plain_json).collect())
            }
            RawElement::Map(entries) => {
                let mut obj = Map::new();
                for (key, value) in entries {
                    obj.insert(key.column_name(), value.to_plain_json());
                }
                JsonValue::Object(obj)
            }
            RawElement::Scalar(value) => value.clone(),
        }
    }
}

fn vertex_plain_json(v: &RawVertex) -> JsonValue {
    let mut obj = Map::new();
    obj.insert("id".to_string(), v.id.clone());
    obj.insert("label".to_string(), JsonValue::String(v.label.clone()));
    JsonValue::Object(obj)
}

impl From<RawVertex> for RawElement {
    fn from(v: RawVertex) -> Self {
        RawElement::Vertex(v)
    }
}

impl From<RawEdge> for RawElement {
    fn from(e: RawEdge) -> Self {
        RawElement::Edge(e)
    }
}

/// Render an engine identity as the string key used for nodes and edges.
/// Strings are taken as-is; numbers use their decimal form.
pub fn identity_string(id: &JsonValue) -> String {
    match id {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}
