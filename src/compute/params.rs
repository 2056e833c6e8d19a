use std::fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;
use crate::common::error::Result;

pub const DEFAULT_MAX_ROUND: u32 = 10;
pub const DEFAULT_LIMIT: u32 = 100;
pub const DEFAULT_DELTA: f64 = 0.85;
pub const DEFAULT_WEIGHT: i64 = 1;

/// Algorithms the compute engine can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmKind {
    #[serde(rename = "pagerank")]
    PageRank,
    #[serde(rename = "sssp")]
    Sssp,
    #[serde(rename = "k_core")]
    KCore,
    #[serde(rename = "wcc")]
    Wcc,
    #[serde(rename = "clustering")]
    Clustering,
    #[serde(rename = "eigenvector_centrality")]
    EigenvectorCentrality,
    #[serde(rename = "lpa")]
    Lpa,
}

impl AlgorithmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmKind::PageRank => "pagerank",
            AlgorithmKind::Sssp => "sssp",
            AlgorithmKind::KCore => "k_core",
            AlgorithmKind::Wcc => "wcc",
            AlgorithmKind::Clustering => "clustering",
            AlgorithmKind::EigenvectorCentrality => "eigenvector_centrality",
            AlgorithmKind::Lpa => "lpa",
        }
    }

    pub fn uses_delta(&self) -> bool {
        matches!(self, AlgorithmKind::PageRank)
    }

    pub fn uses_max_round(&self) -> bool {
        matches!(
            self,
            AlgorithmKind::PageRank | AlgorithmKind::Lpa | AlgorithmKind::EigenvectorCentrality
        )
    }

    pub fn uses_tolerance(&self) -> bool {
        matches!(self, AlgorithmKind::EigenvectorCentrality)
    }

    /// Weight and source vertex
    pub fn uses_source(&self) -> bool {
        matches!(self, AlgorithmKind::Sssp)
    }

    pub fn uses_k(&self) -> bool {
        matches!(self, AlgorithmKind::KCore)
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Algorithm run as requested by the caller, with every optional knob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmRequest {
    pub name: AlgorithmKind,
    #[validate(length(min = 1))]
    pub graph_name: String,
    #[validate(length(min = 1))]
    #[serde(alias = "colomnName")]
    pub column_name: String,
    pub max_round: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by_id: Option<bool>,
    #[serde(rename = "vertex_label")]
    pub vertex_label: Option<String>,
    #[serde(rename = "edge_label")]
    pub edge_label: Option<String>,
    pub delta: Option<f64>,
    pub weight: Option<JsonValue>,
    pub src: Option<JsonValue>,
    pub tolerance: Option<f64>,
    pub k: Option<JsonValue>,
}

impl AlgorithmRequest {
    pub fn new(name: AlgorithmKind, graph_name: impl Into<String>, column_name: impl Into<String>) -> Self {
        AlgorithmRequest {
            name,
            graph_name: graph_name.into(),
            column_name: column_name.into(),
            max_round: None,
            limit: None,
            sort_by_id: None,
            vertex_label: None,
            edge_label: None,
            delta: None,
            weight: None,
            src: None,
            tolerance: None,
            k: None,
        }
    }
}

/// Parameters forwarded to the compute engine, filtered by algorithm kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmParams {
    pub name: AlgorithmKind,
    pub limit: u32,
    #[serde(rename = "sortById", skip_serializing_if = "Option::is_none")]
    pub sort_by_id: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_label: Option<String>,
    pub graph_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_round: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<JsonValue>,
}

impl AlgorithmParams {
    /// Filter a request down to the fields its algorithm understands
    pub fn shape(request: &AlgorithmRequest) -> Self {
        let kind = request.name;
        AlgorithmParams {
            name: kind,
            limit: request.limit.unwrap_or(DEFAULT_LIMIT),
            sort_by_id: request.sort_by_id,
            vertex_label: request.vertex_label.clone(),
            edge_label: request.edge_label.clone(),
            graph_name: request.graph_name.clone(),
            delta: kind
                .uses_delta()
                .then(|| request.delta.unwrap_or(DEFAULT_DELTA)),
            max_round: kind
                .uses_max_round()
                .then(|| request.max_round.unwrap_or(DEFAULT_MAX_ROUND)),
            tolerance: if kind.uses_tolerance() { request.tolerance } else { None },
            weight: kind
                .uses_source()
                .then(|| request.weight.clone().unwrap_or(JsonValue::from(DEFAULT_WEIGHT))),
            src: if kind.uses_source() { request.src.clone() } else { None },
            k: if kind.uses_k() { request.k.clone() } else { None },
        }
    }

    /// Query-string pairs for the GET request
    pub fn to_query_pairs(&self) -> Result<Vec<(String, String)>> {
        let value = serde_json::to_value(self)?;
        let mut pairs = Vec::new();
        if let JsonValue::Object(fields) = value {
            for (key, field) in fields {
                match field {
                    JsonValue::Null => {}
                    JsonValue::String(s) => pairs.push((key, s)),
                    other => pairs.push((key, other.to_string())),
                }
            }
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(name: AlgorithmKind) -> AlgorithmRequest {
        AlgorithmRequest::new(name, "graph_1", "score")
    }

    #[test]
    fn test_pagerank_drops_unrelated_fields() {
        let mut req = request(AlgorithmKind::PageRank);
        req.delta = Some(0.9);
        req.max_round = Some(5);
        req.k = Some(json!("3"));

        let params = AlgorithmParams::shape(&req);
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({
                "name": "pagerank",
                "limit": 100,
                "graph_name": "graph_1",
                "delta": 0.9,
                "max_round": 5,
            })
        );
    }

    #[test]
    fn test_defaults_per_kind() {
        let pagerank = AlgorithmParams::shape(&request(AlgorithmKind::PageRank));
        assert_eq!(pagerank.delta, Some(DEFAULT_DELTA));
        assert_eq!(pagerank.max_round, Some(DEFAULT_MAX_ROUND));

        let lpa = AlgorithmParams::shape(&request(AlgorithmKind::Lpa));
        assert_eq!(lpa.delta, None);
        assert_eq!(lpa.max_round, Some(DEFAULT_MAX_ROUND));

        let sssp = AlgorithmParams::shape(&request(AlgorithmKind::Sssp));
        assert_eq!(sssp.weight, Some(json!(1)));
        assert_eq!(sssp.max_round, None);
    }

    #[test]
    fn test_kind_specific_fields() {
        let mut req = request(AlgorithmKind::EigenvectorCentrality);
        req.tolerance = Some(0.001);
        req.src = Some(json!(6));
        let params = AlgorithmParams::shape(&req);
        assert_eq!(params.tolerance, Some(0.001));
        assert_eq!(params.src, None);

        let mut req = request(AlgorithmKind::KCore);
        req.k = Some(json!(3));
        req.tolerance = Some(0.001);
        let params = AlgorithmParams::shape(&req);
        assert_eq!(params.k, Some(json!(3)));
        assert_eq!(params.tolerance, None);

        for kind in [AlgorithmKind::Wcc, AlgorithmKind::Clustering] {
            let params = serde_json::to_value(AlgorithmParams::shape(&request(kind))).unwrap();
            assert_eq!(params.as_object().unwrap().len(), 3);
        }
    }

    #[test]
    fn test_common_fields_forwarded() {
        let mut req = request(AlgorithmKind::Wcc);
        req.sort_by_id = Some(true);
        req.vertex_label = Some("person".to_string());
        req.limit = Some(10);
        let pairs = AlgorithmParams::shape(&req).to_query_pairs().unwrap();
        assert!(pairs.contains(&("sortById".to_string(), "true".to_string())));
        assert!(pairs.contains(&("vertex_label".to_string(), "person".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "10".to_string())));
        assert!(pairs.contains(&("name".to_string(), "wcc".to_string())));
    }

    #[test]
    fn test_request_accepts_legacy_column_key() {
        let req: AlgorithmRequest = serde_json::from_value(json!({
            "name": "sssp",
            "graphName": "graph_1",
            "colomnName": "dist",
            "src": 6,
        }))
        .unwrap();
        assert_eq!(req.column_name, "dist");
        assert_eq!(req.src, Some(json!(6)));
        assert!(req.validate().is_ok());
    }
}
