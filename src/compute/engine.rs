use std::time::Duration;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use crate::common::error::{Result, WorkbenchError};
use super::params::AlgorithmParams;

pub const ALGORITHM_PATH: &str = "/api/graphservice/algorithm";
pub const ADD_COLUMN_PATH: &str = "/api/graphservice/addColumn";
pub const GRAPH_LIST_PATH: &str = "/api/v1/graph";

/// Raw engine reply: HTTP status and the JSON body, when there is one
#[derive(Debug, Clone, PartialEq)]
pub struct EngineReply {
    pub status: u16,
    pub payload: Option<JsonValue>,
}

impl EngineReply {
    pub fn new(status: u16, payload: Option<JsonValue>) -> Self {
        EngineReply { status, payload }
    }

    /// `success` flag of the payload; absent or non-boolean counts as false
    pub fn succeeded(&self) -> bool {
        self.payload
            .as_ref()
            .and_then(|p| p.get("success"))
            .and_then(JsonValue::as_bool)
            .unwrap_or(false)
    }
}

/// Write-back of an algorithm result as a new data column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddColumnRequest {
    pub graph_name: String,
    pub context_name: String,
    pub column_name: String,
    pub need_gremlin: bool,
}

impl AddColumnRequest {
    fn to_query_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("graph_name".to_string(), self.graph_name.clone()),
            ("context_name".to_string(), self.context_name.clone()),
            ("column_name".to_string(), self.column_name.clone()),
            ("need_gremlin".to_string(), self.need_gremlin.to_string()),
        ]
    }
}

/// Remote graph compute engine
#[async_trait]
pub trait ComputeEngine: Send + Sync {
    async fn run_algorithm(&self, params: &AlgorithmParams) -> Result<EngineReply>;

    async fn add_column(&self, request: &AddColumnRequest) -> Result<EngineReply>;

    async fn list_graphs(&self) -> Result<EngineReply>;
}

/// Build the HTTP client used for compute engine calls.
/// Connect and total timeouts are enforced separately.
pub fn engine_client(connect_timeout: Duration, request_timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()?)
}

/// Compute engine reached over its HTTP service API
#[derive(Debug, Clone)]
pub struct HttpComputeEngine {
    client: reqwest::Client,
    base_url: String,
}

impl HttpComputeEngine {
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(engine_client(connect_timeout, request_timeout)?, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        HttpComputeEngine {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<EngineReply> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| WorkbenchError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| WorkbenchError::transport(e.to_string()))?;

        let payload = match serde_json::from_str::<JsonValue>(&body) {
            Ok(JsonValue::Null) => None,
            Ok(value) => Some(value),
            Err(_) => {
                if !body.trim().is_empty() {
                    tracing::warn!("Non-JSON reply from {} (status {})", url, status);
                }
                None
            }
        };
        Ok(EngineReply::new(status, payload))
    }
}

#[async_trait]
impl ComputeEngine for HttpComputeEngine {
    async fn run_algorithm(&self, params: &AlgorithmParams) -> Result<EngineReply> {
        self.get(ALGORITHM_PATH, &params.to_query_pairs()?).await
    }

    async fn add_column(&self, request: &AddColumnRequest) -> Result<EngineReply> {
        self.get(ADD_COLUMN_PATH, &request.to_query_pairs()).await
    }

    async fn list_graphs(&self) -> Result<EngineReply> {
        self.get(GRAPH_LIST_PATH, &[]).await
    }
}
