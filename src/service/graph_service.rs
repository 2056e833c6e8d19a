use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::Instrument;
use uuid::Uuid;
use validator::Validate;
use crate::common::config::{EngineSettings, ServiceConfig, SettingsStore};
use crate::common::envelope::Envelope;
use crate::common::error::{Result, WorkbenchError};
use crate::compute::engine::{engine_client, ComputeEngine, HttpComputeEngine};
use crate::compute::orchestrator::execute_algorithm;
use crate::compute::params::AlgorithmRequest;
use crate::graph::enricher::{self, PropertyMap};
use crate::graph::materializer::materialize;
use crate::graph::model::{AssembledGraph, GraphBuilder, GraphData};
use crate::graph::assembler::assemble;
use crate::traversal::client::{
    connect, json_id_list, release, Account, HttpTraversalConnector, TraversalConnection, TraversalConnector,
};

/// Loopback host the engine reports for its own gremlin endpoints
const LOOPBACK_HOST: &str = "127.0.0.1";

/// Traversal query submitted by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GremlinQueryRequest {
    pub value: String,
    pub gremlin_server: String,
    pub graph_scope_account: Option<Account>,
}

/// Multi-hop neighbor expansion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborsRequest {
    #[serde(default)]
    pub id: Vec<JsonValue>,
    #[serde(default = "default_hops")]
    pub sep: u32,
    pub gremlin_server: String,
    pub graph_scope_account: Option<Account>,
}

fn default_hops() -> u32 {
    1
}

/// Kind of element whose properties are requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    #[default]
    Vertex,
    Edge,
}

/// Property lookup for a list of element ids
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertiesRequest {
    #[serde(default)]
    pub id: Vec<JsonValue>,
    #[serde(rename = "type", default)]
    pub element_type: ElementType,
    pub gremlin_server: String,
    pub graph_scope_account: Option<Account>,
}

/// Neighbor expansion query: `sep` hops out from the given vertices, edges only
pub fn neighbors_query(ids: &[JsonValue], sep: u32, limit: u32) -> String {
    let hops = ".both()".repeat(sep.saturating_sub(1) as usize);
    format!("g.V({}){}.bothE().limit({})", json_id_list(ids), hops, limit)
}

/// Run a traversal and assemble its result, including the property follow-up.
/// The caller owns the connection and releases it.
pub async fn run_gremlin_query(connection: &dyn TraversalConnection, query: &str) -> Result<AssembledGraph> {
    let rows = connection.submit(query).await?;
    let mut assembly = assemble(&rows);
    enricher::enrich(connection, &mut assembly).await?;
    Ok(assembly.finish())
}

/// Service layer behind the HTTP API. Holds no per-query state.
pub struct GraphComputeService {
    connector: Arc<dyn TraversalConnector>,
    settings: Arc<SettingsStore>,
    http: reqwest::Client,
    neighbor_limit: u32,
}

impl GraphComputeService {
    pub fn new(
        connector: Arc<dyn TraversalConnector>,
        settings: Arc<SettingsStore>,
        http: reqwest::Client,
        neighbor_limit: u32,
    ) -> Self {
        GraphComputeService {
            connector,
            settings,
            http,
            neighbor_limit,
        }
    }

    /// Wire the production connector, engine client and settings file from config
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let connector = HttpTraversalConnector::new(config.connect_timeout(), config.request_timeout())?;
        let settings = SettingsStore::open(&config.settings_path)?;
        let http = engine_client(config.connect_timeout(), config.request_timeout())?;
        Ok(Self::new(Arc::new(connector), Arc::new(settings), http, config.neighbor_limit))
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    fn compute_engine(&self) -> Result<HttpComputeEngine> {
        let settings = self.settings.require()?;
        Ok(HttpComputeEngine::with_client(self.http.clone(), settings.engine_server_url))
    }

    /// Persist the compute engine endpoints
    pub async fn connect_engine(&self, settings: EngineSettings) -> Envelope<JsonValue> {
        match self.settings.save(settings).await {
            Ok(saved) => Envelope::ok("Engine connected", json!(saved)),
            Err(e) => Envelope::from_error("Engine connection failed: ", &e),
        }
    }

    /// Run a traversal and return its graph or table payload.
    /// The connection is released on every path once it was opened.
    pub async fn query_by_gremlin(&self, request: GremlinQueryRequest) -> Envelope<AssembledGraph> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("gremlin_query", %request_id, server = %request.gremlin_server);

        async move {
            tracing::info!("Execute query {} on server {}", request.value, request.gremlin_server);
            let connection = match connect(
                self.connector.as_ref(),
                &request.gremlin_server,
                request.graph_scope_account.as_ref(),
            )
            .await
            {
                Ok(connection) => connection,
                Err(e) => return query_failure(&e),
            };

            let outcome = run_gremlin_query(connection.as_ref(), &request.value).await;
            release(connection.as_ref()).await;

            match outcome {
                Ok(graph) => {
                    tracing::info!(
                        mode = ?graph.mode,
                        nodes = graph.nodes.len(),
                        edges = graph.edges.len(),
                        rows = graph.table_result.len(),
                        "Gremlin query succeeded"
                    );
                    Envelope::ok("Gremlin query succeeded", graph)
                }
                Err(e) => query_failure(&e),
            }
        }
        .instrument(span)
        .await
    }

    /// Expand the neighborhood of the given vertices
    pub async fn query_neighbors(&self, request: NeighborsRequest) -> Envelope<GraphData> {
        let query = neighbors_query(&request.id, request.sep, self.neighbor_limit);
        let connection = match connect(
            self.connector.as_ref(),
            &request.gremlin_server,
            request.graph_scope_account.as_ref(),
        )
        .await
        {
            Ok(connection) => connection,
            Err(e) => return Envelope::failure(format!("Neighbor query failed: {}", e), GraphData::default()),
        };

        let outcome = connection.submit(&query).await;
        release(connection.as_ref()).await;

        match outcome {
            Ok(rows) => {
                let mut builder = GraphBuilder::new();
                for row in rows.iter().filter(|row| row.is_edge()) {
                    if let Some(materialized) = materialize(row) {
                        materialized.merge_into(&mut builder);
                    }
                }
                Envelope::ok("Neighbor query succeeded", GraphData::from(builder))
            }
            Err(e) => Envelope::failure(format!("Neighbor query failed: {}", e), GraphData::default()),
        }
    }

    /// Look up properties of vertices or edges by id
    pub async fn query_element_properties(&self, request: PropertiesRequest) -> Envelope<PropertyMap> {
        let ids = &request.id;
        let connection = match connect(
            self.connector.as_ref(),
            &request.gremlin_server,
            request.graph_scope_account.as_ref(),
        )
        .await
        {
            Ok(connection) => connection,
            Err(e) => return Envelope::failure(format!("Property query failed: {}", e), PropertyMap::new()),
        };

        let outcome = match request.element_type {
            ElementType::Edge => enricher::query_edge_properties(connection.as_ref(), ids).await,
            ElementType::Vertex => enricher::query_vertex_properties(connection.as_ref(), ids).await,
        };
        release(connection.as_ref()).await;

        match outcome {
            Ok(properties) => Envelope::ok("Property query succeeded", properties),
            Err(e) => Envelope::failure(format!("Property query failed: {}", e), PropertyMap::new()),
        }
    }

    /// Run an algorithm on the compute engine and write its result back as a column
    pub async fn exec_algorithm(&self, request: AlgorithmRequest) -> JsonValue {
        if let Err(e) = request.validate() {
            return Envelope::from_error("Invalid algorithm request: ", &WorkbenchError::from(e)).into_json();
        }
        let engine = match self.compute_engine() {
            Ok(engine) => engine,
            Err(e) => return Envelope::from_error("Algorithm execution failed: ", &e).into_json(),
        };
        execute_algorithm(&engine, &request).await.into_response()
    }

    /// List the graphs loaded in the compute engine.
    /// `data` carries the rewritten graph list serialized as a JSON string.
    pub async fn list_subgraphs(&self) -> Envelope<JsonValue> {
        match self.fetch_subgraphs().await {
            Ok(graphs) => Envelope::ok("Subgraph listing succeeded", JsonValue::String(graphs.to_string())),
            Err(e) => Envelope::from_error("Subgraph listing failed: ", &e),
        }
    }

    async fn fetch_subgraphs(&self) -> Result<JsonValue> {
        let settings = self.settings.require()?;
        let host = settings.engine_host()?;
        let engine = self.compute_engine()?;

        let reply = engine.list_graphs().await?;
        let payload = reply
            .payload
            .ok_or_else(|| WorkbenchError::transport(format!("no payload (HTTP {})", reply.status)))?;

        let mut graphs = match payload.get("data") {
            Some(JsonValue::String(text)) => serde_json::from_str::<JsonValue>(text)?,
            Some(JsonValue::Array(list)) => JsonValue::Array(list.clone()),
            _ => return Err(WorkbenchError::transport("graph list missing from payload")),
        };
        rewrite_loopback_endpoints(&mut graphs, &host);
        Ok(graphs)
    }
}

/// Replace the loopback host in every `gremlin_interface.gremlin_endpoint`
pub fn rewrite_loopback_endpoints(graphs: &mut JsonValue, host: &str) {
    let Some(list) = graphs.as_array_mut() else {
        return;
    };
    for graph in list {
        if let Some(endpoint) = graph
            .get_mut("gremlin_interface")
            .and_then(|gi| gi.get_mut("gremlin_endpoint"))
        {
            if let Some(text) = endpoint.as_str() {
                *endpoint = JsonValue::String(text.replace(LOOPBACK_HOST, host));
            }
        }
    }
}

fn query_failure(err: &WorkbenchError) -> Envelope<AssembledGraph> {
    tracing::warn!("Gremlin query failed: {}", err);
    Envelope::failure(format!("Gremlin query failed: {}", err), AssembledGraph::empty())
}
