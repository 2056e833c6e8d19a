use std::net::SocketAddr;
use std::sync::Arc;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::common::config::{EngineSettings, ServiceConfig};
use crate::common::envelope::Envelope;
use crate::common::error::Result;
use crate::compute::params::AlgorithmRequest;
use crate::graph::enricher::PropertyMap;
use crate::graph::model::{AssembledGraph, GraphData};
use super::graph_service::{GraphComputeService, GremlinQueryRequest, NeighborsRequest, PropertiesRequest};

/// Prefix shared by every route
pub const API_PREFIX: &str = "/api/graphcompute";

type SharedService = Arc<GraphComputeService>;

/// HTTP front end of the graph compute service
pub struct Server {
    service: SharedService,
    listen: SocketAddr,
}

impl Server {
    pub fn new(service: GraphComputeService, listen: SocketAddr) -> Self {
        Server {
            service: Arc::new(service),
            listen,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        Ok(Self::new(GraphComputeService::from_config(config)?, config.listen_addr()?))
    }

    /// Set the listen address
    pub fn with_listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    pub fn listen(&self) -> SocketAddr {
        self.listen
    }

    pub fn router(&self) -> Router {
        router(Arc::clone(&self.service))
    }

    /// Serve until ctrl-c
    pub async fn start(self) -> Result<()> {
        let listener = TcpListener::bind(self.listen).await?;
        tracing::info!("Starting server on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Routes of the caller-facing API. Every response is HTTP 200 with an envelope.
pub fn router(service: SharedService) -> Router {
    let api = Router::new()
        .route("/connect", post(connect_handler))
        .route("/gremlinQuery", post(gremlin_query_handler))
        .route("/neighbors", post(neighbors_handler))
        .route("/properties", post(properties_handler))
        .route("/execAlgorithm", post(exec_algorithm_handler))
        .route("/listSubgraph", get(list_subgraph_handler))
        .route("/health", get(health_handler));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(service)
}

fn rejected(rejection: &JsonRejection) -> String {
    tracing::warn!("Rejected request body: {}", rejection.body_text());
    format!("Invalid request body: {}", rejection.body_text())
}

async fn connect_handler(
    State(service): State<SharedService>,
    payload: std::result::Result<Json<EngineSettings>, JsonRejection>,
) -> Json<Envelope<JsonValue>> {
    match payload {
        Ok(Json(settings)) => Json(service.connect_engine(settings).await),
        Err(rejection) => Json(Envelope::failure(rejected(&rejection), json!({}))),
    }
}

async fn gremlin_query_handler(
    State(service): State<SharedService>,
    payload: std::result::Result<Json<GremlinQueryRequest>, JsonRejection>,
) -> Json<Envelope<AssembledGraph>> {
    match payload {
        Ok(Json(request)) => Json(service.query_by_gremlin(request).await),
        Err(rejection) => Json(Envelope::failure(rejected(&rejection), AssembledGraph::empty())),
    }
}

async fn neighbors_handler(
    State(service): State<SharedService>,
    payload: std::result::Result<Json<NeighborsRequest>, JsonRejection>,
) -> Json<Envelope<GraphData>> {
    match payload {
        Ok(Json(request)) => Json(service.query_neighbors(request).await),
        Err(rejection) => Json(Envelope::failure(rejected(&rejection), GraphData::default())),
    }
}

async fn properties_handler(
    State(service): State<SharedService>,
    payload: std::result::Result<Json<PropertiesRequest>, JsonRejection>,
) -> Json<Envelope<PropertyMap>> {
    match payload {
        Ok(Json(request)) => Json(service.query_element_properties(request).await),
        Err(rejection) => Json(Envelope::failure(rejected(&rejection), PropertyMap::new())),
    }
}

async fn exec_algorithm_handler(
    State(service): State<SharedService>,
    payload: std::result::Result<Json<AlgorithmRequest>, JsonRejection>,
) -> Json<JsonValue> {
    match payload {
        Ok(Json(request)) => Json(service.exec_algorithm(request).await),
        Err(rejection) => Json(Envelope::failure(rejected(&rejection), json!({})).into_json()),
    }
}

async fn list_subgraph_handler(State(service): State<SharedService>) -> Json<Envelope<JsonValue>> {
    Json(service.list_subgraphs().await)
}

async fn health_handler(State(service): State<SharedService>) -> Json<Envelope<JsonValue>> {
    let engine = service.settings().current().map(|s| s.engine_server_url);
    Json(Envelope::ok(
        "ok",
        json!({
            "name": crate::NAME,
            "version": crate::VERSION,
            "engineServerURL": engine,
        }),
    ))
}
