pub mod graph_service;
pub mod server;

pub use graph_service::{
    neighbors_query, run_gremlin_query, ElementType, GraphComputeService, GremlinQueryRequest, NeighborsRequest,
    PropertiesRequest,
};
pub use server::{router, Server, API_PREFIX};
