pub mod model;
pub mod materializer;
pub mod assembler;
pub mod enricher;

// Re-export main types from the graph model
pub use model::{
    AssembledGraph,
    EdgeRecord,
    GraphBuilder,
    GraphData,
    GraphMode,
    NodeRecord,
    Properties,
};

pub use materializer::{is_expand_path, materialize, Materialized};
pub use assembler::{assemble, classify, Assembly, RowKind};
pub use enricher::{enrich, PropertyMap};
