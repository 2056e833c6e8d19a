// Graph Workbench Library
// Traversal query assembly and graph algorithm orchestration for a remote graph compute engine

// Common modules
pub mod common {
    pub mod error;
    pub mod value;
    pub mod config;
    pub mod envelope;
}

// Traversal engine client and wire format
pub mod traversal;

// Result assembly
pub mod graph;

// Algorithm execution on the compute engine
pub mod compute;

// Caller-facing operations and HTTP API
pub mod service;

#[cfg(test)]
mod test_support;

// Re-export commonly used types for convenience
pub use common::error::{ErrorCode, Result, WorkbenchError};
pub use common::value::{MapKey, RawEdge, RawElement, RawVertex};
pub use common::config::{EngineSettings, ServiceConfig, SettingsStore};
pub use common::envelope::Envelope;

pub use graph::{AssembledGraph, EdgeRecord, GraphData, GraphMode, NodeRecord};
pub use compute::{AlgorithmKind, AlgorithmOutcome, AlgorithmRequest};
pub use service::{GraphComputeService, Server};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "graph-workbench");
    }
}
