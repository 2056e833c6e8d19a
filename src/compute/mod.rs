pub mod params;
pub mod engine;
pub mod orchestrator;

pub use params::{AlgorithmKind, AlgorithmParams, AlgorithmRequest};
pub use engine::{AddColumnRequest, ComputeEngine, EngineReply, HttpComputeEngine};
pub use orchestrator::{
    execute_algorithm,
    AlgorithmFailure,
    AlgorithmOrchestrator,
    AlgorithmOutcome,
    AlgorithmPair,
    AlgorithmRun,
};
