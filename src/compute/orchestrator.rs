//! Algorithm execution workflow.
//!
//! One run goes `Submitted -> RemoteExecuted -> {Failed | ResultParsed ->
//! ColumnWritten -> Completed}`. The algorithm call and the column write-back
//! are two independent requests. When the write-back fails after a successful
//! run, the engine keeps the run's side effects and the caller gets
//! [`AlgorithmOutcome::ExecutedButNotPersisted`]. Nothing is retried.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use crate::common::envelope::Envelope;
use crate::common::error::{Result, WorkbenchError};
use super::engine::{AddColumnRequest, ComputeEngine, EngineReply};
use super::params::{AlgorithmParams, AlgorithmRequest};

/// One `(id, value)` result of an algorithm run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmPair {
    pub id: JsonValue,
    pub value: JsonValue,
}

/// A run whose result was written back
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmRun {
    pub code: JsonValue,
    pub message: JsonValue,
    pub graph_name: JsonValue,
    pub graph_url: JsonValue,
    pub results: Vec<AlgorithmPair>,
}

/// Why a run failed before its result could be written back
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmFailure {
    /// The request never got a response
    Transport(String),
    /// The engine answered without a JSON body
    MissingPayload { status: u16 },
    /// The engine reported a failure; its payload is kept verbatim
    Engine(JsonValue),
    /// The engine reported success but its result could not be read
    MalformedResult(String),
}

/// Terminal state of one algorithm run
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmOutcome {
    Completed(AlgorithmRun),
    ExecutedButNotPersisted {
        context_name: String,
        results: Vec<AlgorithmPair>,
        reason: String,
    },
    Failed(AlgorithmFailure),
}

impl AlgorithmOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, AlgorithmOutcome::Completed(_))
    }

    /// Response body for the caller. A run that could not be persisted becomes `{}`.
    pub fn into_response(self) -> JsonValue {
        match self {
            AlgorithmOutcome::Completed(run) => json!({
                "code": run.code,
                "success": true,
                "message": run.message,
                "graphName": run.graph_name,
                "gremlinClientURL": run.graph_url,
                "data": run.results,
            }),
            AlgorithmOutcome::ExecutedButNotPersisted { .. } => json!({}),
            AlgorithmOutcome::Failed(AlgorithmFailure::Engine(payload)) => payload,
            AlgorithmOutcome::Failed(AlgorithmFailure::Transport(message)) => {
                Envelope::failure(format!("Algorithm request failed: {}", message), json!({})).into_json()
            }
            AlgorithmOutcome::Failed(AlgorithmFailure::MissingPayload { status }) => Envelope::failure(
                format!("Compute engine returned no payload (HTTP {})", status),
                json!({}),
            )
            .with_code(u32::from(status))
            .into_json(),
            AlgorithmOutcome::Failed(AlgorithmFailure::MalformedResult(message)) => {
                Envelope::failure(format!("Unreadable algorithm result: {}", message), json!({})).into_json()
            }
        }
    }
}

/// Parse the engine's embedded result into `(id, value)` pairs.
/// `id[i]` pairs with `result[i]`; a missing value becomes null.
pub fn parse_algorithm_result(raw: &JsonValue) -> Result<Vec<AlgorithmPair>> {
    let parsed = match raw {
        JsonValue::String(text) => serde_json::from_str::<JsonValue>(text)?,
        other => other.clone(),
    };

    let ids = parsed
        .get("id")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| WorkbenchError::EngineAlgorithm("result has no id list".to_string()))?;
    let values = parsed
        .get("result")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| WorkbenchError::EngineAlgorithm("result has no value list".to_string()))?;

    Ok(ids
        .iter()
        .enumerate()
        .map(|(i, id)| AlgorithmPair {
            id: id.clone(),
            value: values.get(i).cloned().unwrap_or(JsonValue::Null),
        })
        .collect())
}

fn field(payload: &JsonValue, key: &str) -> JsonValue {
    payload.get(key).cloned().unwrap_or(JsonValue::Null)
}

/// Drives algorithm runs against one compute engine
pub struct AlgorithmOrchestrator<'a> {
    engine: &'a dyn ComputeEngine,
}

impl<'a> AlgorithmOrchestrator<'a> {
    pub fn new(engine: &'a dyn ComputeEngine) -> Self {
        AlgorithmOrchestrator { engine }
    }

    pub async fn execute(&self, request: &AlgorithmRequest) -> AlgorithmOutcome {
        let params = AlgorithmParams::shape(request);
        tracing::info!(algorithm = %params.name, graph = %params.graph_name, "Executing graph algorithm: {:?}", params);

        let reply = match self.engine.run_algorithm(&params).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Algorithm request failed: {}", e);
                return AlgorithmOutcome::Failed(AlgorithmFailure::Transport(e.to_string()));
            }
        };

        let payload = match reply.payload {
            Some(ref payload) => payload.clone(),
            None => {
                tracing::warn!("Algorithm request returned no payload (status {})", reply.status);
                return AlgorithmOutcome::Failed(AlgorithmFailure::MissingPayload { status: reply.status });
            }
        };

        if !reply.succeeded() {
            tracing::warn!(algorithm = %params.name, "Compute engine reported algorithm failure");
            return AlgorithmOutcome::Failed(AlgorithmFailure::Engine(payload));
        }

        let results = match parse_algorithm_result(&field(&payload, "result")) {
            Ok(results) => results,
            Err(e) => return AlgorithmOutcome::Failed(AlgorithmFailure::MalformedResult(e.to_string())),
        };
        let context_name = match field(&payload, "context_name") {
            JsonValue::String(name) => name,
            JsonValue::Null => String::new(),
            other => other.to_string(),
        };
        tracing::debug!("Algorithm produced {} results in context {}", results.len(), context_name);

        let write_back = AddColumnRequest {
            graph_name: request.graph_name.clone(),
            context_name: context_name.clone(),
            column_name: request.column_name.clone(),
            need_gremlin: true,
        };
        let column = match self.engine.add_column(&write_back).await {
            Ok(EngineReply { payload: Some(column), .. })
                if column.get("success").and_then(JsonValue::as_bool) != Some(false) =>
            {
                column
            }
            Ok(reply) => {
                return not_persisted(context_name, results, format!("write-back rejected (status {})", reply.status));
            }
            Err(e) => return not_persisted(context_name, results, e.to_string()),
        };

        tracing::info!(algorithm = %params.name, "Algorithm result written to column {}", request.column_name);
        AlgorithmOutcome::Completed(AlgorithmRun {
            code: field(&payload, "code"),
            message: field(&payload, "message"),
            graph_name: field(&column, "graph_name"),
            graph_url: field(&column, "graph_url"),
            results,
        })
    }
}

fn not_persisted(context_name: String, results: Vec<AlgorithmPair>, reason: String) -> AlgorithmOutcome {
    tracing::warn!("Algorithm ran in context {} but its result was not persisted: {}", context_name, reason);
    AlgorithmOutcome::ExecutedButNotPersisted {
        context_name,
        results,
        reason,
    }
}

/// Run one algorithm request against `engine`
pub async fn execute_algorithm(engine: &dyn ComputeEngine, request: &AlgorithmRequest) -> AlgorithmOutcome {
    AlgorithmOrchestrator::new(engine).execute(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use crate::compute::params::AlgorithmKind;

    /// Engine with scripted replies that records every call
    struct ScriptedEngine {
        algorithm: Mutex<Option<Result<EngineReply>>>,
        column: Mutex<Option<Result<EngineReply>>>,
        calls: Mutex<Vec<String>>,
        last_params: Mutex<Option<AlgorithmParams>>,
    }

    impl ScriptedEngine {
        fn new(algorithm: Result<EngineReply>, column: Result<EngineReply>) -> Self {
            ScriptedEngine {
                algorithm: Mutex::new(Some(algorithm)),
                column: Mutex::new(Some(column)),
                calls: Mutex::new(Vec::new()),
                last_params: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ComputeEngine for ScriptedEngine {
        async fn run_algorithm(&self, params: &AlgorithmParams) -> Result<EngineReply> {
            self.calls.lock().push("algorithm".to_string());
            *self.last_params.lock() = Some(params.clone());
            self.algorithm.lock().take().unwrap_or_else(|| Ok(EngineReply::new(500, None)))
        }

        async fn add_column(&self, _request: &AddColumnRequest) -> Result<EngineReply> {
            self.calls.lock().push("addColumn".to_string());
            self.column.lock().take().unwrap_or_else(|| Ok(EngineReply::new(500, None)))
        }

        async fn list_graphs(&self) -> Result<EngineReply> {
            unreachable!("not used by the orchestrator")
        }
    }

    fn success_reply() -> Result<EngineReply> {
        Ok(EngineReply::new(
            200,
            Some(json!({
                "success": true,
                "code": 200,
                "message": "ok",
                "result": "{\"id\": [1, 2, 3], \"result\": [0.5, 0.3, 0.2]}",
                "context_name": "ctx_pagerank",
            })),
        ))
    }

    fn column_reply() -> Result<EngineReply> {
        Ok(EngineReply::new(
            200,
            Some(json!({"success": true, "graph_name": "graph_2", "graph_url": "ws://engine:8182/gremlin"})),
        ))
    }

    fn pagerank() -> AlgorithmRequest {
        let mut req = AlgorithmRequest::new(AlgorithmKind::PageRank, "graph_1", "pr");
        req.k = Some(json!("3"));
        req
    }

    #[test]
    fn test_parse_result_pairs_positionally() {
        let pairs = parse_algorithm_result(&json!("{\"id\": [\"a\", \"b\"], \"result\": [1, 2]}")).unwrap();
        assert_eq!(
            pairs,
            vec![
                AlgorithmPair { id: json!("a"), value: json!(1) },
                AlgorithmPair { id: json!("b"), value: json!(2) },
            ]
        );
        assert!(parse_algorithm_result(&json!("not json")).is_err());
        assert!(parse_algorithm_result(&json!({"id": [1]})).is_err());
    }

    #[tokio::test]
    async fn test_completed_run() {
        let engine = ScriptedEngine::new(success_reply(), column_reply());
        let outcome = execute_algorithm(&engine, &pagerank()).await;
        assert!(outcome.is_completed());
        assert_eq!(engine.calls.lock().as_slice(), ["algorithm", "addColumn"]);
        assert_eq!(engine.last_params.lock().as_ref().unwrap().k, None);

        let response = outcome.into_response();
        assert_eq!(response["success"], json!(true));
        assert_eq!(response["graphName"], json!("graph_2"));
        assert_eq!(response["gremlinClientURL"], json!("ws://engine:8182/gremlin"));
        assert_eq!(response["data"][2], json!({"id": 3, "value": 0.2}));
    }

    #[tokio::test]
    async fn test_write_back_failure_collapses_to_empty_object() {
        let engine = ScriptedEngine::new(success_reply(), Err(WorkbenchError::transport("timed out")));
        let outcome = execute_algorithm(&engine, &pagerank()).await;
        let AlgorithmOutcome::ExecutedButNotPersisted { ref context_name, ref results, .. } = outcome else {
            panic!("expected partial failure, got {:?}", outcome);
        };
        assert_eq!(context_name, "ctx_pagerank");
        assert_eq!(results.len(), 3);
        assert_eq!(outcome.into_response(), json!({}));
    }

    #[tokio::test]
    async fn test_write_back_without_payload_or_rejected() {
        for column in [
            Ok(EngineReply::new(200, None)),
            Ok(EngineReply::new(200, Some(json!({"success": false})))),
        ] {
            let engine = ScriptedEngine::new(success_reply(), column);
            let outcome = execute_algorithm(&engine, &pagerank()).await;
            assert!(matches!(outcome, AlgorithmOutcome::ExecutedButNotPersisted { .. }));
        }
    }

    #[tokio::test]
    async fn test_engine_failure_returned_verbatim() {
        let failure = json!({"success": false, "code": 500, "message": "graph not loaded"});
        let engine = ScriptedEngine::new(Ok(EngineReply::new(200, Some(failure.clone()))), column_reply());
        let outcome = execute_algorithm(&engine, &pagerank()).await;
        assert_eq!(engine.calls.lock().as_slice(), ["algorithm"]);
        assert_eq!(outcome.into_response(), failure);
    }

    #[tokio::test]
    async fn test_transport_and_missing_payload_fail_fast() {
        let engine = ScriptedEngine::new(Err(WorkbenchError::transport("connection refused")), column_reply());
        let outcome = execute_algorithm(&engine, &pagerank()).await;
        assert_eq!(engine.calls.lock().len(), 1);
        let response = outcome.into_response();
        assert_eq!(response["success"], json!(false));
        assert!(response["message"].as_str().unwrap().contains("connection refused"));

        let engine = ScriptedEngine::new(Ok(EngineReply::new(504, None)), column_reply());
        let outcome = execute_algorithm(&engine, &pagerank()).await;
        assert_eq!(outcome, AlgorithmOutcome::Failed(AlgorithmFailure::MissingPayload { status: 504 }));
        assert_eq!(outcome.into_response()["code"], json!(504));
    }

    #[tokio::test]
    async fn test_malformed_result() {
        let reply = Ok(EngineReply::new(200, Some(json!({"success": true, "result": "{oops"}))));
        let engine = ScriptedEngine::new(reply, column_reply());
        let outcome = execute_algorithm(&engine, &pagerank()).await;
        assert!(matches!(outcome, AlgorithmOutcome::Failed(AlgorithmFailure::MalformedResult(_))));
        assert_eq!(engine.calls.lock().as_slice(), ["algorithm"]);
    }
}
