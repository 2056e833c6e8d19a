use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use crate::common::error::WorkbenchError;

/// Status code carried by every envelope; failures are reported through `success`
pub const ENVELOPE_CODE: u32 = 200;

/// Uniform caller-facing response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub code: u32,
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Envelope {
            success: true,
            code: ENVELOPE_CODE,
            message: message.into(),
            data,
        }
    }

    pub fn failure(message: impl Into<String>, data: T) -> Self {
        Envelope {
            success: false,
            code: ENVELOPE_CODE,
            message: message.into(),
            data,
        }
    }

    pub fn with_code(mut self, code: u32) -> Self {
        self.code = code;
        self
    }

}

impl Envelope<JsonValue> {
    /// Failure envelope with an empty object payload
    pub fn from_error(prefix: &str, err: &WorkbenchError) -> Self {
        Envelope::failure(format!("{}{}", prefix, err), JsonValue::Object(Default::default()))
    }

    pub fn into_json(self) -> JsonValue {
        serde_json::json!({
            "success": self.success,
            "code": self.code,
            "message": self.message,
            "data": self.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_envelope_shape() {
        let err = WorkbenchError::transport("connection refused");
        let envelope = Envelope::from_error("Subgraph listing failed: ", &err);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "success": false,
                "code": 200,
                "message": "Subgraph listing failed: Transport error: connection refused",
                "data": {},
            })
        );
    }

    #[test]
    fn test_with_code_keeps_status() {
        let envelope = Envelope::ok("done", 2).with_code(201);
        assert!(envelope.success);
        assert_eq!(envelope.code, 201);
        assert_eq!(envelope.data, 2);
    }
}
