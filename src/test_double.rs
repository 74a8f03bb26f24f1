//! A test-double client: configured with a fixed `{operation-name: result}` map instead
//! of a descriptor/transport/signer pipeline, for exercising caller code without talking
//! to AWS. The out-of-scope collaborator named in §1/§6.

use std::collections::HashMap;

use crate::error::Anomaly;
use crate::value::Value;

/// Mirrors `Client`'s `invoke`/`invoke_async` surface closely enough that callers can
/// swap one for the other in tests, without carrying any of the descriptor/protocol/
/// signing machinery a real `Client` needs.
pub struct TestDoubleClient {
    ops: HashMap<String, Value>,
}

impl TestDoubleClient {
    pub fn new(ops: HashMap<String, Value>) -> Self {
        Self { ops }
    }

    /// `invoke {op, request}` → the canned result for `op`, or `{category: unsupported}`
    /// if it isn't one of the configured operations — matching the real client's
    /// "operation not in service" behavior for consistency between test and production
    /// code paths.
    pub fn invoke(&self, op: &str, _request: Value) -> Result<Value, Anomaly> {
        self.ops
            .get(op)
            .cloned()
            .ok_or_else(|| Anomaly::unsupported("Operation not supported"))
    }

    pub async fn invoke_async(&self, op: &str, request: Value) -> Result<Value, Anomaly> {
        self.invoke(op, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn returns_configured_result_for_known_op() {
        let mut ops = HashMap::new();
        let mut result = Value::structure();
        result.as_map_mut().unwrap().insert("Location", Value::from("abc"));
        ops.insert("CreateBucket".to_string(), result);

        let client = TestDoubleClient::new(ops);
        let mut request = Value::structure();
        request.as_map_mut().unwrap().insert("Bucket", Value::from("b"));

        let outcome = client.invoke("CreateBucket", request).unwrap();
        assert_eq!(outcome.get("Location").and_then(Value::as_str), Some("abc"));
    }

    #[test]
    fn reports_unsupported_for_unknown_op() {
        let client = TestDoubleClient::new(HashMap::new());
        let err = client.invoke("DoesNotExist", Value::structure()).unwrap_err();
        assert_eq!(err.category.as_str(), "unsupported");
    }

    #[tokio::test]
    async fn async_path_matches_sync_path() {
        let mut ops = HashMap::new();
        ops.insert("Ping".to_string(), Value::from("pong"));
        let client = TestDoubleClient::new(ops);
        let outcome = client.invoke_async("Ping", Value::structure()).await.unwrap();
        assert_eq!(outcome.as_str(), Some("pong"));
    }
}
