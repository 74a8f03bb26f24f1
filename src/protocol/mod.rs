//! Protocol dispatch: turns a caller's input `Value` into an `HttpRequest` and an
//! `HttpResponse` back into an output `Value`, per `service.metadata.protocol`.

pub mod json;
pub mod query;
pub mod rest;

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::descriptor::{Operation, ServiceDescriptor};
use crate::error::{Anomaly, AnomalyKind};
use crate::http_types::{HttpRequest, HttpResponse};
use crate::value::Value;

/// One wire-format family. Implementations are stateless; all per-call state is passed
/// in through the arguments.
pub trait ProtocolDispatch: Send + Sync {
    fn build_http_request(
        &self,
        descriptor: &ServiceDescriptor,
        operation: &Operation,
        endpoint: &http::Uri,
        input: &Value,
    ) -> Result<HttpRequest, Anomaly>;

    fn parse_http_response(
        &self,
        descriptor: &ServiceDescriptor,
        operation: &Operation,
        response: &HttpResponse,
    ) -> Result<Value, Anomaly>;
}

static REGISTRY: Lazy<HashMap<&'static str, &'static dyn ProtocolDispatch>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, &'static dyn ProtocolDispatch> = HashMap::new();
    map.insert("json", &json::JsonDispatch);
    map.insert("rest-json", &rest::RestJsonDispatch);
    map.insert("rest-xml", &rest::RestXmlDispatch);
    map.insert("query", &query::QueryDispatch);
    map.insert("ec2", &query::Ec2Dispatch);
    map
});

/// Looks up the dispatcher for `protocol`. Per §4.2.1, an unregistered protocol name is a
/// `fault` anomaly, not a panic: this registry is closed over builtins, never caller
/// extensible, so any miss indicates a descriptor naming a protocol this engine doesn't
/// implement.
pub fn dispatcher_for(protocol: &str) -> Result<&'static dyn ProtocolDispatch, Anomaly> {
    REGISTRY
        .get(protocol)
        .copied()
        .ok_or_else(|| Anomaly::with_message(AnomalyKind::Fault, format!("unsupported protocol: {}", protocol)))
}

/// Base headers common to the whole family: `content-type`, and for JSON-RPC families,
/// `x-amz-target`.
pub fn base_headers(descriptor: &ServiceDescriptor, operation: &Operation) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    match descriptor.metadata.protocol.as_str() {
        "json" => {
            let version = descriptor.metadata.json_version.as_deref().unwrap_or("1.1");
            headers.push(("content-type".to_string(), format!("application/x-amz-json-{}", version)));
            if let Some(target_prefix) = &descriptor.metadata.target_prefix {
                headers.push(("x-amz-target".to_string(), format!("{}.{}", target_prefix, operation.name)));
            }
        }
        "rest-json" => headers.push(("content-type".to_string(), "application/json".to_string())),
        "rest-xml" => headers.push(("content-type".to_string(), "application/xml".to_string())),
        "query" | "ec2" => {
            headers.push(("content-type".to_string(), "application/x-www-form-urlencoded; charset=utf-8".to_string()))
        }
        _ => {}
    }
    if let Some(api_version) = &descriptor.metadata.api_version {
        headers.push(("x-amz-api-version".to_string(), api_version.clone()));
    }
    headers
}
