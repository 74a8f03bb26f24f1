//! AWS JSON-RPC (1.0/1.1): `POST /`, whole input as a JSON body, operation named via the
//! `x-amz-target` header rather than the URI.

use http::Method;

use crate::descriptor::{Operation, ServiceDescriptor};
use crate::error::Anomaly;
use crate::http_types::{HttpRequest, HttpResponse};
use crate::shape_codec;
use crate::value::Value;

use super::{base_headers, ProtocolDispatch};

pub struct JsonDispatch;

impl ProtocolDispatch for JsonDispatch {
    fn build_http_request(
        &self,
        _descriptor: &ServiceDescriptor,
        operation: &Operation,
        endpoint: &http::Uri,
        input: &Value,
    ) -> Result<HttpRequest, Anomaly> {
        let json = shape_codec::value_to_json(input);
        let body = serde_json::to_vec(&json).map_err(Anomaly::fault)?;

        let mut request = HttpRequest::new(Method::POST, endpoint.clone()).with_body(body.into());
        for (name, value) in base_headers(_descriptor, operation) {
            request.headers.insert(
                http::HeaderName::from_bytes(name.as_bytes()).map_err(Anomaly::fault)?,
                value.parse().map_err(Anomaly::fault)?,
            );
        }
        Ok(request)
    }

    fn parse_http_response(
        &self,
        descriptor: &ServiceDescriptor,
        operation: &Operation,
        response: &HttpResponse,
    ) -> Result<Value, Anomaly> {
        if response.body.is_empty() {
            return Ok(Value::structure());
        }
        let json: serde_json::Value = serde_json::from_slice(shape_codec::strip_bom(&response.body)).map_err(Anomaly::fault)?;
        let shape_name = operation.output.as_ref().map(|r| r.shape.as_str());
        Ok(match shape_name {
            Some(name) => shape_codec::json_to_value_shaped(descriptor, name, &json),
            None => shape_codec::json_to_value(&json),
        })
    }
}
