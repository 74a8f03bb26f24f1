//! Classic POST form (`query`) and `ec2`: the whole input flattened into form fields,
//! with `Action`/`Version` added; responses are XML, parsed against the output shape.

use http::Method;

use crate::descriptor::{Operation, ServiceDescriptor};
use crate::error::Anomaly;
use crate::http_types::{HttpRequest, HttpResponse};
use crate::shape_codec;
use crate::value::Value;

use super::{base_headers, ProtocolDispatch};

fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::List(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(&format!("{}.{}", prefix, i + 1), item, out);
            }
        }
        Value::Map(m) => {
            for (k, v) in m.iter() {
                let key = if prefix.is_empty() { k.to_string() } else { format!("{}.{}", prefix, k) };
                flatten(&key, v, out);
            }
        }
        Value::Null => {}
        other => {
            let rendered = match other {
                Value::Str(s) => s.clone(),
                Value::Int(n) => n.to_string(),
                Value::Float(f) => f.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Timestamp(t) => t.to_rfc3339(),
                _ => String::new(),
            };
            out.push((prefix.to_string(), rendered));
        }
    }
}

fn build_form(operation: &Operation, descriptor: &ServiceDescriptor, input: &Value) -> Vec<u8> {
    let mut fields = vec![
        ("Action".to_string(), operation.name.clone()),
        ("Version".to_string(), descriptor.metadata.api_version.clone().unwrap_or_default()),
    ];
    flatten("", input, &mut fields);

    fields
        .into_iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                percent_encoding::utf8_percent_encode(&k, percent_encoding::NON_ALPHANUMERIC),
                percent_encoding::utf8_percent_encode(&v, percent_encoding::NON_ALPHANUMERIC)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
        .into_bytes()
}

fn build(descriptor: &ServiceDescriptor, operation: &Operation, endpoint: &http::Uri, input: &Value) -> Result<HttpRequest, Anomaly> {
    let body = build_form(operation, descriptor, input);
    let mut request = HttpRequest::new(Method::POST, endpoint.clone()).with_body(body.into());
    for (name, value) in base_headers(descriptor, operation) {
        request.headers.insert(
            http::HeaderName::from_bytes(name.as_bytes()).map_err(Anomaly::fault)?,
            value.parse().map_err(Anomaly::fault)?,
        );
    }
    Ok(request)
}

fn parse(descriptor: &ServiceDescriptor, operation: &Operation, response: &HttpResponse) -> Result<Value, Anomaly> {
    if response.body.is_empty() {
        return Ok(Value::structure());
    }
    let body = shape_codec::strip_bom(&response.body);
    match operation.output.as_ref().map(|r| r.shape.as_str()) {
        Some(name) => shape_codec::xml_to_value_shaped(descriptor, name, body),
        None => shape_codec::xml_to_value(body),
    }
}

pub struct QueryDispatch;

impl ProtocolDispatch for QueryDispatch {
    fn build_http_request(&self, descriptor: &ServiceDescriptor, operation: &Operation, endpoint: &http::Uri, input: &Value) -> Result<HttpRequest, Anomaly> {
        build(descriptor, operation, endpoint, input)
    }

    fn parse_http_response(&self, descriptor: &ServiceDescriptor, operation: &Operation, response: &HttpResponse) -> Result<Value, Anomaly> {
        parse(descriptor, operation, response)
    }
}

pub struct Ec2Dispatch;

impl ProtocolDispatch for Ec2Dispatch {
    fn build_http_request(&self, descriptor: &ServiceDescriptor, operation: &Operation, endpoint: &http::Uri, input: &Value) -> Result<HttpRequest, Anomaly> {
        build(descriptor, operation, endpoint, input)
    }

    fn parse_http_response(&self, descriptor: &ServiceDescriptor, operation: &Operation, response: &HttpResponse) -> Result<Value, Anomaly> {
        parse(descriptor, operation, response)
    }
}
