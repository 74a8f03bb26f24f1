//! `rest-json` / `rest-xml`: HTTP method and path template come from the operation; each
//! input member is routed to the URI, query string, a header, or the body by its
//! declared `location`.

use std::fmt::Write as _;

use http::Method;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

use crate::descriptor::{Location, Member, Operation, Shape, ServiceDescriptor, StructureShape};
use crate::error::{Anomaly, AnomalyKind};
use crate::http_types::{HttpRequest, HttpResponse};
use crate::shape_codec;
use crate::value::{Value, ValueMap};

use super::{base_headers, ProtocolDispatch};

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');
/// Same unreserved set as `PATH_SEGMENT`, but also permits `/` — for greedy `{X+}`
/// placeholders, which span multiple path segments and must keep their separators.
const PATH_GREEDY: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~').remove(b'/');

fn input_shape<'a>(descriptor: &'a ServiceDescriptor, operation: &Operation) -> Option<&'a StructureShape> {
    let shape_ref = operation.input.as_ref()?;
    match descriptor.shapes.get(&shape_ref.shape)? {
        Shape::Structure(st) => Some(st),
        _ => None,
    }
}

fn member_value<'a>(value: &'a Value, member_name: &str) -> Option<&'a Value> {
    value.as_map().and_then(|m| m.get(member_name))
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Timestamp(t) => t.to_rfc3339(),
        _ => String::new(),
    }
}

/// Substitutes `{Name}` / `{Name+}` placeholders in `template` using `input`'s uri-bound
/// members. Plain placeholders percent-encode slashes; `+` placeholders preserve them.
fn build_path(template: &str, shape: &StructureShape, input: &Value) -> Result<String, Anomaly> {
    let mut out = String::new();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];
        let close = after_open
            .find('}')
            .ok_or_else(|| Anomaly::incorrect("malformed request URI template: unterminated placeholder"))?;

        let mut name = &after_open[..close];
        let greedy = name.ends_with('+');
        if greedy {
            name = &name[..name.len() - 1];
        }

        let (member_name, _member) = shape
            .members
            .iter()
            .find(|(member_name, m)| {
                m.location == Some(Location::Uri) && m.location_name.as_deref().unwrap_or(member_name.as_str()) == name
            })
            .ok_or_else(|| Anomaly::incorrect(format!("no uri member bound to {{{}}}", name)))?;

        let value = member_value(input, member_name)
            .ok_or_else(|| Anomaly::incorrect(format!("missing required uri member: {}", member_name)))?;
        let raw = scalar_to_string(value);
        let raw = raw.trim_start_matches('/');

        if greedy {
            out.push_str(&percent_encoding::utf8_percent_encode(raw, PATH_GREEDY).to_string());
        } else {
            out.push_str(&percent_encoding::utf8_percent_encode(raw, PATH_SEGMENT).to_string());
        }

        rest = &after_open[close + 1..];
    }
    out.push_str(rest);

    Ok(out)
}

fn members_with_location<'a>(shape: &'a StructureShape, location: Location) -> Vec<(&'a String, &'a Member)> {
    shape.members.iter().filter(|(_, m)| m.location == Some(location)).collect()
}

fn build_query_string(shape: &StructureShape, input: &Value) -> String {
    let mut pairs = Vec::new();
    for (member_name, member) in members_with_location(shape, Location::QueryString) {
        let key = member.location_name.as_deref().unwrap_or(member_name);
        if let Some(value) = member_value(input, member_name) {
            collect_query_pairs(key, value, &mut pairs);
        }
    }
    pairs
        .into_iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                percent_encoding::utf8_percent_encode(&k, PATH_SEGMENT),
                percent_encoding::utf8_percent_encode(&v, PATH_SEGMENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn collect_query_pairs(key: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::List(items) => {
            for item in items {
                collect_query_pairs(key, item, out);
            }
        }
        Value::Map(m) => {
            for (k, v) in m.iter() {
                out.push((format!("{}.{}", key, k), scalar_to_string(v)));
            }
        }
        Value::Null => {}
        other => out.push((key.to_string(), scalar_to_string(other))),
    }
}

fn apply_headers(request: &mut HttpRequest, shape: &StructureShape, input: &Value) -> Result<(), Anomaly> {
    for (member_name, member) in members_with_location(shape, Location::Header) {
        let key = member.location_name.as_deref().unwrap_or(member_name);
        if let Some(value) = member_value(input, member_name) {
            request.headers.insert(
                http::HeaderName::from_bytes(key.as_bytes()).map_err(Anomaly::fault)?,
                scalar_to_string(value).parse().map_err(Anomaly::fault)?,
            );
        }
    }
    for (member_name, member) in members_with_location(shape, Location::Headers) {
        let prefix = member.location_name.as_deref().unwrap_or("");
        if let Some(Value::Map(map)) = member_value(input, member_name) {
            for (k, v) in map.iter() {
                let header_name = format!("{}{}", prefix, k);
                request.headers.insert(
                    http::HeaderName::from_bytes(header_name.as_bytes()).map_err(Anomaly::fault)?,
                    scalar_to_string(v).parse().map_err(Anomaly::fault)?,
                );
            }
        }
    }
    Ok(())
}

fn bound_member_names(shape: &StructureShape) -> Vec<&str> {
    shape
        .members
        .iter()
        .filter(|(_, m)| {
            matches!(m.location, Some(Location::Uri) | Some(Location::Header) | Some(Location::QueryString) | Some(Location::Headers))
        })
        .map(|(name, _)| name.as_str())
        .collect()
}

fn build_body(descriptor: &ServiceDescriptor, shape: &StructureShape, input: &Value, as_xml: bool) -> Vec<u8> {
    if let Some(payload_name) = &shape.payload {
        let value = member_value(input, payload_name).cloned().unwrap_or(Value::Null);
        return match &value {
            Value::Str(s) => s.clone().into_bytes(),
            Value::Blob(b) => b.to_vec(),
            other => {
                if as_xml {
                    match shape.members.get(payload_name) {
                        Some(member) => shape_codec::value_to_xml_shaped(descriptor, &member.shape, payload_name, other).into_bytes(),
                        None => shape_codec::value_to_xml(payload_name, other).into_bytes(),
                    }
                } else {
                    serde_json::to_vec(&shape_codec::value_to_json(other)).unwrap_or_default()
                }
            }
        };
    }

    let bound = bound_member_names(shape);
    let mut remaining = ValueMap::new();
    if let Some(map) = input.as_map() {
        for (k, v) in map.iter() {
            if !bound.contains(&k) {
                remaining.insert(k.to_string(), v.clone());
            }
        }
    }
    let remaining_value = Value::Map(remaining);
    if remaining_value.as_map().map(|m| m.is_empty()).unwrap_or(true) {
        return Vec::new();
    }
    if as_xml {
        shape_codec::value_to_xml_shaped_structure(descriptor, shape, "root", &remaining_value).into_bytes()
    } else {
        serde_json::to_vec(&shape_codec::value_to_json(&remaining_value)).unwrap_or_default()
    }
}

fn build(
    descriptor: &ServiceDescriptor,
    operation: &Operation,
    endpoint: &http::Uri,
    input: &Value,
    as_xml: bool,
) -> Result<HttpRequest, Anomaly> {
    let empty_shape = StructureShape {
        members: Default::default(),
        required: Vec::new(),
        payload: None,
    };
    let shape = input_shape(descriptor, operation).unwrap_or(&empty_shape);

    let path = build_path(&operation.http.request_uri, shape, input)?;
    let query = build_query_string(shape, input);

    let mut path_and_query = path;
    if !query.is_empty() {
        let _ = write!(path_and_query, "?{}", query);
    }

    let base = endpoint.to_string();
    let base = base.trim_end_matches('/');
    let uri: http::Uri = format!("{}{}", base, path_and_query).parse().map_err(Anomaly::fault)?;

    let method: Method = operation.http.method.parse().map_err(Anomaly::fault)?;
    let body = build_body(descriptor, shape, input, as_xml);
    let mut request = HttpRequest::new(method, uri).with_body(body.into());

    for (name, value) in base_headers(descriptor, operation) {
        request.headers.insert(
            http::HeaderName::from_bytes(name.as_bytes()).map_err(Anomaly::fault)?,
            value.parse().map_err(Anomaly::fault)?,
        );
    }
    apply_headers(&mut request, shape, input)?;

    Ok(request)
}

fn parse(descriptor: &ServiceDescriptor, operation: &Operation, response: &HttpResponse, as_xml: bool) -> Result<Value, Anomaly> {
    if response.body.is_empty() {
        return Ok(Value::structure());
    }
    let body = shape_codec::strip_bom(&response.body);

    let shape_name = operation.output.as_ref().map(|r| r.shape.as_str());
    if as_xml {
        Ok(match shape_name {
            Some(name) => shape_codec::xml_to_value_shaped(descriptor, name, body)?,
            None => shape_codec::xml_to_value(body)?,
        })
    } else {
        let json: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| Anomaly::with_message(AnomalyKind::Incorrect, format!("invalid json response: {}", e)))?;
        Ok(match shape_name {
            Some(name) => shape_codec::json_to_value_shaped(descriptor, name, &json),
            None => shape_codec::json_to_value(&json),
        })
    }
}

pub struct RestJsonDispatch;

impl ProtocolDispatch for RestJsonDispatch {
    fn build_http_request(
        &self,
        descriptor: &ServiceDescriptor,
        operation: &Operation,
        endpoint: &http::Uri,
        input: &Value,
    ) -> Result<HttpRequest, Anomaly> {
        build(descriptor, operation, endpoint, input, false)
    }

    fn parse_http_response(&self, descriptor: &ServiceDescriptor, operation: &Operation, response: &HttpResponse) -> Result<Value, Anomaly> {
        parse(descriptor, operation, response, false)
    }
}

pub struct RestXmlDispatch;

impl ProtocolDispatch for RestXmlDispatch {
    fn build_http_request(
        &self,
        descriptor: &ServiceDescriptor,
        operation: &Operation,
        endpoint: &http::Uri,
        input: &Value,
    ) -> Result<HttpRequest, Anomaly> {
        build(descriptor, operation, endpoint, input, true)
    }

    fn parse_http_response(&self, descriptor: &ServiceDescriptor, operation: &Operation, response: &HttpResponse) -> Result<Value, Anomaly> {
        parse(descriptor, operation, response, true)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::descriptor::Member;
    use crate::value::ValueMap;

    fn shape_with_uri_members(members: &[(&str, Location)]) -> StructureShape {
        let mut map = HashMap::new();
        for (name, location) in members {
            map.insert(
                name.to_string(),
                Member {
                    shape: "Str".to_string(),
                    location: Some(*location),
                    location_name: None,
                },
            );
        }
        StructureShape {
            members: map,
            required: Vec::new(),
            payload: None,
        }
    }

    fn input_with(pairs: &[(&str, &str)]) -> Value {
        let mut map = ValueMap::new();
        for (k, v) in pairs {
            map.insert(*k, Value::from(*v));
        }
        Value::Map(map)
    }

    #[test]
    fn non_greedy_placeholder_escapes_reserved_characters() {
        let shape = shape_with_uri_members(&[("Key", Location::Uri)]);
        let input = input_with(&[("Key", "a b/c")]);
        let path = build_path("/objects/{Key}", &shape, &input).unwrap();
        assert_eq!(path, "/objects/a%20b%2Fc");
    }

    #[test]
    fn greedy_placeholder_escapes_reserved_characters_but_keeps_slashes() {
        let shape = shape_with_uri_members(&[("Key", Location::Uri)]);
        let input = input_with(&[("Key", "a b/c+d")]);
        let path = build_path("/objects/{Key+}", &shape, &input).unwrap();
        assert_eq!(path, "/objects/a%20b/c%2Bd");
    }

    #[test]
    fn greedy_placeholder_spanning_multiple_segments_preserves_structure() {
        let shape = shape_with_uri_members(&[("Bucket", Location::Uri), ("Key", Location::Uri)]);
        let input = input_with(&[("Bucket", "my-bucket"), ("Key", "a/b/c")]);
        let path = build_path("/{Bucket}/{Key+}", &shape, &input).unwrap();
        assert_eq!(path, "/my-bucket/a/b/c");
    }

    #[test]
    fn missing_uri_member_is_an_incorrect_anomaly() {
        let shape = shape_with_uri_members(&[("Key", Location::Uri)]);
        let input = Value::structure();
        let err = build_path("/objects/{Key}", &shape, &input).unwrap_err();
        assert_eq!(err.category.as_str(), "incorrect");
    }

    #[test]
    fn unterminated_placeholder_is_an_incorrect_anomaly() {
        let shape = shape_with_uri_members(&[("Key", Location::Uri)]);
        let input = input_with(&[("Key", "x")]);
        let err = build_path("/objects/{Key", &shape, &input).unwrap_err();
        assert_eq!(err.category.as_str(), "incorrect");
    }

    #[test]
    fn leading_slash_in_a_greedy_value_is_not_duplicated() {
        let shape = shape_with_uri_members(&[("Key", Location::Uri)]);
        let input = input_with(&[("Key", "/already/slashed")]);
        let path = build_path("/objects/{Key+}", &shape, &input).unwrap();
        assert_eq!(path, "/objects/already/slashed");
    }
}
