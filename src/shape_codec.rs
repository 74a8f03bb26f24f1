//! Leaf and composite shape serialization/parsing. This is the mechanical collaborator
//! called out in §1 ("the shape serializer/parser primitives for leaf types") generalized
//! up to whole structures so the protocol layer has something concrete to call.

use std::collections::HashMap;

use base64::Engine;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::descriptor::{Member, Shape, ServiceDescriptor};
use crate::error::{Anomaly, AnomalyKind};
use crate::value::{Value, ValueMap};

/// Strips a leading UTF-8 byte-order mark, if present, before handing a body to a
/// JSON/XML decoder. Some services prefix response bodies with one; neither `serde_json`
/// nor `quick-xml` skips it on their own.
pub fn strip_bom(body: &[u8]) -> &[u8] {
    body.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(body)
}

/// Converts a `Value` into a `serde_json::Value`, filling in the encodings leaf shapes
/// require (timestamps as epoch seconds unless the shape says otherwise, blobs as
/// base64).
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(n) => JsonValue::Number((*n).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number).unwrap_or(JsonValue::Null),
        Value::Str(s) => JsonValue::String(s.clone()),
        Value::Blob(b) => JsonValue::String(base64::engine::general_purpose::STANDARD.encode(b)),
        Value::Timestamp(t) => JsonValue::Number(serde_json::Number::from(t.timestamp())),
        Value::List(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        Value::Map(m) => {
            let mut obj = JsonMap::new();
            for (k, v) in m.iter() {
                obj.insert(k.to_string(), value_to_json(v));
            }
            JsonValue::Object(obj)
        }
    }
}

/// Converts a parsed JSON document back into a `Value`, with no shape awareness (used
/// for generic/untyped bodies and for tests). Shape-aware parsing additionally consults
/// the member's declared shape to decide whether a JSON number is a timestamp.
pub fn json_to_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        JsonValue::String(s) => Value::Str(s.clone()),
        JsonValue::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        JsonValue::Object(obj) => {
            let mut map = ValueMap::new();
            for (k, v) in obj {
                map.insert(k.clone(), json_to_value(v));
            }
            Value::Map(map)
        }
    }
}

/// Shape-aware JSON parsing: walks the descriptor's shape graph alongside the JSON tree
/// so timestamps and blobs decode to their proper `Value` variant instead of staying a
/// raw string or number.
pub fn json_to_value_shaped(descriptor: &ServiceDescriptor, shape_name: &str, json: &JsonValue) -> Value {
    let shape = match descriptor.shapes.get(shape_name) {
        Some(s) => s,
        None => return json_to_value(json),
    };

    match (shape, json) {
        (Shape::Structure(st), JsonValue::Object(obj)) => {
            let mut map = ValueMap::new();
            for (member_name, member) in &st.members {
                let wire_name = member.location_name.as_deref().unwrap_or(member_name);
                if let Some(child) = obj.get(wire_name) {
                    map.insert(member_name.clone(), json_to_value_shaped(descriptor, &member.shape, child));
                }
            }
            Value::Map(map)
        }
        (Shape::List(ls), JsonValue::Array(items)) => Value::List(
            items
                .iter()
                .map(|item| json_to_value_shaped(descriptor, &ls.member.shape, item))
                .collect(),
        ),
        (Shape::Map(ms), JsonValue::Object(obj)) => {
            let mut map = ValueMap::new();
            for (k, v) in obj {
                map.insert(k.clone(), json_to_value_shaped(descriptor, &ms.value.shape, v));
            }
            Value::Map(map)
        }
        (Shape::Timestamp(_), JsonValue::Number(n)) => {
            let secs = n.as_i64().unwrap_or(0);
            Value::Timestamp(Utc.timestamp_opt(secs, 0).single().unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap()))
        }
        (Shape::Blob, JsonValue::String(s)) => base64::engine::general_purpose::STANDARD
            .decode(s)
            .map(|bytes| Value::Blob(Bytes::from(bytes)))
            .unwrap_or_else(|_| Value::Str(s.clone())),
        _ => json_to_value(json),
    }
}

/// A minimal, structure-only XML encoder: emits `<MemberTag>value</MemberTag>` pairs for
/// a structure `Value`, recursing into nested structures and lists. Good enough for
/// `rest-xml`/`query` request/response bodies, which never need attributes or mixed
/// content for the shapes this engine targets.
pub fn value_to_xml(root_tag: &str, value: &Value) -> String {
    let mut out = String::new();
    write_xml_node(&mut out, root_tag, value);
    out
}

fn write_xml_node(out: &mut String, tag: &str, value: &Value) {
    match value {
        Value::Map(m) => {
            out.push_str(&format!("<{}>", tag));
            for (k, v) in m.iter() {
                write_xml_node(out, k, v);
            }
            out.push_str(&format!("</{}>", tag));
        }
        Value::List(items) => {
            for item in items {
                write_xml_node(out, tag, item);
            }
        }
        Value::Null => {}
        other => {
            out.push_str(&format!("<{}>{}</{}>", tag, xml_escape(&leaf_to_string(other)), tag));
        }
    }
}

/// Shape-aware XML encoding of a whole structure: like [`value_to_xml`], but consults
/// each member's declared shape so a list member is wrapped in an item-tag container
/// unless its shape says `flattened`.
pub fn value_to_xml_shaped_structure(
    descriptor: &ServiceDescriptor,
    shape: &crate::descriptor::StructureShape,
    tag: &str,
    value: &Value,
) -> String {
    let mut out = String::new();
    if let Value::Map(m) = value {
        out.push_str(&format!("<{}>", tag));
        for (member_name, member) in &shape.members {
            let wire_name = member.location_name.as_deref().unwrap_or(member_name);
            if let Some(child) = m.get(member_name) {
                write_xml_node_shaped(descriptor, &member.shape, &mut out, wire_name, child);
            }
        }
        out.push_str(&format!("</{}>", tag));
    }
    out
}

/// Shape-aware XML encoding rooted at an arbitrary member shape (structure, list, map, or
/// leaf) rather than a whole operation's input/output structure — used for `payload`
/// members, which may themselves be lists or nested structures.
pub fn value_to_xml_shaped(descriptor: &ServiceDescriptor, shape_name: &str, tag: &str, value: &Value) -> String {
    let mut out = String::new();
    write_xml_node_shaped(descriptor, shape_name, &mut out, tag, value);
    out
}

fn write_xml_node_shaped(descriptor: &ServiceDescriptor, shape_name: &str, out: &mut String, tag: &str, value: &Value) {
    match descriptor.shapes.get(shape_name) {
        Some(Shape::Structure(st)) => {
            if let Value::Map(m) = value {
                out.push_str(&format!("<{}>", tag));
                for (member_name, member) in &st.members {
                    let wire_name = member.location_name.as_deref().unwrap_or(member_name);
                    if let Some(child) = m.get(member_name) {
                        write_xml_node_shaped(descriptor, &member.shape, out, wire_name, child);
                    }
                }
                out.push_str(&format!("</{}>", tag));
            }
        }
        Some(Shape::List(ls)) => {
            if let Value::List(items) = value {
                if ls.flattened {
                    for item in items {
                        write_xml_node_shaped(descriptor, &ls.member.shape, out, tag, item);
                    }
                } else {
                    let item_tag = ls.member.location_name.as_deref().unwrap_or("member");
                    out.push_str(&format!("<{}>", tag));
                    for item in items {
                        write_xml_node_shaped(descriptor, &ls.member.shape, out, item_tag, item);
                    }
                    out.push_str(&format!("</{}>", tag));
                }
            }
        }
        Some(Shape::Map(ms)) => {
            if let Value::Map(m) = value {
                out.push_str(&format!("<{}>", tag));
                for (k, v) in m.iter() {
                    write_xml_node_shaped(descriptor, &ms.value.shape, out, k, v);
                }
                out.push_str(&format!("</{}>", tag));
            }
        }
        _ => write_xml_node(out, tag, value),
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn leaf_to_string(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => s.clone(),
        Value::Blob(b) => base64::engine::general_purpose::STANDARD.encode(b),
        Value::Timestamp(t) => t.to_rfc3339(),
        _ => String::new(),
    }
}

/// A minimal, tag-soup XML reader sufficient for AWS `query`/`rest-xml` responses: it
/// turns every leaf element into a string `Value` and every element that itself contains
/// child elements into a `Value::Map`. Sibling elements that share a tag are collapsed
/// into a `Value::List` (this is how flattened and wrapped lists alike are represented on
/// the wire).
pub fn xml_to_value(xml: &[u8]) -> Result<Value, Anomaly> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    let mut stack: Vec<(String, ValueMap)> = Vec::new();
    let mut text_buf = String::new();
    let mut buf = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.push((name, ValueMap::new()));
                text_buf.clear();
            }
            Ok(Event::Text(t)) => {
                text_buf.push_str(&t.unescape().map_err(|e| Anomaly::fault_xml(e))?);
            }
            Ok(Event::End(_)) => {
                let (name, children) = stack.pop().ok_or_else(|| Anomaly::incorrect("unbalanced xml"))?;
                let node_value = if children.is_empty() {
                    Value::Str(std::mem::take(&mut text_buf))
                } else {
                    Value::Map(children)
                };
                text_buf.clear();

                if let Some((_, parent)) = stack.last_mut() {
                    insert_or_append(parent, &name, node_value);
                } else {
                    root = Some(node_value);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Anomaly::with_message(AnomalyKind::Incorrect, format!("xml parse error: {}", e))),
        }
        buf.clear();
    }

    root.ok_or_else(|| Anomaly::incorrect("empty xml document"))
}

/// Shape-aware XML parsing: parses the raw tag-soup tree, then walks it alongside the
/// descriptor's shape graph so blobs/timestamps/numbers/booleans decode to their proper
/// `Value` variant instead of staying a raw string, and list members are unwrapped
/// correctly whether `flattened` or wrapped in an item-tag container.
pub fn xml_to_value_shaped(descriptor: &ServiceDescriptor, shape_name: &str, xml: &[u8]) -> Result<Value, Anomaly> {
    let raw = xml_to_value(xml)?;
    Ok(xml_shape_value(descriptor, shape_name, &raw))
}

/// A raw value is always a list's worth of items whether it arrived as a single scalar
/// (one occurrence) or a `Value::List` (more than one) — the tag-soup reader only
/// produces a list once it has seen a tag repeated.
fn coerce_list(value: Value) -> Vec<Value> {
    match value {
        Value::List(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn xml_shape_value(descriptor: &ServiceDescriptor, shape_name: &str, raw: &Value) -> Value {
    let shape = match descriptor.shapes.get(shape_name) {
        Some(s) => s,
        None => return raw.clone(),
    };

    match shape {
        Shape::Structure(st) => {
            let obj = match raw.as_map() {
                Some(m) => m,
                None => return raw.clone(),
            };
            let mut map = ValueMap::new();
            for (member_name, member) in &st.members {
                let wire_name = member.location_name.as_deref().unwrap_or(member_name);
                let Some(raw_child) = obj.get(wire_name) else { continue };
                match descriptor.shapes.get(&member.shape) {
                    Some(Shape::List(ls)) => {
                        let list_raw = if ls.flattened {
                            raw_child.clone()
                        } else {
                            let item_tag = ls.member.location_name.as_deref().unwrap_or("member");
                            raw_child.get(item_tag).cloned().unwrap_or(Value::Null)
                        };
                        let items = coerce_list(list_raw)
                            .iter()
                            .map(|item| xml_shape_value(descriptor, &ls.member.shape, item))
                            .collect();
                        map.insert(member_name.clone(), Value::List(items));
                    }
                    _ => {
                        map.insert(member_name.clone(), xml_shape_value(descriptor, &member.shape, raw_child));
                    }
                }
            }
            Value::Map(map)
        }
        Shape::List(ls) => {
            let items = coerce_list(raw.clone())
                .iter()
                .map(|item| xml_shape_value(descriptor, &ls.member.shape, item))
                .collect();
            Value::List(items)
        }
        Shape::Map(ms) => {
            let obj = match raw.as_map() {
                Some(m) => m,
                None => return raw.clone(),
            };
            let mut map = ValueMap::new();
            for (k, v) in obj.iter() {
                map.insert(k.to_string(), xml_shape_value(descriptor, &ms.value.shape, v));
            }
            Value::Map(map)
        }
        Shape::Timestamp(_) => match raw.as_str() {
            Some(s) => chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
                .unwrap_or_else(|_| raw.clone()),
            None => raw.clone(),
        },
        Shape::Blob => match raw.as_str() {
            Some(s) => base64::engine::general_purpose::STANDARD
                .decode(s)
                .map(|bytes| Value::Blob(Bytes::from(bytes)))
                .unwrap_or_else(|_| raw.clone()),
            None => raw.clone(),
        },
        Shape::Integer | Shape::Long => match raw.as_str().and_then(|s| s.parse::<i64>().ok()) {
            Some(n) => Value::Int(n),
            None => raw.clone(),
        },
        Shape::Double | Shape::Float => match raw.as_str().and_then(|s| s.parse::<f64>().ok()) {
            Some(f) => Value::Float(f),
            None => raw.clone(),
        },
        Shape::Boolean => match raw.as_str().and_then(|s| s.parse::<bool>().ok()) {
            Some(b) => Value::Bool(b),
            None => raw.clone(),
        },
        Shape::String(_) | Shape::Null => raw.clone(),
    }
}

fn insert_or_append(map: &mut ValueMap, key: &str, value: Value) {
    match map.get(key).cloned() {
        None => map.insert(key, value),
        Some(Value::List(mut items)) => {
            items.push(value);
            map.insert(key, Value::List(items));
        }
        Some(existing) => {
            map.insert(key, Value::List(vec![existing, value]));
        }
    }
}

impl Anomaly {
    fn fault_xml<E: std::fmt::Display>(e: E) -> Self {
        Anomaly::with_message(AnomalyKind::Incorrect, format!("xml decode error: {}", e))
    }
}

/// Validates that `value` supplies every member the descriptor marks `required` for
/// `shape_name`. This is the spec-validation collaborator in its minimal, useful form:
/// it is not a full JSON-Schema engine, only a required-member and type-shape checker,
/// which is all §8 scenario 2 exercises.
pub fn validate_against_shape(descriptor: &ServiceDescriptor, shape_name: &str, value: &Value) -> Result<(), Anomaly> {
    let shape = match descriptor.shapes.get(shape_name) {
        Some(Shape::Structure(st)) => st,
        _ => return Ok(()),
    };

    let mut problems = Vec::new();
    let map = value.as_map();
    for required in &shape.required {
        let present = map.map(|m| m.contains_key(required)).unwrap_or(false);
        if !present {
            problems.push(format!("missing required member: {}", required));
        }
    }

    if let Some(map) = map {
        let known: HashMap<&str, &Member> = shape.members.iter().map(|(k, v)| (k.as_str(), v)).collect();
        for (key, _) in map.iter() {
            if !known.contains_key(key) {
                problems.push(format!("unknown member: {}", key));
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        let problems_json: Vec<JsonValue> = problems.iter().map(|p| JsonValue::String(p.clone())).collect();
        Err(Anomaly::incorrect(problems.join("; ")).with_field("problems", JsonValue::Array(problems_json)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Shape, StructureShape};

    const MODEL: &str = r#"{
        "metadata": {"protocol": "rest-xml", "endpointPrefix": "test"},
        "operations": {},
        "shapes": {
            "Widget": {
                "type": "structure",
                "required": ["Name"],
                "members": {
                    "Name": {"shape": "Str"},
                    "Count": {"shape": "Int"},
                    "Price": {"shape": "Dbl"},
                    "Active": {"shape": "Bool"},
                    "CreatedAt": {"shape": "Ts"},
                    "Payload": {"shape": "Blob"},
                    "Tags": {"shape": "TagsWrapped"},
                    "FlatTags": {"shape": "TagsFlat"},
                    "Attributes": {"shape": "Attrs"},
                    "Nested": {"shape": "Inner"}
                }
            },
            "Inner": {
                "type": "structure",
                "members": { "Sub": {"shape": "Str"} }
            },
            "TagsWrapped": {"type": "list", "member": {"shape": "Str"}},
            "TagsFlat": {"type": "list", "member": {"shape": "Str"}, "flattened": true},
            "Attrs": {"type": "map", "key": {"shape": "Str"}, "value": {"shape": "Str"}},
            "Str": {"type": "string"},
            "Int": {"type": "integer"},
            "Dbl": {"type": "double"},
            "Bool": {"type": "boolean"},
            "Ts": {"type": "timestamp"},
            "Blob": {"type": "blob"}
        }
    }"#;

    fn widget_descriptor() -> ServiceDescriptor {
        ServiceDescriptor::parse(MODEL.as_bytes()).unwrap()
    }

    fn widget_shape(descriptor: &ServiceDescriptor) -> StructureShape {
        match descriptor.shapes.get("Widget").unwrap() {
            Shape::Structure(st) => st.clone(),
            _ => panic!("Widget is not a structure"),
        }
    }

    #[test]
    fn strip_bom_removes_leading_marker_only() {
        let with_bom = [0xEF, 0xBB, 0xBF, b'{', b'}'];
        assert_eq!(strip_bom(&with_bom), b"{}");
        assert_eq!(strip_bom(b"{}"), b"{}");
    }

    #[test]
    fn json_round_trip_covers_every_leaf_and_composite_shape() {
        let descriptor = widget_descriptor();

        let mut attrs = ValueMap::new();
        attrs.insert("color", Value::Str("red".into()));
        let mut nested = ValueMap::new();
        nested.insert("Sub", Value::Str("inner-value".into()));

        let mut original = ValueMap::new();
        original.insert("Name", Value::Str("gadget".into()));
        original.insert("Count", Value::Int(42));
        original.insert("Price", Value::Float(19.99));
        original.insert("Active", Value::Bool(true));
        original.insert("CreatedAt", Value::Timestamp(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        original.insert("Payload", Value::Blob(Bytes::from_static(b"hello")));
        original.insert("Tags", Value::List(vec![Value::Str("a".into()), Value::Str("b".into())]));
        original.insert("Attributes", Value::Map(attrs));
        original.insert("Nested", Value::Map(nested));
        let original = Value::Map(original);

        let json = value_to_json(&original);
        let decoded = json_to_value_shaped(&descriptor, "Widget", &json);

        assert_eq!(decoded.get("Name").and_then(Value::as_str), Some("gadget"));
        assert_eq!(decoded.get("Count"), Some(&Value::Int(42)));
        assert_eq!(decoded.get("Price"), Some(&Value::Float(19.99)));
        assert_eq!(decoded.get("Active"), Some(&Value::Bool(true)));
        assert_eq!(decoded.get("CreatedAt"), original.get("CreatedAt"));
        assert_eq!(decoded.get("Payload"), Some(&Value::Blob(Bytes::from_static(b"hello"))));
        assert_eq!(decoded.get("Tags").and_then(Value::as_list).map(|l| l.len()), Some(2));
        assert_eq!(
            decoded.get("Attributes").and_then(|v| v.get("color")).and_then(Value::as_str),
            Some("red")
        );
        assert_eq!(
            decoded.get("Nested").and_then(|v| v.get("Sub")).and_then(Value::as_str),
            Some("inner-value")
        );
    }

    #[test]
    fn xml_round_trip_preserves_wrapped_list() {
        let descriptor = widget_descriptor();
        let shape = widget_shape(&descriptor);

        let mut value = ValueMap::new();
        value.insert("Name", Value::Str("gadget".into()));
        value.insert("Tags", Value::List(vec![Value::Str("a".into()), Value::Str("b".into())]));
        let value = Value::Map(value);

        let xml = value_to_xml_shaped_structure(&descriptor, &shape, "Widget", &value);
        assert!(xml.contains("<Tags><member>a</member><member>b</member></Tags>"));

        let decoded = xml_to_value_shaped(&descriptor, "Widget", xml.as_bytes()).unwrap();
        assert_eq!(decoded.get("Name").and_then(Value::as_str), Some("gadget"));
        let tags: Vec<&str> = decoded.get("Tags").and_then(Value::as_list).unwrap().iter().map(|v| v.as_str().unwrap()).collect();
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn xml_round_trip_preserves_flattened_list() {
        let descriptor = widget_descriptor();
        let shape = widget_shape(&descriptor);

        let mut value = ValueMap::new();
        value.insert("Name", Value::Str("gadget".into()));
        value.insert("FlatTags", Value::List(vec![Value::Str("x".into()), Value::Str("y".into())]));
        let value = Value::Map(value);

        let xml = value_to_xml_shaped_structure(&descriptor, &shape, "Widget", &value);
        assert!(xml.contains("<FlatTags>x</FlatTags><FlatTags>y</FlatTags>"));
        assert!(!xml.contains("<member>"));

        let decoded = xml_to_value_shaped(&descriptor, "Widget", xml.as_bytes()).unwrap();
        let tags: Vec<&str> = decoded.get("FlatTags").and_then(Value::as_list).unwrap().iter().map(|v| v.as_str().unwrap()).collect();
        assert_eq!(tags, vec!["x", "y"]);
    }

    #[test]
    fn single_element_wrapped_list_still_decodes_as_a_list() {
        let descriptor = widget_descriptor();
        let xml = b"<Widget><Name>gadget</Name><Tags><member>only</member></Tags></Widget>";
        let decoded = xml_to_value_shaped(&descriptor, "Widget", xml).unwrap();
        let tags = decoded.get("Tags").and_then(Value::as_list).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].as_str(), Some("only"));
    }

    #[test]
    fn xml_decodes_typed_leaves_against_the_shape() {
        let descriptor = widget_descriptor();
        let xml = b"<Widget><Name>gadget</Name><Count>7</Count><Active>true</Active>\
            <Payload>aGVsbG8=</Payload><CreatedAt>2023-11-14T22:13:20Z</CreatedAt></Widget>";
        let decoded = xml_to_value_shaped(&descriptor, "Widget", xml).unwrap();
        assert_eq!(decoded.get("Count"), Some(&Value::Int(7)));
        assert_eq!(decoded.get("Active"), Some(&Value::Bool(true)));
        assert_eq!(decoded.get("Payload"), Some(&Value::Blob(Bytes::from_static(b"hello"))));
        assert_eq!(decoded.get("CreatedAt"), Some(&Value::Timestamp(Utc.timestamp_opt(1_700_000_000, 0).unwrap())));
    }

    #[test]
    fn validate_against_shape_rejects_missing_required_member() {
        let descriptor = widget_descriptor();
        let value = Value::structure();
        let err = validate_against_shape(&descriptor, "Widget", &value).unwrap_err();
        assert!(err.to_string().contains("missing required member: Name"));
    }

    #[test]
    fn validate_against_shape_rejects_unknown_member() {
        let descriptor = widget_descriptor();
        let mut value = Value::structure();
        value.as_map_mut().unwrap().insert("Name", Value::from("gadget"));
        value.as_map_mut().unwrap().insert("Bogus", Value::from("nope"));
        let err = validate_against_shape(&descriptor, "Widget", &value).unwrap_err();
        assert!(err.to_string().contains("unknown member: Bogus"));
    }

    #[test]
    fn validate_against_shape_accepts_well_formed_value() {
        let descriptor = widget_descriptor();
        let mut value = Value::structure();
        value.as_map_mut().unwrap().insert("Name", Value::from("gadget"));
        assert!(validate_against_shape(&descriptor, "Widget", &value).is_ok());
    }
}
