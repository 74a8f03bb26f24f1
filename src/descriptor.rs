//! Service descriptors: immutable, per-service metadata loaded once from a JSON model
//! file and shared for the lifetime of a client handle. Nothing in this module mutates a
//! descriptor after `ServiceDescriptor::load` returns it — callers are expected to wrap
//! it in an `Arc`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use serde::Deserialize;

use crate::error::{Anomaly, AnomalyKind};

/// Where on disk (or in a bundled resource root) service descriptors are found. Pinned
/// per §6: "the descriptor loader expects a JSON resource named by service id under a
/// known resource root".
pub fn default_resource_root() -> PathBuf {
    std::env::var("AWS_CLIENT_MODEL_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("models"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub protocol: String,
    #[serde(rename = "signatureVersion", default)]
    pub signature_version: Option<String>,
    #[serde(rename = "endpointPrefix")]
    pub endpoint_prefix: String,
    #[serde(rename = "signingName", default)]
    pub signing_name: Option<String>,
    #[serde(rename = "targetPrefix", default)]
    pub target_prefix: Option<String>,
    #[serde(rename = "jsonVersion", default)]
    pub json_version: Option<String>,
    #[serde(rename = "apiVersion", default)]
    pub api_version: Option<String>,
    #[serde(rename = "serviceId", default)]
    pub service_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpBinding {
    pub method: String,
    #[serde(rename = "requestUri")]
    pub request_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShapeRef {
    pub shape: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    pub name: String,
    pub http: HttpBinding,
    #[serde(default)]
    pub input: Option<ShapeRef>,
    #[serde(default)]
    pub output: Option<ShapeRef>,
    #[serde(default)]
    pub errors: Vec<ShapeRef>,
    #[serde(default)]
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Uri,
    QueryString,
    Header,
    Headers,
    StatusCode,
    Payload,
}

impl Location {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "uri" => Some(Self::Uri),
            "querystring" => Some(Self::QueryString),
            "header" => Some(Self::Header),
            "headers" => Some(Self::Headers),
            "statusCode" => Some(Self::StatusCode),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Member {
    pub shape: String,
    #[serde(default, deserialize_with = "deserialize_location")]
    pub location: Option<Location>,
    #[serde(rename = "locationName", default)]
    pub location_name: Option<String>,
}

fn deserialize_location<'de, D>(d: D) -> Result<Option<Location>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw.and_then(|s| Location::parse(&s)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct StructureShape {
    #[serde(default)]
    pub members: HashMap<String, Member>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListShape {
    pub member: Member,
    #[serde(default)]
    pub flattened: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapShape {
    pub key: Member,
    pub value: Member,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StringShape {
    #[serde(rename = "enum", default)]
    pub enum_values: Option<Vec<String>>,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimestampShape {
    #[serde(default)]
    pub timestamp_format: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Shape {
    #[serde(rename = "structure")]
    Structure(StructureShape),
    #[serde(rename = "list")]
    List(ListShape),
    #[serde(rename = "map")]
    Map(MapShape),
    #[serde(rename = "string")]
    String(StringShape),
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "long")]
    Long,
    #[serde(rename = "double")]
    Double,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "timestamp")]
    Timestamp(TimestampShape),
    #[serde(rename = "blob")]
    Blob,
    #[serde(rename = "null")]
    Null,
}

#[derive(Debug, Clone, Deserialize)]
struct RawServiceDescriptor {
    metadata: Metadata,
    operations: HashMap<String, RawOperation>,
    shapes: HashMap<String, Shape>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawOperation {
    http: HttpBinding,
    #[serde(default)]
    input: Option<ShapeRef>,
    #[serde(default)]
    output: Option<ShapeRef>,
    #[serde(default)]
    errors: Vec<ShapeRef>,
    #[serde(default)]
    documentation: Option<String>,
}

/// Immutable, per-service descriptor. The operation registry (`operations`) is the sole
/// authority on which operation names are valid for this service.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub metadata: Metadata,
    pub operations: HashMap<String, Operation>,
    pub shapes: HashMap<String, Shape>,
}

impl ServiceDescriptor {
    /// Loads a descriptor from `<root>/<api>.json`. This is the mechanical
    /// out-of-scope collaborator called out in §1; a production deployment would point
    /// `AWS_CLIENT_MODEL_ROOT` at a directory of vendored AWS SDK model files.
    pub async fn load(api: &str) -> Result<Self, Anomaly> {
        let root = default_resource_root();
        Self::load_from(&root, api).await
    }

    pub async fn load_from(root: &Path, api: &str) -> Result<Self, Anomaly> {
        let path = root.join(format!("{}.json", api));
        trace!("loading service descriptor for '{}' from {:?}", api, path);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            Anomaly::with_message(
                AnomalyKind::Fault,
                format!("could not read service descriptor {:?}: {}", path, e),
            )
        })?;
        Self::parse(&bytes)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, Anomaly> {
        let raw: RawServiceDescriptor = serde_json::from_slice(bytes)
            .map_err(|e| Anomaly::with_message(AnomalyKind::Fault, format!("invalid service descriptor: {}", e)))?;

        let mut operations = HashMap::with_capacity(raw.operations.len());
        for (name, op) in raw.operations {
            operations.insert(
                name.clone(),
                Operation {
                    name,
                    http: op.http,
                    input: op.input,
                    output: op.output,
                    errors: op.errors,
                    documentation: op.documentation,
                },
            );
        }

        debug!(
            "loaded service descriptor: protocol={}, {} operations, {} shapes",
            raw.metadata.protocol,
            operations.len(),
            raw.shapes.len()
        );

        Ok(ServiceDescriptor {
            metadata: raw.metadata,
            operations,
            shapes: raw.shapes,
        })
    }

    pub fn signing_name(&self) -> &str {
        self.metadata
            .signing_name
            .as_deref()
            .unwrap_or(&self.metadata.endpoint_prefix)
    }

    /// Required input member names for `op`, per the declared structure shape.
    pub fn required_members(&self, op: &str) -> &[String] {
        self.operations
            .get(op)
            .and_then(|o| o.input.as_ref())
            .and_then(|r| self.shapes.get(&r.shape))
            .map(|s| match s {
                Shape::Structure(st) => st.required.as_slice(),
                _ => &[],
            })
            .unwrap_or(&[])
    }
}
