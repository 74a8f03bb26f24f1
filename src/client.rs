//! The client handle: binds a service descriptor, HTTP transport, region/credentials
//! providers, and retry policy into the one long-lived object callers invoke operations
//! against.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::oneshot;

use crate::credentials::{self, Credentials, CredentialsProvider};
use crate::descriptor::ServiceDescriptor;
use crate::endpoint::{self, EndpointOverride};
use crate::error::{Anomaly, AnomalyKind};
use crate::http_types::HttpTransport;
use crate::protocol::{self, ProtocolDispatch};
use crate::region::{self, RegionProvider};
use crate::request_id::RequestId;
use crate::retry::{self, BackoffFn};
use crate::signing::{self, SigningOptions};
use crate::transport::DEFAULT_TRANSPORT;
use crate::value::Value;

/// A thin wrapper around `tokio::sync::oneshot::Receiver` that implements `Future`
/// itself — the literal "result channel" `invoke_async` hands back (§4.1.1). Dropping it
/// before it resolves is the Rust equivalent of closing the result sink: the spawned task
/// notices the send failing and stops.
pub struct ResultReceiver<T> {
    inner: oneshot::Receiver<T>,
}

impl<T> Future for ResultReceiver<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(value),
            Poll::Ready(Err(_)) => panic!("invocation task dropped its result sender without sending"),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Configuration accepted by [`Client::new`], mirroring the `config` map of §6.
pub struct ClientConfig {
    pub api: String,
    pub region: Option<String>,
    pub region_provider: Option<Arc<dyn RegionProvider>>,
    pub credentials: Option<Credentials>,
    pub credentials_provider: Option<Arc<dyn CredentialsProvider>>,
    pub endpoint_override: Option<EndpointOverride>,
    pub http_transport: Option<Arc<dyn HttpTransport>>,
    pub validate_requests: bool,
    pub backoff: Option<Arc<BackoffFn>>,
    pub retriable: Option<Arc<dyn Fn(&Result<Value, Anomaly>) -> bool + Send + Sync>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: String::new(),
            region: None,
            region_provider: None,
            credentials: None,
            credentials_provider: None,
            endpoint_override: None,
            http_transport: None,
            validate_requests: true,
            backoff: None,
            retriable: None,
        }
    }
}

impl ClientConfig {
    pub fn for_api(api: impl Into<String>) -> Self {
        Self {
            api: api.into(),
            ..Default::default()
        }
    }
}

/// An immutable client handle. The only mutable state is `validate_requests`, which is a
/// single atomic flag per §5's locking discipline.
pub struct Client {
    descriptor: Arc<ServiceDescriptor>,
    protocol: &'static dyn ProtocolDispatch,
    http_transport: Arc<dyn HttpTransport>,
    uses_shared_transport: bool,
    region_provider: Arc<dyn RegionProvider>,
    credentials_provider: Arc<dyn CredentialsProvider>,
    endpoint_override: Option<EndpointOverride>,
    backoff: Arc<BackoffFn>,
    retriable: Arc<dyn Fn(&Result<Value, Anomaly>) -> bool + Send + Sync>,
    validate_requests: AtomicBool,
}

impl Client {
    /// Loads the service descriptor for `config.api`, eagerly resolves its protocol
    /// dispatcher, and constructs providers using supplied or shared defaults.
    pub async fn new(config: ClientConfig) -> Result<Self, Anomaly> {
        if config.api.is_empty() {
            return Err(Anomaly::incorrect("client config requires a non-empty 'api'"));
        }

        let descriptor = Arc::new(ServiceDescriptor::load(&config.api).await?);
        let protocol = protocol::dispatcher_for(&descriptor.metadata.protocol)?;

        let region_provider: Arc<dyn RegionProvider> = match (config.region, config.region_provider) {
            (Some(region), _) => Arc::new(region::ExplicitRegionProvider(region)),
            (None, Some(provider)) => provider,
            (None, None) => region::default_chain(),
        };

        let credentials_provider: Arc<dyn CredentialsProvider> = match (config.credentials, config.credentials_provider) {
            (Some(creds), _) => Arc::new(credentials::ExplicitCredentialsProvider(creds)),
            (None, Some(provider)) => provider,
            (None, None) => credentials::default_chain(),
        };

        let (http_transport, uses_shared_transport) = match config.http_transport {
            Some(transport) => (transport, false),
            None => (DEFAULT_TRANSPORT.clone() as Arc<dyn HttpTransport>, true),
        };

        info!("client ready: api={}, protocol={}", config.api, descriptor.metadata.protocol);

        Ok(Self {
            descriptor,
            protocol,
            http_transport,
            uses_shared_transport,
            region_provider,
            credentials_provider,
            endpoint_override: config.endpoint_override,
            backoff: config.backoff.unwrap_or_else(|| Arc::new(retry::default_backoff)),
            retriable: config.retriable.unwrap_or_else(|| Arc::new(retry::default_retriable)),
            validate_requests: AtomicBool::new(config.validate_requests),
        })
    }

    pub fn validate_requests(&self, enabled: Option<bool>) -> bool {
        if let Some(enabled) = enabled {
            self.validate_requests.store(enabled, Ordering::SeqCst);
        }
        self.validate_requests.load(Ordering::SeqCst)
    }

    pub fn ops(&self) -> HashMap<&str, Option<&str>> {
        self.descriptor
            .operations
            .iter()
            .map(|(name, op)| (name.as_str(), op.documentation.as_deref()))
            .collect()
    }

    pub fn doc(&self, op: &str) -> Option<String> {
        let operation = self.descriptor.operations.get(op)?;
        Some(match &operation.documentation {
            Some(doc) => format!("{}\n\n{} {}", doc, operation.http.method, operation.http.request_uri),
            None => format!("{} {}", operation.http.method, operation.http.request_uri),
        })
    }

    pub fn request_spec_key<'a>(&'a self, op: &str) -> Option<&'a str> {
        self.descriptor.operations.get(op)?.input.as_ref().map(|r| r.shape.as_str())
    }

    pub fn response_spec_key<'a>(&'a self, op: &str) -> Option<&'a str> {
        self.descriptor.operations.get(op)?.output.as_ref().map(|r| r.shape.as_str())
    }

    /// Closes the underlying transport unless it's the process-shared default — stopping
    /// a handle that shares the global transport is a no-op, matching §3's lifecycle note.
    pub fn stop(self) {
        if !self.uses_shared_transport {
            debug!("client stopped, releasing dedicated HTTP transport");
        }
    }

    /// Spawns one invocation (with retries) onto the ambient runtime and returns a
    /// result-channel future the caller can await.
    pub fn invoke_async(self: &Arc<Self>, op: impl Into<String>, input: Value) -> ResultReceiver<Result<Value, Anomaly>> {
        let (tx, rx) = oneshot::channel();
        let client = Arc::clone(self);
        let op = op.into();

        tokio::spawn(async move {
            let request_id = RequestId::new();
            let result = client.invoke_with_retries(&op, input, request_id).await;
            let _ = tx.send(result);
        });

        ResultReceiver { inner: rx }
    }

    /// `invoke(client, op) = client.invoke_async(op).await` — async Rust has no
    /// meaningful distinction between "blocks on the channel" and "awaits the channel"
    /// for a caller already inside an async context (§4.1.1).
    pub async fn invoke(self: &Arc<Self>, op: impl Into<String>, input: Value) -> Result<Value, Anomaly> {
        self.invoke_async(op, input).await
    }

    async fn invoke_with_retries(&self, op: &str, input: Value, request_id: RequestId) -> Result<Value, Anomaly> {
        let operation = match self.descriptor.operations.get(op) {
            Some(operation) => operation.clone(),
            None => return Err(Anomaly::unsupported("Operation not supported")),
        };

        if self.validate_requests.load(Ordering::SeqCst) {
            if let Some(input_shape) = operation.input.as_ref() {
                crate::shape_codec::validate_against_shape(&self.descriptor, &input_shape.shape, &input)?;
            }
        }

        let retriable = |result: &Result<Value, Anomaly>| (self.retriable)(result);
        let backoff = |attempts: u32| (self.backoff)(attempts);

        retry::invoke_with_retry(
            || self.attempt(&operation, &input, request_id),
            &retriable,
            &backoff,
        )
        .await
    }

    async fn attempt(&self, operation: &crate::descriptor::Operation, input: &Value, request_id: RequestId) -> Result<Value, Anomaly> {
        let (region_result, credentials_result) =
            tokio::join!(self.region_provider.fetch(), self.credentials_provider.fetch());
        let region = region_result?;
        let credentials = credentials_result?;

        let endpoint = endpoint::resolve(&self.descriptor.metadata.endpoint_prefix, &region, self.endpoint_override.as_ref())?;

        let mut request = self.protocol.build_http_request(&self.descriptor, operation, &endpoint, input)?;

        let signing_name = self.descriptor.signing_name().to_string();
        let is_s3 = self.descriptor.metadata.signature_version.as_deref() == Some("s3v4");
        signing::sign(
            &mut request,
            &signing_name,
            &region,
            &credentials,
            Utc::now(),
            &SigningOptions {
                is_s3,
                unsigned_payload: false,
            },
        )?;

        debug!("[{}] submitting {} {}", request_id, operation.name, request.uri);
        let response = self.http_transport.submit(request).await?;

        if response.status >= 400 {
            warn!("[{}] {} returned status {}", request_id, operation.name, response.status);
            return Err(classify_error_response(response.status, &response.body));
        }

        self.protocol.parse_http_response(&self.descriptor, operation, &response)
    }
}

/// Maps an HTTP error status to an anomaly category per §7's fixed table. A proper
/// per-service `Error.Code` mapping additionally consults the parsed error body; this
/// baseline only uses the status code, which is always present.
fn classify_error_response(status: u16, _body: &[u8]) -> Anomaly {
    let category = match status {
        429 | 503 => AnomalyKind::Busy,
        400 => AnomalyKind::Incorrect,
        403 => AnomalyKind::Forbidden,
        404 => AnomalyKind::NotFound,
        409 => AnomalyKind::Conflict,
        500..=599 => AnomalyKind::Fault,
        400..=499 => AnomalyKind::Incorrect,
        _ => AnomalyKind::Fault,
    };
    Anomaly::with_message(category, format!("request failed with status {}", status))
}
