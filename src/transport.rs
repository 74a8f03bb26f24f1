//! Default `HttpTransport`: a `hyper::Client` over `hyper-rustls`, shared process-wide so
//! connection pooling actually pools. The out-of-scope mechanical collaborator named in
//! §1/§6, given a minimal working body so the engine runs end to end.

use std::sync::Arc;

use async_trait::async_trait;
use hyper::body::Body as HyperBody;
use hyper::Client as HyperClient;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use log::trace;
use once_cell::sync::Lazy;

use crate::error::{Anomaly, AnomalyKind};
use crate::http_types::{HttpRequest, HttpResponse, HttpTransport};

/// A `hyper::Client` wired up with a rustls-backed HTTPS connector. Clones are cheap
/// (`hyper::Client` is itself an `Arc`-backed handle), mirroring how the teacher's own
/// service types are built to be shared across tasks.
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient<HttpsConnector<hyper::client::HttpConnector>, HyperBody>,
}

impl HyperTransport {
    pub fn new() -> Self {
        let connector = HttpsConnectorBuilder::new()
            .with_native_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        Self {
            client: HyperClient::builder().build(connector),
        }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn submit(&self, request: HttpRequest) -> Result<HttpResponse, Anomaly> {
        trace!("submitting {} {}", request.method, request.uri);

        let mut builder = hyper::Request::builder().method(request.method).uri(request.uri);
        if let Some(headers) = builder.headers_mut() {
            *headers = request.headers;
        }
        let hyper_request = builder
            .body(HyperBody::from(request.body))
            .map_err(|e| Anomaly::with_message(AnomalyKind::Fault, format!("could not build request: {}", e)))?;

        let response = self.client.request(hyper_request).await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                Anomaly::with_message(AnomalyKind::Unavailable, format!("transport error: {}", e))
            } else {
                Anomaly::with_message(AnomalyKind::Fault, format!("transport error: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(|e| Anomaly::with_message(AnomalyKind::Fault, format!("could not read response body: {}", e)))?;

        Ok(HttpResponse { status, headers, body })
    }
}

/// A process-wide default transport. Dispatchers that don't need per-client transport
/// configuration can clone this rather than build their own connector pool.
pub static DEFAULT_TRANSPORT: Lazy<Arc<HyperTransport>> = Lazy::new(|| Arc::new(HyperTransport::new()));
