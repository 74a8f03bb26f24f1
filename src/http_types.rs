//! Engine-internal HTTP request/response types and the transport contract protocol
//! dispatchers build against. Kept deliberately thin: a dispatcher only needs a method,
//! a URI, a case-insensitive header map, and a body buffer, not the full generality of
//! `hyper::Request`.

use std::fmt::{self, Debug, Formatter};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

use crate::error::Anomaly;

/// A request the engine is about to submit, already built by a protocol dispatcher:
/// method, target URI (host, path, and query string all folded in), headers, and body.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    pub fn host(&self) -> &str {
        self.uri.host().unwrap_or("")
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }
}

impl Debug for HttpRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// A response the transport handed back, already drained into memory. Status, headers,
/// and body are all the protocol layer ever needs to build a `Value` from.
#[derive(Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl Debug for HttpResponse {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// The out-of-scope HTTP transport collaborator named in §1/§6: something that can
/// submit a built, signed request and hand back a drained response. A client handle owns
/// one implementation of this for its whole lifetime.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn submit(&self, request: HttpRequest) -> Result<HttpResponse, Anomaly>;
}
