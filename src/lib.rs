#![warn(clippy::all)]
#![deny(rustdoc::broken_intra_doc_links)]

//! A data-driven, protocol-agnostic AWS service client engine. Rather than generating a
//! module per AWS service, a single `Client` loads a service's JSON descriptor at
//! runtime and dispatches requests through one of a handful of wire-protocol
//! implementations (`json`, `rest-json`, `rest-xml`, `query`, `ec2`), driven entirely by
//! the descriptor's shape and operation metadata.

pub mod client;
pub mod config;
pub mod credentials;
pub mod descriptor;
pub mod endpoint;
pub mod error;
pub mod http_types;
pub mod protocol;
pub mod region;
pub mod request_id;
pub mod retry;
pub mod shape_codec;
pub mod signing;
pub mod test_double;
pub mod transport;
pub mod value;

pub use client::{Client, ClientConfig, ResultReceiver};
pub use descriptor::ServiceDescriptor;
pub use error::{Anomaly, AnomalyKind};
pub use request_id::RequestId;
pub use value::{Value, ValueMap};
