//! The uniform failure value ("anomaly") that flows through the pipeline as an ordinary
//! return value. Nothing in this crate raises an anomaly as a Rust panic or a thrown
//! error from inside the invocation pipeline; every fallible pipeline stage returns
//! `Result<T, Anomaly>` and the engine converts stray `Err` values from collaborators
//! into `AnomalyKind::Fault` at the task boundary that owns them.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};

use serde_json::Value as JsonValue;

/// The closed set of failure categories a caller can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    Busy,
    Interrupted,
    Unavailable,
    Incorrect,
    Forbidden,
    NotFound,
    Conflict,
    Unsupported,
    Fault,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Interrupted => "interrupted",
            Self::Unavailable => "unavailable",
            Self::Incorrect => "incorrect",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not-found",
            Self::Conflict => "conflict",
            Self::Unsupported => "unsupported",
            Self::Fault => "fault",
        }
    }
}

impl Display for AnomalyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A uniform failure value. Anomalies are plain data: they carry a category, an optional
/// human-readable message, and a bag of extra fields for category-specific detail
/// (schema diagnostics, the underlying cause, etc).
#[derive(Debug, Clone)]
pub struct Anomaly {
    pub category: AnomalyKind,
    pub message: Option<String>,
    pub extra: HashMap<String, JsonValue>,
}

impl Anomaly {
    pub fn new(category: AnomalyKind) -> Self {
        Self {
            category,
            message: None,
            extra: HashMap::new(),
        }
    }

    pub fn with_message(category: AnomalyKind, message: impl Into<String>) -> Self {
        Self {
            category,
            message: Some(message.into()),
            extra: HashMap::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: JsonValue) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// Wraps an arbitrary error from a collaborator into a `fault` anomaly, attaching the
    /// cause's `Display` text so it remains observable even after the original error type
    /// is erased.
    pub fn fault<E: StdError>(cause: E) -> Self {
        Self::with_message(AnomalyKind::Fault, cause.to_string())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::with_message(AnomalyKind::Unsupported, message)
    }

    pub fn incorrect(message: impl Into<String>) -> Self {
        Self::with_message(AnomalyKind::Incorrect, message)
    }

    pub fn is_retriable_default(&self) -> bool {
        matches!(
            self.category,
            AnomalyKind::Busy | AnomalyKind::Interrupted | AnomalyKind::Unavailable
        )
    }
}

impl Display for Anomaly {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(m) => write!(f, "{}: {}", self.category, m),
            None => write!(f, "{}", self.category),
        }
    }
}

impl StdError for Anomaly {}

impl From<std::io::Error> for Anomaly {
    fn from(e: std::io::Error) -> Self {
        Anomaly::fault(e)
    }
}
