//! Credentials and the provider chain that resolves them.

mod cache;
mod chain;
mod providers;

pub use cache::CachingCredentialsProvider;
pub use chain::default_chain;
pub use providers::{
    EcsCredentialsProvider, EnvCredentialsProvider, ExplicitCredentialsProvider, Imdsv2CredentialsProvider,
    ProfileCredentialsProvider, SystemPropertyCredentialsProvider,
};

use std::fmt::{self, Debug, Formatter};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Anomaly;

/// A resolved set of AWS credentials. `expiration` of `None` means non-expiring (e.g.
/// long-lived access keys); anything else is an absolute instant after which the
/// credentials must be refreshed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
            expiration: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// True when expiration is set and less than 5 minutes away (the refresh buffer
    /// every provider and the cache both honor).
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            Some(exp) => now >= exp - chrono::Duration::minutes(5),
            None => false,
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// A credentials source. Providers compose into a chain (§4.4): the first one that
/// resolves successfully wins.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    async fn fetch(&self) -> Result<Credentials, Anomaly>;
}
