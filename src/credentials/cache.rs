//! Caches a provider's resolved credentials and deduplicates concurrent refreshes: N
//! simultaneous `fetch` calls against an expired cache make exactly one upstream call and
//! all of them observe its result.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::Anomaly;

use super::{Credentials, CredentialsProvider};

struct State {
    cached: Option<Credentials>,
}

/// Wraps any `CredentialsProvider`, adding the 5-minute-before-expiry refresh and
/// single-flight behavior §4.4 requires of the chain as a whole.
pub struct CachingCredentialsProvider<P> {
    inner: P,
    state: Mutex<State>,
}

impl<P: CredentialsProvider> CachingCredentialsProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            state: Mutex::new(State { cached: None }),
        }
    }
}

#[async_trait]
impl<P: CredentialsProvider> CredentialsProvider for CachingCredentialsProvider<P> {
    async fn fetch(&self) -> Result<Credentials, Anomaly> {
        // Holding the lock across the inner fetch is what gives us single-flight: a
        // second caller arriving while a refresh is in progress simply waits for it
        // instead of racing a second upstream call.
        let mut state = self.state.lock().await;

        if let Some(creds) = &state.cached {
            if !creds.is_expired_at(Utc::now()) {
                return Ok(creds.clone());
            }
        }

        let fresh = self.inner.fetch().await?;
        state.cached = Some(fresh.clone());
        Ok(fresh)
    }
}

/// A type-erased, `Arc`-shareable credentials provider, used by the client handle so it
/// doesn't need to name the concrete chain type.
pub type SharedCredentialsProvider = Arc<dyn CredentialsProvider>;
