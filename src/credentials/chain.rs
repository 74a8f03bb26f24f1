use std::sync::Arc;

use async_trait::async_trait;
use log::trace;

use crate::error::{Anomaly, AnomalyKind};

use super::cache::CachingCredentialsProvider;
use super::providers::{
    EcsCredentialsProvider, EnvCredentialsProvider, Imdsv2CredentialsProvider, ProfileCredentialsProvider,
    SystemPropertyCredentialsProvider,
};
use super::{Credentials, CredentialsProvider};

/// Tries each member provider in order, returning the first success. Any failure —
/// not configured, a partial/malformed credential pair, an unreachable metadata endpoint —
/// is silent and falls through to the next member; an anomaly only surfaces once the whole
/// chain is exhausted.
struct ChainCredentialsProvider {
    members: Vec<Box<dyn CredentialsProvider>>,
}

#[async_trait]
impl CredentialsProvider for ChainCredentialsProvider {
    async fn fetch(&self) -> Result<Credentials, Anomaly> {
        for member in &self.members {
            match member.fetch().await {
                Ok(creds) => return Ok(creds),
                Err(e) => {
                    trace!("credentials provider skipped: {}", e);
                    continue;
                }
            }
        }
        Err(Anomaly::with_message(AnomalyKind::NotFound, "no credentials found"))
    }
}

/// The default provider chain from §4.4, minus the explicit/caller-supplied slot (the
/// client handle layers that on separately), wrapped in the 5-minute caching/single-flight
/// behavior.
pub fn default_chain() -> Arc<dyn CredentialsProvider> {
    Arc::new(CachingCredentialsProvider::new(ChainCredentialsProvider {
        members: vec![
            Box::new(EnvCredentialsProvider),
            Box::new(SystemPropertyCredentialsProvider),
            Box::new(ProfileCredentialsProvider),
            Box::new(EcsCredentialsProvider),
            Box::new(Imdsv2CredentialsProvider),
        ],
    }))
}
