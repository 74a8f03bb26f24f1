//! Region resolution: explicit value, then environment, then system property, then
//! profile file, then EC2 instance metadata — the same provider-chain shape as
//! credentials, just resolving to a plain string.

mod providers;

pub use providers::{
    EnvRegionProvider, ExplicitRegionProvider, Imdsv2RegionProvider, ProfileRegionProvider,
    SystemPropertyRegionProvider,
};

use std::sync::Arc;

use async_trait::async_trait;
use log::trace;

use crate::error::{Anomaly, AnomalyKind};

/// A region source; §4.4's shape, specialized to `String`.
#[async_trait]
pub trait RegionProvider: Send + Sync {
    async fn fetch(&self) -> Result<String, Anomaly>;
}

struct ChainRegionProvider {
    members: Vec<Box<dyn RegionProvider>>,
}

#[async_trait]
impl RegionProvider for ChainRegionProvider {
    async fn fetch(&self) -> Result<String, Anomaly> {
        for member in &self.members {
            match member.fetch().await {
                Ok(region) => return Ok(region),
                Err(e) => {
                    trace!("region provider skipped: {}", e);
                    continue;
                }
            }
        }
        Err(Anomaly::with_message(AnomalyKind::Fault, "no region found"))
    }
}

/// The default provider chain from §4.4 (minus the explicit/caller-supplied slot, which
/// the client handle layers on separately), with the instance-metadata provider
/// memoizing concurrent lookups the way §4.4 requires.
pub fn default_chain() -> Arc<dyn RegionProvider> {
    Arc::new(ChainRegionProvider {
        members: vec![
            Box::new(EnvRegionProvider),
            Box::new(SystemPropertyRegionProvider),
            Box::new(ProfileRegionProvider),
            Box::new(Imdsv2RegionProvider::new()),
        ],
    })
}
