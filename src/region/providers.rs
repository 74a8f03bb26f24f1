use std::env;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::config;
use crate::error::{Anomaly, AnomalyKind};
use crate::http_types::{HttpRequest, HttpTransport};
use crate::transport::DEFAULT_TRANSPORT;

use super::RegionProvider;

pub struct ExplicitRegionProvider(pub String);

#[async_trait]
impl RegionProvider for ExplicitRegionProvider {
    async fn fetch(&self) -> Result<String, Anomaly> {
        Ok(self.0.clone())
    }
}

/// `AWS_REGION`, falling back to `AWS_DEFAULT_REGION`.
pub struct EnvRegionProvider;

#[async_trait]
impl RegionProvider for EnvRegionProvider {
    async fn fetch(&self) -> Result<String, Anomaly> {
        env::var("AWS_REGION")
            .or_else(|_| env::var("AWS_DEFAULT_REGION"))
            .map_err(|_| Anomaly::with_message(AnomalyKind::NotFound, "AWS_REGION not set"))
    }
}

/// The historical `aws.region` system property, read as an environment variable — same
/// Open Question decision as `SystemPropertyCredentialsProvider`.
pub struct SystemPropertyRegionProvider;

#[async_trait]
impl RegionProvider for SystemPropertyRegionProvider {
    async fn fetch(&self) -> Result<String, Anomaly> {
        env::var("aws.region").map_err(|_| Anomaly::with_message(AnomalyKind::NotFound, "aws.region not set"))
    }
}

/// The active profile's `region =` line in the shared config file.
pub struct ProfileRegionProvider;

#[async_trait]
impl RegionProvider for ProfileRegionProvider {
    async fn fetch(&self) -> Result<String, Anomaly> {
        config::lookup("region")
            .await
            .ok_or_else(|| Anomaly::with_message(AnomalyKind::NotFound, "no region in profile"))
    }
}

/// EC2 instance metadata's placement region. Memoizing: concurrent `fetch` calls all
/// await the same in-flight upstream request rather than each making their own.
pub struct Imdsv2RegionProvider {
    cached: OnceCell<String>,
}

impl Imdsv2RegionProvider {
    pub fn new() -> Self {
        Self { cached: OnceCell::new() }
    }
}

impl Default for Imdsv2RegionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegionProvider for Imdsv2RegionProvider {
    async fn fetch(&self) -> Result<String, Anomaly> {
        if env::var("AWS_EC2_METADATA_DISABLED").as_deref() == Ok("true") {
            return Err(Anomaly::with_message(AnomalyKind::NotFound, "EC2 metadata disabled"));
        }

        self.cached
            .get_or_try_init(fetch_region_from_imds)
            .await
            .cloned()
    }
}

async fn fetch_region_from_imds() -> Result<String, Anomaly> {
    let mut token_request = HttpRequest::new(
        http::Method::PUT,
        "http://169.254.169.254/latest/api/token".parse().map_err(Anomaly::fault)?,
    );
    token_request
        .headers
        .insert("x-aws-ec2-metadata-token-ttl-seconds", "21600".parse().unwrap());
    let token_response = DEFAULT_TRANSPORT.submit(token_request).await?;
    let token = String::from_utf8_lossy(&token_response.body).trim().to_string();

    let mut region_request = HttpRequest::new(
        http::Method::GET,
        "http://169.254.169.254/latest/meta-data/placement/region"
            .parse()
            .map_err(Anomaly::fault)?,
    );
    region_request
        .headers
        .insert("x-aws-ec2-metadata-token", token.parse().map_err(Anomaly::fault)?);
    let region_response = DEFAULT_TRANSPORT.submit(region_request).await?;
    Ok(String::from_utf8_lossy(&region_response.body).trim().to_string())
}
