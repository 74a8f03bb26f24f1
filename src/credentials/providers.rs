use std::env;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, trace};
use serde::Deserialize;

use crate::config;
use crate::error::{Anomaly, AnomalyKind};
use crate::http_types::{HttpRequest, HttpTransport};
use crate::transport::DEFAULT_TRANSPORT;

use super::{Credentials, CredentialsProvider};

/// Wraps a fixed, caller-supplied `Credentials` value. First link in the chain: whatever
/// the caller passed to `client(config)` explicitly always wins.
pub struct ExplicitCredentialsProvider(pub Credentials);

#[async_trait]
impl CredentialsProvider for ExplicitCredentialsProvider {
    async fn fetch(&self) -> Result<Credentials, Anomaly> {
        Ok(self.0.clone())
    }
}

/// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`.
pub struct EnvCredentialsProvider;

#[async_trait]
impl CredentialsProvider for EnvCredentialsProvider {
    async fn fetch(&self) -> Result<Credentials, Anomaly> {
        let access_key_id = env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| Anomaly::with_message(AnomalyKind::NotFound, "AWS_ACCESS_KEY_ID not set"))?;
        let secret_access_key = env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| Anomaly::with_message(AnomalyKind::NotFound, "AWS_SECRET_ACCESS_KEY not set"))?;
        let mut creds = Credentials::new(access_key_id, secret_access_key);
        if let Ok(token) = env::var("AWS_SESSION_TOKEN") {
            creds = creds.with_session_token(token);
        }
        Ok(creds)
    }
}

/// The historical JVM-system-property names (`aws.accessKeyId`, `aws.secretAccessKey`,
/// `aws.sessionToken`), resolved here as plain environment variables with the dotted name
/// preserved — see the "system properties" Open Question decision in `DESIGN.md`.
pub struct SystemPropertyCredentialsProvider;

#[async_trait]
impl CredentialsProvider for SystemPropertyCredentialsProvider {
    async fn fetch(&self) -> Result<Credentials, Anomaly> {
        let access_key_id = env::var("aws.accessKeyId")
            .map_err(|_| Anomaly::with_message(AnomalyKind::NotFound, "aws.accessKeyId not set"))?;
        let secret_access_key = env::var("aws.secretAccessKey")
            .map_err(|_| Anomaly::with_message(AnomalyKind::NotFound, "aws.secretAccessKey not set"))?;
        let mut creds = Credentials::new(access_key_id, secret_access_key);
        if let Ok(token) = env::var("aws.sessionToken") {
            creds = creds.with_session_token(token);
        }
        Ok(creds)
    }
}

/// Shared config/credentials profile file, honoring `AWS_PROFILE` and friends. Roles,
/// `credential_process`, and SSO are read for presence only (resolving them fully would
/// mean shelling out or running an OIDC flow, out of scope for this collaborator) — if
/// they're present without a plain `aws_access_key_id`, the provider reports `fault` so
/// the chain can fall through rather than silently returning garbage.
pub struct ProfileCredentialsProvider;

#[async_trait]
impl CredentialsProvider for ProfileCredentialsProvider {
    async fn fetch(&self) -> Result<Credentials, Anomaly> {
        let access_key_id = config::lookup("aws_access_key_id")
            .await
            .ok_or_else(|| Anomaly::with_message(AnomalyKind::NotFound, "no profile credentials found"))?;
        let secret_access_key = config::lookup("aws_secret_access_key")
            .await
            .ok_or_else(|| Anomaly::with_message(AnomalyKind::Incorrect, "profile missing aws_secret_access_key"))?;
        let mut creds = Credentials::new(access_key_id, secret_access_key);
        if let Some(token) = config::lookup("aws_session_token").await {
            creds = creds.with_session_token(token);
        }
        Ok(creds)
    }
}

#[derive(Deserialize)]
struct EcsCredentialsResponse {
    #[serde(rename = "AccessKeyId")]
    access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: String,
    #[serde(rename = "Token")]
    token: String,
    #[serde(rename = "Expiration")]
    expiration: DateTime<Utc>,
}

/// ECS task-role credentials, fetched from the relative or full container credentials
/// endpoint named by `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` / `_FULL_URI`.
pub struct EcsCredentialsProvider;

impl EcsCredentialsProvider {
    fn endpoint() -> Option<String> {
        if let Ok(relative) = env::var("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI") {
            return Some(format!("http://169.254.170.2{}", relative));
        }
        env::var("AWS_CONTAINER_CREDENTIALS_FULL_URI").ok()
    }
}

#[async_trait]
impl CredentialsProvider for EcsCredentialsProvider {
    async fn fetch(&self) -> Result<Credentials, Anomaly> {
        let uri = Self::endpoint()
            .ok_or_else(|| Anomaly::with_message(AnomalyKind::NotFound, "no ECS container credentials URI set"))?;
        trace!("fetching ECS task-role credentials from {}", uri);

        let request = HttpRequest::new(http::Method::GET, uri.parse().map_err(Anomaly::fault)?);
        let response = DEFAULT_TRANSPORT.submit(request).await?;
        let parsed: EcsCredentialsResponse = serde_json::from_slice(&response.body)
            .map_err(|e| Anomaly::with_message(AnomalyKind::Fault, format!("invalid ECS credentials response: {}", e)))?;

        Ok(Credentials::new(parsed.access_key_id, parsed.secret_access_key)
            .with_session_token(parsed.token)
            .with_expiration(parsed.expiration))
    }
}

#[derive(Deserialize)]
struct Imdsv2CredentialsResponse {
    #[serde(rename = "AccessKeyId")]
    access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: String,
    #[serde(rename = "Token")]
    token: String,
    #[serde(rename = "Expiration")]
    expiration: DateTime<Utc>,
}

const IMDS_BASE: &str = "http://169.254.169.254";

/// EC2 Instance Metadata Service v2 role credentials: a `PUT` for a session token,
/// followed by a `GET` for the role name and then its credentials document.
pub struct Imdsv2CredentialsProvider;

#[async_trait]
impl CredentialsProvider for Imdsv2CredentialsProvider {
    async fn fetch(&self) -> Result<Credentials, Anomaly> {
        if env::var("AWS_EC2_METADATA_DISABLED").as_deref() == Ok("true") {
            return Err(Anomaly::with_message(AnomalyKind::NotFound, "EC2 metadata disabled"));
        }

        let token = fetch_imds_token().await?;
        let role = fetch_imds(
            "/latest/meta-data/iam/security-credentials/",
            &token,
        )
        .await?;
        let role = String::from_utf8_lossy(&role).trim().to_string();
        if role.is_empty() {
            return Err(Anomaly::with_message(AnomalyKind::NotFound, "no IAM role attached to this instance"));
        }

        let doc = fetch_imds(
            &format!("/latest/meta-data/iam/security-credentials/{}", role),
            &token,
        )
        .await?;
        let parsed: Imdsv2CredentialsResponse = serde_json::from_slice(&doc)
            .map_err(|e| Anomaly::with_message(AnomalyKind::Fault, format!("invalid IMDS credentials document: {}", e)))?;

        debug!("resolved IMDS role credentials for role '{}'", role);
        Ok(Credentials::new(parsed.access_key_id, parsed.secret_access_key)
            .with_session_token(parsed.token)
            .with_expiration(parsed.expiration))
    }
}

async fn fetch_imds_token() -> Result<String, Anomaly> {
    let mut request = HttpRequest::new(
        http::Method::PUT,
        format!("{}/latest/api/token", IMDS_BASE).parse().map_err(Anomaly::fault)?,
    );
    request
        .headers
        .insert("x-aws-ec2-metadata-token-ttl-seconds", "21600".parse().unwrap());
    let response = DEFAULT_TRANSPORT.submit(request).await?;
    Ok(String::from_utf8_lossy(&response.body).trim().to_string())
}

async fn fetch_imds(path: &str, token: &str) -> Result<bytes::Bytes, Anomaly> {
    let mut request = HttpRequest::new(
        http::Method::GET,
        format!("{}{}", IMDS_BASE, path).parse().map_err(Anomaly::fault)?,
    );
    request
        .headers
        .insert("x-aws-ec2-metadata-token", token.parse().map_err(Anomaly::fault)?);
    let response = DEFAULT_TRANSPORT.submit(request).await?;
    Ok(response.body)
}
