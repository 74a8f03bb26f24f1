//! The SigV4/S3v4 request signer. Grounded on the canonicalization rules of the
//! scratchstack signature-verification algorithm, run in reverse: here we *build* the
//! canonical request and Authorization header instead of checking one a caller sent.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use sha2::{Digest, Sha256};

use crate::credentials::Credentials;
use crate::error::Anomaly;
use crate::http_types::HttpRequest;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// RFC 3986 unreserved characters: alphanumeric plus `-._~`. Everything else gets
/// percent-encoded, mirroring the teacher ecosystem's `BASE_SET` pattern from the wider
/// `aws-sigv4` lineage.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// The same unreserved set, but without the `/` exception used for whole URI paths — used
/// for query keys/values and individual path segments.
fn encode(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s, UNRESERVED).to_string()
}

/// Percent-decodes a single path segment without the query-string `+`-means-space
/// rule: a literal `+` in a URI path stays a `+`.
fn decode_path_segment(segment: &str) -> String {
    percent_encoding::percent_decode_str(segment).decode_utf8_lossy().to_string()
}

/// Normalizes `path`, which has already been percent-encoded once by the protocol
/// dispatcher when it built the request URI. Each segment is decoded back to its raw form
/// and re-encoded exactly once, which both canonicalizes escaping (uppercase hex, minimal
/// escaped set) and collapses repeated `/` separators — it does not add a second encoding
/// pass on top of the one already present on the wire. `double_encode` then controls
/// whether a *second* pass is layered on for services that sign the already-escaped path
/// a second time (every service except S3).
fn canonical_uri_path(path: &str, double_encode: bool) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len() - 1;
    let normalized: String = segments
        .iter()
        .enumerate()
        .filter(|(i, segment)| !segment.is_empty() || *i == 0 || *i == last)
        .map(|(_, segment)| encode(&decode_path_segment(segment)))
        .collect::<Vec<_>>()
        .join("/");
    if double_encode {
        normalized.split('/').map(encode).collect::<Vec<_>>().join("/")
    } else {
        normalized
    }
}

fn canonical_query_string(query: Option<&str>) -> String {
    let query = match query {
        Some(q) if !q.is_empty() => q,
        _ => return String::new(),
    };

    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode(k), decode(v)),
            None => (decode(pair), String::new()),
        })
        .collect();

    pairs.sort_by(|a, b| a.cmp(b));

    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", encode(&k), encode(&v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn decode(s: &str) -> String {
    percent_encoding::percent_decode_str(s)
        .decode_utf8_lossy()
        .replace('+', " ")
}

/// Headers eligible for signing: `host`, `x-amz-date`, and anything starting with
/// `x-amz-` except `x-amz-client-context` (used by mobile SDK analytics, never signed).
fn signable_headers(request: &HttpRequest) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (name, value) in request.headers.iter() {
        let lower = name.as_str().to_ascii_lowercase();
        if lower == "host" || lower == "x-amz-date" || (lower.starts_with("x-amz-") && lower != "x-amz-client-context")
        {
            let value = String::from_utf8_lossy(value.as_bytes());
            let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
            out.entry(lower)
                .and_modify(|existing: &mut String| {
                    existing.push(',');
                    existing.push_str(&collapsed);
                })
                .or_insert(collapsed);
        }
    }
    out
}

fn canonical_headers(headers: &BTreeMap<String, String>) -> String {
    headers.iter().map(|(k, v)| format!("{}:{}\n", k, v)).collect()
}

fn signed_headers_list(headers: &BTreeMap<String, String>) -> String {
    headers.keys().cloned().collect::<Vec<_>>().join(";")
}

fn hex_sha256(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Options governing signer behavior that vary by service/signature-version, rather than
/// by request.
#[derive(Debug, Clone)]
pub struct SigningOptions {
    /// `true` for `signatureVersion = "s3v4"`: single-pass URI encoding and an
    /// `x-amz-content-sha256` header unconditionally.
    pub is_s3: bool,
    /// Skip hashing the body and send `UNSIGNED-PAYLOAD` instead (S3 streaming uploads).
    pub unsigned_payload: bool,
}

impl Default for SigningOptions {
    fn default() -> Self {
        Self {
            is_s3: false,
            unsigned_payload: false,
        }
    }
}

/// Signs `request` in place for `service`/`region` using `credentials`, at the instant
/// `now`. Adds `x-amz-date` (if absent), `x-amz-security-token` (for session credentials),
/// `x-amz-content-sha256` (per `options`), and the `authorization` header.
pub fn sign(
    request: &mut HttpRequest,
    service: &str,
    region: &str,
    credentials: &Credentials,
    now: DateTime<Utc>,
    options: &SigningOptions,
) -> Result<(), Anomaly> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();

    if !request.headers.contains_key("x-amz-date") {
        request
            .headers
            .insert("x-amz-date", amz_date.parse().map_err(Anomaly::fault)?);
    }
    if let Some(token) = &credentials.session_token {
        request
            .headers
            .insert("x-amz-security-token", token.parse().map_err(Anomaly::fault)?);
    }

    let payload_hash = if options.unsigned_payload {
        UNSIGNED_PAYLOAD.to_string()
    } else {
        hex_sha256(&request.body)
    };
    if options.is_s3 || request.headers.contains_key("x-amz-content-sha256") {
        request
            .headers
            .insert("x-amz-content-sha256", payload_hash.parse().map_err(Anomaly::fault)?);
    }

    if !request.headers.contains_key("host") {
        request
            .headers
            .insert("host", request.host().parse().map_err(Anomaly::fault)?);
    }

    let headers = signable_headers(request);
    let signed_headers = signed_headers_list(&headers);

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method.as_str(),
        canonical_uri_path(request.path(), !options.is_s3),
        canonical_query_string(request.query()),
        canonical_headers(&headers),
        signed_headers,
        payload_hash,
    );

    let credential_scope = format!("{}/{}/{}/aws4_request", date_stamp, region, service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        now.to_rfc3339_opts(SecondsFormat::Secs, true).replace(['-', ':'], ""),
        credential_scope,
        hex_sha256(canonical_request.as_bytes()),
    );

    let k_date = hmac_sha256(format!("AWS4{}", credentials.secret_access_key).as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    let k_signing = hmac_sha256(&k_service, b"aws4_request");
    let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes()));

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, credentials.access_key_id, credential_scope, signed_headers, signature
    );
    request
        .headers
        .insert("authorization", authorization.parse().map_err(Anomaly::fault)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_types::HttpRequest;
    use chrono::TimeZone;
    use http::Method;

    #[test]
    fn signs_a_simple_get_request() {
        let creds = Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY");
        let now = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();
        let mut request = HttpRequest::new(Method::GET, "https://example.amazonaws.com/".parse().unwrap());
        request.headers.insert("host", "example.amazonaws.com".parse().unwrap());

        sign(&mut request, "service", "us-east-1", &creds, now, &SigningOptions::default()).unwrap();

        let auth = request.headers.get("authorization").unwrap().to_str().unwrap();
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request"));
        assert!(auth.contains("SignedHeaders=host;x-amz-date"));
    }

    #[test]
    fn adds_session_token_header() {
        let creds = Credentials::new("AKID", "secret").with_session_token("token-value");
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut request = HttpRequest::new(Method::GET, "https://example.amazonaws.com/".parse().unwrap());
        request.headers.insert("host", "example.amazonaws.com".parse().unwrap());

        sign(&mut request, "s3", "us-west-2", &creds, now, &SigningOptions { is_s3: true, unsigned_payload: false })
            .unwrap();

        assert_eq!(request.headers.get("x-amz-security-token").unwrap(), "token-value");
        assert!(request.headers.contains_key("x-amz-content-sha256"));
    }

    #[test]
    fn canonical_uri_path_normalizes_without_double_encoding_for_s3() {
        let path = "/my%20bucket/key%2Bwith%2Bplus/100%25";
        assert_eq!(canonical_uri_path(path, false), path);
    }

    #[test]
    fn canonical_uri_path_double_encodes_for_standard_services() {
        let path = "/a b/c+d";
        assert_eq!(canonical_uri_path(path, true), "/a%2520b/c%252Bd");
    }

    #[test]
    fn canonical_uri_path_collapses_repeated_slashes() {
        assert_eq!(canonical_uri_path("/a//b", false), "/a/b");
    }

    #[test]
    fn signs_request_with_reserved_characters_in_path_once_for_s3() {
        let creds = Credentials::new("AKID", "secret");
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let mut request = HttpRequest::new(
            Method::GET,
            "https://bucket.s3.amazonaws.com/my%20object%2Bname".parse().unwrap(),
        );
        request.headers.insert("host", "bucket.s3.amazonaws.com".parse().unwrap());

        sign(&mut request, "s3", "us-east-1", &creds, now, &SigningOptions { is_s3: true, unsigned_payload: false })
            .unwrap();

        let auth = request.headers.get("authorization").unwrap().to_str().unwrap();
        assert!(auth.contains("Signature="));
        assert_eq!(canonical_uri_path(request.path(), false), "/my%20object%2Bname");
    }
}
