//! Request signing for access-key protected namespaces.
//!
//! The signature is `base64(HMAC-SHA1(secret, timestamp + "\n" + pathWithQuery))`
//! and travels in the `Authorization: Apollo {appId}:{signature}` header next to
//! a `Timestamp` header carrying the same millisecond timestamp.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use thiserror::Error;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const TIMESTAMP_HEADER: &str = "Timestamp";

const AUTHORIZATION_FORMAT_PREFIX: &str = "Apollo";
const DELIMITER: &str = "\n";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("HMAC initialization failed: {0}")]
    InvalidKey(String),
}

/// Compute the signature for a path-and-query string.
pub fn sign(timestamp_millis: &str, path_with_query: &str, secret: &str) -> Result<String, SignError> {
    let mut mac = <HmacSha1 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|e| SignError::InvalidKey(e.to_string()))?;
    mac.update(timestamp_millis.as_bytes());
    mac.update(DELIMITER.as_bytes());
    mac.update(path_with_query.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Path plus `?query` (when present) of a URL, the part covered by the signature.
pub fn path_with_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Build the `Authorization` and `Timestamp` headers for a request to `url`.
pub fn build_headers(url: &Url, app_id: &str, secret: &str) -> Result<Vec<(String, String)>, SignError> {
    build_headers_at(url, app_id, secret, current_millis())
}

/// Same as [`build_headers`] with an explicit timestamp.
pub fn build_headers_at(
    url: &Url,
    app_id: &str,
    secret: &str,
    timestamp_millis: u128,
) -> Result<Vec<(String, String)>, SignError> {
    let timestamp = timestamp_millis.to_string();
    let signature = sign(&timestamp, &path_with_query(url), secret)?;
    Ok(vec![
        (
            AUTHORIZATION_HEADER.to_string(),
            format!("{} {}:{}", AUTHORIZATION_FORMAT_PREFIX, app_id, signature),
        ),
        (TIMESTAMP_HEADER.to_string(), timestamp),
    ])
}

fn current_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "df23df3f59884980844ff3dada30fa97";

    #[test]
    fn test_signature_fixture() {
        let signature = sign(
            "1576478257344",
            "/configs/100004458/default/application?ip=10.0.0.1",
            SECRET,
        )
        .unwrap();
        assert_eq!(signature, "EoKyziXvKqzHgwx+ijDJwgVTDgE=");
    }

    #[test]
    fn test_any_secret_length_signs() {
        assert!(sign("1", "/configs/a/b/c", "").is_ok());
        assert!(sign("1", "/configs/a/b/c", &"k".repeat(200)).is_ok());
    }

    #[test]
    fn test_path_with_query() {
        let url = Url::parse("http://localhost:8080/configs/100004458/default/application?ip=10.0.0.1").unwrap();
        assert_eq!(path_with_query(&url), "/configs/100004458/default/application?ip=10.0.0.1");

        let url = Url::parse("http://localhost:8080/services/config").unwrap();
        assert_eq!(path_with_query(&url), "/services/config");
    }

    #[test]
    fn test_build_headers() {
        let url = Url::parse("http://config:8080/configs/100004458/default/application?ip=10.0.0.1").unwrap();
        let headers = build_headers_at(&url, "100004458", SECRET, 1576478257344).unwrap();

        assert_eq!(headers[0].0, AUTHORIZATION_HEADER);
        assert_eq!(headers[0].1, "Apollo 100004458:EoKyziXvKqzHgwx+ijDJwgVTDgE=");
        assert_eq!(headers[1], (TIMESTAMP_HEADER.to_string(), "1576478257344".to_string()));
    }

    #[test]
    fn test_signature_changes_with_timestamp() {
        let a = sign("1", "/configs/a/b/c", SECRET).unwrap();
        let b = sign("2", "/configs/a/b/c", SECRET).unwrap();
        assert_ne!(a, b);
    }
}
