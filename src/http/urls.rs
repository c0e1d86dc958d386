//! URL construction for the three remote endpoints.
//!
//! # Endpoints
//! - `GET {meta}/services/config?appId=&ip=` (config-service discovery)
//! - `GET {service}/configs/{appId}/{cluster}/{namespace}?releaseKey=&ip=&label=&dataCenter=&messages=`
//! - `GET {service}/notifications/v2?cluster=&appId=&ip=&dataCenter=&notifications=`
//!
//! Path segments are percent-encoded; absent query values are omitted.

use url::Url;

use crate::model::Namespace;

/// Identity parameters attached to every config and notification request.
#[derive(Debug, Clone, Default)]
pub struct ClientIdentity {
    pub ip: Option<String>,
    pub label: Option<String>,
    pub data_center: Option<String>,
}

/// URL for fetching a namespace's configuration.
pub fn config_url(
    service: &str,
    namespace: &Namespace,
    release_key: Option<&str>,
    messages: Option<&str>,
    identity: &ClientIdentity,
) -> Result<Url, url::ParseError> {
    build(
        service,
        &["configs", namespace.app_id(), namespace.cluster(), namespace.name()],
        &[
            ("releaseKey", release_key),
            ("ip", identity.ip.as_deref()),
            ("label", identity.label.as_deref()),
            ("dataCenter", identity.data_center.as_deref()),
            ("messages", messages),
        ],
    )
}

/// URL for a long-poll notification request.
pub fn notifications_url(
    service: &str,
    app_id: &str,
    cluster: &str,
    notifications: &str,
    identity: &ClientIdentity,
) -> Result<Url, url::ParseError> {
    build(
        service,
        &["notifications", "v2"],
        &[
            ("cluster", Some(cluster)),
            ("appId", Some(app_id)),
            ("ip", identity.ip.as_deref()),
            ("dataCenter", identity.data_center.as_deref()),
            ("notifications", Some(notifications)),
        ],
    )
}

/// URL for listing config services registered with a meta server.
pub fn services_url(meta: &str, app_id: &str, ip: Option<&str>) -> Result<Url, url::ParseError> {
    build(meta, &["services", "config"], &[("appId", Some(app_id)), ("ip", ip)])
}

fn build(base: &str, segments: &[&str], query: &[(&str, Option<&str>)]) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base.trim())?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?;
        path.pop_if_empty().extend(segments);
    }

    let pairs: Vec<(&str, &str)> = query
        .iter()
        .filter_map(|(k, v)| v.filter(|v| !v.is_empty()).map(|v| (*k, v)))
        .collect();
    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(ip: &str) -> ClientIdentity {
        ClientIdentity {
            ip: Some(ip.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_url_matches_signed_path() {
        let ns = Namespace::new("100004458", "default", "application");
        let url = config_url("http://localhost:8080", &ns, None, None, &identity("10.0.0.1")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/configs/100004458/default/application?ip=10.0.0.1");
    }

    #[test]
    fn test_config_url_with_trailing_slash_and_release_key() {
        let ns = Namespace::new("app", "default", "application");
        let url = config_url("http://localhost:8080/", &ns, Some("rk-1"), None, &ClientIdentity::default()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/configs/app/default/application?releaseKey=rk-1");
    }

    #[test]
    fn test_path_segments_are_escaped() {
        let ns = Namespace::new("app", "my cluster", "a/b");
        let url = config_url("http://localhost:8080", &ns, None, None, &ClientIdentity::default()).unwrap();
        assert_eq!(url.path(), "/configs/app/my%20cluster/a%2Fb");
        assert!(url.query().is_none());
    }

    #[test]
    fn test_notifications_url() {
        let url = notifications_url(
            "http://localhost:8080",
            "app",
            "default",
            r#"[{"namespaceName":"application","notificationId":-1}]"#,
            &ClientIdentity::default(),
        )
        .unwrap();
        assert_eq!(url.path(), "/notifications/v2");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("cluster".into(), "default".into()));
        assert_eq!(pairs[1], ("appId".into(), "app".into()));
        assert_eq!(pairs[2].1, r#"[{"namespaceName":"application","notificationId":-1}]"#);
    }

    #[test]
    fn test_services_url() {
        let url = services_url("http://meta:8080", "app", Some("10.0.0.1")).unwrap();
        assert_eq!(url.as_str(), "http://meta:8080/services/config?appId=app&ip=10.0.0.1");
    }

    #[test]
    fn test_invalid_base_is_rejected() {
        assert!(services_url("not a url", "app", None).is_err());
    }
}
