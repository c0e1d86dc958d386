//! In-process HTTP fakes for unit tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::http::{HttpClient, HttpRequest, HttpResponse, TransportError};

/// A scripted reply.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Respond(u16, String),
    Delayed(Duration, u16, String),
    Fail,
    /// Never completes; only cancellation ends the request.
    Hang,
}

impl Reply {
    pub(crate) fn ok(body: impl Into<String>) -> Self {
        Reply::Respond(200, body.into())
    }

    pub(crate) fn status(status: u16) -> Self {
        Reply::Respond(status, String::new())
    }
}

#[derive(Debug)]
struct Route {
    prefix: String,
    script: VecDeque<Reply>,
    fallback: Option<Reply>,
}

/// Routes requests by URL prefix; scripted replies first, then the fallback.
#[derive(Debug, Default)]
pub(crate) struct FakeHttpClient {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeHttpClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reply used whenever the script for `prefix` is empty.
    pub(crate) fn on(&self, prefix: &str, reply: Reply) -> &Self {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|r| r.prefix == prefix) {
            Some(route) => route.fallback = Some(reply),
            None => routes.push(Route {
                prefix: prefix.to_string(),
                script: VecDeque::new(),
                fallback: Some(reply),
            }),
        }
        drop(routes);
        self
    }

    /// Replies consumed in order before the fallback applies.
    pub(crate) fn script(&self, prefix: &str, replies: Vec<Reply>) -> &Self {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|r| r.prefix == prefix) {
            Some(route) => route.script.extend(replies),
            None => routes.push(Route {
                prefix: prefix.to_string(),
                script: replies.into(),
                fallback: None,
            }),
        }
        drop(routes);
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.as_str().starts_with(prefix))
            .count()
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut routes = self.routes.lock();
        // Longest prefix wins so specific routes can shadow general ones.
        routes
            .iter_mut()
            .filter(|r| url.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len())
            .and_then(|route| route.script.pop_front().or_else(|| route.fallback.clone()))
    }
}

#[async_trait]
impl HttpClient for FakeHttpClient {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.to_string();
        self.requests.lock().push(request);

        match self.next_reply(&url) {
            Some(Reply::Respond(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Reply::Delayed(delay, status, body)) => {
                tokio::time::sleep(delay).await;
                Ok(HttpResponse::new(status, body))
            }
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Fail) | None => Err(TransportError::Connect {
                url,
                message: "connection refused".to_string(),
            }),
        }
    }
}

/// JSON body of a config fetch response.
pub(crate) fn config_body(namespace: &str, release_key: &str, pairs: &[(&str, &str)]) -> String {
    let configurations: serde_json::Map<String, serde_json::Value> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    serde_json::json!({
        "appId": "app",
        "cluster": "default",
        "namespaceName": namespace,
        "configurations": configurations,
        "releaseKey": release_key,
    })
    .to_string()
}

/// JSON body of a long-poll response carrying one notification.
pub(crate) fn notification_body(namespace: &str, notification_id: i64) -> String {
    serde_json::json!([{ "namespaceName": namespace, "notificationId": notification_id }]).to_string()
}
