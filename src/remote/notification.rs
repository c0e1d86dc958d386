//! Long-poll change notifications.
//!
//! # States
//! ```text
//! IDLE → POLLING → NOTIFIED  → POLLING   (new id: handler asked to re-fetch)
//!                → TIMED_OUT → POLLING   (304, immediately)
//!                → ERROR     → POLLING   (after growing backoff, forever)
//! ```
//!
//! # Design Decisions
//! - Ids only move forward; stale or repeated ids are dropped
//! - The in-flight poll and the error backoff both abort on cancellation
//! - Ids live in memory only; a restart begins from the sentinel again

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::discovery::ServiceLocator;
use crate::http::{urls, ClientIdentity, HttpClient, HttpRequest};
use crate::model::Namespace;
use crate::remote::types::{FetchError, NotificationDto, NotificationMessages, INIT_NOTIFICATION_ID};
use crate::resilience::SchedulePolicy;
use crate::security::signer;

/// Receives accepted notifications.
pub trait NotificationHandler: Send + Sync {
    fn on_notified(&self, namespace: &Namespace, notification_id: i64);
}

/// Latest known notification id and messages for one namespace.
#[derive(Debug)]
pub struct NotificationState {
    notification_id: AtomicI64,
    messages: Mutex<NotificationMessages>,
}

impl NotificationState {
    pub fn new() -> Self {
        Self::with_id(INIT_NOTIFICATION_ID)
    }

    pub fn with_id(notification_id: i64) -> Self {
        Self {
            notification_id: AtomicI64::new(notification_id),
            messages: Mutex::new(NotificationMessages::default()),
        }
    }

    pub fn notification_id(&self) -> i64 {
        self.notification_id.load(Ordering::Acquire)
    }

    /// Move to `id` if it is newer. Returns false for stale or repeated ids.
    pub fn advance(&self, id: i64) -> bool {
        self.notification_id
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| (id > current).then_some(id))
            .is_ok()
    }

    pub fn merge_messages(&self, messages: &NotificationMessages) {
        self.messages.lock().merge_from(messages);
    }

    pub fn messages(&self) -> NotificationMessages {
        self.messages.lock().clone()
    }
}

impl Default for NotificationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single long-poll round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Notified {
        notification_id: i64,
        messages: Option<NotificationMessages>,
    },
    TimedOut,
    Error(FetchError),
}

/// Long-polls the config service for one namespace.
#[derive(Debug)]
pub struct NotificationClient {
    namespace: Namespace,
    http: Arc<dyn HttpClient>,
    services: Arc<ServiceLocator>,
    identity: ClientIdentity,
    secret: Option<String>,
    long_poll_timeout: Duration,
    failure_base: Duration,
    failure_max: Duration,
    state: Arc<NotificationState>,
}

impl NotificationClient {
    pub fn new(
        namespace: Namespace,
        http: Arc<dyn HttpClient>,
        services: Arc<ServiceLocator>,
        config: &ClientConfig,
        state: Arc<NotificationState>,
    ) -> Self {
        Self {
            namespace,
            http,
            services,
            identity: ClientIdentity {
                ip: config.client_ip.clone(),
                label: None,
                data_center: config.data_center.clone(),
            },
            secret: config.secret.clone(),
            long_poll_timeout: config.timeouts.long_poll(),
            failure_base: Duration::from_secs(config.long_poll.failure_base_secs),
            failure_max: Duration::from_secs(config.long_poll.failure_max_secs),
            state,
        }
    }

    pub fn state(&self) -> &Arc<NotificationState> {
        &self.state
    }

    /// Poll until `cancel` fires. Failures are never terminal.
    pub async fn run(&self, handler: Arc<dyn NotificationHandler>, cancel: CancellationToken) {
        let mut failures = SchedulePolicy::new(self.failure_base, self.failure_max);
        tracing::debug!(namespace = %self.namespace, "Long polling started");

        while !cancel.is_cancelled() {
            let outcome = tokio::select! {
                outcome = self.poll_once() => outcome,
                _ = cancel.cancelled() => break,
            };

            match outcome {
                PollOutcome::Notified { notification_id, messages } => {
                    failures.success();
                    if let Some(messages) = &messages {
                        self.state.merge_messages(messages);
                    }
                    if self.state.advance(notification_id) {
                        tracing::debug!(namespace = %self.namespace, notification_id, "Change notification received");
                        handler.on_notified(&self.namespace, notification_id);
                    } else {
                        tracing::debug!(
                            namespace = %self.namespace,
                            notification_id,
                            current = self.state.notification_id(),
                            "Ignoring stale notification"
                        );
                    }
                }
                PollOutcome::TimedOut => failures.success(),
                PollOutcome::Error(e) => {
                    let delay = failures.fail();
                    tracing::warn!(
                        namespace = %self.namespace,
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        failures = failures.consecutive_failures(),
                        "Long poll failed"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel.cancelled() => break,
                    }
                }
            }
        }

        tracing::debug!(namespace = %self.namespace, "Long polling stopped");
    }

    /// One long-poll request.
    pub async fn poll_once(&self) -> PollOutcome {
        let services = self.services.config_services().await;
        let Some(service) = services.first() else {
            return PollOutcome::Error(FetchError::Transient("no config service available".to_string()));
        };

        let notifications = [NotificationDto {
            namespace_name: self.namespace.name().to_string(),
            notification_id: self.state.notification_id(),
            messages: None,
        }];
        let notifications = match serde_json::to_string(&notifications) {
            Ok(json) => json,
            Err(e) => return PollOutcome::Error(FetchError::MalformedResponse(e.to_string())),
        };

        let url = match urls::notifications_url(
            service,
            self.namespace.app_id(),
            self.namespace.cluster(),
            &notifications,
            &self.identity,
        ) {
            Ok(url) => url,
            Err(e) => return PollOutcome::Error(FetchError::Transient(format!("invalid service URL {}: {}", service, e))),
        };

        let headers = match &self.secret {
            Some(secret) => match signer::build_headers(&url, self.namespace.app_id(), secret) {
                Ok(headers) => headers,
                Err(e) => return PollOutcome::Error(e.into()),
            },
            None => Vec::new(),
        };
        let request = HttpRequest::get(url, self.long_poll_timeout).with_headers(headers);

        let response = match self.http.get(request).await {
            Ok(response) => response,
            Err(e) => {
                self.services.report_failure();
                return PollOutcome::Error(FetchError::Transient(e.to_string()));
            }
        };

        if response.is_not_modified() {
            self.services.report_success();
            return PollOutcome::TimedOut;
        }
        if !response.is_ok() {
            self.services.report_failure();
            return PollOutcome::Error(FetchError::Transient(format!("unexpected status {}", response.status)));
        }
        self.services.report_success();

        let notifications: Vec<NotificationDto> = match response.json() {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(namespace = %self.namespace, error = %e, "Malformed notification response");
                return PollOutcome::Error(FetchError::MalformedResponse(e.to_string()));
            }
        };

        // The server may echo the name with the ".properties" suffix.
        let matches = |name: &str| {
            Namespace::new(self.namespace.app_id(), self.namespace.cluster(), name).name() == self.namespace.name()
        };
        match notifications.into_iter().find(|n| matches(&n.namespace_name)) {
            Some(n) => PollOutcome::Notified {
                notification_id: n.notification_id,
                messages: n.messages,
            },
            None => PollOutcome::TimedOut,
        }
    }
}
