//! Alert Dispatcher
//!
//! In-memory subscriber registry keyed by email, and a fire-and-forget
//! broadcast of critical conjunctions to every subscriber. Transport is
//! behind [`Notifier`]; the default [`LogNotifier`] only logs the payload.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const DEFAULT_MISSION: &str = "GENERAL";

#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

pub type Result<T> = std::result::Result<T, AlertError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub email: String,
    pub mission: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriberMetadata {
    pub mission: Option<String>,
}

/// The fields of a risk assessment an alert needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalEvent {
    pub satellite_id: String,
    pub debris_id: String,
    pub probability: f64,
    #[serde(rename = "timeToCA")]
    pub time_to_ca: f64,
    pub relative_velocity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

impl AlertPayload {
    pub fn compose(event: &CriticalEvent, recipients: Vec<String>, generated_at: DateTime<Utc>) -> Self {
        let subject = format!(
            "Critical Conjunction: {} vs {}",
            event.satellite_id, event.debris_id
        );
        let body = format!(
            "Critical Collision Risk\n\
             Satellite: {}\n\
             Intruder: {}\n\
             Probability: {:.2}%\n\
             Time to CA: {} sec\n\
             Relative Velocity: {} km/s\n\
             Generated at {}",
            event.satellite_id,
            event.debris_id,
            event.probability * 100.0,
            event.time_to_ca,
            event.relative_velocity,
            generated_at.to_rfc2822()
        );
        Self {
            subject,
            body,
            recipients,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub queued: bool,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// `Ok(true)` when the payload was handed to a transport
    async fn notify(&self, payload: &AlertPayload) -> Result<bool>;
}

/// Logs the payload instead of delivering it
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, payload: &AlertPayload) -> Result<bool> {
        warn!(
            "No alert transport configured; {} recipients for \"{}\"",
            payload.recipients.len(),
            payload.subject
        );
        info!("{}", payload.body);
        Ok(false)
    }
}

pub struct AlertDispatcher {
    subscribers: RwLock<HashMap<String, Subscriber>>,
    notifier: Arc<dyn Notifier>,
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(LogNotifier))
    }
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            notifier,
        }
    }

    /// Upsert by email; re-registering overwrites the metadata
    pub async fn register_subscriber(
        &self,
        email: &str,
        metadata: SubscriberMetadata,
    ) -> Result<Subscriber> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AlertError::InvalidInput(
                "Email is required to subscribe for alerts".into(),
            ));
        }

        let subscriber = Subscriber {
            email: email.to_string(),
            mission: metadata
                .mission
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MISSION.to_string()),
            created_at: Utc::now(),
        };

        self.subscribers
            .write()
            .await
            .insert(subscriber.email.clone(), subscriber.clone());
        info!("Registered alert subscriber {} ({})", subscriber.email, subscriber.mission);
        Ok(subscriber)
    }

    pub async fn subscribers(&self) -> Vec<Subscriber> {
        let mut list: Vec<Subscriber> = self.subscribers.read().await.values().cloned().collect();
        list.sort_by(|a, b| a.email.cmp(&b.email));
        list
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Broadcast to every subscriber. Zero subscribers is a no-op; notifier
    /// failures are logged and do not change the delivery count.
    pub async fn send_critical_alert(&self, event: &CriticalEvent) -> DeliveryReport {
        let recipients: Vec<String> = {
            let guard = self.subscribers.read().await;
            guard.keys().cloned().collect()
        };

        if recipients.is_empty() {
            warn!("No subscribers registered; skipping alert dispatch");
            return DeliveryReport {
                delivered: 0,
                queued: false,
            };
        }

        let delivered = recipients.len();
        let payload = AlertPayload::compose(event, recipients, Utc::now());

        let queued = match self.notifier.notify(&payload).await {
            Ok(queued) => queued,
            Err(e) => {
                warn!("Alert notifier failed: {}", e);
                false
            }
        };

        DeliveryReport { delivered, queued }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<AlertPayload>>,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, payload: &AlertPayload) -> Result<bool> {
            self.sent.lock().unwrap().push(payload.clone());
            Ok(true)
        }
    }

    struct Broken;

    #[async_trait]
    impl Notifier for Broken {
        async fn notify(&self, _payload: &AlertPayload) -> Result<bool> {
            Err(AlertError::Delivery("smtp down".into()))
        }
    }

    fn event() -> CriticalEvent {
        CriticalEvent {
            satellite_id: "25544".into(),
            debris_id: "99001".into(),
            probability: 0.987,
            time_to_ca: 120.0,
            relative_velocity: 14.2,
        }
    }

    #[tokio::test]
    async fn test_empty_email_rejected() {
        let dispatcher = AlertDispatcher::default();
        let result = dispatcher.register_subscriber("   ", SubscriberMetadata::default()).await;
        assert!(matches!(result, Err(AlertError::InvalidInput(_))));
        assert_eq!(dispatcher.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_register_is_upsert() {
        let dispatcher = AlertDispatcher::default();
        let first = dispatcher
            .register_subscriber("ops@example.com", SubscriberMetadata::default())
            .await
            .unwrap();
        assert_eq!(first.mission, "GENERAL");

        let second = dispatcher
            .register_subscriber(
                "ops@example.com",
                SubscriberMetadata {
                    mission: Some("LEO-SURVEY".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(second.mission, "LEO-SURVEY");

        let all = dispatcher.subscribers().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].mission, "LEO-SURVEY");
    }

    #[tokio::test]
    async fn test_no_subscribers_is_noop() {
        let notifier = Arc::new(Recording::default());
        let dispatcher = AlertDispatcher::new(notifier.clone());

        let report = dispatcher.send_critical_alert(&event()).await;
        assert_eq!(report.delivered, 0);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_payload() {
        let notifier = Arc::new(Recording::default());
        let dispatcher = AlertDispatcher::new(notifier.clone());
        for email in ["a@example.com", "b@example.com"] {
            dispatcher
                .register_subscriber(email, SubscriberMetadata::default())
                .await
                .unwrap();
        }

        let report = dispatcher.send_critical_alert(&event()).await;
        assert_eq!(report, DeliveryReport { delivered: 2, queued: true });

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent[0].subject, "Critical Conjunction: 25544 vs 99001");
        assert!(sent[0].body.contains("Probability: 98.70%"));
        assert!(sent[0].body.contains("Time to CA: 120 sec"));
        assert_eq!(sent[0].recipients.len(), 2);
    }

    #[tokio::test]
    async fn test_notifier_failure_keeps_count() {
        let dispatcher = AlertDispatcher::new(Arc::new(Broken));
        dispatcher
            .register_subscriber("ops@example.com", SubscriberMetadata::default())
            .await
            .unwrap();

        let report = dispatcher.send_critical_alert(&event()).await;
        assert_eq!(report.delivered, 1);
        assert!(!report.queued);
    }

    #[tokio::test]
    async fn test_log_notifier_never_queues() {
        let dispatcher = AlertDispatcher::default();
        dispatcher
            .register_subscriber("ops@example.com", SubscriberMetadata::default())
            .await
            .unwrap();
        assert!(!dispatcher.send_critical_alert(&event()).await.queued);
    }

    #[test]
    fn test_subscriber_wire_format() {
        let metadata: SubscriberMetadata = serde_json::from_str(r#"{"mission":"GEO"}"#).unwrap();
        assert_eq!(metadata.mission.as_deref(), Some("GEO"));
    }
}
