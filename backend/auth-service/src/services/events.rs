/// Outbound auth events
///
/// The core pushes typed events onto a bounded channel and returns
/// immediately; a spawned worker drains the channel and delivers to Kafka
/// with its own retry policy, decoupled from request latency. Delivery
/// failures are logged and never surface to the request path.
use chrono::{DateTime, Utc};
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 1024;
const DELIVERY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    UserRegistered {
        user_id: Uuid,
        email: String,
        created_at: DateTime<Utc>,
    },
    UserLoggedIn {
        user_id: Uuid,
        session_id: String,
        logged_in_at: DateTime<Utc>,
    },
    UserLoggedOut {
        user_id: Uuid,
        session_id: String,
        logged_out_at: DateTime<Utc>,
    },
    PasswordChanged {
        user_id: Uuid,
        changed_at: DateTime<Utc>,
        invalidate_all_sessions: bool,
    },
    AccountLocked {
        user_id: Uuid,
        locked_until: DateTime<Utc>,
    },
}

impl AuthEvent {
    fn partition_key(&self) -> Uuid {
        match self {
            AuthEvent::UserRegistered { user_id, .. }
            | AuthEvent::UserLoggedIn { user_id, .. }
            | AuthEvent::UserLoggedOut { user_id, .. }
            | AuthEvent::PasswordChanged { user_id, .. }
            | AuthEvent::AccountLocked { user_id, .. } => *user_id,
        }
    }
}

/// Envelope wrapping every published event with provenance fields.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    event_id: Uuid,
    source: &'static str,
    occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    payload: AuthEvent,
}

/// Cheap handle held by the auth service; `publish` never blocks and never
/// fails the caller.
#[derive(Clone)]
pub struct EventPublisher {
    tx: mpsc::Sender<AuthEvent>,
}

impl EventPublisher {
    pub fn publish(&self, event: AuthEvent) {
        if let Err(e) = self.tx.try_send(event) {
            warn!("Dropping outbound auth event: {}", e);
        }
    }

    /// Publisher whose worker discards everything, for tests and for
    /// deployments without brokers.
    pub fn disabled() -> Self {
        spawn_event_worker(None, "auth-events")
    }
}

/// Spawn the delivery worker and hand back its publisher handle. With no
/// brokers configured the worker drains and drops, keeping call sites
/// uniform.
pub fn spawn_event_worker(brokers: Option<&str>, topic: &str) -> EventPublisher {
    let producer = brokers.and_then(|brokers| {
        match rdkafka::config::ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", "auth-service")
            .create::<FutureProducer>()
        {
            Ok(producer) => Some(producer),
            Err(e) => {
                warn!("Failed to create Kafka producer, event publishing disabled: {}", e);
                None
            }
        }
    });

    let (tx, mut rx) = mpsc::channel::<AuthEvent>(CHANNEL_CAPACITY);
    let topic = topic.to_string();

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Some(producer) = producer.as_ref() else {
                debug!("Event publishing disabled, dropping {:?}", event);
                continue;
            };
            deliver(producer, &topic, event).await;
        }
    });

    EventPublisher { tx }
}

async fn deliver(producer: &FutureProducer, topic: &str, event: AuthEvent) {
    let envelope = EventEnvelope {
        event_id: Uuid::new_v4(),
        source: "auth-service",
        occurred_at: Utc::now(),
        payload: event,
    };

    let payload = match serde_json::to_string(&envelope) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to serialize auth event: {}", e);
            return;
        }
    };
    let partition_key = envelope.payload.partition_key().to_string();

    for attempt in 1..=DELIVERY_ATTEMPTS {
        let record = FutureRecord::to(topic).key(&partition_key).payload(&payload);
        match producer.send(record, Duration::from_secs(30)).await {
            Ok(_) => return,
            Err((e, _)) if attempt < DELIVERY_ATTEMPTS => {
                warn!("Kafka delivery attempt {} failed: {:?}", attempt, e);
                tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
            }
            Err((e, _)) => {
                warn!("Giving up on auth event after {} attempts: {:?}", attempt, e);
            }
        }
    }
}
