/// Security event recording
///
/// Events are appended under `security:logs:{userId|anonymous}:{millis}` so
/// natural key ordering gives chronological retrieval, each entry carrying
/// its own retention TTL. Recording is a best-effort side effect for the
/// auth flows: failures are logged by the caller and never fail the primary
/// operation.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kv_store::KeyValueStore;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{SecurityEvent, SecurityEventType};

const LOG_PREFIX: &str = "security:logs:";
const ANONYMOUS: &str = "anonymous";

#[derive(Clone)]
pub struct SecurityEventRecorder {
    store: Arc<dyn KeyValueStore>,
    retention_secs: u64,
}

#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub limit: usize,
    pub offset: usize,
    pub type_filter: Option<SecurityEventType>,
    pub time_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

fn scope(user_id: Option<Uuid>) -> String {
    user_id.map_or_else(|| ANONYMOUS.to_string(), |id| id.to_string())
}

impl SecurityEventRecorder {
    pub fn new(store: Arc<dyn KeyValueStore>, retention_secs: u64) -> Self {
        Self {
            store,
            retention_secs,
        }
    }

    /// Append one immutable event. Severity is derived from the type, never
    /// chosen by the caller.
    pub async fn record(
        &self,
        user_id: Option<Uuid>,
        event_type: SecurityEventType,
        data: serde_json::Value,
    ) -> Result<()> {
        let now = Utc::now();
        let event = SecurityEvent {
            event_type,
            severity: event_type.severity(),
            timestamp: now,
            data,
        };

        let scope = scope(user_id);
        // Writes within the same millisecond take the next free slot so no
        // event is silently overwritten.
        let mut ts = now.timestamp_millis();
        loop {
            let key = format!("{}{}:{}", LOG_PREFIX, scope, ts);
            if !self.store.exists(&key).await? {
                self.store
                    .set(&key, &serde_json::to_string(&event)?, Some(self.retention_secs))
                    .await?;
                break;
            }
            ts += 1;
        }

        Ok(())
    }

    /// Matching events for the user, most recent first.
    pub async fn query(&self, user_id: Option<Uuid>, query: EventQuery) -> Result<Vec<SecurityEvent>> {
        let scope = scope(user_id);
        let pattern = format!("{}{}:*", LOG_PREFIX, scope);
        let keys = self.store.scan(&pattern).await?;

        // Sort by the timestamp suffix, newest first.
        let mut stamped: Vec<(i64, String)> = keys
            .into_iter()
            .filter_map(|key| {
                let ts: i64 = key.rsplit(':').next()?.parse().ok()?;
                Some((ts, key))
            })
            .collect();
        stamped.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        let mut events = Vec::new();
        let mut skipped = 0;
        for (ts, key) in stamped {
            if let Some((from, to)) = query.time_range {
                if ts < from.timestamp_millis() || ts > to.timestamp_millis() {
                    continue;
                }
            }
            let Some(value) = self.store.get(&key).await? else {
                continue;
            };
            let event: SecurityEvent = serde_json::from_str(&value)?;
            if let Some(filter) = query.type_filter {
                if event.event_type != filter {
                    continue;
                }
            }
            if skipped < query.offset {
                skipped += 1;
                continue;
            }
            events.push(event);
            if query.limit > 0 && events.len() >= query.limit {
                break;
            }
        }

        Ok(events)
    }
}
