//! # Fulfillment Ledger
//!
//! In-memory record of checkout sessions that have already been fulfilled.
//! Payment providers redeliver webhooks (timeouts, retries, manual resends),
//! so fulfillment must run once per session no matter how many times the
//! completion event arrives.
//!
//! Entries are forgotten after `retention` and the ledger never holds more
//! than `capacity` sessions (oldest evicted first). Nothing is persisted: a
//! restart clears the ledger.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Default retention, matching Stripe's three-day redelivery window
pub const DEFAULT_RETENTION_HOURS: i64 = 72;

/// Default maximum number of remembered sessions
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Shared, cloneable ledger of fulfilled session ids
#[derive(Clone)]
pub struct FulfillmentLedger {
    inner: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
    retention: Duration,
    capacity: usize,
}

impl FulfillmentLedger {
    pub fn new(retention: Duration, capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            retention,
            capacity: capacity.max(1),
        }
    }

    /// Mark `session_id` as being fulfilled.
    ///
    /// Returns `true` on the first claim; `false` if the session was already
    /// claimed within the retention window. Check and mark happen under one
    /// lock, so concurrent deliveries of the same session yield one winner.
    pub async fn claim(&self, session_id: &str) -> bool {
        self.claim_at(session_id, Utc::now()).await
    }

    async fn claim_at(&self, session_id: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.inner.lock().await;

        let cutoff = now - self.retention;
        entries.retain(|_, claimed_at| *claimed_at > cutoff);

        if entries.contains_key(session_id) {
            debug!("Session {} already fulfilled", session_id);
            return false;
        }

        while entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, claimed_at)| **claimed_at)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    entries.remove(&id);
                }
                None => break,
            }
        }

        entries.insert(session_id.to_string(), now);
        true
    }

    /// Forget a claim so a later redelivery can retry fulfillment
    pub async fn release(&self, session_id: &str) {
        self.inner.lock().await.remove(session_id);
    }

    /// Check whether a session is currently recorded as fulfilled
    pub async fn contains(&self, session_id: &str) -> bool {
        self.inner.lock().await.contains_key(session_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

impl Default for FulfillmentLedger {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_RETENTION_HOURS), DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_claim_once() {
        let ledger = FulfillmentLedger::default();

        assert!(ledger.claim("cs_123").await);
        assert!(!ledger.claim("cs_123").await);
        assert!(ledger.claim("cs_456").await);
        assert_eq!(ledger.len().await, 2);
    }

    #[tokio::test]
    async fn test_release_allows_reclaim() {
        let ledger = FulfillmentLedger::default();

        assert!(ledger.claim("cs_123").await);
        ledger.release("cs_123").await;
        assert!(!ledger.contains("cs_123").await);
        assert!(ledger.claim("cs_123").await);
    }

    #[tokio::test]
    async fn test_expired_entries_forgotten() {
        let ledger = FulfillmentLedger::new(Duration::hours(1), 100);
        let start = Utc::now();

        assert!(ledger.claim_at("cs_old", start).await);
        assert!(!ledger.claim_at("cs_old", start + Duration::minutes(30)).await);
        assert!(ledger.claim_at("cs_old", start + Duration::hours(2)).await);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let ledger = FulfillmentLedger::new(Duration::hours(1), 2);
        let start = Utc::now();

        assert!(ledger.claim_at("cs_1", start).await);
        assert!(ledger.claim_at("cs_2", start + Duration::seconds(1)).await);
        assert!(ledger.claim_at("cs_3", start + Duration::seconds(2)).await);

        assert_eq!(ledger.len().await, 2);
        assert!(!ledger.contains("cs_1").await);
        assert!(ledger.contains("cs_3").await);
    }

    #[tokio::test]
    async fn test_concurrent_claims_single_winner() {
        let ledger = FulfillmentLedger::default();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.claim("cs_race").await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
