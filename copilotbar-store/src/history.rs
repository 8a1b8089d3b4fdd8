//! Rolling daily usage history.
//!
//! One value per local calendar day, keyed `YYYY-MM-DD` and stored under
//! [`keys::USAGE_HISTORY`]. At most [`MAX_HISTORY_DAYS`] keys are kept; on
//! overflow the smallest keys (oldest dates) are dropped.

use chrono::NaiveDate;
use copilotbar_core::calendar::date_key;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::error::StoreError;
use crate::kv::{KeyValueStore, keys};

/// Maximum number of days retained.
pub const MAX_HISTORY_DAYS: usize = 60;

/// Bounded date-keyed history persisted through a [`KeyValueStore`].
///
/// Every read and write goes through one async mutex, so a reader never
/// observes a half-applied record.
pub struct HistoryStore {
    kv: Arc<dyn KeyValueStore>,
    lock: Mutex<()>,
}

impl HistoryStore {
    /// Creates a history store on top of `kv`.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            lock: Mutex::new(()),
        }
    }

    /// Upserts the value for `date`, evicts down to the retention limit and
    /// persists.
    #[instrument(skip(self))]
    pub async fn record_daily(&self, date: NaiveDate, value: u64) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;

        let mut history = self.load().await?;
        history.insert(date_key(date), value);
        let evicted = evict(&mut history);
        if evicted > 0 {
            debug!(evicted, "Evicted old history entries");
        }

        self.kv
            .set(keys::USAGE_HISTORY, serde_json::to_value(&history)?)
            .await
    }

    /// Returns the stored value for `date`, or 0 when absent.
    pub async fn read_daily(&self, date: NaiveDate) -> Result<u64, StoreError> {
        let _guard = self.lock.lock().await;
        let history = self.load().await?;
        Ok(history.get(&date_key(date)).copied().unwrap_or(0))
    }

    /// Returns the whole history, oldest first.
    pub async fn entries(&self) -> Result<BTreeMap<String, u64>, StoreError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Removes all history.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.kv.delete(keys::USAGE_HISTORY).await?;
        Ok(())
    }

    /// Reads the persisted map. Entries whose value is not a non-negative
    /// integer are skipped.
    async fn load(&self) -> Result<BTreeMap<String, u64>, StoreError> {
        let Some(value) = self.kv.get(keys::USAGE_HISTORY).await? else {
            return Ok(BTreeMap::new());
        };

        let Value::Object(map) = value else {
            return Err(StoreError::InvalidValue {
                key: keys::USAGE_HISTORY.to_string(),
                reason: "expected an object".to_string(),
            });
        };

        let mut history = BTreeMap::new();
        for (key, value) in map {
            match value.as_u64() {
                Some(count) => {
                    history.insert(key, count);
                }
                None => warn!(key = %key, value = %value, "Skipping malformed history entry"),
            }
        }
        Ok(history)
    }
}

/// Drops the smallest keys until at most [`MAX_HISTORY_DAYS`] remain.
fn evict(history: &mut BTreeMap<String, u64>) -> usize {
    let mut evicted = 0;
    while history.len() > MAX_HISTORY_DAYS {
        history.pop_first();
        evicted += 1;
    }
    evicted
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use chrono::Duration;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store() -> (Arc<MemoryStore>, HistoryStore) {
        let kv = Arc::new(MemoryStore::new());
        let history = HistoryStore::new(kv.clone());
        (kv, history)
    }

    #[tokio::test]
    async fn test_read_absent_is_zero() {
        let (_, history) = store();
        assert_eq!(history.read_daily(date(2024, 2, 10)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_then_read() {
        let (kv, history) = store();
        history.record_daily(date(2024, 2, 10), 80).await.unwrap();
        assert_eq!(history.read_daily(date(2024, 2, 10)).await.unwrap(), 80);

        let raw = kv.get(keys::USAGE_HISTORY).await.unwrap().unwrap();
        assert_eq!(raw, json!({ "2024-02-10": 80 }));
    }

    #[tokio::test]
    async fn test_record_is_upsert() {
        let (_, history) = store();
        history.record_daily(date(2024, 2, 10), 80).await.unwrap();
        history.record_daily(date(2024, 2, 10), 95).await.unwrap();

        let entries = history.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["2024-02-10"], 95);
    }

    #[tokio::test]
    async fn test_retains_sixty_greatest_keys() {
        let (_, history) = store();
        let start = date(2024, 1, 1);
        for offset in 0..75 {
            history
                .record_daily(start + Duration::days(offset), 1)
                .await
                .unwrap();
        }

        let entries = history.entries().await.unwrap();
        assert_eq!(entries.len(), MAX_HISTORY_DAYS);
        assert_eq!(
            entries.keys().next().map(String::as_str),
            Some(date_key(start + Duration::days(15)).as_str())
        );
        assert_eq!(
            entries.keys().last().map(String::as_str),
            Some(date_key(start + Duration::days(74)).as_str())
        );
    }

    #[tokio::test]
    async fn test_late_old_record_is_evicted_immediately() {
        let (_, history) = store();
        let start = date(2024, 3, 1);
        for offset in 0..60 {
            history
                .record_daily(start + Duration::days(offset), 5)
                .await
                .unwrap();
        }

        // Older than everything retained: inserted then dropped.
        history.record_daily(date(2023, 12, 31), 9).await.unwrap();

        let entries = history.entries().await.unwrap();
        assert_eq!(entries.len(), MAX_HISTORY_DAYS);
        assert!(!entries.contains_key("2023-12-31"));
        assert_eq!(history.read_daily(date(2023, 12, 31)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_loads_existing_oversized_history() {
        let (kv, history) = store();
        let mut seeded = serde_json::Map::new();
        let start = date(2024, 1, 1);
        for offset in 0..70 {
            seeded.insert(date_key(start + Duration::days(offset)), json!(offset));
        }
        kv.set(keys::USAGE_HISTORY, Value::Object(seeded))
            .await
            .unwrap();

        history.record_daily(date(2024, 6, 1), 3).await.unwrap();

        let entries = history.entries().await.unwrap();
        assert_eq!(entries.len(), MAX_HISTORY_DAYS);
        assert_eq!(entries["2024-06-01"], 3);
    }

    #[tokio::test]
    async fn test_skips_malformed_entries() {
        let (kv, history) = store();
        kv.set(
            keys::USAGE_HISTORY,
            json!({ "2024-02-09": 12, "2024-02-10": "lots", "2024-02-11": -1 }),
        )
        .await
        .unwrap();

        let entries = history.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["2024-02-09"], 12);
    }

    #[tokio::test]
    async fn test_rejects_non_object() {
        let (kv, history) = store();
        kv.set(keys::USAGE_HISTORY, json!([1, 2, 3])).await.unwrap();
        assert!(matches!(
            history.entries().await,
            Err(StoreError::InvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_clear() {
        let (kv, history) = store();
        history.record_daily(date(2024, 2, 10), 1).await.unwrap();
        history.clear().await.unwrap();
        assert!(history.entries().await.unwrap().is_empty());
        assert!(kv.get(keys::USAGE_HISTORY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_records_all_land() {
        let (_, history) = store();
        let history = Arc::new(history);
        let start = date(2024, 5, 1);

        let mut handles = Vec::new();
        for offset in 0..20 {
            let history = history.clone();
            handles.push(tokio::spawn(async move {
                history
                    .record_daily(start + Duration::days(offset), 7)
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(history.entries().await.unwrap().len(), 20);
    }
}
