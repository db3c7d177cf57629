use std::sync::Arc;

use chrono::NaiveDate;

use crate::db::RecordStore;
use crate::errors::AppError;
use crate::models::{AvailabilityRecord, AvailabilityUpdate};
use crate::services::clock::Clock;

/// CRUD over a provider's availability record.
pub struct AvailabilityManager {
    records: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityManager {
    pub fn new(records: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { records, clock }
    }

    /// Writes the default record unless one exists; an existing record is
    /// returned untouched.
    pub async fn create(&self, provider_id: &str) -> Result<AvailabilityRecord, AppError> {
        if let Some(existing) = self.get(provider_id).await? {
            return Ok(existing);
        }

        let record = AvailabilityRecord::with_defaults(provider_id, self.clock.now());
        self.records.put_record(&record).await.map_err(AppError::fetch)?;

        tracing::info!(provider_id, "created default availability");
        Ok(record)
    }

    pub async fn get(&self, provider_id: &str) -> Result<Option<AvailabilityRecord>, AppError> {
        self.records
            .get_record(provider_id)
            .await
            .map_err(AppError::fetch)
    }

    pub async fn update(
        &self,
        provider_id: &str,
        update: AvailabilityUpdate,
    ) -> Result<AvailabilityRecord, AppError> {
        let mut record = self.require(provider_id).await?;
        record.apply(update);
        record.validate()?;
        self.save(record).await
    }

    pub async fn add_custom_day_off(
        &self,
        provider_id: &str,
        date: NaiveDate,
    ) -> Result<AvailabilityRecord, AppError> {
        let mut record = self.require(provider_id).await?;
        if !record.custom_days_off.insert(date) {
            return Ok(record);
        }
        tracing::info!(provider_id, %date, "added day off");
        self.save(record).await
    }

    pub async fn remove_custom_day_off(
        &self,
        provider_id: &str,
        date: NaiveDate,
    ) -> Result<AvailabilityRecord, AppError> {
        let mut record = self.require(provider_id).await?;
        if !record.custom_days_off.remove(&date) {
            return Ok(record);
        }
        tracing::info!(provider_id, %date, "removed day off");
        self.save(record).await
    }

    async fn require(&self, provider_id: &str) -> Result<AvailabilityRecord, AppError> {
        self.get(provider_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("no availability record for provider {provider_id}"))
        })
    }

    async fn save(&self, mut record: AvailabilityRecord) -> Result<AvailabilityRecord, AppError> {
        record.updated_at = self.clock.now();
        self.records.put_record(&record).await.map_err(AppError::fetch)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDateTime;

    use crate::db::{self, SqliteStore};
    use crate::models::WorkingInterval;
    use crate::services::clock::FixedClock;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn manager() -> AvailabilityManager {
        let conn = db::init_db(":memory:").unwrap();
        let store = SqliteStore::new(Arc::new(Mutex::new(conn)));
        AvailabilityManager::new(Arc::new(store), Arc::new(FixedClock(dt("2025-06-01 08:00"))))
    }

    struct BrokenStore;

    #[async_trait]
    impl RecordStore for BrokenStore {
        async fn get_record(&self, _provider_id: &str) -> anyhow::Result<Option<AvailabilityRecord>> {
            Err(anyhow::anyhow!("backend unreachable"))
        }

        async fn put_record(&self, _record: &AvailabilityRecord) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("backend unreachable"))
        }
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let manager = manager();
        assert!(manager.get("p1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let manager = manager();
        let first = manager.create("p1").await.unwrap();
        manager
            .update(
                "p1",
                AvailabilityUpdate {
                    slot_duration_minutes: Some(30),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let second = manager.create("p1").await.unwrap();
        assert_eq!(second.slot_duration_minutes, 30);
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn test_update_requires_existing_record() {
        let manager = manager();
        let err = manager
            .update("p1", AvailabilityUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_overlap_and_keeps_old_record() {
        let manager = manager();
        manager.create("p1").await.unwrap();

        let mut template = crate::models::WeeklyTemplate::new();
        template.insert(
            1,
            vec![
                WorkingInterval::parse("09:00", "12:00").unwrap(),
                WorkingInterval::parse("11:00", "14:00").unwrap(),
            ],
        );
        let err = manager
            .update(
                "p1",
                AvailabilityUpdate {
                    weekly_template: Some(template),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let stored = manager.get("p1").await.unwrap().unwrap();
        assert_eq!(stored.weekly_template.len(), 7);
    }

    #[tokio::test]
    async fn test_add_day_off_twice_is_same_as_once() {
        let manager = manager();
        manager.create("p1").await.unwrap();

        let once = manager.add_custom_day_off("p1", date("2025-12-25")).await.unwrap();
        let twice = manager.add_custom_day_off("p1", date("2025-12-25")).await.unwrap();
        assert_eq!(once.custom_days_off, twice.custom_days_off);
        assert_eq!(twice.custom_days_off.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_absent_day_off_is_noop() {
        let manager = manager();
        manager.create("p1").await.unwrap();
        manager.add_custom_day_off("p1", date("2025-12-25")).await.unwrap();

        let record = manager
            .remove_custom_day_off("p1", date("2025-12-31"))
            .await
            .unwrap();
        assert_eq!(record.custom_days_off.len(), 1);

        let record = manager
            .remove_custom_day_off("p1", date("2025-12-25"))
            .await
            .unwrap();
        assert!(record.custom_days_off.is_empty());
    }

    #[tokio::test]
    async fn test_day_off_requires_record() {
        let manager = manager();
        let err = manager
            .add_custom_day_off("p1", date("2025-12-25"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_store_failure_is_data_fetch() {
        let manager = AvailabilityManager::new(
            Arc::new(BrokenStore),
            Arc::new(FixedClock(dt("2025-06-01 08:00"))),
        );
        let err = manager.create("p1").await.unwrap_err();
        assert!(matches!(err, AppError::DataFetch(_)));
    }
}
