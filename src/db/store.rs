use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::Connection;

use super::queries;
use crate::models::{AvailabilityRecord, BookedTime};

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_record(&self, provider_id: &str) -> anyhow::Result<Option<AvailabilityRecord>>;
    async fn put_record(&self, record: &AvailabilityRecord) -> anyhow::Result<()>;
}

#[async_trait]
pub trait BookingQuery: Send + Sync {
    async fn get_bookings_for_provider_on_date(
        &self,
        provider_id: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<BookedTime>>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_device_tokens(&self, user_id: &str) -> anyhow::Result<Vec<String>>;
}

/// All three store contracts over the shared SQLite connection.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    pub fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get_record(&self, provider_id: &str) -> anyhow::Result<Option<AvailabilityRecord>> {
        let db = self.conn()?;
        queries::get_availability(&db, provider_id)
    }

    async fn put_record(&self, record: &AvailabilityRecord) -> anyhow::Result<()> {
        let db = self.conn()?;
        queries::save_availability(&db, record)
    }
}

#[async_trait]
impl BookingQuery for SqliteStore {
    async fn get_bookings_for_provider_on_date(
        &self,
        provider_id: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<BookedTime>> {
        let db = self.conn()?;
        let bookings = queries::get_bookings_for_provider_on_date(&db, provider_id, date)?;
        Ok(bookings.iter().map(BookedTime::from).collect())
    }
}

#[async_trait]
impl TokenStore for SqliteStore {
    async fn get_device_tokens(&self, user_id: &str) -> anyhow::Result<Vec<String>> {
        let db = self.conn()?;
        queries::get_device_tokens(&db, user_id)
    }
}
