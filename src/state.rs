use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::db::SqliteStore;
use crate::services::availability::AvailabilityManager;
use crate::services::clock::Clock;
use crate::services::notifications::{Notifier, PushProvider};
use crate::services::scheduling::BookingService;
use crate::services::slots::SlotEngine;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub availability: AvailabilityManager,
    pub slots: SlotEngine,
    pub bookings: BookingService,
    pub notifier: Arc<Notifier>,
}

impl AppState {
    pub fn new(
        conn: Connection,
        config: AppConfig,
        push: Arc<dyn PushProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let db = Arc::new(Mutex::new(conn));
        let store = SqliteStore::new(db.clone());
        let shared = Arc::new(store.clone());

        let notifier = Arc::new(Notifier::new(shared.clone(), push, config.relay_batch_size));
        let bookings = BookingService::new(
            store,
            SlotEngine::new(shared.clone(), shared.clone(), clock.clone()),
            notifier.clone(),
            clock.clone(),
        );

        Self {
            db,
            availability: AvailabilityManager::new(shared.clone(), clock.clone()),
            slots: SlotEngine::new(shared.clone(), shared, clock),
            bookings,
            notifier,
            config,
        }
    }
}
