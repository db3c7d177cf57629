use std::sync::Arc;

use crate::db::{queries, RecordStore, SqliteStore};
use crate::errors::AppError;
use crate::models::availability::{minutes_of_day, MAX_SLOT_DURATION_MINUTES};
use crate::models::{Booking, BookingStatus, NewBooking, NotificationEvent};
use crate::services::clock::{optional_zone, Clock};
use crate::services::notifications::Notifier;
use crate::services::slots::SlotEngine;

/// Creates bookings and moves them through their statuses.
pub struct BookingService {
    store: SqliteStore,
    engine: SlotEngine,
    notifier: Arc<Notifier>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        store: SqliteStore,
        engine: SlotEngine,
        notifier: Arc<Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            engine,
            notifier,
            clock,
        }
    }

    pub async fn create_booking(&self, new: NewBooking) -> Result<Booking, AppError> {
        let zone = optional_zone(new.tz.as_deref())?;
        if let Some(minutes) = new.duration_minutes {
            check_duration(minutes)?;
        }

        let check = self
            .engine
            .get_available_slots(&new.provider_id, new.scheduled_date, zone)
            .await?;
        if !check.is_available {
            return Err(AppError::Conflict(
                check.reason.unwrap_or_else(|| "No slots available".to_string()),
            ));
        }
        if !check
            .available_slots
            .iter()
            .any(|slot| slot.start == new.scheduled_time)
        {
            return Err(AppError::Conflict(format!(
                "{} is not an available slot",
                new.scheduled_time.format("%H:%M")
            )));
        }

        let record = self
            .store
            .get_record(&new.provider_id)
            .await
            .map_err(AppError::fetch)?
            .ok_or_else(|| AppError::Conflict("Provider has not set availability".to_string()))?;

        let duration = new.duration_minutes.unwrap_or(record.slot_duration_minutes);
        check_duration(duration)?;

        let start = minutes_of_day(new.scheduled_time);
        let end = start + duration;
        let fits = record
            .intervals_for(new.scheduled_date)
            .iter()
            .any(|i| start >= i.start_minutes() && end <= i.end_minutes());
        if !fits {
            return Err(AppError::Conflict(format!(
                "That booking runs outside working hours. Working hours: {}",
                record.to_human_readable()
            )));
        }

        let now = self.clock.now();
        let booking = Booking {
            id: uuid::Uuid::new_v4().to_string(),
            provider_id: new.provider_id,
            customer_id: new.customer_id,
            scheduled_date: new.scheduled_date,
            scheduled_time: new.scheduled_time,
            duration_minutes: Some(duration),
            status: BookingStatus::Pending,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };

        let inserted = {
            let mut db = self.store.conn().map_err(AppError::fetch)?;
            queries::insert_booking_if_free(&mut db, &booking, record.slot_duration_minutes)
                .map_err(AppError::fetch)?
        };
        if !inserted {
            return Err(AppError::Conflict(
                "Sorry, that time slot is already booked. Could you pick a different time?"
                    .to_string(),
            ));
        }

        tracing::info!(
            booking_id = %booking.id,
            provider_id = %booking.provider_id,
            date = %booking.scheduled_date,
            "booking created"
        );

        self.dispatch(NotificationEvent::BookingCreated {
            booking: booking.clone(),
        })
        .await;

        Ok(booking)
    }

    pub async fn get_booking(&self, id: &str) -> Result<Booking, AppError> {
        let db = self.store.conn().map_err(AppError::fetch)?;
        queries::get_booking_by_id(&db, id)
            .map_err(AppError::fetch)?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
    }

    pub async fn update_booking_status(
        &self,
        id: &str,
        status: BookingStatus,
    ) -> Result<Booking, AppError> {
        let (mut booking, previous, updated_at) = {
            let db = self.store.conn().map_err(AppError::fetch)?;
            let booking = queries::get_booking_by_id(&db, id)
                .map_err(AppError::fetch)?
                .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

            if booking.status == status {
                return Ok(booking);
            }
            if booking.status.is_terminal() {
                return Err(AppError::Validation(format!(
                    "booking {id} is {} and cannot change",
                    booking.status.as_str()
                )));
            }

            let now = self.clock.now();
            queries::update_booking_status(&db, id, status, now).map_err(AppError::fetch)?;
            let previous = booking.status;
            (booking, previous, now)
        };

        booking.status = status;
        booking.updated_at = updated_at;

        tracing::info!(
            booking_id = id,
            from = previous.as_str(),
            to = status.as_str(),
            "booking status changed"
        );

        self.dispatch(NotificationEvent::BookingStatusChanged {
            booking: booking.clone(),
            previous,
        })
        .await;

        Ok(booking)
    }

    /// Push failures never undo the write that triggered them.
    async fn dispatch(&self, event: NotificationEvent) {
        if let Err(e) = self.notifier.notify(&event).await {
            tracing::warn!(error = %e, "failed to send booking notification");
        }
    }
}

fn check_duration(minutes: u32) -> Result<(), AppError> {
    if minutes == 0 || minutes > MAX_SLOT_DURATION_MINUTES {
        return Err(AppError::Validation(format!(
            "duration must be between 1 and {MAX_SLOT_DURATION_MINUTES} minutes, got {minutes}"
        )));
    }
    Ok(())
}
