use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;

use crate::db::{BookingQuery, RecordStore};
use crate::errors::AppError;
use crate::models::availability::{minutes_of_day, time_from_minutes};
use crate::models::{
    AvailabilityCheckResult, AvailabilityRecord, BookedTime, TimeSlot, UnavailableReason,
};
use crate::services::clock::Clock;

pub struct SlotEngine {
    records: Arc<dyn RecordStore>,
    bookings: Arc<dyn BookingQuery>,
    clock: Arc<dyn Clock>,
}

impl SlotEngine {
    pub fn new(
        records: Arc<dyn RecordStore>,
        bookings: Arc<dyn BookingQuery>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            records,
            bookings,
            clock,
        }
    }

    /// Free slots for `provider_id` on `date`. "Not available" outcomes are
    /// results; only store failures are errors. Past slots are judged in the
    /// caller's `zone`, or the server's when it is `None`.
    pub async fn get_available_slots(
        &self,
        provider_id: &str,
        date: NaiveDate,
        zone: Option<Tz>,
    ) -> Result<AvailabilityCheckResult, AppError> {
        let (record, booked) = tokio::try_join!(
            self.records.get_record(provider_id),
            self.bookings.get_bookings_for_provider_on_date(provider_id, date),
        )
        .map_err(AppError::fetch)?;

        let result = compute_slots(record.as_ref(), date, &booked, self.clock.now_in(zone));

        tracing::debug!(
            provider_id,
            %date,
            slots = result.available_slots.len(),
            reason = result.reason.as_deref().unwrap_or(""),
            "computed availability"
        );

        Ok(result)
    }
}

pub fn compute_slots(
    record: Option<&AvailabilityRecord>,
    date: NaiveDate,
    booked: &[BookedTime],
    now: NaiveDateTime,
) -> AvailabilityCheckResult {
    let Some(record) = record else {
        return AvailabilityCheckResult::unavailable(UnavailableReason::NotConfigured);
    };

    if record.is_day_off(date) {
        return AvailabilityCheckResult::unavailable(UnavailableReason::DayOff);
    }

    let intervals = record.intervals_for(date);
    if intervals.is_empty() {
        return AvailabilityCheckResult::unavailable(UnavailableReason::NotWorkingDay);
    }

    let step = record.slot_duration_minutes;
    if step == 0 {
        return AvailabilityCheckResult::unavailable(UnavailableReason::NoSlots);
    }

    let occupied: Vec<(u32, u32)> = booked
        .iter()
        .filter(|b| b.status.blocks_slot())
        .map(|b| b.occupied_minutes(step))
        .collect();

    // Slots starting before this minute are in the past.
    let earliest_start = match date.cmp(&now.date()) {
        std::cmp::Ordering::Less => u32::MAX,
        std::cmp::Ordering::Equal => minutes_of_day(now.time()),
        std::cmp::Ordering::Greater => 0,
    };

    let mut candidates: Vec<(u32, u32)> = Vec::new();
    for interval in intervals {
        let end = interval.end_minutes();
        let mut start = interval.start_minutes();
        while start + step <= end {
            candidates.push((start, start + step));
            start += step;
        }
    }

    let mut free: Vec<(u32, u32)> = candidates
        .into_iter()
        .filter(|(start, end)| {
            !occupied
                .iter()
                .any(|(b_start, b_end)| *start < *b_end && *end > *b_start)
        })
        .filter(|(start, _)| *start >= earliest_start)
        .collect();
    free.sort_unstable();
    free.dedup();

    let slots = free
        .into_iter()
        .filter_map(|(start, end)| {
            Some(TimeSlot {
                start: time_from_minutes(start)?,
                end: time_from_minutes(end)?,
            })
        })
        .collect();

    AvailabilityCheckResult::from_slots(slots)
}
