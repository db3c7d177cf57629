use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::availability::{hhmm, minutes_of_day};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub provider_id: String,
    pub customer_id: String,
    pub scheduled_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub scheduled_time: NaiveTime,
    pub duration_minutes: Option<u32>,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub provider_id: String,
    pub customer_id: String,
    pub scheduled_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub scheduled_time: NaiveTime,
    pub duration_minutes: Option<u32>,
    pub notes: Option<String>,
    /// IANA zone of the customer. "Too late to book" is judged in it.
    #[serde(default)]
    pub tz: Option<String>,
}

/// The part of a booking the slot engine needs.
#[derive(Debug, Clone, PartialEq)]
pub struct BookedTime {
    pub scheduled_time: NaiveTime,
    pub duration_minutes: Option<u32>,
    pub status: BookingStatus,
}

impl BookedTime {
    /// Occupied `[start, end)` in minutes from midnight. May run past 24:00.
    pub fn occupied_minutes(&self, default_duration: u32) -> (u32, u32) {
        let start = minutes_of_day(self.scheduled_time);
        let duration = self.duration_minutes.unwrap_or(default_duration);
        (start, start.saturating_add(duration))
    }
}

impl From<&Booking> for BookedTime {
    fn from(booking: &Booking) -> Self {
        Self {
            scheduled_time: booking.scheduled_time,
            duration_minutes: booking.duration_minutes,
            status: booking.status,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Confirmed,
    OnTheWay,
    InProgress,
    Completed,
    Cancelled,
    Rejected,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 8] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::Confirmed,
        BookingStatus::OnTheWay,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::OnTheWay => "on-the-way",
            BookingStatus::InProgress => "in-progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Whether a booking in this status occupies provider time.
    pub fn blocks_slot(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled | BookingStatus::Rejected)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Rejected
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::OnTheWay => "on the way",
            BookingStatus::InProgress => "in progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Rejected => "rejected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_cancelled_and_rejected_free_the_slot() {
        let free: Vec<_> = BookingStatus::ALL
            .into_iter()
            .filter(|s| !s.blocks_slot())
            .collect();
        assert_eq!(free, vec![BookingStatus::Cancelled, BookingStatus::Rejected]);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("archived"), None);
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let json = serde_json::to_string(&BookingStatus::OnTheWay).unwrap();
        assert_eq!(json, "\"on-the-way\"");
        let parsed: BookingStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(parsed, BookingStatus::InProgress);
    }

    #[test]
    fn test_occupied_minutes_falls_back_to_default_duration() {
        let booked = BookedTime {
            scheduled_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            duration_minutes: None,
            status: BookingStatus::Confirmed,
        };
        assert_eq!(booked.occupied_minutes(45), (600, 645));

        let booked = BookedTime {
            duration_minutes: Some(90),
            ..booked
        };
        assert_eq!(booked.occupied_minutes(45), (600, 690));
    }

    #[test]
    fn test_occupied_minutes_saturates_on_huge_duration() {
        let booked = BookedTime {
            scheduled_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            duration_minutes: Some(u32::MAX),
            status: BookingStatus::Confirmed,
        };
        assert_eq!(booked.occupied_minutes(60), (600, u32::MAX));
    }
}
