use chrono::NaiveTime;
use serde::Serialize;

use super::availability::hhmm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    NotConfigured,
    DayOff,
    NotWorkingDay,
    NoSlots,
}

impl UnavailableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableReason::NotConfigured => "Provider has not set availability",
            UnavailableReason::DayOff => "Provider is off on this date",
            UnavailableReason::NotWorkingDay => "Provider does not work on this day",
            UnavailableReason::NoSlots => "No slots available",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityCheckResult {
    pub is_available: bool,
    pub available_slots: Vec<TimeSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AvailabilityCheckResult {
    pub fn unavailable(reason: UnavailableReason) -> Self {
        Self {
            is_available: false,
            available_slots: Vec::new(),
            reason: Some(reason.as_str().to_string()),
        }
    }

    pub fn from_slots(available_slots: Vec<TimeSlot>) -> Self {
        if available_slots.is_empty() {
            return Self::unavailable(UnavailableReason::NoSlots);
        }
        Self {
            is_available: true,
            available_slots,
            reason: None,
        }
    }
}
