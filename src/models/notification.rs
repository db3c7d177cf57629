use serde::{Deserialize, Serialize};

use super::booking::{Booking, BookingStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone)]
pub enum NotificationEvent {
    NewMessage(NewMessage),
    BookingCreated {
        booking: Booking,
    },
    BookingStatusChanged {
        booking: Booking,
        previous: BookingStatus,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    pub conversation_id: String,
    pub recipient_id: String,
    pub sender_name: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
    pub tokens: usize,
    pub relay_batches: usize,
    pub multicast_batches: usize,
    pub failed_batches: usize,
}
