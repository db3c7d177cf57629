pub mod availability;
pub mod booking;
pub mod notification;
pub mod slot;

pub use availability::{AvailabilityRecord, AvailabilityUpdate, WeeklyTemplate, WorkingInterval};
pub use booking::{BookedTime, Booking, BookingStatus, NewBooking};
pub use notification::{FanOutReport, NewMessage, NotificationEvent, PushMessage};
pub use slot::{AvailabilityCheckResult, TimeSlot, UnavailableReason};
