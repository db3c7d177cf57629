pub mod availability;
pub mod clock;
pub mod notifications;
pub mod scheduling;
pub mod slots;
