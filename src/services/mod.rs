pub mod availability;
pub mod booking;
pub mod reminders;
pub mod statistics;
