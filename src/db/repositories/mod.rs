mod appointment_repository;
mod availability_repository;

pub use appointment_repository::{day_lock_key, AppointmentFilter, AppointmentRepository};
pub use availability_repository::AvailabilityRepository;
