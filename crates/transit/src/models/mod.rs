//! Booking data models, schedules, and types.

pub mod reservation;
pub mod schedule;
pub mod trip;
pub mod types;

// Re-exports for convenience
pub use reservation::{sort_reservations, Companion, Reservation, ReservationRequest};
pub use schedule::TripSchedule;
pub use trip::{sort_by_departure, Trip};
pub use types::{Availability, ReservationStatus, Result, TransitError};
