//! Booking module: reservation rules and lifecycle
//!
//! Contains the `ReservationService` and the `Clock` it reads "today" from.

pub mod clock;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use service::{BookingPolicy, ReservationService};
