//! Reservation aggregate
//!
//! Contains the Reservation entity, booking rules, overlap detection and the
//! repository interface.

pub mod model;
pub mod overlap;
pub mod repository;
pub mod rules;

pub use model::{
    Reservation, ReservationChanges, ReservationFilter, ReservationInput, ReservationStatus,
    ReservationView, TimeSlot,
};
pub use overlap::{describe_conflicts, find_conflicts, overlaps, ConflictPolicy};
pub use repository::{guard_status, NewReservation, ReservationRepository};
pub use rules::{validate_slot, BookingRuleViolation, BusinessHours};
