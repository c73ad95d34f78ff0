//! Reservations module: party room bookings

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
