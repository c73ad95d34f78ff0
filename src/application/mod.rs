pub mod booking;
pub mod identity;

// Re-export key types for convenience
pub use booking::{BookingPolicy, Clock, FixedClock, ReservationService, SystemClock};
pub use identity::{AuthResult, NewAccount, UserService};
