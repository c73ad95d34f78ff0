pub mod repositories;
pub mod reservation;
pub mod user;

// Re-export commonly used types
pub use repositories::{DomainResult, RepositoryProvider};
pub use reservation::{Reservation, ReservationStatus};
pub use user::{
    CreateUserDto, GetUserDto, UpdateUserDto, User, UserRepositoryInterface, UserRole,
    UserSummary,
};

pub use crate::shared::errors::DomainError;
