//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod repository_provider;
pub mod reservation_repository;
pub mod user_repository;

pub use repository_provider::SeaOrmRepositoryProvider;
pub use reservation_repository::SeaOrmReservationRepository;
pub use user_repository::UserRepository;

use log::warn;

use crate::domain::DomainError;
use crate::shared::InfraError;

/// Map a store error onto the domain taxonomy.
///
/// Unique violations and write contention (serialization failures, busy or
/// locked SQLite databases) surface as `Conflict`; everything else is internal.
pub(crate) fn db_err(e: sea_orm::DbErr) -> DomainError {
    let msg = e.to_string();
    if msg.contains("UNIQUE") || msg.contains("duplicate") {
        return DomainError::Conflict("record already exists".to_string());
    }
    if is_contention(&msg) {
        warn!("Write contention reported by the database: {}", msg);
        return DomainError::Conflict(
            "another booking for this time slot is being saved, try again".to_string(),
        );
    }
    InfraError::Database(e).into()
}

fn is_contention(msg: &str) -> bool {
    const MARKERS: [&str; 5] = [
        "40001",
        "could not serialize",
        "database is locked",
        "SQLITE_BUSY",
        "deadlock",
    ];
    MARKERS.iter().any(|m| msg.contains(m))
}
