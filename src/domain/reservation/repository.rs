//! Reservation repository interface

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::model::{Reservation, ReservationFilter, ReservationStatus, ReservationView, TimeSlot};
use super::overlap::ConflictPolicy;
use crate::domain::{DomainError, DomainResult};

/// Row to insert. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub slot: TimeSlot,
    pub note: Option<String>,
    pub status: ReservationStatus,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Find reservation by ID, joined with its owner
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ReservationView>>;

    /// List reservations ordered by date, then start time
    async fn list(&self, filter: ReservationFilter) -> DomainResult<Vec<ReservationView>>;

    /// All reservations (any status) on a calendar day
    async fn find_by_date(&self, date: NaiveDate) -> DomainResult<Vec<Reservation>>;

    /// Insert after checking for overlaps, atomically.
    ///
    /// Fails with `Conflict` when the slot is taken or a concurrent writer won.
    async fn insert_if_free(
        &self,
        reservation: NewReservation,
        policy: ConflictPolicy,
    ) -> DomainResult<Reservation>;

    /// Persist a modified reservation.
    ///
    /// `expected` is the status the caller validated against. The stored
    /// status is re-read and checked with [`guard_status`] in the same atomic
    /// step as the write. The status column is only written when
    /// `reservation.status` differs from `expected`. With `conflict_check`
    /// set, the overlap check (excluding itself) is part of that step too.
    async fn update(
        &self,
        reservation: Reservation,
        expected: ReservationStatus,
        conflict_check: Option<ConflictPolicy>,
    ) -> DomainResult<Reservation>;

    /// Move from `from` to `to`, touching only status and `updated_at`.
    /// Fails when the stored status no longer permits the move.
    async fn update_status(
        &self,
        id: i32,
        from: ReservationStatus,
        to: ReservationStatus,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<Reservation>;

    /// Hard-delete cancelled reservations dated before `before`
    async fn purge_cancelled(&self, before: NaiveDate) -> DomainResult<u64>;
}

/// Re-check a write against the status found in storage.
///
/// `expected` is what the caller saw, `target` what it wants to store.
/// A row that went terminal in between rejects every write; otherwise a
/// status change must still be a legal move from the stored status.
pub fn guard_status(
    stored: ReservationStatus,
    expected: ReservationStatus,
    target: ReservationStatus,
) -> DomainResult<()> {
    if stored == expected {
        return Ok(());
    }
    if stored.is_terminal() {
        return Err(DomainError::Terminal(stored));
    }
    if target != expected && !stored.can_transition_to(target) {
        return Err(DomainError::InvalidTransition {
            from: stored,
            to: target,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationStatus::*;

    #[test]
    fn unchanged_status_passes() {
        assert!(guard_status(Pending, Pending, Pending).is_ok());
        assert!(guard_status(Confirmed, Confirmed, Finalized).is_ok());
    }

    #[test]
    fn row_cancelled_underneath_rejects_any_write() {
        assert!(matches!(
            guard_status(Cancelled, Pending, Pending),
            Err(DomainError::Terminal(Cancelled))
        ));
        assert!(matches!(
            guard_status(Cancelled, Pending, Confirmed),
            Err(DomainError::Terminal(Cancelled))
        ));
    }

    #[test]
    fn newer_live_status_still_allows_legal_moves() {
        assert!(guard_status(Confirmed, Pending, Cancelled).is_ok());
        // a field edit keeps the newer stored status
        assert!(guard_status(Confirmed, Pending, Pending).is_ok());
    }
}
