//! Reservation lifecycle service: application-layer orchestration
//!
//! Every reservation write goes through here: booking rules first, then the
//! owner reference, then an atomic overlap-check-and-write in the repository.
//! HTTP handlers are thin wrappers around these methods.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::clock::Clock;
use crate::domain::reservation::{
    find_conflicts, validate_slot, BusinessHours, ConflictPolicy, NewReservation, Reservation,
    ReservationChanges, ReservationFilter, ReservationInput, ReservationStatus, ReservationView,
    TimeSlot,
};
use crate::domain::{DomainError, DomainResult, RepositoryProvider, UserSummary};

/// Tunable booking rules
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingPolicy {
    pub hours: BusinessHours,
    pub conflicts: ConflictPolicy,
}

pub struct ReservationService {
    repos: Arc<dyn RepositoryProvider>,
    clock: Arc<dyn Clock>,
    policy: BookingPolicy,
}

impl ReservationService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        clock: Arc<dyn Clock>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            repos,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> BookingPolicy {
        self.policy
    }

    /// Local calendar day according to the injected clock
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn get(&self, id: i32) -> DomainResult<ReservationView> {
        self.repos
            .reservations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", id))
    }

    pub async fn list(&self, filter: ReservationFilter) -> DomainResult<Vec<ReservationView>> {
        self.repos.reservations().list(filter).await
    }

    /// Reservations on `slot.date` that overlap `slot`, skipping `exclude_id`.
    pub async fn find_conflicts(
        &self,
        slot: TimeSlot,
        exclude_id: Option<i32>,
    ) -> DomainResult<Vec<Reservation>> {
        let same_day = self.repos.reservations().find_by_date(slot.date).await?;
        Ok(find_conflicts(
            &slot,
            same_day,
            exclude_id,
            self.policy.conflicts,
        ))
    }

    // ── Commands ────────────────────────────────────────────────

    /// Book a slot. New reservations always start as `pending`.
    pub async fn create(&self, input: ReservationInput) -> DomainResult<ReservationView> {
        validate_slot(&input.slot, self.clock.today(), self.policy.hours)?;
        let owner = self.require_user(input.user_id).await?;

        let new = NewReservation {
            slot: input.slot,
            note: normalize_note(input.note),
            status: ReservationStatus::Pending,
            user_id: input.user_id,
            created_at: self.clock.now_utc(),
        };

        let reservation = self
            .repos
            .reservations()
            .insert_if_free(new, self.policy.conflicts)
            .await
            .inspect_err(record_conflict)?;

        metrics::counter!("reservations_created_total").increment(1);
        info!(
            reservation_id = reservation.id,
            user_id = reservation.user_id,
            date = %reservation.date,
            "Reservation created"
        );

        Ok(ReservationView { reservation, owner })
    }

    /// Apply a partial update.
    ///
    /// Terminal reservations reject every change. A status-only change skips
    /// the schedule rules but must follow the state machine.
    pub async fn update(
        &self,
        id: i32,
        changes: ReservationChanges,
    ) -> DomainResult<ReservationView> {
        if changes.is_empty() {
            return Err(DomainError::Validation(
                "at least one field must be provided".into(),
            ));
        }

        let current = self.get(id).await?;
        let existing = current.reservation;

        if existing.status.is_terminal() {
            return Err(DomainError::Terminal(existing.status));
        }

        if let Some(target) = changes.status {
            if !existing.status.can_transition_to(target) {
                return Err(DomainError::InvalidTransition {
                    from: existing.status,
                    to: target,
                });
            }
        }

        let now = self.clock.now_utc();

        if let (true, Some(target)) = (changes.is_status_only(), changes.status) {
            let reservation = self
                .repos
                .reservations()
                .update_status(id, existing.status, target, now)
                .await?;
            info!(
                reservation_id = id,
                from = %existing.status,
                to = %target,
                "Reservation status changed"
            );
            return Ok(ReservationView {
                reservation,
                owner: current.owner,
            });
        }

        let owner = match changes.user_id {
            Some(user_id) if user_id != existing.user_id => self.require_user(user_id).await?,
            _ => current.owner,
        };

        let touches_schedule = changes.touches_schedule();
        let mut next = existing.clone();
        if let Some(date) = changes.date {
            next.date = date;
        }
        if let Some(start) = changes.start_time {
            next.start_time = start;
        }
        if let Some(end) = changes.end_time {
            next.end_time = end;
        }
        if let Some(note) = changes.note {
            next.note = normalize_note(note);
        }
        if let Some(status) = changes.status {
            next.status = status;
        }
        next.user_id = owner.id;
        next.updated_at = now;

        let conflict_check = if touches_schedule {
            validate_slot(&next.slot(), self.clock.today(), self.policy.hours)?;
            Some(self.policy.conflicts)
        } else {
            None
        };

        let reservation = self
            .repos
            .reservations()
            .update(next, existing.status, conflict_check)
            .await
            .inspect_err(record_conflict)?;

        info!(reservation_id = id, "Reservation updated");
        Ok(ReservationView { reservation, owner })
    }

    /// Soft delete. Cancelling twice is a no-op; finalized bookings stay.
    pub async fn cancel(&self, id: i32) -> DomainResult<ReservationView> {
        let current = self.get(id).await?;

        match current.reservation.status {
            ReservationStatus::Finalized => Err(DomainError::InvalidTransition {
                from: ReservationStatus::Finalized,
                to: ReservationStatus::Cancelled,
            }),
            ReservationStatus::Cancelled => Ok(current),
            from => {
                let written = self
                    .repos
                    .reservations()
                    .update_status(id, from, ReservationStatus::Cancelled, self.clock.now_utc())
                    .await;
                let reservation = match written {
                    Ok(r) => r,
                    // lost a race with another cancel
                    Err(DomainError::Terminal(ReservationStatus::Cancelled)) => {
                        return self.get(id).await;
                    }
                    Err(DomainError::Terminal(ReservationStatus::Finalized)) => {
                        return Err(DomainError::InvalidTransition {
                            from: ReservationStatus::Finalized,
                            to: ReservationStatus::Cancelled,
                        });
                    }
                    Err(e) => return Err(e),
                };
                metrics::counter!("reservations_cancelled_total").increment(1);
                info!(reservation_id = id, "Reservation cancelled");
                Ok(ReservationView {
                    reservation,
                    owner: current.owner,
                })
            }
        }
    }

    /// Permanently remove cancelled reservations dated before `before`.
    pub async fn purge(&self, before: NaiveDate) -> DomainResult<u64> {
        let deleted = self.repos.reservations().purge_cancelled(before).await?;
        metrics::counter!("reservations_purged_total").increment(deleted);
        info!(%before, deleted, "Purged cancelled reservations");
        Ok(deleted)
    }

    // ── Helpers ─────────────────────────────────────────────────

    async fn require_user(&self, user_id: i32) -> DomainResult<UserSummary> {
        self.repos
            .users()
            .get_user_by_id(user_id)
            .await?
            .map(|u| u.summary())
            .ok_or_else(|| DomainError::InvalidReference {
                entity: "User",
                value: user_id.to_string(),
            })
    }
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

fn record_conflict(e: &DomainError) {
    if let DomainError::Conflict(reason) = e {
        metrics::counter!("reservation_conflicts_total").increment(1);
        warn!(%reason, "Reservation rejected");
    }
}

// ── Tests ──────────────────────────────────────────────────────
