//! Reservation domain entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::domain::{DomainError, UserSummary};

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservationStatus {
    /// Requested, waiting for confirmation
    Pending,
    /// Confirmed by the administrator
    Confirmed,
    /// Cancelled by the resident or the administrator (terminal)
    Cancelled,
    /// Event took place (terminal)
    Finalized,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 4] = [
        Self::Pending,
        Self::Confirmed,
        Self::Cancelled,
        Self::Finalized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Finalized => "finalized",
        }
    }

    /// No edits are accepted once a reservation reaches a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Finalized)
    }

    /// Allowed edges: pending -> confirmed | cancelled,
    /// confirmed -> cancelled | finalized. Staying put is always allowed.
    pub fn can_transition_to(&self, target: ReservationStatus) -> bool {
        if *self == target {
            return true;
        }
        matches!(
            (self, target),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Cancelled)
                | (Self::Confirmed, Self::Finalized)
        )
    }
}

impl FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "Invalid status '{}'. Allowed: pending, confirmed, cancelled, finalized",
                    s
                ))
            })
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested interval on one calendar day.
///
/// Times are local wall-clock timestamps; the interval is half-open
/// `[start_time, end_time)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl TimeSlot {
    pub fn new(date: NaiveDate, start_time: NaiveDateTime, end_time: NaiveDateTime) -> Self {
        Self {
            date,
            start_time,
            end_time,
        }
    }
}

/// Party room reservation
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub id: i32,
    pub date: NaiveDate,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub note: Option<String>,
    pub status: ReservationStatus,
    /// Owner of the booking
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.date, self.start_time, self.end_time)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == ReservationStatus::Cancelled
    }
}

/// Validated input for a new reservation. Status always starts at `pending`.
#[derive(Debug, Clone)]
pub struct ReservationInput {
    pub slot: TimeSlot,
    pub note: Option<String>,
    pub user_id: i32,
}

/// Partial update. `None` leaves the field untouched; `note: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ReservationChanges {
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub note: Option<Option<String>>,
    pub status: Option<ReservationStatus>,
    pub user_id: Option<i32>,
}

impl ReservationChanges {
    pub fn status_only(status: ReservationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.note.is_none()
            && self.status.is_none()
            && self.user_id.is_none()
    }

    /// True when nothing but the status is being changed.
    pub fn is_status_only(&self) -> bool {
        self.status.is_some()
            && Self {
                status: None,
                ..self.clone()
            }
            .is_empty()
    }

    /// True when the booked interval itself moves.
    pub fn touches_schedule(&self) -> bool {
        self.date.is_some() || self.start_time.is_some() || self.end_time.is_some()
    }
}

/// Reservation together with the public fields of its owner.
#[derive(Debug, Clone)]
pub struct ReservationView {
    pub reservation: Reservation,
    pub owner: UserSummary,
}

/// Listing filter
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<ReservationStatus>,
    pub user_id: Option<i32>,
    /// Cancelled reservations are hidden unless this is set or `status` asks for them.
    pub include_cancelled: bool,
}

impl ReservationFilter {
    pub fn matches(&self, r: &Reservation) -> bool {
        if let Some(from) = self.date_from {
            if r.date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if r.date > to {
                return false;
            }
        }
        if let Some(user_id) = self.user_id {
            if r.user_id != user_id {
                return false;
            }
        }
        match self.status {
            Some(status) => r.status == status,
            None => self.include_cancelled || !r.is_cancelled(),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn at(date: NaiveDate, h: u32) -> NaiveDateTime {
        date.and_time(NaiveTime::from_hms_opt(h, 0, 0).unwrap())
    }

    fn sample(status: ReservationStatus) -> Reservation {
        let date = NaiveDate::from_ymd_opt(2030, 5, 1).unwrap();
        Reservation {
            id: 1,
            date,
            start_time: at(date, 10),
            end_time: at(date, 12),
            note: None,
            status,
            user_id: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(!ReservationStatus::Confirmed.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(ReservationStatus::Finalized.is_terminal());
    }

    #[test]
    fn state_machine_edges() {
        use ReservationStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Finalized));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Finalized));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Finalized.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Pending));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!(
            "Confirmed".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::Confirmed
        );
        assert!("archived".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn status_only_detection() {
        let c = ReservationChanges::status_only(ReservationStatus::Confirmed);
        assert!(c.is_status_only());
        assert!(!c.touches_schedule());

        let c = ReservationChanges {
            status: Some(ReservationStatus::Confirmed),
            note: Some(Some("music".into())),
            ..Default::default()
        };
        assert!(!c.is_status_only());
        assert!(ReservationChanges::default().is_empty());
    }

    #[test]
    fn filter_hides_cancelled_by_default() {
        let cancelled = sample(ReservationStatus::Cancelled);
        let pending = sample(ReservationStatus::Pending);

        let filter = ReservationFilter::default();
        assert!(filter.matches(&pending));
        assert!(!filter.matches(&cancelled));

        let filter = ReservationFilter {
            include_cancelled: true,
            ..Default::default()
        };
        assert!(filter.matches(&cancelled));

        let filter = ReservationFilter {
            status: Some(ReservationStatus::Cancelled),
            ..Default::default()
        };
        assert!(filter.matches(&cancelled));
        assert!(!filter.matches(&pending));
    }

    #[test]
    fn filter_by_date_range_and_owner() {
        let r = sample(ReservationStatus::Pending);
        let filter = ReservationFilter {
            date_from: Some(r.date),
            date_to: Some(r.date),
            user_id: Some(3),
            ..Default::default()
        };
        assert!(filter.matches(&r));

        let filter = ReservationFilter {
            date_from: r.date.succ_opt(),
            ..Default::default()
        };
        assert!(!filter.matches(&r));

        let filter = ReservationFilter {
            user_id: Some(99),
            ..Default::default()
        };
        assert!(!filter.matches(&r));
    }
}
