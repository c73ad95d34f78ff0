//! Overlap detection for the single shared party room.
//!
//! Conflicts are global: the room is one resource, so reservations of every
//! owner are considered.

use super::model::{Reservation, TimeSlot};

/// Whether cancelled reservations still hold their slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Cancelled reservations free their slot.
    #[default]
    IgnoreCancelled,
    /// Cancelled reservations keep blocking their slot.
    IncludeCancelled,
}

impl ConflictPolicy {
    pub fn from_cancelled_blocks(cancelled_blocks_slot: bool) -> Self {
        if cancelled_blocks_slot {
            Self::IncludeCancelled
        } else {
            Self::IgnoreCancelled
        }
    }

    pub fn considers(&self, r: &Reservation) -> bool {
        match self {
            Self::IgnoreCancelled => !r.is_cancelled(),
            Self::IncludeCancelled => true,
        }
    }
}

/// Half-open interval intersection on the same date.
///
/// Start-inside, end-inside, covering and contained cases are all instances
/// of this one predicate.
pub fn overlaps(a: &TimeSlot, b: &TimeSlot) -> bool {
    a.date == b.date && !(a.end_time <= b.start_time || a.start_time >= b.end_time)
}

/// Every reservation in `existing` that collides with `candidate`.
pub fn find_conflicts<I>(
    candidate: &TimeSlot,
    existing: I,
    exclude_id: Option<i32>,
    policy: ConflictPolicy,
) -> Vec<Reservation>
where
    I: IntoIterator<Item = Reservation>,
{
    existing
        .into_iter()
        .filter(|r| Some(r.id) != exclude_id)
        .filter(|r| policy.considers(r))
        .filter(|r| overlaps(candidate, &r.slot()))
        .collect()
}

/// Human-readable summary used in conflict errors.
pub fn describe_conflicts(conflicts: &[Reservation]) -> String {
    let slots: Vec<String> = conflicts
        .iter()
        .map(|r| {
            format!(
                "#{} {} {}-{}",
                r.id,
                r.date,
                r.start_time.format("%H:%M"),
                r.end_time.format("%H:%M")
            )
        })
        .collect();
    format!("time slot already booked ({})", slots.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::ReservationStatus;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 7, 4).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    fn slot(start: u32, end: u32) -> TimeSlot {
        TimeSlot::new(day(), at(day(), start, 0), at(day(), end, 0))
    }

    fn booking(id: i32, start: u32, end: u32, status: ReservationStatus) -> Reservation {
        Reservation {
            id,
            date: day(),
            start_time: at(day(), start, 0),
            end_time: at(day(), end, 0),
            note: None,
            status,
            user_id: id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn four_classic_cases_are_conflicts() {
        let existing = slot(10, 12);
        // new start inside existing
        assert!(overlaps(&slot(11, 13), &existing));
        // new end inside existing
        assert!(overlaps(&slot(9, 11), &existing));
        // new covers existing
        assert!(overlaps(&slot(9, 13), &existing));
        // new contained in existing
        assert!(overlaps(&TimeSlot::new(day(), at(day(), 10, 30), at(day(), 11, 30)), &existing));
        // identical
        assert!(overlaps(&slot(10, 12), &existing));
    }

    #[test]
    fn touching_intervals_do_not_conflict() {
        let existing = slot(10, 12);
        assert!(!overlaps(&slot(12, 14), &existing));
        assert!(!overlaps(&slot(8, 10), &existing));
    }

    #[test]
    fn other_dates_never_conflict() {
        let other = day().succ_opt().unwrap();
        let a = TimeSlot::new(other, at(other, 10, 0), at(other, 12, 0));
        assert!(!overlaps(&a, &slot(10, 12)));
    }

    #[test]
    fn predicate_matches_brute_force_on_hour_grid() {
        for s1 in 8..22 {
            for e1 in (s1 + 1)..=22 {
                for s2 in 8..22 {
                    for e2 in (s2 + 1)..=22 {
                        let shares_an_hour = (s1..e1).any(|h| (s2..e2).contains(&h));
                        assert_eq!(
                            overlaps(&slot(s1, e1), &slot(s2, e2)),
                            shares_an_hour,
                            "[{s1},{e1}) vs [{s2},{e2})"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn exclusion_round_trip() {
        let stored = booking(5, 10, 12, ReservationStatus::Pending);
        let candidate = stored.slot();

        let with_self = find_conflicts(
            &candidate,
            vec![stored.clone()],
            None,
            ConflictPolicy::default(),
        );
        assert_eq!(with_self.len(), 1);
        assert_eq!(with_self[0].id, 5);

        let without_self =
            find_conflicts(&candidate, vec![stored], Some(5), ConflictPolicy::default());
        assert!(without_self.is_empty());
    }

    #[test]
    fn returns_every_conflict() {
        let existing = vec![
            booking(1, 8, 10, ReservationStatus::Confirmed),
            booking(2, 11, 12, ReservationStatus::Pending),
            booking(3, 13, 15, ReservationStatus::Pending),
            booking(4, 18, 20, ReservationStatus::Pending),
        ];
        let conflicts = find_conflicts(&slot(9, 14), existing, None, ConflictPolicy::default());
        let ids: Vec<i32> = conflicts.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn cancelled_policy() {
        let existing = vec![booking(1, 10, 12, ReservationStatus::Cancelled)];

        let lenient = find_conflicts(
            &slot(10, 12),
            existing.clone(),
            None,
            ConflictPolicy::IgnoreCancelled,
        );
        assert!(lenient.is_empty());

        let strict = find_conflicts(
            &slot(10, 12),
            existing,
            None,
            ConflictPolicy::IncludeCancelled,
        );
        assert_eq!(strict.len(), 1);
    }

    #[test]
    fn conflicts_are_described_with_ids() {
        let msg = describe_conflicts(&[booking(7, 10, 12, ReservationStatus::Pending)]);
        assert_eq!(msg, "time slot already booked (#7 2030-07-04 10:00-12:00)");
    }
}
