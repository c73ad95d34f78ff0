//! Booking rules checked before any reservation is written.

use chrono::{NaiveDate, NaiveTime, Timelike};
use thiserror::Error;

use super::model::TimeSlot;

/// First rule a candidate reservation breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BookingRuleViolation {
    #[error("reservation date must be today or later")]
    PastDate,

    #[error("start and end time must fall on the reservation date")]
    OutsideReservationDay,

    #[error("end time must be after start time")]
    EndNotAfterStart,

    #[error("reservation must be between {open:02}:00 and {close:02}:00")]
    OutsideBusinessHours { open: u32, close: u32 },
}

/// Opening hours of the party room, `[open, close)` in whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub open: u32,
    pub close: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self { open: 8, close: 22 }
    }
}

impl BusinessHours {
    pub fn new(open: u32, close: u32) -> Self {
        Self { open, close }
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        let hour = time.hour();
        hour >= self.open && hour < self.close
    }
}

/// Check a candidate slot against the booking rules.
///
/// `today` is the caller's local calendar day; a booking for today is valid
/// whatever the current time.
pub fn validate_slot(
    slot: &TimeSlot,
    today: NaiveDate,
    hours: BusinessHours,
) -> Result<(), BookingRuleViolation> {
    if slot.date < today {
        return Err(BookingRuleViolation::PastDate);
    }

    if slot.start_time.date() != slot.date || slot.end_time.date() != slot.date {
        return Err(BookingRuleViolation::OutsideReservationDay);
    }

    if slot.end_time <= slot.start_time {
        return Err(BookingRuleViolation::EndNotAfterStart);
    }

    if !hours.contains(slot.start_time.time()) || !hours.contains(slot.end_time.time()) {
        return Err(BookingRuleViolation::OutsideBusinessHours {
            open: hours.open,
            close: hours.close,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDateTime};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, 10).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        date.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    fn slot(date: NaiveDate, start: (u32, u32), end: (u32, u32)) -> TimeSlot {
        TimeSlot::new(date, at(date, start.0, start.1), at(date, end.0, end.1))
    }

    #[test]
    fn accepts_valid_slots_across_the_day() {
        let hours = BusinessHours::default();
        for day_offset in 0..3 {
            let date = today() + Duration::days(day_offset);
            for start in 8..21 {
                for end in (start + 1)..22 {
                    let s = slot(date, (start, 0), (end, 0));
                    assert_eq!(validate_slot(&s, today(), hours), Ok(()), "{:?}", s);
                }
            }
        }
    }

    #[test]
    fn today_is_allowed() {
        let s = slot(today(), (20, 0), (21, 30));
        assert!(validate_slot(&s, today(), BusinessHours::default()).is_ok());
    }

    #[test]
    fn rejects_past_dates() {
        for back in 1..30 {
            let date = today() - Duration::days(back);
            let s = slot(date, (10, 0), (12, 0));
            assert_eq!(
                validate_slot(&s, today(), BusinessHours::default()),
                Err(BookingRuleViolation::PastDate)
            );
        }
    }

    #[test]
    fn rejects_times_on_another_day() {
        let date = today();
        let s = TimeSlot::new(date, at(date, 10, 0), at(date.succ_opt().unwrap(), 11, 0));
        assert_eq!(
            validate_slot(&s, today(), BusinessHours::default()),
            Err(BookingRuleViolation::OutsideReservationDay)
        );
    }

    #[test]
    fn rejects_end_not_after_start() {
        let equal = slot(today(), (10, 0), (10, 0));
        let reversed = slot(today(), (12, 0), (10, 0));
        for s in [equal, reversed] {
            assert_eq!(
                validate_slot(&s, today(), BusinessHours::default()),
                Err(BookingRuleViolation::EndNotAfterStart)
            );
        }
    }

    #[test]
    fn rejects_early_start() {
        // today 07:00-09:00
        let s = slot(today(), (7, 0), (9, 0));
        assert_eq!(
            validate_slot(&s, today(), BusinessHours::default()),
            Err(BookingRuleViolation::OutsideBusinessHours { open: 8, close: 22 })
        );
    }

    #[test]
    fn closing_hour_is_exclusive() {
        let hours = BusinessHours::default();
        assert!(validate_slot(&slot(today(), (20, 0), (21, 59)), today(), hours).is_ok());
        assert!(validate_slot(&slot(today(), (20, 0), (22, 0)), today(), hours).is_err());
    }

    #[test]
    fn first_violation_wins() {
        // past date and reversed times: date rule reported
        let date = today() - Duration::days(1);
        let s = slot(date, (23, 0), (6, 0));
        assert_eq!(
            validate_slot(&s, today(), BusinessHours::default()),
            Err(BookingRuleViolation::PastDate)
        );
    }

    #[test]
    fn custom_hours() {
        let hours = BusinessHours::new(10, 18);
        assert!(validate_slot(&slot(today(), (9, 0), (11, 0)), today(), hours).is_err());
        assert!(validate_slot(&slot(today(), (10, 0), (17, 30)), today(), hours).is_ok());
    }

    #[test]
    fn violation_message() {
        let v = BookingRuleViolation::OutsideBusinessHours { open: 8, close: 22 };
        assert_eq!(v.to_string(), "reservation must be between 08:00 and 22:00");
    }
}
