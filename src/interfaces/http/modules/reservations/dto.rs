//! Reservation DTOs

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::domain::reservation::{
    Reservation, ReservationChanges, ReservationFilter, ReservationView,
};
use crate::domain::{DomainResult, ReservationStatus, UserSummary};

/// Public fields of the reservation owner
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OwnerDto {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub unit: i32,
}

impl From<UserSummary> for OwnerDto {
    fn from(u: UserSummary) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone: u.phone,
            unit: u.unit,
        }
    }
}

/// Reservation details in API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReservationDto {
    pub id: i32,
    #[schema(value_type = String, format = Date, example = "2030-06-11")]
    pub date: NaiveDate,
    #[schema(value_type = String, example = "2030-06-11T10:00:00")]
    pub start_time: NaiveDateTime,
    #[schema(value_type = String, example = "2030-06-11T12:00:00")]
    pub end_time: NaiveDateTime,
    pub note: Option<String>,
    /// pending, confirmed, cancelled or finalized
    pub status: String,
    pub user_id: i32,
    pub owner: OwnerDto,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReservationView> for ReservationDto {
    fn from(v: ReservationView) -> Self {
        let r = v.reservation;
        Self {
            id: r.id,
            date: r.date,
            start_time: r.start_time,
            end_time: r.end_time,
            note: r.note,
            status: r.status.as_str().to_string(),
            user_id: r.user_id,
            owner: OwnerDto::from(v.owner),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// A reservation blocking the requested interval
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConflictDto {
    pub id: i32,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    #[schema(value_type = String)]
    pub start_time: NaiveDateTime,
    #[schema(value_type = String)]
    pub end_time: NaiveDateTime,
    pub status: String,
    pub user_id: i32,
}

impl From<Reservation> for ConflictDto {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            date: r.date,
            start_time: r.start_time,
            end_time: r.end_time,
            status: r.status.as_str().to_string(),
            user_id: r.user_id,
        }
    }
}

/// Availability check result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConflictCheckResponse {
    /// `true` when nothing overlaps the requested interval
    pub available: bool,
    pub conflicts: Vec<ConflictDto>,
}

/// Request to book the party room
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservationRequest {
    #[schema(value_type = String, format = Date, example = "2030-06-11")]
    pub date: NaiveDate,
    /// Local time on `date`
    #[schema(value_type = String, example = "2030-06-11T10:00:00")]
    pub start_time: NaiveDateTime,
    #[schema(value_type = String, example = "2030-06-11T12:00:00")]
    pub end_time: NaiveDateTime,
    #[validate(length(max = 500, message = "note must be at most 500 characters"))]
    pub note: Option<String>,
    /// Owner; defaults to the caller. Only administrators may book for others.
    pub user_id: Option<i32>,
}

/// Partial update. An empty `note` clears it.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "at_least_one_field"))]
pub struct UpdateReservationRequest {
    #[schema(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
    #[schema(value_type = Option<String>)]
    pub start_time: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>)]
    pub end_time: Option<NaiveDateTime>,
    #[validate(length(max = 500, message = "note must be at most 500 characters"))]
    pub note: Option<String>,
    /// pending, confirmed, cancelled or finalized
    pub status: Option<String>,
    pub user_id: Option<i32>,
}

fn at_least_one_field(req: &UpdateReservationRequest) -> Result<(), ValidationError> {
    let empty = req.date.is_none()
        && req.start_time.is_none()
        && req.end_time.is_none()
        && req.note.is_none()
        && req.status.is_none()
        && req.user_id.is_none();
    if empty {
        let mut err = ValidationError::new("empty_update");
        err.message = Some("at least one field must be provided".into());
        return Err(err);
    }
    Ok(())
}

impl UpdateReservationRequest {
    pub fn into_changes(self) -> DomainResult<ReservationChanges> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<ReservationStatus>)
            .transpose()?;
        Ok(ReservationChanges {
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            note: self.note.map(|n| Some(n).filter(|n| !n.trim().is_empty())),
            status,
            user_id: self.user_id,
        })
    }
}

/// List filters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListReservationsParams {
    /// Earliest date, inclusive (YYYY-MM-DD)
    pub date_from: Option<NaiveDate>,
    /// Latest date, inclusive (YYYY-MM-DD)
    pub date_to: Option<NaiveDate>,
    /// pending, confirmed, cancelled or finalized
    pub status: Option<String>,
    /// Owner id
    pub user_id: Option<i32>,
    /// Include cancelled reservations (default false)
    pub include_cancelled: Option<bool>,
}

impl ListReservationsParams {
    pub fn into_filter(self) -> DomainResult<ReservationFilter> {
        Ok(ReservationFilter {
            date_from: self.date_from,
            date_to: self.date_to,
            status: self
                .status
                .as_deref()
                .map(str::parse::<ReservationStatus>)
                .transpose()?,
            user_id: self.user_id,
            include_cancelled: self.include_cancelled.unwrap_or(false),
        })
    }
}

/// Availability query
#[derive(Debug, Deserialize, IntoParams)]
pub struct ConflictQuery {
    /// Day to check (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Local start, e.g. 2030-06-11T10:00:00
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    /// Reservation to ignore, typically the one being edited
    pub exclude_id: Option<i32>,
}

/// Purge query
#[derive(Debug, Deserialize, IntoParams)]
pub struct PurgeQuery {
    /// Delete cancelled reservations dated strictly before this day; defaults to today
    pub before: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurgeResponse {
    pub deleted: u64,
    #[schema(value_type = String, format = Date)]
    pub before: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_fails_validation() {
        let errors = UpdateReservationRequest::default().validate().unwrap_err();
        assert!(errors.errors().contains_key("__all__"));
    }

    #[test]
    fn long_note_fails_validation() {
        let req = UpdateReservationRequest {
            note: Some("x".repeat(501)),
            ..Default::default()
        };
        assert!(req.validate().unwrap_err().field_errors().contains_key("note"));
    }

    #[test]
    fn blank_note_clears_and_status_parses() {
        let changes = UpdateReservationRequest {
            note: Some("  ".into()),
            status: Some("Confirmed".into()),
            ..Default::default()
        }
        .into_changes()
        .unwrap();
        assert_eq!(changes.note, Some(None));
        assert_eq!(changes.status, Some(ReservationStatus::Confirmed));

        let bad = UpdateReservationRequest {
            status: Some("archived".into()),
            ..Default::default()
        };
        assert_eq!(bad.into_changes().unwrap_err().code(), "validation_failed");
    }
}
