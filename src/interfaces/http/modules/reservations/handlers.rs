//! Reservation API handlers
//!
//! Any signed-in user can browse the room calendar and check availability.
//! Residents create, edit and cancel only their own bookings; confirming,
//! finalizing, reassigning and purging are administrator actions.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;

use super::dto::{
    ConflictCheckResponse, ConflictDto, ConflictQuery, CreateReservationRequest,
    ListReservationsParams, PurgeQuery, PurgeResponse, ReservationDto, UpdateReservationRequest,
};
use crate::application::booking::ReservationService;
use crate::domain::reservation::{ReservationInput, ReservationView, TimeSlot};
use crate::domain::{DomainError, ReservationStatus};
use crate::interfaces::http::common::{ApiResponse, ValidatedJson};
use crate::interfaces::http::middleware::AuthenticatedUser;

#[derive(Clone)]
pub struct ReservationHandlerState {
    pub service: Arc<ReservationService>,
}

fn ensure_owner(caller: &AuthenticatedUser, view: &ReservationView) -> Result<(), DomainError> {
    if caller.is_admin() || view.reservation.user_id == caller.user_id {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "You can only manage your own reservations".into(),
        ))
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(ListReservationsParams),
    responses(
        (status = 200, description = "Reservations ordered by date and start time", body = ApiResponse<Vec<ReservationDto>>),
        (status = 400, description = "Invalid filter")
    )
)]
pub async fn list_reservations(
    State(state): State<ReservationHandlerState>,
    Query(params): Query<ListReservationsParams>,
) -> Result<Json<ApiResponse<Vec<ReservationDto>>>, DomainError> {
    let views = state.service.list(params.into_filter()?).await?;
    let items = views.into_iter().map(ReservationDto::from).collect();
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/conflicts",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(ConflictQuery),
    responses(
        (status = 200, description = "Overlapping reservations, if any", body = ApiResponse<ConflictCheckResponse>)
    )
)]
pub async fn check_conflicts(
    State(state): State<ReservationHandlerState>,
    Query(query): Query<ConflictQuery>,
) -> Result<Json<ApiResponse<ConflictCheckResponse>>, DomainError> {
    let slot = TimeSlot::new(query.date, query.start_time, query.end_time);
    let conflicts = state.service.find_conflicts(slot, query.exclude_id).await?;

    Ok(Json(ApiResponse::success(ConflictCheckResponse {
        available: conflicts.is_empty(),
        conflicts: conflicts.into_iter().map(ConflictDto::from).collect(),
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation details", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_reservation(
    State(state): State<ReservationHandlerState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ReservationDto>>, DomainError> {
    let view = state.service.get(id).await?;
    Ok(Json(ApiResponse::success(ReservationDto::from(view))))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation created as pending", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Booking rule violated or unknown owner"),
        (status = 403, description = "Booking for another resident"),
        (status = 409, description = "Time slot already booked"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_reservation(
    State(state): State<ReservationHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReservationDto>>), DomainError> {
    let user_id = request.user_id.unwrap_or(caller.user_id);
    if user_id != caller.user_id {
        caller.require_admin()?;
    }

    let input = ReservationInput {
        slot: TimeSlot::new(request.date, request.start_time, request.end_time),
        note: request.note,
        user_id,
    };

    let view = state.service.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ReservationDto::from(view))),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = UpdateReservationRequest,
    responses(
        (status = 200, description = "Reservation updated", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Booking rule violated or transition not allowed"),
        (status = 403, description = "Not allowed"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Time slot already booked")
    )
)]
pub async fn update_reservation(
    State(state): State<ReservationHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
    ValidatedJson(request): ValidatedJson<UpdateReservationRequest>,
) -> Result<Json<ApiResponse<ReservationDto>>, DomainError> {
    let changes = request.into_changes()?;

    let current = state.service.get(id).await?;
    ensure_owner(&caller, &current)?;

    if !caller.is_admin() {
        if matches!(changes.user_id, Some(uid) if uid != current.reservation.user_id) {
            return Err(DomainError::Forbidden(
                "Only an administrator can reassign a reservation".into(),
            ));
        }
        if matches!(changes.status, Some(s) if s != ReservationStatus::Cancelled && s != current.reservation.status)
        {
            return Err(DomainError::Forbidden(
                "Only an administrator can confirm or finalize a reservation".into(),
            ));
        }
    }

    let view = state.service.update(id, changes).await?;
    Ok(Json(ApiResponse::success(ReservationDto::from(view))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled (idempotent)", body = ApiResponse<ReservationDto>),
        (status = 400, description = "Reservation already finalized"),
        (status = 403, description = "Not your reservation"),
        (status = 404, description = "Not found")
    )
)]
pub async fn cancel_reservation(
    State(state): State<ReservationHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ReservationDto>>, DomainError> {
    let current = state.service.get(id).await?;
    ensure_owner(&caller, &current)?;

    let view = state.service.cancel(id).await?;
    Ok(Json(ApiResponse::success(ReservationDto::from(view))))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/purge",
    tag = "Reservations",
    security(("bearer_auth" = [])),
    params(PurgeQuery),
    responses(
        (status = 200, description = "Number of deleted reservations", body = ApiResponse<PurgeResponse>),
        (status = 403, description = "Administrator role required")
    )
)]
pub async fn purge_reservations(
    State(state): State<ReservationHandlerState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Query(query): Query<PurgeQuery>,
) -> Result<Json<ApiResponse<PurgeResponse>>, DomainError> {
    caller.require_admin()?;

    let before = query.before.unwrap_or_else(|| state.service.today());
    let deleted = state.service.purge(before).await?;
    info!(admin_id = caller.user_id, %before, deleted, "Purge requested");

    Ok(Json(ApiResponse::success(PurgeResponse { deleted, before })))
}
