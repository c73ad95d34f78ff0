use thiserror::Error;

use crate::domain::reservation::{BookingRuleViolation, ReservationStatus};

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Validation: {0}")]
    Rule(#[from] BookingRuleViolation),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Reservation is {from} and cannot move to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("Reservation is {0} and can no longer be modified")]
    Terminal(ReservationStatus),

    #[error("Invalid reference: {entity} {value} does not exist")]
    InvalidReference { entity: &'static str, value: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Machine-checkable reason surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound { .. } => "not_found",
            DomainError::Validation(_) | DomainError::Rule(_) => "validation_failed",
            DomainError::Conflict(_) => "conflict",
            DomainError::InvalidTransition { .. } | DomainError::Terminal(_) => {
                "invalid_transition"
            }
            DomainError::InvalidReference { .. } => "reference_error",
            DomainError::Unauthorized(_) => "unauthorized",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::Internal(_) => "internal",
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            field: "id",
            value: id.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<InfraError> for DomainError {
    fn from(e: InfraError) -> Self {
        DomainError::Internal(e.to_string())
    }
}
