//! User DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::{DomainError, User, UserRole};

/// User API representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Apartment number
    pub unit: i32,
    /// `admin` or `resident`
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone: u.phone,
            unit: u.unit,
            role: u.role.as_str().to_string(),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Strict role parsing for request bodies and filters
pub fn parse_role(s: &str) -> Result<UserRole, DomainError> {
    match s.trim().to_lowercase().as_str() {
        "admin" => Ok(UserRole::Admin),
        "resident" => Ok(UserRole::Resident),
        other => Err(DomainError::Validation(format!(
            "Invalid role '{}'. Allowed: admin, resident",
            other
        ))),
    }
}

/// Create user request (admin)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 20, message = "phone must be 8-20 characters"))]
    pub phone: String,
    #[validate(range(min = 1, message = "unit must be a positive number"))]
    pub unit: i32,
    #[validate(length(min = 8, max = 128, message = "password must be 8-128 characters"))]
    pub password: String,
    /// `admin` or `resident` (default)
    pub role: Option<String>,
}

/// Update user request. Only administrators may change `role`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 20, message = "phone must be 8-20 characters"))]
    pub phone: Option<String>,
    #[validate(range(min = 1, message = "unit must be a positive number"))]
    pub unit: Option<i32>,
    pub role: Option<String>,
}

/// List users query parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersParams {
    /// Search by name or email
    pub search: Option<String>,
    /// Filter by role (admin, resident)
    pub role: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// Sort field (name, email, unit); newest first otherwise
    pub sort_by: Option<String>,
}
