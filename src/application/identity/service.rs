//! User management service: application-layer orchestration
//!
//! All user-related business logic lives here.
//! HTTP handlers should be thin wrappers that delegate to this service.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{
    CreateUserDto, DomainError, DomainResult, GetUserDto, RepositoryProvider, UpdateUserDto,
    User, UserRole,
};
use crate::infrastructure::crypto::jwt::{create_token, JwtConfig};
use crate::infrastructure::crypto::password::{hash_password, verify_password};
use crate::shared::PaginatedResult;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Authentication result returned after a successful login
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// Account fields supplied at sign-up or by an administrator.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub unit: i32,
    pub password: String,
}

/// User service: orchestrates all identity / user-management use-cases.
pub struct UserService {
    repos: Arc<dyn RepositoryProvider>,
    jwt_config: JwtConfig,
}

impl UserService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, jwt_config: JwtConfig) -> Self {
        Self { repos, jwt_config }
    }

    // ── Authentication ──────────────────────────────────────────

    /// Authenticate by email + password and return a JWT.
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<AuthResult> {
        let email = email.trim().to_lowercase();
        let user = self.repos.users().get_user_by_email(&email).await?;

        let Some(user) = user else {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        };

        if !verify_password(password, &user.password_hash) {
            warn!(user_id = user.id, "Login rejected: wrong password");
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        }

        info!(user_id = user.id, "User logged in");
        self.issue(user)
    }

    // ── Registration ────────────────────────────────────────────

    /// Self-service sign-up. New accounts are always residents.
    pub async fn register(&self, account: NewAccount) -> DomainResult<AuthResult> {
        let user = self.create_user(account, UserRole::Resident).await?;
        info!(user_id = user.id, email = %user.email, "New resident registered");
        self.issue(user)
    }

    // ── Queries ─────────────────────────────────────────────────

    /// List users with search, filtering, sorting and pagination.
    pub async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        self.repos.users().list_users(dto).await
    }

    pub async fn get_user(&self, id: i32) -> DomainResult<User> {
        self.repos
            .users()
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    // ── Commands (mutations) ────────────────────────────────────

    pub async fn create_user(&self, account: NewAccount, role: UserRole) -> DomainResult<User> {
        check_password(&account.password)?;
        if account.unit <= 0 {
            return Err(DomainError::Validation(
                "Unit must be a positive number".into(),
            ));
        }

        let email = account.email.trim().to_lowercase();
        if self.repos.users().get_user_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict("Email already exists".into()));
        }

        let password_hash = hash_password(&account.password)
            .map_err(|e| DomainError::Internal(format!("Failed to hash password: {}", e)))?;

        let user = self
            .repos
            .users()
            .create_user(CreateUserDto {
                name: account.name.trim().to_string(),
                email,
                phone: account.phone.trim().to_string(),
                unit: account.unit,
                role: Some(role),
                password_hash,
            })
            .await?;

        info!(user_id = user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Update profile fields.
    pub async fn update_user(&self, id: i32, mut dto: UpdateUserDto) -> DomainResult<User> {
        if matches!(dto.unit, Some(unit) if unit <= 0) {
            return Err(DomainError::Validation(
                "Unit must be a positive number".into(),
            ));
        }
        dto.email = dto.email.map(|e| e.trim().to_lowercase());

        self.repos
            .users()
            .update_user(id, dto)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    /// Change a user's password. Verifies the current password first.
    pub async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> DomainResult<()> {
        check_password(new_password)?;

        let user = self.get_user(user_id).await?;

        if !verify_password(current_password, &user.password_hash) {
            return Err(DomainError::Unauthorized("Invalid current password".into()));
        }

        let new_hash = hash_password(new_password)
            .map_err(|e| DomainError::Internal(format!("Failed to hash password: {}", e)))?;

        self.repos
            .users()
            .update_user_password(user_id, &new_hash)
            .await?;

        info!(user_id, "Password changed");
        Ok(())
    }

    /// Delete a user together with their reservations.
    pub async fn delete_user(&self, id: i32) -> DomainResult<()> {
        self.repos.users().delete_user(id).await?;
        info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Create the administrator account when the user table is empty.
    ///
    /// Returns the new admin, or `None` when users already exist.
    pub async fn seed_admin(&self, account: NewAccount) -> DomainResult<Option<User>> {
        if self.repos.users().count_users().await? > 0 {
            return Ok(None);
        }
        let admin = self.create_user(account, UserRole::Admin).await?;
        info!(email = %admin.email, "Default admin created");
        warn!("Please change the admin password immediately!");
        Ok(Some(admin))
    }

    // ── Helpers ─────────────────────────────────────────────────

    fn issue(&self, user: User) -> DomainResult<AuthResult> {
        let token = create_token(&user, &self.jwt_config)
            .map_err(|e| DomainError::Internal(format!("Failed to create token: {}", e)))?;

        Ok(AuthResult {
            token,
            token_type: "Bearer".into(),
            expires_in: self.jwt_config.expiration_hours * 3600,
            user,
        })
    }
}

fn check_password(password: &str) -> DomainResult<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(DomainError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
