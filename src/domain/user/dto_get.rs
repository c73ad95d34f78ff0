use super::UserRole;

#[derive(Debug, Clone, Default)]
pub struct GetUserDto {
    /// Matches name or email
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// name, email, unit; newest first otherwise
    pub sort_by: Option<String>,
}
