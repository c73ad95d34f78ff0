use super::UserRole;

#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub unit: i32,
    pub role: Option<UserRole>,
    /// Already hashed by the caller
    pub password_hash: String,
}
