//! Login account types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use estate_desk_core::{Email, EmployeeId, Role, UserId};

/// A login account (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    /// Normalized (lowercase) login email.
    pub email: Email,
    pub role: Role,
    /// Linked staff profile, required for advisors.
    pub employee_id: Option<EmployeeId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Request body for `POST /users`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUserInput {
    pub email: Email,
    pub password: String,
    pub role: Role,
    pub employee_id: Option<EmployeeId>,
}

/// Request body for `PATCH /users/{id}/role`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RoleUpdate {
    pub role: Role,
}

/// Request body for `PATCH /users/{id}/active`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ActiveUpdate {
    pub active: bool,
}

/// Query parameters for `GET /users`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl UserFilter {
    #[must_use]
    pub const fn paging(&self) -> super::PageParams {
        super::PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}
