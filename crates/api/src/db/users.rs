//! Login account repository.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use estate_desk_core::{Email, EmployeeId, Role, UserId};

use super::RepositoryError;
use crate::models::user::{User, UserFilter};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    role: Role,
    employee_id: Option<i32>,
    active: bool,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            role: row.role,
            employee_id: row.employee_id.map(EmployeeId::new),
            active: row.active,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

const USER_COLUMNS: &str = "id, email, role, employee_id, active, created_at, last_login_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for login accounts.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &UserFilter) -> Result<(Vec<User>, i64), RepositoryError> {
        let (limit, offset) = filter.paging().limit_offset();

        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::boolean IS NULL OR active = $2)
            ",
        )
        .bind(filter.role)
        .bind(filter.active)
        .fetch_one(self.pool)
        .await?;

        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            r"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::boolean IS NULL OR active = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(filter.role)
        .bind(filter.active)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<_, _>>()?;
        Ok((users, total))
    }

    /// Get an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an account by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an account and its password hash by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<UserWithHashRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE LOWER(email) = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((User::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken, the employee
    /// is already linked to another account, or the employee does not exist.
    pub async fn create(
        &self,
        email: &Email,
        password_hash: &str,
        role: Role,
        employee_id: Option<EmployeeId>,
    ) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO users (email, password_hash, role, employee_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(email.as_str())
        .bind(password_hash)
        .bind(role)
        .bind(employee_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return if db_err.constraint() == Some("users_email_lower_key") {
                    RepositoryError::Conflict("email already exists".to_owned())
                } else {
                    RepositoryError::Conflict(
                        "employee is already linked to another account".to_owned(),
                    )
                };
            }
            RepositoryError::from_constraint(e)
        })?;

        row.try_into()
    }

    /// Replace an account's password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    pub async fn update_password_hash(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("user"));
        }
        Ok(())
    }

    /// Record a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn touch_last_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Role and activation changes (transaction-scoped)
// =============================================================================

/// Lock every active broker account, in id order.
///
/// Callers take this lock before touching the target account so concurrent
/// changes to broker accounts queue in the same order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_active_brokers(conn: &mut PgConnection) -> Result<Vec<UserId>, RepositoryError> {
    let ids: Vec<i32> = sqlx::query_scalar(
        "SELECT id FROM users WHERE role = 'broker' AND active ORDER BY id FOR UPDATE",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(ids.into_iter().map(UserId::new).collect())
}

/// Lock an account row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(conn: &mut PgConnection, id: UserId) -> Result<Option<User>, RepositoryError> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Change an account's role.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the account doesn't exist.
pub async fn update_role(
    conn: &mut PgConnection,
    id: UserId,
    role: Role,
) -> Result<User, RepositoryError> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(role)
    .fetch_optional(&mut *conn)
    .await?;

    row.ok_or(RepositoryError::NotFound("user"))?.try_into()
}

/// Activate or deactivate an account.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the account doesn't exist.
pub async fn set_active(
    conn: &mut PgConnection,
    id: UserId,
    active: bool,
) -> Result<User, RepositoryError> {
    let row: Option<UserRow> = sqlx::query_as(&format!(
        "UPDATE users SET active = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(active)
    .fetch_optional(&mut *conn)
    .await?;

    row.ok_or(RepositoryError::NotFound("user"))?.try_into()
}
