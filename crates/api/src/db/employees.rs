//! Employee repository, including the rotation queries used by visit
//! assignment.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};

use estate_desk_core::rotation::AdvisorCandidate;
use estate_desk_core::{Email, EmployeeId, Phone};

use super::{RepositoryError, like_pattern};
use crate::models::employee::{Employee, EmployeeFilter, EmployeeInput};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    id: i32,
    national_id: String,
    first_names: String,
    last_names: String,
    email: String,
    phone: String,
    birth_date: Option<NaiveDate>,
    zones: Vec<String>,
    active: bool,
    last_assigned_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = RepositoryError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid employee email in database: {e}"))
        })?;
        let phone = Phone::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid employee phone in database: {e}"))
        })?;

        Ok(Self {
            id: EmployeeId::new(row.id),
            national_id: row.national_id,
            first_names: row.first_names,
            last_names: row.last_names,
            email,
            phone,
            birth_date: row.birth_date,
            zones: row.zones,
            active: row.active,
            last_assigned_at: row.last_assigned_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    id: i32,
    last_assigned_at: Option<DateTime<Utc>>,
}

const EMPLOYEE_COLUMNS: &str = "id, national_id, first_names, last_names, email, phone, \
     birth_date, zones, active, last_assigned_at, created_at, updated_at";

fn map_write_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict("national_id already registered".to_owned());
    }
    RepositoryError::from_constraint(e)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for staff profiles.
pub struct EmployeeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EmployeeRepository<'a> {
    /// Create a new employee repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List employees ordered by last name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &EmployeeFilter,
    ) -> Result<(Vec<Employee>, i64), RepositoryError> {
        let (limit, offset) = filter.paging().limit_offset();
        let search = filter.q.as_deref().map(like_pattern);
        let zone = filter.zone.as_deref().map(str::trim);

        let where_clause = r"
            WHERE ($1::boolean IS NULL OR active = $1)
              AND ($2::text IS NULL
                   OR cardinality(zones) = 0
                   OR EXISTS (SELECT 1 FROM unnest(zones) z WHERE LOWER(TRIM(z)) = LOWER($2)))
              AND ($3::text IS NULL
                   OR first_names ILIKE $3 OR last_names ILIKE $3 OR national_id ILIKE $3)
        ";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM employees {where_clause}"))
            .bind(filter.active)
            .bind(zone)
            .bind(search.as_deref())
            .fetch_one(self.pool)
            .await?;

        let rows: Vec<EmployeeRow> = sqlx::query_as(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees {where_clause}
             ORDER BY last_names, first_names, id LIMIT $4 OFFSET $5"
        ))
        .bind(filter.active)
        .bind(zone)
        .bind(search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let employees = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<_, _>>()?;
        Ok((employees, total))
    }

    /// Get an employee by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let row: Option<EmployeeRow> = sqlx::query_as(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create an employee.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the national ID is taken.
    pub async fn create(&self, input: &EmployeeInput) -> Result<Employee, RepositoryError> {
        let row: EmployeeRow = sqlx::query_as(&format!(
            r"
            INSERT INTO employees
                (national_id, first_names, last_names, email, phone, birth_date, zones, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {EMPLOYEE_COLUMNS}
            "
        ))
        .bind(&input.national_id)
        .bind(&input.first_names)
        .bind(&input.last_names)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.birth_date)
        .bind(&input.zones)
        .bind(input.active)
        .fetch_one(self.pool)
        .await
        .map_err(map_write_error)?;

        row.try_into()
    }

    /// Replace an employee's profile. The rotation pointer is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the employee doesn't exist.
    /// Returns `RepositoryError::Conflict` if the national ID is taken.
    pub async fn update(
        &self,
        id: EmployeeId,
        input: &EmployeeInput,
    ) -> Result<Employee, RepositoryError> {
        let row: Option<EmployeeRow> = sqlx::query_as(&format!(
            r"
            UPDATE employees SET
                national_id = $2, first_names = $3, last_names = $4, email = $5,
                phone = $6, birth_date = $7, zones = $8, active = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {EMPLOYEE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.national_id)
        .bind(&input.first_names)
        .bind(&input.last_names)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.birth_date)
        .bind(&input.zones)
        .bind(input.active)
        .fetch_optional(self.pool)
        .await
        .map_err(map_write_error)?;

        row.ok_or(RepositoryError::NotFound("employee"))?.try_into()
    }
}

// =============================================================================
// Rotation (transaction-scoped)
// =============================================================================

/// Lock and return every active advisor that serves `zone`.
///
/// Rows stay locked until the surrounding transaction ends, so two
/// concurrent assignments serialize on the same candidates.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_rotation_candidates(
    conn: &mut PgConnection,
    zone: &str,
) -> Result<Vec<AdvisorCandidate>, RepositoryError> {
    let rows: Vec<CandidateRow> = sqlx::query_as(
        r"
        SELECT e.id, e.last_assigned_at
        FROM employees e
        JOIN users u ON u.employee_id = e.id
        WHERE e.active
          AND u.active
          AND u.role = 'advisor'
          AND (cardinality(e.zones) = 0
               OR EXISTS (SELECT 1 FROM unnest(e.zones) z WHERE LOWER(TRIM(z)) = LOWER(TRIM($1))))
        ORDER BY e.id
        FOR UPDATE OF e
        ",
    )
    .bind(zone)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| AdvisorCandidate {
            employee_id: EmployeeId::new(r.id),
            last_assigned_at: r.last_assigned_at,
        })
        .collect())
}

/// Move an advisor's rotation pointer to now.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn advance_rotation(
    conn: &mut PgConnection,
    id: EmployeeId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE employees SET last_assigned_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Lock an employee row for booking and report whether it is an active
/// employee with an active advisor account.
///
/// Every booking path takes this lock before checking the advisor's
/// calendar, so overlapping bookings for one advisor serialize.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_for_booking(
    conn: &mut PgConnection,
    id: EmployeeId,
) -> Result<bool, RepositoryError> {
    let eligible: Option<bool> = sqlx::query_scalar(
        r"
        SELECT e.active AND EXISTS (
            SELECT 1 FROM users u
            WHERE u.employee_id = e.id AND u.active AND u.role = 'advisor'
        )
        FROM employees e
        WHERE e.id = $1
        FOR UPDATE
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(eligible.unwrap_or(false))
}

/// Whether `id` is an active employee.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn is_active_employee(
    conn: &mut PgConnection,
    id: EmployeeId,
) -> Result<bool, RepositoryError> {
    let found: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM employees WHERE id = $1 AND active)")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(found)
}
