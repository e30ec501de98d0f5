//! Client repository and append-only interaction history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use estate_desk_core::{
    ClientId, ClientOrigin, Email, InteractionId, InteractionKind, Phone, UserId,
};

use super::{RepositoryError, like_pattern};
use crate::models::client::{Client, ClientFilter, ClientInput, Interaction, NewInteractionInput};

#[derive(Debug, sqlx::FromRow)]
struct ClientRow {
    id: i32,
    full_name: String,
    phone: String,
    email: Option<String>,
    preferred_zone: Option<String>,
    budget_min: Option<Decimal>,
    budget_max: Option<Decimal>,
    origin: ClientOrigin,
    registered_by: Option<i32>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ClientRow> for Client {
    type Error = RepositoryError;

    fn try_from(row: ClientRow) -> Result<Self, Self::Error> {
        let phone = Phone::parse(&row.phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid client phone in database: {e}"))
        })?;
        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid client email in database: {e}"))
            })?;

        Ok(Self {
            id: ClientId::new(row.id),
            full_name: row.full_name,
            phone,
            email,
            preferred_zone: row.preferred_zone,
            budget_min: row.budget_min,
            budget_max: row.budget_max,
            origin: row.origin,
            registered_by: row.registered_by.map(UserId::new),
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InteractionRow {
    id: i32,
    client_id: i32,
    kind: InteractionKind,
    body: String,
    author_id: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<InteractionRow> for Interaction {
    fn from(row: InteractionRow) -> Self {
        Self {
            id: InteractionId::new(row.id),
            client_id: ClientId::new(row.client_id),
            kind: row.kind,
            body: row.body,
            author_id: row.author_id.map(UserId::new),
            created_at: row.created_at,
        }
    }
}

const CLIENT_COLUMNS: &str = "id, full_name, phone, email, preferred_zone, budget_min, \
     budget_max, origin, registered_by, active, created_at, updated_at";

/// Repository for clients.
pub struct ClientRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ClientRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List clients by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ClientFilter) -> Result<(Vec<Client>, i64), RepositoryError> {
        let (limit, offset) = filter.paging().limit_offset();
        let search = filter.q.as_deref().map(like_pattern);

        let where_clause = r"
            WHERE ($1::text IS NULL OR full_name ILIKE $1 OR phone ILIKE $1 OR email ILIKE $1)
              AND ($2::client_origin IS NULL OR origin = $2)
              AND ($3::text IS NULL OR LOWER(preferred_zone) = LOWER(TRIM($3)))
              AND ($4::boolean IS NULL OR active = $4)
        ";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM clients {where_clause}"))
            .bind(search.as_deref())
            .bind(filter.origin)
            .bind(filter.zone.as_deref())
            .bind(filter.active)
            .fetch_one(self.pool)
            .await?;

        let rows: Vec<ClientRow> = sqlx::query_as(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients {where_clause}
             ORDER BY LOWER(full_name), id LIMIT $5 OFFSET $6"
        ))
        .bind(search.as_deref())
        .bind(filter.origin)
        .bind(filter.zone.as_deref())
        .bind(filter.active)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let clients = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<_, _>>()?;
        Ok((clients, total))
    }

    /// Get a client by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError> {
        let row: Option<ClientRow> =
            sqlx::query_as(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Register a client.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a constraint violation.
    pub async fn create(
        &self,
        input: &ClientInput,
        registered_by: UserId,
    ) -> Result<Client, RepositoryError> {
        let row: ClientRow = sqlx::query_as(&format!(
            r"
            INSERT INTO clients
                (full_name, phone, email, preferred_zone, budget_min, budget_max,
                 origin, registered_by, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {CLIENT_COLUMNS}
            "
        ))
        .bind(&input.full_name)
        .bind(&input.phone)
        .bind(input.email.as_ref())
        .bind(input.preferred_zone.as_deref())
        .bind(input.budget_min)
        .bind(input.budget_max)
        .bind(input.origin)
        .bind(registered_by)
        .bind(input.active)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_constraint)?;

        row.try_into()
    }

    /// Replace a client's details. `registered_by` is kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the client doesn't exist.
    pub async fn update(&self, id: ClientId, input: &ClientInput) -> Result<Client, RepositoryError> {
        let row: Option<ClientRow> = sqlx::query_as(&format!(
            r"
            UPDATE clients SET
                full_name = $2, phone = $3, email = $4, preferred_zone = $5,
                budget_min = $6, budget_max = $7, origin = $8, active = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CLIENT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.full_name)
        .bind(&input.phone)
        .bind(input.email.as_ref())
        .bind(input.preferred_zone.as_deref())
        .bind(input.budget_min)
        .bind(input.budget_max)
        .bind(input.origin)
        .bind(input.active)
        .fetch_optional(self.pool)
        .await
        .map_err(RepositoryError::from_constraint)?;

        row.ok_or(RepositoryError::NotFound("client"))?.try_into()
    }

    /// A client's history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_interactions(&self, id: ClientId) -> Result<Vec<Interaction>, RepositoryError> {
        let rows: Vec<InteractionRow> = sqlx::query_as(
            r"
            SELECT id, client_id, kind, body, author_id, created_at
            FROM client_interactions
            WHERE client_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Append an entry to a client's history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the client doesn't exist.
    pub async fn append_interaction(
        &self,
        id: ClientId,
        input: &NewInteractionInput,
        author: UserId,
    ) -> Result<Interaction, RepositoryError> {
        let row: InteractionRow = sqlx::query_as(
            r"
            INSERT INTO client_interactions (client_id, kind, body, author_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, client_id, kind, body, author_id, created_at
            ",
        )
        .bind(id)
        .bind(input.kind)
        .bind(&input.body)
        .bind(author)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_constraint)?;

        Ok(row.into())
    }
}

/// Whether an active client with `id` exists.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn is_active(conn: &mut PgConnection, id: ClientId) -> Result<bool, RepositoryError> {
    let found: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM clients WHERE id = $1 AND active)")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(found)
}
