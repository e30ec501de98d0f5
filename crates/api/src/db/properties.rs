//! Property listing repository: listings, images, documents and the public
//! catalog view.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use estate_desk_core::{
    CurrencyCode, DocumentKind, EmployeeId, ListingType, PropertyDocumentId, PropertyId,
    PropertyImageId, PropertyStatus,
};

use super::{RepositoryError, like_pattern};
use crate::models::property::{
    CatalogFilter, CatalogImage, CatalogProperty, NewDocumentInput, NewImageInput, Property,
    PropertyDocument, PropertyFilter, PropertyImage, PropertyInput,
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct PropertyRow {
    id: i32,
    code: String,
    title: String,
    description: String,
    listing_type: ListingType,
    status: PropertyStatus,
    price: Decimal,
    currency: CurrencyCode,
    surface_m2: Option<Decimal>,
    street: String,
    city: String,
    zone: String,
    owner_name: String,
    owner_phone: String,
    owner_email: Option<String>,
    advisor_id: Option<i32>,
    commission_rate: Decimal,
    listed_at: NaiveDate,
    published_at: Option<DateTime<Utc>>,
    closed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PropertyRow> for Property {
    fn from(row: PropertyRow) -> Self {
        Self {
            id: PropertyId::new(row.id),
            code: row.code,
            title: row.title,
            description: row.description,
            listing_type: row.listing_type,
            status: row.status,
            price: row.price,
            currency: row.currency,
            surface_m2: row.surface_m2,
            street: row.street,
            city: row.city,
            zone: row.zone,
            owner_name: row.owner_name,
            owner_phone: row.owner_phone,
            owner_email: row.owner_email,
            advisor_id: row.advisor_id.map(EmployeeId::new),
            commission_rate: row.commission_rate,
            listed_at: row.listed_at,
            published_at: row.published_at,
            closed_at: row.closed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: i32,
    property_id: i32,
    url: String,
    caption: Option<String>,
    position: i32,
    is_cover: bool,
    created_at: DateTime<Utc>,
}

impl From<ImageRow> for PropertyImage {
    fn from(row: ImageRow) -> Self {
        Self {
            id: PropertyImageId::new(row.id),
            property_id: PropertyId::new(row.property_id),
            url: row.url,
            caption: row.caption,
            position: row.position,
            is_cover: row.is_cover,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: i32,
    property_id: i32,
    kind: DocumentKind,
    name: String,
    url: String,
    created_at: DateTime<Utc>,
}

impl From<DocumentRow> for PropertyDocument {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: PropertyDocumentId::new(row.id),
            property_id: PropertyId::new(row.property_id),
            kind: row.kind,
            name: row.name,
            url: row.url,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CatalogRow {
    code: String,
    title: String,
    description: String,
    listing_type: ListingType,
    status: PropertyStatus,
    price: Decimal,
    currency: CurrencyCode,
    surface_m2: Option<Decimal>,
    city: String,
    zone: String,
    cover_url: Option<String>,
}

impl From<CatalogRow> for CatalogProperty {
    fn from(row: CatalogRow) -> Self {
        Self {
            code: row.code,
            title: row.title,
            description: row.description,
            listing_type: row.listing_type,
            status: row.status,
            price: row.price,
            currency: row.currency,
            surface_m2: row.surface_m2,
            city: row.city,
            zone: row.zone,
            cover_url: row.cover_url,
        }
    }
}

const PROPERTY_COLUMNS: &str = "id, code, title, description, listing_type, status, price, \
     currency, surface_m2, street, city, zone, owner_name, owner_phone, owner_email, \
     advisor_id, commission_rate, listed_at, published_at, closed_at, created_at, updated_at";

const IMAGE_COLUMNS: &str = "id, property_id, url, caption, position, is_cover, created_at";

/// Listings visible in the public catalog.
const CATALOG_VISIBLE: &str = "p.published_at IS NOT NULL AND p.status IN ('available', 'reserved')";

fn map_write_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict("property code already exists".to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::Conflict("listing advisor does not exist".to_owned());
        }
    }
    RepositoryError::from_constraint(e)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for property listings.
pub struct PropertyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PropertyRepository<'a> {
    /// Create a new property repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List listings, newest first.
    ///
    /// When `assigned_to` is set, only listings where that employee is the
    /// listing advisor or has a visit are returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &PropertyFilter,
        assigned_to: Option<EmployeeId>,
    ) -> Result<(Vec<Property>, i64), RepositoryError> {
        let (limit, offset) = filter.paging().limit_offset();
        let search = filter.q.as_deref().map(like_pattern);

        let where_clause = r"
            WHERE ($1::property_status IS NULL OR p.status = $1)
              AND ($2::listing_type IS NULL OR p.listing_type = $2)
              AND ($3::text IS NULL OR LOWER(p.city) = LOWER(TRIM($3)))
              AND ($4::text IS NULL OR LOWER(p.zone) = LOWER(TRIM($4)))
              AND ($5::numeric IS NULL OR p.price >= $5)
              AND ($6::numeric IS NULL OR p.price <= $6)
              AND ($7::integer IS NULL OR p.advisor_id = $7)
              AND ($8::text IS NULL OR p.code ILIKE $8 OR p.title ILIKE $8 OR p.street ILIKE $8)
              AND ($9::integer IS NULL
                   OR p.advisor_id = $9
                   OR EXISTS (SELECT 1 FROM visits v WHERE v.property_id = p.id AND v.advisor_id = $9))
        ";

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM properties p {where_clause}"))
                .bind(filter.status)
                .bind(filter.listing_type)
                .bind(filter.city.as_deref())
                .bind(filter.zone.as_deref())
                .bind(filter.min_price)
                .bind(filter.max_price)
                .bind(filter.advisor_id)
                .bind(search.as_deref())
                .bind(assigned_to)
                .fetch_one(self.pool)
                .await?;

        let rows: Vec<PropertyRow> = sqlx::query_as(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties p {where_clause}
             ORDER BY p.created_at DESC, p.id DESC LIMIT $10 OFFSET $11"
        ))
        .bind(filter.status)
        .bind(filter.listing_type)
        .bind(filter.city.as_deref())
        .bind(filter.zone.as_deref())
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(filter.advisor_id)
        .bind(search.as_deref())
        .bind(assigned_to)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Get a listing by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: PropertyId) -> Result<Option<Property>, RepositoryError> {
        let row: Option<PropertyRow> = sqlx::query_as(&format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Whether the listing is assigned to `employee`: listing advisor or has
    /// a visit on it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_assigned_to(
        &self,
        id: PropertyId,
        employee: EmployeeId,
    ) -> Result<bool, RepositoryError> {
        let assigned: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (SELECT 1 FROM properties WHERE id = $1 AND advisor_id = $2)
                OR EXISTS (SELECT 1 FROM visits WHERE property_id = $1 AND advisor_id = $2)
            ",
        )
        .bind(id)
        .bind(employee)
        .fetch_one(self.pool)
        .await?;
        Ok(assigned)
    }

    /// Create a listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken or the
    /// listing advisor does not exist.
    pub async fn create(
        &self,
        input: &PropertyInput,
        currency: CurrencyCode,
    ) -> Result<Property, RepositoryError> {
        let row: PropertyRow = sqlx::query_as(&format!(
            r"
            INSERT INTO properties
                (code, title, description, listing_type, price, currency, surface_m2,
                 street, city, zone, owner_name, owner_phone, owner_email, advisor_id,
                 commission_rate, listed_at, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    COALESCE($16, CURRENT_DATE), CASE WHEN $17 THEN NOW() END)
            RETURNING {PROPERTY_COLUMNS}
            "
        ))
        .bind(&input.code)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.listing_type)
        .bind(input.price)
        .bind(currency)
        .bind(input.surface_m2)
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.zone)
        .bind(&input.owner_name)
        .bind(&input.owner_phone)
        .bind(input.owner_email.as_ref())
        .bind(input.advisor_id)
        .bind(input.commission_rate.value())
        .bind(input.listed_at)
        .bind(input.published)
        .fetch_one(self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.into())
    }

    /// Replace the attributes of a listing that is not sold or rented.
    /// Status is changed separately.
    ///
    /// Publishing keeps the original `published_at`; unpublishing clears it.
    /// Returns `None` if no open listing has this ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate code.
    pub async fn update(
        &self,
        id: PropertyId,
        input: &PropertyInput,
        currency: CurrencyCode,
    ) -> Result<Option<Property>, RepositoryError> {
        let row: Option<PropertyRow> = sqlx::query_as(&format!(
            r"
            UPDATE properties SET
                code = $2, title = $3, description = $4, listing_type = $5, price = $6,
                currency = $7, surface_m2 = $8, street = $9, city = $10, zone = $11,
                owner_name = $12, owner_phone = $13, owner_email = $14, advisor_id = $15,
                commission_rate = $16, listed_at = COALESCE($17, listed_at),
                published_at = CASE WHEN $18 THEN COALESCE(published_at, NOW()) END,
                updated_at = NOW()
            WHERE id = $1 AND status NOT IN ('sold', 'rented')
            RETURNING {PROPERTY_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.code)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.listing_type)
        .bind(input.price)
        .bind(currency)
        .bind(input.surface_m2)
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.zone)
        .bind(&input.owner_name)
        .bind(&input.owner_phone)
        .bind(input.owner_email.as_ref())
        .bind(input.advisor_id)
        .bind(input.commission_rate.value())
        .bind(input.listed_at)
        .bind(input.published)
        .fetch_optional(self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.map(Into::into))
    }

    /// Images ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_images(&self, id: PropertyId) -> Result<Vec<PropertyImage>, RepositoryError> {
        let rows: Vec<ImageRow> = sqlx::query_as(&format!(
            "SELECT {IMAGE_COLUMNS} FROM property_images WHERE property_id = $1 ORDER BY position, id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Documents, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_documents(
        &self,
        id: PropertyId,
    ) -> Result<Vec<PropertyDocument>, RepositoryError> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            r"
            SELECT id, property_id, kind, name, url, created_at
            FROM property_documents WHERE property_id = $1 ORDER BY created_at, id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Attach a document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the listing doesn't exist.
    pub async fn add_document(
        &self,
        id: PropertyId,
        input: &NewDocumentInput,
    ) -> Result<PropertyDocument, RepositoryError> {
        let row: DocumentRow = sqlx::query_as(
            r"
            INSERT INTO property_documents (property_id, kind, name, url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, property_id, kind, name, url, created_at
            ",
        )
        .bind(id)
        .bind(input.kind)
        .bind(&input.name)
        .bind(&input.url)
        .fetch_one(self.pool)
        .await
        .map_err(RepositoryError::from_constraint)?;

        Ok(row.into())
    }

    /// Remove a document from a listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such document is attached.
    pub async fn delete_document(
        &self,
        id: PropertyId,
        document_id: PropertyDocumentId,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM property_documents WHERE id = $1 AND property_id = $2")
                .bind(document_id)
                .bind(id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("document"));
        }
        Ok(())
    }

    /// Remove an image from a listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such image is attached.
    pub async fn delete_image(
        &self,
        id: PropertyId,
        image_id: PropertyImageId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM property_images WHERE id = $1 AND property_id = $2")
            .bind(image_id)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("image"));
        }
        Ok(())
    }

    // =========================================================================
    // Public catalog
    // =========================================================================

    /// Published listings for the public catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_catalog(
        &self,
        filter: &CatalogFilter,
    ) -> Result<(Vec<CatalogProperty>, i64), RepositoryError> {
        let (limit, offset) = filter.paging().limit_offset();

        let where_clause = format!(
            r"
            WHERE {CATALOG_VISIBLE}
              AND ($1::listing_type IS NULL OR p.listing_type = $1)
              AND ($2::text IS NULL OR LOWER(p.city) = LOWER(TRIM($2)))
              AND ($3::text IS NULL OR LOWER(p.zone) = LOWER(TRIM($3)))
              AND ($4::numeric IS NULL OR p.price >= $4)
              AND ($5::numeric IS NULL OR p.price <= $5)
            "
        );

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM properties p {where_clause}"))
                .bind(filter.listing_type)
                .bind(filter.city.as_deref())
                .bind(filter.zone.as_deref())
                .bind(filter.min_price)
                .bind(filter.max_price)
                .fetch_one(self.pool)
                .await?;

        let rows: Vec<CatalogRow> = sqlx::query_as(&format!(
            r"
            SELECT p.code, p.title, p.description, p.listing_type, p.status, p.price,
                   p.currency, p.surface_m2, p.city, p.zone, i.url AS cover_url
            FROM properties p
            LEFT JOIN property_images i ON i.property_id = p.id AND i.is_cover
            {where_clause}
            ORDER BY p.published_at DESC, p.id DESC
            LIMIT $6 OFFSET $7
            "
        ))
        .bind(filter.listing_type)
        .bind(filter.city.as_deref())
        .bind(filter.zone.as_deref())
        .bind(filter.min_price)
        .bind(filter.max_price)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// A published listing by its public code, with its images.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_catalog_by_code(
        &self,
        code: &str,
    ) -> Result<Option<(CatalogProperty, Vec<CatalogImage>)>, RepositoryError> {
        let row: Option<(i32, CatalogRow)> = {
            #[derive(sqlx::FromRow)]
            struct Row {
                id: i32,
                #[sqlx(flatten)]
                catalog: CatalogRow,
            }

            let row: Option<Row> = sqlx::query_as(&format!(
                r"
                SELECT p.id, p.code, p.title, p.description, p.listing_type, p.status,
                       p.price, p.currency, p.surface_m2, p.city, p.zone,
                       i.url AS cover_url
                FROM properties p
                LEFT JOIN property_images i ON i.property_id = p.id AND i.is_cover
                WHERE UPPER(p.code) = UPPER($1) AND {CATALOG_VISIBLE}
                "
            ))
            .bind(code.trim())
            .fetch_optional(self.pool)
            .await?;
            row.map(|r| (r.id, r.catalog))
        };

        let Some((id, catalog)) = row else {
            return Ok(None);
        };

        let images = self
            .list_images(PropertyId::new(id))
            .await?
            .into_iter()
            .map(|i| CatalogImage {
                url: i.url,
                caption: i.caption,
                is_cover: i.is_cover,
            })
            .collect();

        Ok(Some((catalog.into(), images)))
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Lock a listing row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(
    conn: &mut PgConnection,
    id: PropertyId,
) -> Result<Option<Property>, RepositoryError> {
    let row: Option<PropertyRow> = sqlx::query_as(&format!(
        "SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Set a listing's status; closing statuses also stamp `closed_at`.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the listing doesn't exist.
pub async fn set_status(
    conn: &mut PgConnection,
    id: PropertyId,
    status: PropertyStatus,
) -> Result<Property, RepositoryError> {
    let row: Option<PropertyRow> = sqlx::query_as(&format!(
        r"
        UPDATE properties SET
            status = $2,
            closed_at = CASE WHEN $2 IN ('sold', 'rented') THEN NOW() ELSE NULL END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {PROPERTY_COLUMNS}
        "
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.ok_or(RepositoryError::NotFound("property"))?.into())
}

/// Attach an image. A new cover replaces the previous one; a missing
/// position appends after the last image.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn add_image(
    conn: &mut PgConnection,
    id: PropertyId,
    input: &NewImageInput,
) -> Result<PropertyImage, RepositoryError> {
    if input.is_cover {
        clear_cover(conn, id).await?;
    }

    let row: ImageRow = sqlx::query_as(&format!(
        r"
        INSERT INTO property_images (property_id, url, caption, position, is_cover)
        VALUES ($1, $2, $3,
                COALESCE($4, (SELECT COALESCE(MAX(position) + 1, 0)
                              FROM property_images WHERE property_id = $1)),
                $5)
        RETURNING {IMAGE_COLUMNS}
        "
    ))
    .bind(id)
    .bind(&input.url)
    .bind(input.caption.as_deref())
    .bind(input.position)
    .bind(input.is_cover)
    .fetch_one(&mut *conn)
    .await
    .map_err(RepositoryError::from_constraint)?;

    Ok(row.into())
}

/// Make `image_id` the listing's only cover.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if no such image is attached.
pub async fn set_cover(
    conn: &mut PgConnection,
    id: PropertyId,
    image_id: PropertyImageId,
) -> Result<PropertyImage, RepositoryError> {
    clear_cover(conn, id).await?;

    let row: Option<ImageRow> = sqlx::query_as(&format!(
        r"
        UPDATE property_images SET is_cover = TRUE
        WHERE id = $1 AND property_id = $2
        RETURNING {IMAGE_COLUMNS}
        "
    ))
    .bind(image_id)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.ok_or(RepositoryError::NotFound("image"))?.into())
}

async fn clear_cover(conn: &mut PgConnection, id: PropertyId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE property_images SET is_cover = FALSE WHERE property_id = $1 AND is_cover")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
