//! Listing changes that span more than one row or depend on the current
//! status.

use sqlx::PgPool;

use estate_desk_core::{CurrencyCode, PropertyId, PropertyImageId, PropertyStatus};

use crate::db::{PropertyRepository, properties};
use crate::error::AppError;
use crate::models::property::{NewImageInput, Property, PropertyImage, PropertyInput};

/// Listing service.
pub struct PropertyService<'a> {
    pool: &'a PgPool,
}

impl<'a> PropertyService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Replace a listing's attributes.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the listing is sold or rented.
    pub async fn update(
        &self,
        id: PropertyId,
        input: &PropertyInput,
        currency: CurrencyCode,
    ) -> Result<Property, AppError> {
        let repo = PropertyRepository::new(self.pool);
        let current = repo
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound("property"))?;
        if current.status.is_closed() {
            return Err(AppError::conflict(format!(
                "property is {} and can no longer be edited",
                current.status
            )));
        }

        // The update itself re-checks the status, so a listing closed in
        // between is reported as a conflict rather than overwritten.
        repo.update(id, input, currency).await?.ok_or_else(|| {
            AppError::conflict("property was closed and can no longer be edited")
        })
    }

    /// Apply a manual status change.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Conflict` if the lifecycle does not allow it.
    pub async fn change_status(
        &self,
        id: PropertyId,
        status: PropertyStatus,
    ) -> Result<Property, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = properties::lock(&mut tx, id)
            .await?
            .ok_or(AppError::NotFound("property"))?;
        let next = current.status.transition_to(status)?;
        let property = properties::set_status(&mut tx, id, next).await?;

        tx.commit().await?;

        tracing::info!(property_id = %id, from = %current.status, to = %next, "property status changed");
        Ok(property)
    }

    /// Attach an image, replacing the cover if this one is flagged as cover.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the listing doesn't exist.
    pub async fn add_image(
        &self,
        id: PropertyId,
        input: &NewImageInput,
    ) -> Result<PropertyImage, AppError> {
        let mut tx = self.pool.begin().await?;
        properties::lock(&mut tx, id)
            .await?
            .ok_or(AppError::NotFound("property"))?;
        let image = properties::add_image(&mut tx, id, input).await?;
        tx.commit().await?;
        Ok(image)
    }

    /// Make one image the listing's cover.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the image is not attached to the
    /// listing.
    pub async fn set_cover(
        &self,
        id: PropertyId,
        image_id: PropertyImageId,
    ) -> Result<PropertyImage, AppError> {
        let mut tx = self.pool.begin().await?;
        properties::lock(&mut tx, id)
            .await?
            .ok_or(AppError::NotFound("property"))?;
        let image = properties::set_cover(&mut tx, id, image_id).await?;
        tx.commit().await?;
        Ok(image)
    }
}
