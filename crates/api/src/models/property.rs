//! Property listing types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use estate_desk_core::{
    CurrencyCode, DocumentKind, DomainError, Email, EmployeeId, ListingType, Percentage, Phone,
    PropertyDocumentId, PropertyId, PropertyImageId, PropertyStatus,
};

use super::{PageParams, http_url, optional_text, required_text};

/// A property listing (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Property {
    pub id: PropertyId,
    /// Public reference shown in the catalog.
    pub code: String,
    pub title: String,
    pub description: String,
    pub listing_type: ListingType,
    pub status: PropertyStatus,
    pub price: Decimal,
    pub currency: CurrencyCode,
    pub surface_m2: Option<Decimal>,
    pub street: String,
    pub city: String,
    pub zone: String,
    pub owner_name: String,
    pub owner_phone: String,
    pub owner_email: Option<String>,
    /// Listing advisor.
    pub advisor_id: Option<EmployeeId>,
    /// Commission percentage charged on a closed operation.
    pub commission_rate: Decimal,
    pub listed_at: NaiveDate,
    pub published_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An image attached to a listing.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyImage {
    pub id: PropertyImageId,
    pub property_id: PropertyId,
    pub url: String,
    pub caption: Option<String>,
    pub position: i32,
    pub is_cover: bool,
    pub created_at: DateTime<Utc>,
}

/// A document attached to a listing.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyDocument {
    pub id: PropertyDocumentId,
    pub property_id: PropertyId,
    pub kind: DocumentKind,
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// A listing with its images and documents.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyDetail {
    #[serde(flatten)]
    pub property: Property,
    pub images: Vec<PropertyImage>,
    pub documents: Vec<PropertyDocument>,
}

/// Request body for `POST /properties` and `PUT /properties/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyInput {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub listing_type: ListingType,
    pub price: Decimal,
    pub currency: Option<CurrencyCode>,
    pub surface_m2: Option<Decimal>,
    pub street: String,
    pub city: String,
    pub zone: String,
    pub owner_name: String,
    pub owner_phone: Phone,
    pub owner_email: Option<Email>,
    pub advisor_id: Option<EmployeeId>,
    pub commission_rate: Percentage,
    pub listed_at: Option<NaiveDate>,
    #[serde(default)]
    pub published: bool,
}

impl PropertyInput {
    /// Trim text fields and check amounts.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` for blank required text, a
    /// non-positive price or surface, or a malformed code.
    pub fn validate(mut self) -> Result<Self, DomainError> {
        self.code = required_text("code", &self.code, 30)?.to_uppercase();
        if !self
            .code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(DomainError::invalid(
                "code may only contain letters, digits and dashes",
            ));
        }
        self.title = required_text("title", &self.title, 200)?;
        self.description = self.description.trim().to_string();
        self.street = required_text("street", &self.street, 200)?;
        self.city = required_text("city", &self.city, 100)?;
        self.zone = required_text("zone", &self.zone, 100)?;
        self.owner_name = required_text("owner_name", &self.owner_name, 200)?;

        if self.price <= Decimal::ZERO {
            return Err(DomainError::invalid("price must be greater than zero"));
        }
        if self.surface_m2.is_some_and(|s| s <= Decimal::ZERO) {
            return Err(DomainError::invalid("surface_m2 must be greater than zero"));
        }

        Ok(self)
    }
}

/// Request body for `POST /properties/{id}/status`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StatusChange {
    pub status: PropertyStatus,
}

/// Request body for `POST /properties/{id}/images`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewImageInput {
    pub url: String,
    pub caption: Option<String>,
    /// Defaults to the end of the list.
    pub position: Option<i32>,
    #[serde(default)]
    pub is_cover: bool,
}

impl NewImageInput {
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` for a non-http URL or negative position.
    pub fn validate(mut self) -> Result<Self, DomainError> {
        self.url = http_url("url", &self.url)?;
        self.caption = optional_text("caption", self.caption.as_deref(), 200)?;
        if self.position.is_some_and(|p| p < 0) {
            return Err(DomainError::invalid("position cannot be negative"));
        }
        Ok(self)
    }
}

/// Request body for `POST /properties/{id}/documents`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocumentInput {
    pub kind: DocumentKind,
    pub name: String,
    pub url: String,
}

impl NewDocumentInput {
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` for a blank name or non-http URL.
    pub fn validate(mut self) -> Result<Self, DomainError> {
        self.name = required_text("name", &self.name, 200)?;
        self.url = http_url("url", &self.url)?;
        Ok(self)
    }
}

/// Query parameters for `GET /properties`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyFilter {
    pub status: Option<PropertyStatus>,
    pub listing_type: Option<ListingType>,
    pub city: Option<String>,
    pub zone: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub advisor_id: Option<EmployeeId>,
    /// Matches code, title or street.
    pub q: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PropertyFilter {
    #[must_use]
    pub const fn paging(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Public catalog entry. Owner contact data and internal fields are omitted.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogProperty {
    pub code: String,
    pub title: String,
    pub description: String,
    pub listing_type: ListingType,
    pub status: PropertyStatus,
    pub price: Decimal,
    pub currency: CurrencyCode,
    pub surface_m2: Option<Decimal>,
    pub city: String,
    pub zone: String,
    pub cover_url: Option<String>,
}

/// Public catalog image.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogImage {
    pub url: String,
    pub caption: Option<String>,
    pub is_cover: bool,
}

/// Public catalog detail page.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogDetail {
    #[serde(flatten)]
    pub property: CatalogProperty,
    pub images: Vec<CatalogImage>,
}

/// Query parameters for `GET /catalog/properties`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFilter {
    pub listing_type: Option<ListingType>,
    pub city: Option<String>,
    pub zone: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl CatalogFilter {
    #[must_use]
    pub const fn paging(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(price: &str) -> PropertyInput {
        serde_json::from_value(serde_json::json!({
            "code": " sc-0012 ",
            "title": "Casa en Equipetrol",
            "listing_type": "sale",
            "price": price,
            "street": "Av. San Martin 123",
            "city": "Santa Cruz",
            "zone": "Equipetrol",
            "owner_name": "Juan Perez",
            "owner_phone": "70012345",
            "commission_rate": "3"
        }))
        .unwrap()
    }

    #[test]
    fn test_validate_normalizes_code() {
        let valid = input("185000").validate().unwrap();
        assert_eq!(valid.code, "SC-0012");
        assert!(!valid.published);
    }

    #[test]
    fn test_validate_rejects_non_positive_price() {
        assert!(input("0").validate().is_err());
    }

    #[test]
    fn test_commission_rate_over_100_fails_deserialization() {
        let result: Result<PropertyInput, _> = serde_json::from_value(serde_json::json!({
            "code": "X1",
            "title": "t",
            "listing_type": "rental",
            "price": "10",
            "street": "s",
            "city": "c",
            "zone": "z",
            "owner_name": "o",
            "owner_phone": "70012345",
            "commission_rate": "150"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_image_requires_http_url() {
        let image = NewImageInput {
            url: "javascript:alert(1)".to_string(),
            caption: None,
            position: None,
            is_cover: false,
        };
        assert!(image.validate().is_err());
    }
}
