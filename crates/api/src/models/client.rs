//! Client and interaction history types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use estate_desk_core::{
    ClientId, ClientOrigin, DomainError, Email, InteractionId, InteractionKind, Phone, UserId,
};

use super::{PageParams, optional_text, required_text};

/// A prospective buyer or tenant (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Client {
    pub id: ClientId,
    pub full_name: String,
    pub phone: Phone,
    pub email: Option<Email>,
    pub preferred_zone: Option<String>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub origin: ClientOrigin,
    pub registered_by: Option<UserId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of a client's history. Entries are never edited or removed.
#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub client_id: ClientId,
    pub kind: InteractionKind,
    pub body: String,
    pub author_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

const fn default_true() -> bool {
    true
}

/// Request body for `POST /clients` and `PUT /clients/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInput {
    pub full_name: String,
    pub phone: Phone,
    pub email: Option<Email>,
    pub preferred_zone: Option<String>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    #[serde(default)]
    pub origin: ClientOrigin,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl ClientInput {
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` for a blank name, a negative budget,
    /// or `budget_min` above `budget_max`.
    pub fn validate(mut self) -> Result<Self, DomainError> {
        self.full_name = required_text("full_name", &self.full_name, 200)?;
        self.preferred_zone = optional_text("preferred_zone", self.preferred_zone.as_deref(), 100)?;

        for (field, value) in [("budget_min", self.budget_min), ("budget_max", self.budget_max)] {
            if value.is_some_and(|v| v < Decimal::ZERO) {
                return Err(DomainError::invalid(format!("{field} cannot be negative")));
            }
        }
        if let (Some(min), Some(max)) = (self.budget_min, self.budget_max)
            && min > max
        {
            return Err(DomainError::invalid(
                "budget_min cannot be greater than budget_max",
            ));
        }

        Ok(self)
    }
}

/// Request body for `POST /clients/{id}/interactions`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInteractionInput {
    #[serde(default)]
    pub kind: InteractionKind,
    pub body: String,
}

impl NewInteractionInput {
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` for a blank body.
    pub fn validate(mut self) -> Result<Self, DomainError> {
        self.body = required_text("body", &self.body, 4000)?;
        Ok(self)
    }
}

/// Query parameters for `GET /clients`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientFilter {
    /// Matches name, phone or email.
    pub q: Option<String>,
    pub origin: Option<ClientOrigin>,
    pub zone: Option<String>,
    pub active: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ClientFilter {
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

    fn input(min: Option<&str>, max: Option<&str>) -> ClientInput {
        serde_json::from_value(serde_json::json!({
            "full_name": "  Maria Rojas ",
            "phone": "76543210",
            "budget_min": min,
            "budget_max": max,
            "origin": "whatsapp"
        }))
        .unwrap()
    }

    #[test]
    fn test_validate_budget_range() {
        let valid = input(Some("50000"), Some("90000")).validate().unwrap();
        assert_eq!(valid.full_name, "Maria Rojas");
        assert_eq!(valid.origin, ClientOrigin::Whatsapp);

        assert!(input(Some("90000"), Some("50000")).validate().is_err());
        assert!(input(Some("-1"), None).validate().is_err());
        assert!(input(None, Some("100")).validate().is_ok());
    }

    #[test]
    fn test_interaction_defaults_to_note() {
        let input: NewInteractionInput =
            serde_json::from_value(serde_json::json!({ "body": "Called back" })).unwrap();
        assert_eq!(input.kind, InteractionKind::Note);
        assert!(
            NewInteractionInput {
                kind: InteractionKind::Call,
                body: "  ".into()
            }
            .validate()
            .is_err()
        );
    }
}
