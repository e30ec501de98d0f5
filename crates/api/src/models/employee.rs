//! Staff profile types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use estate_desk_core::{DomainError, Email, EmployeeId, Phone};

use super::{PageParams, required_text};

/// A staff member (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub national_id: String,
    pub first_names: String,
    pub last_names: String,
    pub email: Email,
    pub phone: Phone,
    pub birth_date: Option<NaiveDate>,
    /// Zones this employee covers. Empty means every zone.
    pub zones: Vec<String>,
    pub active: bool,
    /// Rotation pointer for automatic visit assignment.
    pub last_assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_names, self.last_names)
    }
}

const fn default_true() -> bool {
    true
}

/// Request body for `POST /employees` and `PUT /employees/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeInput {
    pub national_id: String,
    pub first_names: String,
    pub last_names: String,
    pub email: Email,
    pub phone: Phone,
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl EmployeeInput {
    /// Trim text fields and dedupe zones case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Invalid` for blank names or a birth date in the
    /// future.
    pub fn validate(mut self, today: NaiveDate) -> Result<Self, DomainError> {
        self.national_id = required_text("national_id", &self.national_id, 20)?;
        self.first_names = required_text("first_names", &self.first_names, 100)?;
        self.last_names = required_text("last_names", &self.last_names, 100)?;

        if self.birth_date.is_some_and(|d| d >= today) {
            return Err(DomainError::invalid("birth_date must be in the past"));
        }

        let mut zones: Vec<String> = Vec::with_capacity(self.zones.len());
        for zone in &self.zones {
            let zone = zone.trim();
            if zone.is_empty() || zones.iter().any(|z| z.eq_ignore_ascii_case(zone)) {
                continue;
            }
            zones.push(zone.to_string());
        }
        self.zones = zones;

        Ok(self)
    }
}

/// Query parameters for `GET /employees`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeFilter {
    pub active: Option<bool>,
    pub zone: Option<String>,
    pub q: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl EmployeeFilter {
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

    fn input() -> EmployeeInput {
        serde_json::from_value(serde_json::json!({
            "national_id": " 4455667 LP ",
            "first_names": "Ana",
            "last_names": "Quispe",
            "email": "ana@inmobiliaria.bo",
            "phone": "+591 70000000",
            "zones": ["Sopocachi", "sopocachi ", "", "Calacoto"]
        }))
        .unwrap()
    }

    #[test]
    fn test_validate_normalizes_zones() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let valid = input().validate(today).unwrap();
        assert_eq!(valid.national_id, "4455667 LP");
        assert_eq!(valid.zones, vec!["Sopocachi".to_string(), "Calacoto".to_string()]);
        assert!(valid.active);
    }

    #[test]
    fn test_validate_rejects_future_birth_date() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut bad = input();
        bad.birth_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        assert!(bad.validate(today).is_err());
    }

    #[test]
    fn test_invalid_phone_fails_deserialization() {
        let result: Result<EmployeeInput, _> = serde_json::from_value(serde_json::json!({
            "national_id": "1",
            "first_names": "A",
            "last_names": "B",
            "email": "a@b.co",
            "phone": "call me"
        }));
        assert!(result.is_err());
    }
}
