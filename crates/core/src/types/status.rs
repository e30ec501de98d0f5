//! Role, status and kind enums for the brokerage entities.
//!
//! Enums that carry a lifecycle (`PropertyStatus`, `VisitStatus`) expose
//! their transition rules here so that every caller agrees on them.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A state change that the lifecycle does not allow.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {entity} transition from '{from}' to '{to}'")]
pub struct TransitionError {
    /// Entity name (e.g. "visit").
    pub entity: &'static str,
    /// Current state.
    pub from: String,
    /// Requested state.
    pub to: String,
}

/// Unknown textual value for an enum.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    /// Enum name.
    pub kind: &'static str,
    /// Offending input.
    pub value: String,
}

/// Implements `as_str`, `Display` and `FromStr` over snake_case names.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Returns the snake_case name used in JSON and SQL.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase();
                match normalized.as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

/// User role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including employee and account management.
    Broker,
    /// Day-to-day administration of clients, listings, visits and operations.
    Secretary,
    /// Field agent limited to assigned listings and own visits.
    Advisor,
}

string_enum!(Role, "role", {
    Broker => "broker",
    Secretary => "secretary",
    Advisor => "advisor",
});

/// How a property is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "listing_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    Sale,
    Rental,
    /// Bolivian lump-sum lease where the owner returns the deposit at term.
    Anticresis,
}

string_enum!(ListingType, "listing type", {
    Sale => "sale",
    Rental => "rental",
    Anticresis => "anticresis",
});

/// Property listing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "property_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    #[default]
    Available,
    InProcess,
    Reserved,
    Sold,
    Rented,
    Inactive,
}

string_enum!(PropertyStatus, "property status", {
    Available => "available",
    InProcess => "in_process",
    Reserved => "reserved",
    Sold => "sold",
    Rented => "rented",
    Inactive => "inactive",
});

impl PropertyStatus {
    /// Sold and rented listings are closed for good.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Sold | Self::Rented)
    }

    /// Whether a manual status change from `self` to `next` is allowed.
    ///
    /// Closing (`sold`/`rented`) only happens through a finalized operation,
    /// never through this path.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Available, Self::InProcess | Self::Reserved | Self::Inactive)
                | (
                    Self::InProcess,
                    Self::Reserved | Self::Available | Self::Inactive
                )
                | (Self::Reserved, Self::Available | Self::Inactive)
                | (Self::Inactive, Self::Available)
        )
    }

    /// Validate a manual transition.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` if the change is not allowed.
    pub fn transition_to(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                entity: "property",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    /// Status a listing takes when an operation of `kind` closes it.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` if the listing is already closed or inactive.
    pub fn close_with(self, kind: OperationKind) -> Result<Self, TransitionError> {
        let next = match kind {
            OperationKind::Sale => Self::Sold,
            OperationKind::Rental | OperationKind::Anticresis => Self::Rented,
        };
        if self.is_closed() || self == Self::Inactive {
            return Err(TransitionError {
                entity: "property",
                from: self.to_string(),
                to: next.to_string(),
            });
        }
        Ok(next)
    }
}

/// Kinds of documents attached to a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "document_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Exclusivity,
    SaleContract,
    RentalContract,
    Deed,
    FloorPlan,
    Other,
}

string_enum!(DocumentKind, "document kind", {
    Exclusivity => "exclusivity",
    SaleContract => "sale_contract",
    RentalContract => "rental_contract",
    Deed => "deed",
    FloorPlan => "floor_plan",
    Other => "other",
});

/// How a client first reached the brokerage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "client_origin", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ClientOrigin {
    #[default]
    Web,
    Whatsapp,
    Referral,
    SocialMedia,
    PhoneCall,
    OfficeVisit,
    Other,
}

string_enum!(ClientOrigin, "client origin", {
    Web => "web",
    Whatsapp => "whatsapp",
    Referral => "referral",
    SocialMedia => "social_media",
    PhoneCall => "phone_call",
    OfficeVisit => "office_visit",
    Other => "other",
});

/// Entry type in a client's interaction history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "interaction_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    #[default]
    Note,
    Call,
    Message,
    Meeting,
    Visit,
}

string_enum!(InteractionKind, "interaction kind", {
    Note => "note",
    Call => "call",
    Message => "message",
    Meeting => "meeting",
    Visit => "visit",
});

/// Visit lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "visit_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    Rescheduled,
}

string_enum!(VisitStatus, "visit status", {
    Scheduled => "scheduled",
    Completed => "completed",
    Cancelled => "cancelled",
    Rescheduled => "rescheduled",
});

impl VisitStatus {
    /// Completed and cancelled visits accept no further changes.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the visit still occupies its advisor's slot.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !self.is_terminal()
    }

    /// Validate a transition.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError` when leaving a terminal state or when
    /// targeting `scheduled` (a reschedule uses `rescheduled`).
    pub fn transition_to(self, next: Self) -> Result<Self, TransitionError> {
        let allowed = self.is_open()
            && matches!(next, Self::Completed | Self::Cancelled | Self::Rescheduled);
        if allowed {
            Ok(next)
        } else {
            Err(TransitionError {
                entity: "visit",
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

/// Kind of closed deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "operation_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Sale,
    Rental,
    Anticresis,
}

string_enum!(OperationKind, "operation kind", {
    Sale => "sale",
    Rental => "rental",
    Anticresis => "anticresis",
});

impl OperationKind {
    /// Whether a listing of type `listing` can close with this kind.
    #[must_use]
    pub const fn matches_listing(self, listing: ListingType) -> bool {
        matches!(
            (self, listing),
            (Self::Sale, ListingType::Sale)
                | (Self::Rental, ListingType::Rental)
                | (Self::Anticresis, ListingType::Anticresis)
        )
    }
}

/// Payment state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Partial,
    Paid,
    Overdue,
}

string_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Partial => "partial",
    Paid => "paid",
    Overdue => "overdue",
});

/// Who receives a commission share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "share_recipient", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ShareRecipient {
    Advisor,
    Broker,
}

string_enum!(ShareRecipient, "share recipient", {
    Advisor => "advisor",
    Broker => "broker",
});
