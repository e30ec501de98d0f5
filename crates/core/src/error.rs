//! Domain error aggregating the rule errors of this crate.

use crate::commission::CommissionError;
use crate::rotation::RotationError;
use crate::{EmailError, MoneyError, ParseEnumError, PhoneError, TransitionError};

/// Any business-rule violation raised by core.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Email(#[from] EmailError),
    #[error(transparent)]
    Phone(#[from] PhoneError),
    #[error(transparent)]
    Money(#[from] MoneyError),
    #[error(transparent)]
    Parse(#[from] ParseEnumError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Commission(#[from] CommissionError),
    #[error(transparent)]
    Rotation(#[from] RotationError),
    /// Free-form validation failure.
    #[error("{0}")]
    Invalid(String),
}

impl DomainError {
    /// Shorthand for [`DomainError::Invalid`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}
