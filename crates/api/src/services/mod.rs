//! Business logic services.
//!
//! # Services
//!
//! - `accounts` - Account registration and password resets
//! - `auth` - Password login and JWT bearer tokens
//! - `operations` - Operation lifecycle and commission shares
//! - `properties` - Listing status, images and edits
//! - `visits` - Visit scheduling and rotation assignment

pub mod accounts;
pub mod auth;
pub mod operations;
pub mod properties;
pub mod visits;

pub use accounts::AccountService;
pub use auth::{AuthError, AuthService, TokenService};
pub use operations::OperationService;
pub use properties::PropertyService;
pub use visits::VisitService;
