//! Estate Desk Core - Domain types and business rules.
//!
//! This crate provides the pieces shared by every Estate Desk component:
//! - `api` - REST service for the brokerage back office
//! - `cli` - Command-line tools for migrations and account bootstrap
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. Persistence encodings are available behind the
//! `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, phones, money and statuses
//! - [`authz`] - Static role capability table
//! - [`rotation`] - Round-robin advisor selection for visit assignment
//! - [`commission`] - Commission totals and per-participant splits
//! - [`error`] - `DomainError` wrapping every rule violation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod authz;
pub mod commission;
pub mod error;
pub mod rotation;
pub mod types;

pub use error::DomainError;
pub use types::*;
