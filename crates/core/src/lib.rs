//! Accounts Core - Shared domain types.
//!
//! This crate provides the types used across all accounts components:
//! - `api` - The account service (registration, login, user management)
//! - `cli` - Command-line tools for migrations and account administration
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. Every type here is validated on construction, so
//! holding a value is proof that it is well-formed.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for user IDs, emails, nicknames, profile
//!   URLs, roles and notification kinds

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
