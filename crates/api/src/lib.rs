//! User account service library.
//!
//! Registration, email verification, password login with failed-login
//! lockout, signed access tokens, role-gated user management and
//! transactional email. Exposed as a library so that the CLI and the
//! integration tests can build the same router and services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
