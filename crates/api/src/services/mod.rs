//! Business logic.

pub mod auth;
pub mod email;
pub mod policy;
pub mod users;
