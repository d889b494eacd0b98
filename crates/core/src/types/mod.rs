//! Core types for the accounts service.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod nickname;
pub mod notification;
pub mod profile_url;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use nickname::{Nickname, NicknameError};
pub use notification::{NotificationKind, UnknownNotificationKind};
pub use profile_url::{ProfileUrl, ProfileUrlError};
pub use role::{UnknownRole, UserRole};
