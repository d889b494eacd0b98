//! Domain models for the account service.

pub mod user;

pub use user::{
    AdminUserCreate, ListParams, NewUser, User, UserChanges, UserCreate, UserListResponse,
    UserResponse,
};
