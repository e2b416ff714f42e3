//! Authentication service models

pub mod role;
pub mod user;

pub use role::{Role, UnknownRole};
pub use user::{NewUser, UpdateUser, User};
