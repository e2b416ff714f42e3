//! Repositories for identity data

pub mod user;

pub use user::UserRepository;
