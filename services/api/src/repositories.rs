//! Repositories for catalog and user-authored content

pub mod catalog;
pub mod comments;
pub mod reviews;
pub mod titles;

pub use catalog::{CatalogKind, CatalogRepository};
pub use comments::CommentRepository;
pub use reviews::ReviewRepository;
pub use titles::TitleRepository;
