//! Application state shared across handlers

use auth::{AuthService, repositories::UserRepository};
use sqlx::PgPool;

use crate::{
    config::ApiConfig,
    repositories::{
        CatalogKind, CatalogRepository, CommentRepository, ReviewRepository, TitleRepository,
    },
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: ApiConfig,
    pub auth: AuthService,
    pub users: UserRepository,
    pub genres: CatalogRepository,
    pub categories: CatalogRepository,
    pub titles: TitleRepository,
    pub reviews: ReviewRepository,
    pub comments: CommentRepository,
}

impl AppState {
    /// Wire the repositories onto one pool
    pub fn new(db_pool: PgPool, config: ApiConfig, auth: AuthService) -> Self {
        Self {
            users: auth.users().clone(),
            genres: CatalogRepository::new(db_pool.clone(), CatalogKind::Genre),
            categories: CatalogRepository::new(db_pool.clone(), CatalogKind::Category),
            titles: TitleRepository::new(db_pool.clone()),
            reviews: ReviewRepository::new(db_pool.clone()),
            comments: CommentRepository::new(db_pool.clone()),
            db_pool,
            config,
            auth,
        }
    }
}
