//! Genres and categories

use auth::policy::{Action, ResourceKind};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use common::error::DatabaseError;

use crate::{
    error::ApiError,
    extract::{PathParams, QueryParams, ValidatedJson, required},
    middleware::CurrentActor,
    models::catalog::{CatalogEntryRequest, CatalogQuery},
    pagination::Pagination,
    repositories::{CatalogKind, CatalogRepository},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/genres", get(list_genres).post(create_genre))
        .route("/genres/:slug", delete(delete_genre))
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:slug", delete(delete_category))
}

fn resource(kind: CatalogKind) -> ResourceKind {
    match kind {
        CatalogKind::Genre => ResourceKind::Genre,
        CatalogKind::Category => ResourceKind::Category,
    }
}

async fn list(
    repository: &CatalogRepository,
    actor: CurrentActor,
    pagination: Pagination,
    query: CatalogQuery,
) -> Result<impl IntoResponse + use<>, ApiError> {
    actor.authorize(resource(repository.kind()), Action::List, None)?;

    let (entries, count) = repository
        .list(
            query.search.as_deref(),
            pagination.limit(),
            pagination.offset(),
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to list {:?} entries: {}", repository.kind(), e);
            ApiError::InternalServerError
        })?;

    Ok(Json(pagination.respond(entries, count)?))
}

async fn create(
    repository: &CatalogRepository,
    actor: CurrentActor,
    payload: Result<ValidatedJson<CatalogEntryRequest>, ApiError>,
) -> Result<impl IntoResponse + use<>, ApiError> {
    let kind = repository.kind();
    actor.authorize(resource(kind), Action::Create, None)?;
    let ValidatedJson(payload) = payload?;

    let name = required(payload.name, "name")?;
    let slug = required(payload.slug, "slug")?;

    let entry = repository.create(&name, &slug).await.map_err(|e| match e {
        DatabaseError::UniqueViolation { .. } => {
            ApiError::field("slug", "This slug is already in use.")
        }
        e => {
            tracing::error!("Failed to create {:?} entry: {}", kind, e);
            ApiError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(entry)))
}

async fn remove(
    repository: &CatalogRepository,
    actor: CurrentActor,
    slug: String,
) -> Result<impl IntoResponse + use<>, ApiError> {
    let kind = repository.kind();
    actor.authorize(resource(kind), Action::Delete, None)?;

    let deleted = repository.delete_by_slug(&slug).await.map_err(|e| match e {
        DatabaseError::ForeignKeyViolation { .. } => {
            ApiError::Conflict(format!("'{}' is still used by titles and cannot be deleted.", slug))
        }
        e => {
            tracing::error!("Failed to delete {:?} entry: {}", kind, e);
            ApiError::from(e)
        }
    })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

/// List genres, optionally searching by name
pub async fn list_genres(
    actor: CurrentActor,
    State(state): State<AppState>,
    pagination: Pagination,
    QueryParams(query): QueryParams<CatalogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    list(&state.genres, actor, pagination, query).await
}

/// Create a genre
pub async fn create_genre(
    actor: CurrentActor,
    State(state): State<AppState>,
    payload: Result<ValidatedJson<CatalogEntryRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    create(&state.genres, actor, payload).await
}

/// Delete a genre by slug
pub async fn delete_genre(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams(slug): PathParams<String>,
) -> Result<impl IntoResponse, ApiError> {
    remove(&state.genres, actor, slug).await
}

/// List categories, optionally searching by name
pub async fn list_categories(
    actor: CurrentActor,
    State(state): State<AppState>,
    pagination: Pagination,
    QueryParams(query): QueryParams<CatalogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    list(&state.categories, actor, pagination, query).await
}

/// Create a category
pub async fn create_category(
    actor: CurrentActor,
    State(state): State<AppState>,
    payload: Result<ValidatedJson<CatalogEntryRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    create(&state.categories, actor, payload).await
}

/// Delete a category by slug; refused while titles use it
pub async fn delete_category(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams(slug): PathParams<String>,
) -> Result<impl IntoResponse, ApiError> {
    remove(&state.categories, actor, slug).await
}
