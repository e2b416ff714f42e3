//! Titles

use auth::policy::{Action, ResourceKind};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use common::error::FieldErrors;

use crate::{
    error::ApiError,
    extract::{PathParams, QueryParams, ValidatedJson, required},
    models::catalog::{
        CatalogEntry, CreateTitleRequest, NewTitle, TitleChanges, TitleQuery, UpdateTitleRequest,
    },
    middleware::CurrentActor,
    pagination::Pagination,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/titles", get(list_titles).post(create_title))
        .route(
            "/titles/:title_id",
            get(get_title).patch(update_title).delete(delete_title),
        )
}

/// Resolve a category slug, recording a field error when it is unknown
async fn resolve_category(
    state: &AppState,
    slug: &str,
    errors: &mut FieldErrors,
) -> Result<Option<CatalogEntry>, ApiError> {
    let category = state.categories.find_by_slug(slug).await.map_err(|e| {
        tracing::error!("Failed to look up category: {}", e);
        ApiError::InternalServerError
    })?;

    if category.is_none() {
        errors.add(
            "category",
            format!("Object with slug={} does not exist.", slug),
        );
    }

    Ok(category)
}

/// Resolve genre slugs, recording a field error for every unknown one
async fn resolve_genres(
    state: &AppState,
    slugs: &[String],
    errors: &mut FieldErrors,
) -> Result<Vec<i64>, ApiError> {
    let genres = state.genres.find_by_slugs(slugs).await.map_err(|e| {
        tracing::error!("Failed to look up genres: {}", e);
        ApiError::InternalServerError
    })?;

    for slug in slugs {
        if !genres.iter().any(|genre| &genre.slug == slug) {
            errors.add("genre", format!("Object with slug={} does not exist.", slug));
        }
    }

    Ok(genres.into_iter().map(|genre| genre.id).collect())
}

/// List titles with optional filters and ordering
pub async fn list_titles(
    actor: CurrentActor,
    State(state): State<AppState>,
    pagination: Pagination,
    QueryParams(query): QueryParams<TitleQuery>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::Title, Action::List, None)?;
    let filter = query.into_filter().map_err(ApiError::BadRequest)?;

    let (titles, count) = state
        .titles
        .list(&filter, pagination.limit(), pagination.offset())
        .await
        .map_err(|e| {
            tracing::error!("Failed to list titles: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(pagination.respond(titles, count)?))
}

/// Create a title
pub async fn create_title(
    actor: CurrentActor,
    State(state): State<AppState>,
    payload: Result<ValidatedJson<CreateTitleRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::Title, Action::Create, None)?;
    let ValidatedJson(payload) = payload?;

    let genre_slugs = required(payload.genre, "genre")?;
    let category_slug = required(payload.category, "category")?;

    let mut errors = FieldErrors::new();
    let genre_ids = resolve_genres(&state, &genre_slugs, &mut errors).await?;
    let category = resolve_category(&state, &category_slug, &mut errors).await?;
    errors.into_result().map_err(ApiError::Validation)?;

    let new_title = NewTitle {
        name: required(payload.name, "name")?,
        year: required(payload.year, "year")?,
        description: payload.description,
        category_id: required(category, "category")?.id,
        genre_ids,
    };

    let title = state.titles.create(&new_title).await.map_err(|e| {
        tracing::error!("Failed to create title: {}", e);
        ApiError::from(e)
    })?;

    Ok((StatusCode::CREATED, Json(title)))
}

/// Get a title by ID
pub async fn get_title(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams(title_id): PathParams<i64>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::Title, Action::Retrieve, None)?;

    let title = state
        .titles
        .find_by_id(title_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get title: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(title))
}

/// Partially update a title; a genre list replaces the current one
pub async fn update_title(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams(title_id): PathParams<i64>,
    payload: Result<ValidatedJson<UpdateTitleRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::Title, Action::Update, None)?;
    let ValidatedJson(payload) = payload?;

    let mut errors = FieldErrors::new();
    let genre_ids = match &payload.genre {
        Some(slugs) => Some(resolve_genres(&state, slugs, &mut errors).await?),
        None => None,
    };
    let category = match &payload.category {
        Some(slug) => resolve_category(&state, slug, &mut errors).await?,
        None => None,
    };
    errors.into_result().map_err(ApiError::Validation)?;

    let changes = TitleChanges {
        name: payload.name,
        year: payload.year,
        description: payload.description,
        category_id: category.map(|category| category.id),
        genre_ids,
    };

    let title = state
        .titles
        .update(title_id, &changes)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update title: {}", e);
            ApiError::from(e)
        })?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(title))
}

/// Delete a title with its reviews and comments
pub async fn delete_title(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams(title_id): PathParams<i64>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::Title, Action::Delete, None)?;

    let deleted = state.titles.delete(title_id).await.map_err(|e| {
        tracing::error!("Failed to delete title: {}", e);
        ApiError::InternalServerError
    })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
