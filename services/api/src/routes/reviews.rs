//! Reviews of a title
//!
//! An author reviews a title at most once. The handler checks first so the
//! client gets a field-style error; the unique constraint catches the
//! concurrent case and surfaces as a conflict.

use auth::policy::{Action, ResourceKind};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use common::error::{DatabaseError, FieldErrors};

use crate::{
    error::ApiError,
    extract::{PathParams, ValidatedJson, required},
    middleware::CurrentActor,
    models::reviews::{CreateReviewRequest, Review, UpdateReviewRequest},
    pagination::Pagination,
    state::AppState,
};

const ALREADY_REVIEWED: &str = "You have already reviewed this title.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/titles/:title_id/reviews",
            get(list_reviews).post(create_review),
        )
        .route(
            "/titles/:title_id/reviews/:review_id",
            get(get_review).patch(update_review).delete(delete_review),
        )
}

/// 404 unless the title exists
async fn ensure_title(state: &AppState, title_id: i64) -> Result<(), ApiError> {
    let exists = state.titles.exists(title_id).await.map_err(|e| {
        tracing::error!("Failed to look up title: {}", e);
        ApiError::InternalServerError
    })?;

    if exists { Ok(()) } else { Err(ApiError::NotFound) }
}

/// Fetch a review of the title in the path
pub(super) async fn find_review(
    state: &AppState,
    title_id: i64,
    review_id: i64,
) -> Result<Review, ApiError> {
    state
        .reviews
        .find(title_id, review_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get review: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound)
}

/// List the reviews of a title
pub async fn list_reviews(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams(title_id): PathParams<i64>,
    pagination: Pagination,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::Review, Action::List, None)?;
    ensure_title(&state, title_id).await?;

    let (reviews, count) = state
        .reviews
        .list(title_id, pagination.limit(), pagination.offset())
        .await
        .map_err(|e| {
            tracing::error!("Failed to list reviews: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(pagination.respond(reviews, count)?))
}

/// Review a title
pub async fn create_review(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams(title_id): PathParams<i64>,
    payload: Result<ValidatedJson<CreateReviewRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::Review, Action::Create, None)?;
    let author = actor.require_user()?;
    ensure_title(&state, title_id).await?;
    let ValidatedJson(payload) = payload?;

    let text = required(payload.text, "text")?;
    let score = required(payload.score, "score")?;

    let reviewed = state
        .reviews
        .exists_for_author(title_id, author.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to check existing reviews: {}", e);
            ApiError::InternalServerError
        })?;

    if reviewed {
        return Err(ApiError::Validation(FieldErrors::single(
            "non_field_errors",
            ALREADY_REVIEWED,
        )));
    }

    let review = state
        .reviews
        .create(title_id, author.id, &text, score)
        .await
        .map_err(|e| match e {
            DatabaseError::UniqueViolation { .. } => {
                tracing::warn!(
                    "Concurrent review of title {} by user {} rejected",
                    title_id,
                    author.id
                );
                ApiError::Conflict(ALREADY_REVIEWED.to_string())
            }
            DatabaseError::ForeignKeyViolation { .. } => ApiError::NotFound,
            e => {
                tracing::error!("Failed to create review: {}", e);
                ApiError::from(e)
            }
        })?;

    Ok((StatusCode::CREATED, Json(review)))
}

/// Get a review of a title
pub async fn get_review(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams((title_id, review_id)): PathParams<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::Review, Action::Retrieve, None)?;
    let review = find_review(&state, title_id, review_id).await?;

    Ok(Json(review))
}

/// Edit a review; allowed to its author and to staff
pub async fn update_review(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams((title_id, review_id)): PathParams<(i64, i64)>,
    payload: Result<ValidatedJson<UpdateReviewRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    actor.require_user()?;
    let review = find_review(&state, title_id, review_id).await?;
    actor.authorize(ResourceKind::Review, Action::Update, Some(review.author_id))?;
    let ValidatedJson(payload) = payload?;

    let review = state
        .reviews
        .update(review.id, payload.text.as_deref(), payload.score)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update review: {}", e);
            ApiError::from(e)
        })?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(review))
}

/// Delete a review; allowed to its author and to staff
pub async fn delete_review(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams((title_id, review_id)): PathParams<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    actor.require_user()?;
    let review = find_review(&state, title_id, review_id).await?;
    actor.authorize(ResourceKind::Review, Action::Delete, Some(review.author_id))?;

    let deleted = state.reviews.delete(review.id).await.map_err(|e| {
        tracing::error!("Failed to delete review: {}", e);
        ApiError::InternalServerError
    })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
