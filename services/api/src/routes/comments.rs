//! Comments on a review

use auth::policy::{Action, ResourceKind};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::{
    error::ApiError,
    extract::{PathParams, ValidatedJson, required},
    middleware::CurrentActor,
    models::reviews::{Comment, CommentRequest},
    pagination::Pagination,
    state::AppState,
};

use super::reviews::find_review;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/titles/:title_id/reviews/:review_id/comments",
            get(list_comments).post(create_comment),
        )
        .route(
            "/titles/:title_id/reviews/:review_id/comments/:comment_id",
            get(get_comment).patch(update_comment).delete(delete_comment),
        )
}

async fn find_comment(
    state: &AppState,
    review_id: i64,
    comment_id: i64,
) -> Result<Comment, ApiError> {
    state
        .comments
        .find(review_id, comment_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get comment: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound)
}

/// List the comments on a review
pub async fn list_comments(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams((title_id, review_id)): PathParams<(i64, i64)>,
    pagination: Pagination,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::Comment, Action::List, None)?;
    let review = find_review(&state, title_id, review_id).await?;

    let (comments, count) = state
        .comments
        .list(review.id, pagination.limit(), pagination.offset())
        .await
        .map_err(|e| {
            tracing::error!("Failed to list comments: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(pagination.respond(comments, count)?))
}

/// Comment on a review
pub async fn create_comment(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams((title_id, review_id)): PathParams<(i64, i64)>,
    payload: Result<ValidatedJson<CommentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::Comment, Action::Create, None)?;
    let author = actor.require_user()?;
    let review = find_review(&state, title_id, review_id).await?;
    let ValidatedJson(payload) = payload?;

    let text = required(payload.text, "text")?;

    let comment = state
        .comments
        .create(review.id, author.id, &text)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create comment: {}", e);
            ApiError::from(e)
        })?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Get a comment on a review
pub async fn get_comment(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams((title_id, review_id, comment_id)): PathParams<(i64, i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::Comment, Action::Retrieve, None)?;
    let review = find_review(&state, title_id, review_id).await?;
    let comment = find_comment(&state, review.id, comment_id).await?;

    Ok(Json(comment))
}

/// Edit a comment; allowed to its author and to staff
pub async fn update_comment(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams((title_id, review_id, comment_id)): PathParams<(i64, i64, i64)>,
    payload: Result<ValidatedJson<CommentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    actor.require_user()?;
    let review = find_review(&state, title_id, review_id).await?;
    let comment = find_comment(&state, review.id, comment_id).await?;
    actor.authorize(
        ResourceKind::Comment,
        Action::Update,
        Some(comment.author_id),
    )?;
    let ValidatedJson(payload) = payload?;

    let text = required(payload.text, "text")?;

    let comment = state
        .comments
        .update(comment.id, &text)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update comment: {}", e);
            ApiError::from(e)
        })?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(comment))
}

/// Delete a comment; allowed to its author and to staff
pub async fn delete_comment(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams((title_id, review_id, comment_id)): PathParams<(i64, i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    actor.require_user()?;
    let review = find_review(&state, title_id, review_id).await?;
    let comment = find_comment(&state, review.id, comment_id).await?;
    actor.authorize(
        ResourceKind::Comment,
        Action::Delete,
        Some(comment.author_id),
    )?;

    let deleted = state.comments.delete(comment.id).await.map_err(|e| {
        tracing::error!("Failed to delete comment: {}", e);
        ApiError::InternalServerError
    })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
