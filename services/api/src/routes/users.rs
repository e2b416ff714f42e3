//! User management and the current user's profile

use auth::{
    models::{NewUser, UpdateUser, User},
    policy::{Action, ResourceKind},
    service::taken_field_errors,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use common::error::DatabaseError;

use crate::{
    error::ApiError,
    extract::{PathParams, QueryParams, ValidatedJson, required},
    middleware::CurrentActor,
    models::users::{CreateUserRequest, UpdateUserRequest, UserQuery, UserResponse},
    pagination::Pagination,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/me", get(get_me).patch(update_me))
        .route(
            "/users/:username",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

/// Unique violations become field errors, anything else is logged
fn write_error(e: DatabaseError) -> ApiError {
    match e.constraint() {
        Some(constraint) if e.is_unique_violation() => {
            ApiError::Validation(taken_field_errors(constraint))
        }
        _ => {
            tracing::error!("Failed to write user: {}", e);
            ApiError::from(e)
        }
    }
}

/// Id of the caller when the path names the caller's own account
fn owner_of(actor: &CurrentActor, username: &str) -> Option<i64> {
    actor
        .user
        .as_ref()
        .filter(|user| user.username == username)
        .map(|user| user.id)
}

async fn apply_update(
    state: &AppState,
    user: &User,
    changes: UpdateUser,
) -> Result<User, ApiError> {
    if changes.is_empty() {
        return Ok(user.clone());
    }

    state
        .users
        .update(user.id, &changes)
        .await
        .map_err(write_error)?
        .ok_or(ApiError::NotFound)
}

/// List users, optionally searching by username
pub async fn list_users(
    actor: CurrentActor,
    State(state): State<AppState>,
    pagination: Result<Pagination, ApiError>,
    QueryParams(query): QueryParams<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::User, Action::List, None)?;
    let pagination = pagination?;

    let (users, count) = state
        .users
        .list(
            query.search.as_deref(),
            pagination.limit(),
            pagination.offset(),
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to list users: {}", e);
            ApiError::InternalServerError
        })?;

    let users = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(pagination.respond(users, count)?))
}

/// Create a user on behalf of an admin
pub async fn create_user(
    actor: CurrentActor,
    State(state): State<AppState>,
    payload: Result<ValidatedJson<CreateUserRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::User, Action::Create, None)?;
    let ValidatedJson(payload) = payload?;

    let new_user = NewUser {
        username: required(payload.username, "username")?,
        email: required(payload.email, "email")?,
        first_name: payload.first_name.unwrap_or_default(),
        last_name: payload.last_name.unwrap_or_default(),
        bio: payload.bio.unwrap_or_default(),
        role: payload.role.unwrap_or_default(),
        is_superuser: false,
    };

    let user = state.users.create(&new_user).await.map_err(write_error)?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Profile of the caller
pub async fn get_me(actor: CurrentActor) -> Result<impl IntoResponse, ApiError> {
    let user = actor.require_user()?;
    Ok(Json(UserResponse::from(user.clone())))
}

/// Update the caller's profile; the role only changes for admins
pub async fn update_me(
    actor: CurrentActor,
    State(state): State<AppState>,
    payload: Result<ValidatedJson<UpdateUserRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let user = actor.require_user()?;
    let ValidatedJson(payload) = payload?;

    let changes = payload.into_update(actor.may_assign_role());
    let user = apply_update(&state, user, changes).await?;

    Ok(Json(UserResponse::from(user)))
}

/// Get a user by username
pub async fn get_user(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams(username): PathParams<String>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(
        ResourceKind::User,
        Action::Retrieve,
        owner_of(&actor, &username),
    )?;

    let user = state
        .users
        .find_by_username(&username)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get user: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(UserResponse::from(user)))
}

/// Update a user by username
pub async fn update_user(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams(username): PathParams<String>,
    payload: Result<ValidatedJson<UpdateUserRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(
        ResourceKind::User,
        Action::Update,
        owner_of(&actor, &username),
    )?;

    let user = state
        .users
        .find_by_username(&username)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get user: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::NotFound)?;

    let ValidatedJson(payload) = payload?;
    let changes = payload.into_update(actor.may_assign_role());
    let user = apply_update(&state, &user, changes).await?;

    Ok(Json(UserResponse::from(user)))
}

/// Delete a user by username
pub async fn delete_user(
    actor: CurrentActor,
    State(state): State<AppState>,
    PathParams(username): PathParams<String>,
) -> Result<impl IntoResponse, ApiError> {
    actor.authorize(ResourceKind::User, Action::Delete, None)?;

    let deleted = state
        .users
        .delete_by_username(&username)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {}", e);
            ApiError::InternalServerError
        })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
