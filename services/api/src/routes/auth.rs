//! Sign-up and token exchange

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};

use crate::{
    error::ApiError,
    extract::{ValidatedJson, required},
    models::users::{SignupRequest, SignupResponse, TokenRequest, TokenResponse},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/token", post(token))
}

/// Register, or ask for a fresh confirmation code
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = required(payload.username, "username")?;
    let email = required(payload.email, "email")?;

    let user = state.auth.signup(&username, &email).await?;

    Ok(Json(SignupResponse {
        username: user.username,
        email: user.email,
    }))
}

/// Exchange a confirmation code for an access token
pub async fn token(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<TokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = required(payload.username, "username")?;
    let code = required(payload.confirmation_code, "confirmation_code")?;

    let token = state.auth.exchange_code(&username, &code).await?;

    Ok(Json(TokenResponse { token }))
}
