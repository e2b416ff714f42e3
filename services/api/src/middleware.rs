//! Bearer token authentication
//!
//! Every handler that needs to know who is calling takes a [`CurrentActor`].
//! A request without an `Authorization` header is anonymous; a header that
//! does not carry a valid access token is rejected outright, even on routes
//! anonymous callers may use.

use auth::{
    models::User,
    policy::{self, Action, Actor, Decision, ResourceKind},
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::{debug, warn};

use crate::{error::ApiError, state::AppState};

/// Caller of the current request
#[derive(Debug, Clone)]
pub struct CurrentActor {
    pub actor: Actor,
    /// The authenticated user, `None` for anonymous callers
    pub user: Option<User>,
}

impl CurrentActor {
    pub fn anonymous() -> Self {
        Self {
            actor: Actor::Anonymous,
            user: None,
        }
    }

    pub fn authenticated(user: User) -> Self {
        Self {
            actor: Actor::from(&user),
            user: Some(user),
        }
    }

    /// The authenticated user, or 401
    pub fn require_user(&self) -> Result<&User, ApiError> {
        self.user.as_ref().ok_or(ApiError::Unauthorized)
    }

    /// Ask the policy; `owner` is the user owning the target resource
    pub fn authorize(
        &self,
        kind: ResourceKind,
        action: Action,
        owner: Option<i64>,
    ) -> Result<(), ApiError> {
        match policy::decide(&self.actor, kind, action, owner) {
            Decision::Allow => Ok(()),
            Decision::Unauthenticated => Err(ApiError::Unauthorized),
            Decision::Forbidden => Err(ApiError::Forbidden),
        }
    }

    pub fn may_assign_role(&self) -> bool {
        policy::may_assign_role(&self.actor)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(Self::anonymous());
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|e| {
                    debug!("Malformed Authorization header: {}", e);
                    ApiError::InvalidToken
                })?;

        let user = state.auth.authenticate(bearer.token()).await.map_err(|e| {
            warn!("Rejected bearer token: {}", e);
            ApiError::from(e)
        })?;

        Ok(Self::authenticated(user))
    }
}
