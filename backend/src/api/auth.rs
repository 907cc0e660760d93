//! Account and session endpoints.

use axum::{extract::State, Json};

use super::{respond, ApiResult};
use crate::auth::{CurrentUser, SessionToken};
use crate::models::{RegisterRequest, SignInRequest, SignInResponse, UpdateProfileRequest, User};
use crate::AppState;

/// POST /api/auth/register - Create an account.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<User> {
    respond(state.services.register_user(request).await)
}

/// POST /api/auth/login - Exchange credentials for a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<SignInResponse> {
    respond(state.services.sign_in(request).await)
}

/// POST /api/auth/logout - Revoke the presented session token.
pub async fn logout(State(state): State<AppState>, SessionToken(token): SessionToken) -> ApiResult<()> {
    respond(state.services.sign_out(&token).await)
}

/// GET /api/auth/session - The signed-in user.
pub async fn current_session(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> ApiResult<User> {
    respond(state.services.current_user(&actor).await)
}

/// PUT /api/auth/profile - Change the caller's display name.
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<User> {
    respond(state.services.update_profile(&actor, request).await)
}
