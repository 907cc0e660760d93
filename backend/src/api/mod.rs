//! REST API module.
//!
//! Handlers are thin: extract the caller and the request, call one service
//! method, wrap the result in the response envelope.

mod auth;
mod invitations;
mod key_results;
mod members;
mod okrs;
mod reviews;
mod teams;

pub use auth::*;
pub use invitations::*;
pub use key_results::*;
pub use members::*;
pub use okrs::*;
pub use reviews::*;
pub use teams::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Wrap a service result in the envelope.
pub fn respond<T: Serialize>(result: Result<T, AppError>) -> ApiResult<T> {
    result.map(ApiResponse::new)
}
