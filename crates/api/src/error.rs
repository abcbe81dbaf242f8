use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ctf_platform_models::{ErrorResponse, PlatformError};
use tracing::{error, warn};

/// Response wrapper mapping platform errors onto HTTP statuses
pub struct ApiError(pub PlatformError);

impl From<PlatformError> for ApiError {
    fn from(err: PlatformError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Full detail stays server-side; the client sees the stable code
        if status.is_server_error() {
            error!(code = self.0.code(), error = %self.0, "Request failed");
        } else {
            warn!(code = self.0.code(), error = %self.0, "Request rejected");
        }

        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}
