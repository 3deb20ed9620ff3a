use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

/// Errors surfaced to the browser by the portal gateway.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    BadGateway(&'static str, String),
}

impl ApiError {
    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    pub fn no_session() -> Self {
        ApiError::Unauthorized("NO_SESSION", "No active portal session for this token".into())
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
            },
        })
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Status { status: 401, .. } => ApiError::session_expired(),
            BackendError::Status { status: 404, body } => ApiError::NotFound("NOT_FOUND", body),
            other => ApiError::BadGateway("BACKEND_UNAVAILABLE", other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(code, msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::NotFound(code, msg) => {
                (StatusCode::NOT_FOUND, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadGateway(code, msg) => {
                (StatusCode::BAD_GATEWAY, ApiError::to_error_response(code, &msg)).into_response()
            }
        }
    }
}

/// Failures talking to the clinic backend's REST API.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend payload could not be decoded: {0}")]
    Decode(String),
    #[error("backend url is not usable: {0}")]
    InvalidUrl(String),
}

/// Failures opening or using the push channel.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("push channel error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("bearer token cannot be sent as a header")]
    InvalidToken,
    #[error("could not encode push message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("push handshake did not finish within {0:?}")]
    Timeout(std::time::Duration),
}

/// Failures reading identity out of a bearer token.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is not a JWT")]
    Malformed,
    #[error("token payload is not valid: {0}")]
    Payload(String),
    #[error("token carries no subject")]
    MissingSubject,
}
